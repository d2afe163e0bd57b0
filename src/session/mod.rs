// Per-feature probe state (login, search)

use parking_lot::RwLock;
use std::sync::Arc;

use crate::client::FirewallClient;
use crate::probe::{self, BaseFields, Feature, ProbeOutcome, Scenario};

// ============================================
// Session State
// ============================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub loading: bool,
    pub outcome: ProbeOutcome,
}

impl SessionState {
    /// Enter the loading state and clear the previous result
    pub fn begin(&mut self) {
        self.loading = true;
        self.outcome = ProbeOutcome::default();
    }

    pub fn complete(&mut self, outcome: ProbeOutcome) {
        self.loading = false;
        self.outcome = outcome;
    }
}

// ============================================
// Shared handle
// ============================================

/// One per feature. Only one probe may be in flight at a time; starting
/// another while loading is a no-op.
#[derive(Clone)]
pub struct ProbeSession {
    feature: Feature,
    state: Arc<RwLock<SessionState>>,
}

impl ProbeSession {
    pub fn new(feature: Feature) -> Self {
        Self {
            feature,
            state: Arc::new(RwLock::new(SessionState::default())),
        }
    }

    pub fn feature(&self) -> Feature {
        self.feature
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.read().clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.read().loading
    }

    /// Returns `None` when a probe is already in flight
    fn try_begin(&self) -> Option<LoadingGuard> {
        let mut state = self.state.write();
        if state.loading {
            return None;
        }
        state.begin();
        Some(LoadingGuard {
            state: Arc::clone(&self.state),
            completed: false,
        })
    }

    /// Run one probe through this session.
    ///
    /// Returns `None` without sending anything if a probe is already loading.
    /// If the returned future is dropped before the response arrives, the
    /// session leaves the loading state with an empty outcome.
    pub async fn run(
        &self,
        client: &FirewallClient,
        scenario: Scenario,
        fields: &BaseFields,
    ) -> Option<ProbeOutcome> {
        if scenario.feature() != self.feature {
            tracing::warn!(
                "Scenario {:?} does not belong to the {} session",
                scenario,
                self.feature
            );
            return None;
        }

        let Some(guard) = self.try_begin() else {
            tracing::debug!("{} probe already in flight, ignoring trigger", self.feature);
            return None;
        };

        let outcome = probe::probe(client, scenario, fields).await;
        guard.complete(outcome.clone());
        Some(outcome)
    }
}

/// Pairs every `begin` with a `complete`, even when the run is cancelled
struct LoadingGuard {
    state: Arc<RwLock<SessionState>>,
    completed: bool,
}

impl LoadingGuard {
    fn complete(mut self, outcome: ProbeOutcome) {
        self.state.write().complete(outcome);
        self.completed = true;
    }
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        if !self.completed {
            self.state.write().complete(ProbeOutcome::default());
        }
    }
}
