// Dashboard: owns one of each component and exposes read-only views

use crate::burst::{BurstError, BurstExecutor, BurstSummary};
use crate::client::{ClientError, FirewallClient};
use crate::config::Config;
use crate::models::{StatsSnapshot, ThreatLogEntry};
use crate::poller::{PollerHandle, SyncPoller};
use crate::probe::{BaseFields, Feature, LoginScenario, ProbeOutcome, Scenario, SearchScenario};
use crate::session::ProbeSession;

pub mod render;

pub struct Dashboard {
    config: Config,
    client: FirewallClient,
    login: ProbeSession,
    search: ProbeSession,
    burst: BurstExecutor,
    poller: Option<PollerHandle>,
}

impl Dashboard {
    pub fn new(config: Config) -> Result<Self, ClientError> {
        let client = FirewallClient::new(&config)?;
        let burst = BurstExecutor::new(client.clone(), config.burst_delay());

        Ok(Self {
            login: ProbeSession::new(Feature::Login),
            search: ProbeSession::new(Feature::Search),
            burst,
            poller: None,
            client,
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn login_session(&self) -> &ProbeSession {
        &self.login
    }

    pub fn search_session(&self) -> &ProbeSession {
        &self.search
    }

    pub fn burst(&self) -> &BurstExecutor {
        &self.burst
    }

    /// `None` while a login probe is already in flight
    pub async fn login(
        &self,
        scenario: LoginScenario,
        username: &str,
        password: &str,
    ) -> Option<ProbeOutcome> {
        let fields = BaseFields {
            username: username.to_string(),
            password: password.to_string(),
            ..Default::default()
        };
        self.login
            .run(&self.client, Scenario::Login(scenario), &fields)
            .await
    }

    /// `None` while a search probe is already in flight
    pub async fn search(&self, scenario: SearchScenario, query: &str) -> Option<ProbeOutcome> {
        let fields = BaseFields {
            query: query.to_string(),
            ..Default::default()
        };
        self.search
            .run(&self.client, Scenario::Search(scenario), &fields)
            .await
    }

    pub async fn run_burst(&self, count: i64) -> Result<BurstSummary, BurstError> {
        self.burst.run(count).await
    }

    // ============================================
    // Poller lifecycle
    // ============================================

    /// Start polling stats and logs. Calling it while active does nothing.
    pub fn activate(&mut self) {
        if self.poller.is_some() {
            return;
        }
        let poller = SyncPoller::new(self.client.clone(), self.config.poll_interval());
        self.poller = Some(poller.start());
    }

    pub async fn deactivate(&mut self) {
        if let Some(mut handle) = self.poller.take() {
            handle.stop().await;
        }
    }

    pub fn is_active(&self) -> bool {
        self.poller.is_some()
    }

    pub fn poller(&self) -> Option<&PollerHandle> {
        self.poller.as_ref()
    }

    pub fn latest_stats(&self) -> Option<StatsSnapshot> {
        self.poller.as_ref().and_then(PollerHandle::latest_stats)
    }

    pub fn latest_logs(&self) -> Vec<ThreatLogEntry> {
        self.poller
            .as_ref()
            .map(PollerHandle::latest_logs)
            .unwrap_or_default()
    }
}
