// ============================================
// Burst Executor for rate-limit probing
// ============================================
//
// Sends `count` identical search requests strictly one after another with a
// fixed pause after each, appending one record per request to a log that
// consumers watch grow. A run always completes all iterations.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::watch;

use crate::client::FirewallClient;
use crate::probe::{self, ProbeRequest};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BurstError {
    #[error("a burst run is already in progress")]
    AlreadyRunning,
}

// ============================================
// Records
// ============================================

/// One line of the burst log. `index` is 1-based dispatch order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BurstRecord {
    Response { index: u64, status: u16 },
    Failed { index: u64 },
}

impl BurstRecord {
    pub fn index(&self) -> u64 {
        match self {
            BurstRecord::Response { index, .. } | BurstRecord::Failed { index } => *index,
        }
    }
}

impl fmt::Display for BurstRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BurstRecord::Response { index, status } => {
                write!(f, "Request #{}: HTTP {}", index, status)
            }
            BurstRecord::Failed { index } => write!(f, "Request #{}: FAILED (blocked)", index),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BurstSummary {
    pub total: u64,
    pub by_status: BTreeMap<u16, u64>,
    pub failed: u64,
    pub elapsed: Duration,
}

impl BurstSummary {
    fn from_records(records: &[BurstRecord], elapsed: Duration) -> Self {
        let mut summary = Self {
            total: records.len() as u64,
            elapsed,
            ..Default::default()
        };
        for record in records {
            match record {
                BurstRecord::Response { status, .. } => {
                    *summary.by_status.entry(*status).or_insert(0) += 1;
                }
                BurstRecord::Failed { .. } => summary.failed += 1,
            }
        }
        summary
    }

    /// Responses the firewall answered with 403 or 429
    pub fn rejected(&self) -> u64 {
        self.by_status
            .iter()
            .filter(|(status, _)| matches!(**status, 403 | 429))
            .map(|(_, n)| n)
            .sum()
    }
}

// ============================================
// Executor
// ============================================

/// Clears the in-progress flag when the run ends
struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Clone)]
pub struct BurstExecutor {
    client: FirewallClient,
    delay: Duration,
    running: Arc<AtomicBool>,
    log: Arc<watch::Sender<Vec<BurstRecord>>>,
}

impl BurstExecutor {
    pub fn new(client: FirewallClient, delay: Duration) -> Self {
        let (log, _) = watch::channel(Vec::new());
        Self {
            client,
            delay,
            running: Arc::new(AtomicBool::new(false)),
            log: Arc::new(log),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Receiver that sees the log after every appended record
    pub fn subscribe(&self) -> watch::Receiver<Vec<BurstRecord>> {
        self.log.subscribe()
    }

    pub fn records(&self) -> Vec<BurstRecord> {
        self.log.borrow().clone()
    }

    /// Run `count` sequential probes. Counts below 1 are treated as 1.
    pub async fn run(&self, count: i64) -> Result<BurstSummary, BurstError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(BurstError::AlreadyRunning);
        }
        let _guard = RunningGuard(Arc::clone(&self.running));

        let total = count.max(1) as u64;
        self.log.send_replace(Vec::new());

        tracing::info!(
            "Burst started: {} requests, {}ms pause",
            total,
            self.delay.as_millis()
        );

        let started = Instant::now();
        let request = ProbeRequest::burst();

        for index in 1..=total {
            let outcome = probe::send(&self.client, &request).await;
            let record = match outcome.status {
                Some(status) => BurstRecord::Response { index, status },
                None => BurstRecord::Failed { index },
            };

            self.log.send_modify(|log| log.push(record));
            tokio::time::sleep(self.delay).await;
        }

        let summary = BurstSummary::from_records(&self.log.borrow(), started.elapsed());
        tracing::info!(
            "Burst finished: {} requests, {} rejected, {} failed in {:.2}s",
            summary.total,
            summary.rejected(),
            summary.failed,
            summary.elapsed.as_secs_f64()
        );

        Ok(summary)
    }
}
