// ============================================
// Sync Poller for firewall stats and threat log
// ============================================
//
// Each resource runs on its own repeating task: one fetch immediately on
// start, then one per interval until stopped. A successful fetch replaces
// the latest snapshot wholesale; a failed one is logged and the previous
// snapshot stays in place.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};

use crate::client::{ClientError, FirewallClient, LOGS_PATH, STATS_PATH};
use crate::models::{StatsSnapshot, ThreatLogEntry};

// ============================================
// Poll counters
// ============================================

#[derive(Debug, Default)]
pub struct FeedCounters {
    succeeded: AtomicU64,
    failed: AtomicU64,
}

impl FeedCounters {
    pub fn succeeded(&self) -> u64 {
        self.succeeded.load(Ordering::SeqCst)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::SeqCst)
    }

    pub fn attempts(&self) -> u64 {
        self.succeeded() + self.failed()
    }
}

// ============================================
// Poller
// ============================================

#[derive(Clone)]
pub struct SyncPoller {
    client: FirewallClient,
    period: Duration,
}

impl SyncPoller {
    pub fn new(client: FirewallClient, period: Duration) -> Self {
        Self { client, period }
    }

    pub async fn fetch_stats(&self) -> Result<StatsSnapshot, ClientError> {
        self.client.get_json(STATS_PATH).await
    }

    /// Entries in server order (newest first)
    pub async fn fetch_logs(&self) -> Result<Vec<ThreatLogEntry>, ClientError> {
        self.client.get_json(LOGS_PATH).await
    }

    /// Start both feeds. The returned handle owns the tasks.
    pub fn start(self) -> PollerHandle {
        let (shutdown, _) = watch::channel(false);
        let (stats_tx, stats_rx) = watch::channel(None);
        let (logs_tx, logs_rx) = watch::channel(None);
        let stats_counters = Arc::new(FeedCounters::default());
        let logs_counters = Arc::new(FeedCounters::default());

        let stats_task = {
            let poller = self.clone();
            spawn_feed(
                "stats",
                self.period,
                shutdown.subscribe(),
                move || {
                    let poller = poller.clone();
                    async move { poller.fetch_stats().await }
                },
                stats_tx,
                Arc::clone(&stats_counters),
            )
        };

        let logs_task = {
            let poller = self.clone();
            spawn_feed(
                "logs",
                self.period,
                shutdown.subscribe(),
                move || {
                    let poller = poller.clone();
                    async move { poller.fetch_logs().await }
                },
                logs_tx,
                Arc::clone(&logs_counters),
            )
        };

        tracing::info!(
            "Sync poller started against {} (interval={}ms)",
            self.client.base_url(),
            self.period.as_millis()
        );

        PollerHandle {
            stats: stats_rx,
            logs: logs_rx,
            stats_counters,
            logs_counters,
            shutdown,
            tasks: vec![stats_task, logs_task],
        }
    }
}

/// Repeating fetch loop for one resource
fn spawn_feed<T, F, Fut>(
    resource: &'static str,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
    fetch: F,
    feed: watch::Sender<Option<T>>,
    counters: Arc<FeedCounters>,
) -> JoinHandle<()>
where
    T: Send + Sync + 'static,
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, ClientError>> + Send + 'static,
{
    tokio::spawn(async move {
        // First tick completes immediately
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                _ = ticker.tick() => {}
            }

            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                result = fetch() => match result {
                    Ok(value) => {
                        feed.send_replace(Some(value));
                        counters.succeeded.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(e) => {
                        counters.failed.fetch_add(1, Ordering::SeqCst);
                        tracing::warn!("Failed to fetch {} ({}): {}", resource, e.kind(), e);
                    }
                }
            }
        }

        tracing::debug!("{} feed stopped", resource);
    })
}

// ============================================
// Handle
// ============================================

/// Owns the running feeds. `stop` ends them; dropping the handle aborts them.
pub struct PollerHandle {
    stats: watch::Receiver<Option<StatsSnapshot>>,
    logs: watch::Receiver<Option<Vec<ThreatLogEntry>>>,
    stats_counters: Arc<FeedCounters>,
    logs_counters: Arc<FeedCounters>,
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl PollerHandle {
    /// `None` until the first successful stats poll
    pub fn latest_stats(&self) -> Option<StatsSnapshot> {
        self.stats.borrow().clone()
    }

    pub fn latest_logs(&self) -> Vec<ThreatLogEntry> {
        self.logs.borrow().clone().unwrap_or_default()
    }

    pub fn stats_updates(&self) -> watch::Receiver<Option<StatsSnapshot>> {
        self.stats.clone()
    }

    pub fn log_updates(&self) -> watch::Receiver<Option<Vec<ThreatLogEntry>>> {
        self.logs.clone()
    }

    pub fn stats_counters(&self) -> &FeedCounters {
        &self.stats_counters
    }

    pub fn logs_counters(&self) -> &FeedCounters {
        &self.logs_counters
    }

    pub fn is_running(&self) -> bool {
        self.tasks.iter().any(|t| !t.is_finished())
    }

    /// Cancel both feeds and wait for them to exit. No fetch starts afterwards.
    pub async fn stop(&mut self) {
        let _ = self.shutdown.send(true);
        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                tracing::error!("Poller task ended abnormally: {}", e);
            }
        }
        tracing::info!("Sync poller stopped");
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}
