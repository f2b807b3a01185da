//! Rate-bounded activity notification.
//!
//! State is a pair of atomics, not a mutex: `last_update_ms` gates the
//! immediate send path with a compare-exchange, `pending` remembers bursts
//! inside the threshold window for the periodic flush. Notifications run on
//! detached tasks so the calling request thread never blocks on them.

use crate::client::ActivityClient;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, warn};

struct Shared {
    workspace_id: String,
    client: Arc<dyn ActivityClient>,
    threshold_ms: i64,
    epoch: Instant,
    /// Milliseconds since `epoch` of the last immediate send.
    last_update_ms: AtomicI64,
    /// Set when activity arrived inside the threshold window.
    pending: AtomicBool,
}

impl Shared {
    fn now_ms(&self) -> i64 {
        self.epoch.elapsed().as_millis() as i64
    }

    async fn touch(&self) {
        if let Err(e) = self.client.touch(&self.workspace_id).await {
            // Never propagated: the triggering request must not fail.
            warn!(workspace = %self.workspace_id, error = %e, "activity notification failed");
        }
    }
}

pub struct ActivityNotifier {
    shared: Arc<Shared>,
    flush_task: Mutex<Option<JoinHandle<()>>>,
}

impl ActivityNotifier {
    pub fn new(
        client: Arc<dyn ActivityClient>,
        workspace_id: impl Into<String>,
        threshold: Duration,
    ) -> Self {
        let threshold_ms = threshold.as_millis() as i64;
        Self {
            shared: Arc::new(Shared {
                workspace_id: workspace_id.into(),
                client,
                threshold_ms,
                epoch: Instant::now(),
                // Pre-dated so the very first activity sends immediately.
                last_update_ms: AtomicI64::new(-threshold_ms),
                pending: AtomicBool::new(false),
            }),
            flush_task: Mutex::new(None),
        }
    }

    /// Records one unit of inbound work.
    ///
    /// Inside the threshold window this only marks the pending flag; past
    /// it, one notification fires on a detached task. At most one immediate
    /// send per window even under concurrent callers.
    pub fn on_activity(&self) {
        let shared = &self.shared;
        let now = shared.now_ms();
        let last = shared.last_update_ms.load(Ordering::Acquire);

        if now < last + shared.threshold_ms {
            shared.pending.store(true, Ordering::Release);
            return;
        }

        // Claim the send slot; a losing racer just marks the window active.
        if shared
            .last_update_ms
            .compare_exchange(last, now, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            let shared = Arc::clone(shared);
            tokio::spawn(async move { shared.touch().await });
        } else {
            shared.pending.store(true, Ordering::Release);
        }
    }

    /// Starts the periodic flush: each tick sends one notification if any
    /// activity happened inside a threshold window since the last tick.
    ///
    /// Calling it again replaces (and cancels) the previous flush task.
    pub fn start_flush(&self, period: Duration) {
        let shared = Arc::clone(&self.shared);
        let task = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick of tokio's interval fires immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if shared.pending.swap(false, Ordering::AcqRel) {
                    debug!(workspace = %shared.workspace_id, "flushing pending activity");
                    shared.touch().await;
                }
            }
        });

        if let Some(previous) = self
            .flush_task
            .lock()
            .expect("flush task lock")
            .replace(task)
        {
            previous.abort();
        }
    }

    /// Cancels the flush task. Outstanding detached sends finish on their own.
    pub fn shutdown(&self) {
        if let Some(task) = self.flush_task.lock().expect("flush task lock").take() {
            task.abort();
        }
    }
}

impl Drop for ActivityNotifier {
    fn drop(&mut self) {
        self.shutdown();
    }
}
