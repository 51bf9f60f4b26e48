use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{error, info};

use super::processor::ReconciliationProcessor;

/// Periodic background task that drives the reconciliation processor.
///
/// Runs independently of caller-initiated work; the processor's guarded
/// transitions make it safe to run concurrently with the callback handler
/// and with any in-flight transfer.
pub struct ReconciliationScheduler {
    processor: Arc<ReconciliationProcessor>,
    interval: Duration,
    #[cfg_attr(not(feature = "simulate-gateway"), allow(dead_code))]
    simulate_completion: bool,
}

impl ReconciliationScheduler {
    pub fn new(
        processor: Arc<ReconciliationProcessor>,
        interval: Duration,
        simulate_completion: bool,
    ) -> Self {
        Self {
            processor,
            interval,
            simulate_completion,
        }
    }

    /// Spawns the periodic loop. The first tick fires after one full
    /// interval, not immediately, so startup is not serialized behind a
    /// gateway round-trip.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            ticker.tick().await; // completes immediately; skip the zeroth tick

            info!(interval_secs = self.interval.as_secs(), "reconciliation scheduler started");

            loop {
                ticker.tick().await;

                #[cfg(feature = "simulate-gateway")]
                if self.simulate_completion {
                    if let Err(e) = self.processor.simulate_complete_pending().await {
                        error!(error = %e, "simulated completion failed");
                    }
                    continue;
                }

                if let Err(e) = self.processor.resolve_pending().await {
                    error!(error = %e, "reconciliation pass failed");
                }
            }
        })
    }
}
