//! Fixed-interval driver for [`Monitor::run_cycle`].
//!
//! At most one cycle runs at a time. A tick that fires while a cycle is still
//! running is dropped, not queued.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};
use tokio::{
    sync::Mutex,
    task::JoinHandle,
    time::{MissedTickBehavior, interval},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::monitor::Monitor;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerStats {
    pub cycles_started: u64,
    pub ticks_skipped: u64,
}

pub struct Scheduler {
    period: Duration,
    cancel: CancellationToken,
    in_flight: Arc<AtomicBool>,
}

/// Clears the in-flight flag when the cycle task ends, even on panic.
struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Scheduler {
    pub fn new(period: Duration, cancel: CancellationToken) -> Self {
        Self { period, cancel, in_flight: Arc::new(AtomicBool::new(false)) }
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Tick until cancelled. The first tick fires immediately.
    ///
    /// On cancellation a cycle that is already running is allowed to finish.
    pub async fn run(&self, monitor: Arc<Mutex<Monitor>>) -> SchedulerStats {
        let mut stats = SchedulerStats::default();
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut current: Option<JoinHandle<()>> = None;

        info!(period_secs = self.period.as_secs(), "scheduler started");

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            if self
                .in_flight
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                stats.ticks_skipped += 1;
                warn!("previous cycle still running, skipping tick");
                continue;
            }

            stats.cycles_started += 1;
            let guard = InFlightGuard(self.in_flight.clone());
            let monitor = monitor.clone();
            let cycle = stats.cycles_started;

            current = Some(tokio::spawn(async move {
                let _guard = guard;
                let report = monitor.lock().await.run_cycle().await;
                debug!(
                    cycle,
                    fetched = report.fetched.len(),
                    failed = report.failed.len(),
                    alerts = report.alerts,
                    saved = report.summaries_saved,
                    "cycle finished"
                );
            }));
        }

        if let Some(task) = current.take() {
            if !task.is_finished() {
                info!("waiting for in-flight cycle to finish");
            }
            if let Err(e) = task.await {
                warn!(error = %e, "cycle task ended abnormally");
            }
        }

        info!(
            cycles = stats.cycles_started,
            skipped = stats.ticks_skipped,
            "scheduler stopped"
        );
        stats
    }
}
