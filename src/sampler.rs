//! Background sampling loop publishing health and system gauges.

use crate::config::SamplerConfig;
use crate::controller::Controller;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// A periodically running collector loop with a cooperative shutdown.
///
/// Owned by the composition root, which calls [`shutdown`] during
/// controlled teardown; nothing self-registers globally.
///
/// [`shutdown`]: PeriodicSampler::shutdown
pub struct PeriodicSampler {
    stop: watch::Sender<bool>,
    handle: JoinHandle<()>,
    grace: Duration,
}

impl PeriodicSampler {
    /// Spawn the sampling loop.
    pub fn start(controller: Arc<Controller>, config: SamplerConfig) -> Self {
        let (stop, stop_rx) = watch::channel(false);
        let interval = config.interval();
        let handle = tokio::spawn(run_loop(controller, interval, stop_rx));

        Self {
            stop,
            handle,
            grace: config.shutdown_grace(),
        }
    }

    /// Signal the loop to stop and wait up to the grace period for it
    /// to exit. A loop that overruns the grace period is logged and
    /// left to finish on its own; shutdown never fails the process.
    pub async fn shutdown(self) {
        let _ = self.stop.send(true);
        match tokio::time::timeout(self.grace, self.handle).await {
            Ok(_) => info!("sampler stopped"),
            Err(_) => warn!(grace = ?self.grace, "sampler did not stop within grace period"),
        }
    }
}

async fn run_loop(
    controller: Arc<Controller>,
    interval: Duration,
    mut stop: watch::Receiver<bool>,
) {
    info!(interval_secs = interval.as_secs(), "sampler started");

    loop {
        if *stop.borrow() {
            break;
        }

        let started = Instant::now();
        controller.sample_once().await;

        // Sleep only the remainder, so slow cycles do not compound
        // drift. The sleep side of the select wakes early when the
        // stop signal flips.
        let remaining = interval.saturating_sub(started.elapsed());
        tokio::select! {
            _ = stop.changed() => break,
            _ = tokio::time::sleep(remaining) => {}
        }
    }

    info!("sampler loop exited");
}
