//! Serialized access to the panel with consecutive-failure tracking.

use crate::config::{check_extension, DisplayConfig};
use crate::display::lock::HardwareLock;
use crate::display::panel::{ColourMode, Panel, PanelInfo, Resolution};
use crate::error::{MirageError, Result};
use crate::metrics::{Metrics, LABEL_FAILURE, LABEL_SUCCESS};
use chrono::{DateTime, Utc};
use image::imageops::FilterType;
use std::path::Path;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Probe,
    Refresh,
}

impl Operation {
    fn name(self) -> &'static str {
        match self {
            Operation::Probe => "probe",
            Operation::Refresh => "refresh",
        }
    }
}

/// Owns the panel handle and the health counters derived from it.
///
/// All hardware-touching work happens under the [`HardwareLock`], so at
/// most one probe or refresh is in flight at any time, across request
/// handlers and the background sampler alike. The failure counters are
/// plain atomics: written only by the task holding the permit (or on
/// the pre-lock format-rejection path, where no contention exists) and
/// readable anywhere without it.
pub struct DisplayDriver {
    panel: HardwareLock<Box<dyn Panel>>,
    resolution: Resolution,
    colour: ColourMode,
    config: DisplayConfig,
    metrics: Arc<Metrics>,
    consecutive_failures: AtomicU32,
    /// Unix millis of the last successful refresh; 0 = never
    last_success_millis: AtomicU64,
}

impl DisplayDriver {
    /// Open the panel and read its fixed properties.
    ///
    /// Fails if the hardware cannot be reached; there is no meaningful
    /// half-initialized driver, so callers should treat this as fatal.
    pub async fn new(
        mut panel: Box<dyn Panel>,
        config: DisplayConfig,
        metrics: Arc<Metrics>,
    ) -> Result<Self> {
        info!("initializing display");
        let info = panel.describe().await.map_err(|e| {
            MirageError::hardware(format!("failed to initialize display: {}", e))
        })?;
        info!(
            width = info.resolution.width,
            height = info.resolution.height,
            colour = ?info.colour,
            "display initialized"
        );

        metrics.display_connected.set(1);

        Ok(Self {
            panel: HardwareLock::new(panel),
            resolution: info.resolution,
            colour: info.colour,
            config,
            metrics,
            consecutive_failures: AtomicU32::new(0),
            last_success_millis: AtomicU64::new(0),
        })
    }

    /// Panel pixel dimensions, fixed at construction.
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Panel colour capability, fixed at construction.
    pub fn colour_mode(&self) -> ColourMode {
        self.colour
    }

    /// Accepted upload extensions.
    pub fn supported_formats(&self) -> &[String] {
        &self.config.supported_formats
    }

    /// Failures since the last successful operation.
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures.load(Ordering::Relaxed)
    }

    /// Time of the last successful refresh, if any.
    pub fn last_success(&self) -> Option<DateTime<Utc>> {
        match self.last_success_millis.load(Ordering::Relaxed) {
            0 => None,
            millis => DateTime::from_timestamp_millis(millis as i64),
        }
    }

    /// Permits granted by the hardware lock so far.
    pub fn lock_acquisitions(&self) -> u64 {
        self.panel.acquisitions()
    }

    /// Read the panel's identifying properties without drawing.
    ///
    /// Updates the failure/success counters exactly as a refresh does,
    /// so a prolonged disconnect shows up as rising consecutive
    /// failures even with no upload traffic.
    pub async fn probe(&self, timeout: Duration) -> Result<PanelInfo> {
        let start = Instant::now();
        match self.panel.acquire(timeout).await {
            Ok(mut panel) => {
                let result = panel.describe().await;
                // Committed before the permit drops, so the next holder
                // observes this operation's counters
                self.finish(Operation::Probe, start, result)
            }
            Err(err) => self.finish(Operation::Probe, start, Err(err)),
        }
    }

    /// Decode the image at `path`, resize it to the panel, transmit it,
    /// and command a physical redraw.
    ///
    /// The extension check happens before any lock traffic, so an
    /// unsupported upload never contends with an in-flight operation.
    /// `timeout` bounds only the wait for the lock; a granted refresh
    /// runs to its own completion.
    pub async fn refresh(&self, path: &Path, timeout: Duration) -> Result<()> {
        let start = Instant::now();
        if let Err(err) = check_extension(path, &self.config.supported_formats) {
            return self.finish(Operation::Refresh, start, Err(err));
        }

        match self.panel.acquire(timeout).await {
            Ok(mut panel) => {
                let result = self.draw_image(&mut panel, path).await;
                self.finish(Operation::Refresh, start, result)
            }
            Err(err) => self.finish(Operation::Refresh, start, Err(err)),
        }
    }

    async fn draw_image(&self, panel: &mut Box<dyn Panel>, path: &Path) -> Result<()> {
        debug!(path = %path.display(), "decoding image");
        let source = path.to_path_buf();
        let resolution = self.resolution;

        // Decode and Lanczos resampling are CPU-bound; keep them off
        // the async workers while the permit is held.
        let resized = tokio::task::spawn_blocking(move || {
            let decoded = image::open(&source)
                .map_err(|e| MirageError::image_decode(e.to_string()))?;
            // Stretched to exactly fill the panel; aspect ratio is
            // intentionally not preserved.
            Ok::<_, MirageError>(decoded.resize_exact(
                resolution.width,
                resolution.height,
                FilterType::Lanczos3,
            ))
        })
        .await
        .map_err(|e| MirageError::hardware(format!("image processing task failed: {}", e)))??;

        info!(
            path = %path.display(),
            "starting display refresh (e-ink redraws are slow)"
        );
        panel.draw(&resized).await
    }

    /// Commit counters and metrics for a completed operation.
    ///
    /// Runs on every path, so caller-visible latency is recorded even
    /// when no device I/O happened (lock timeout, format rejection).
    fn finish<T>(&self, op: Operation, start: Instant, result: Result<T>) -> Result<T> {
        let duration = start.elapsed();
        self.metrics
            .display_update_duration
            .observe(duration.as_secs_f64());

        match &result {
            Ok(_) => {
                self.consecutive_failures.store(0, Ordering::Relaxed);
                self.metrics
                    .display_updates_total
                    .with_label_values(&[LABEL_SUCCESS])
                    .inc();
                self.metrics.display_connected.set(1);

                if op == Operation::Refresh {
                    let now_millis = unix_millis();
                    // A refresh timestamp never moves backwards
                    self.last_success_millis
                        .fetch_max(now_millis, Ordering::Relaxed);
                    self.metrics
                        .display_last_update_timestamp
                        .set(now_millis as f64 / 1000.0);
                }

                info!(
                    operation = op.name(),
                    duration_ms = duration.as_millis() as u64,
                    "display operation succeeded"
                );
            }
            Err(err) => {
                let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
                self.metrics
                    .display_updates_total
                    .with_label_values(&[LABEL_FAILURE])
                    .inc();
                self.metrics.display_connected.set(0);
                self.metrics.display_consecutive_failures.inc();

                warn!(
                    operation = op.name(),
                    error = %err,
                    consecutive_failures = failures,
                    duration_ms = duration.as_millis() as u64,
                    "display operation failed"
                );
            }
        }

        result
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
