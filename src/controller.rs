//! Orchestration facade composing the display, system, and storage
//! collaborators.

use crate::config::DisplayConfig;
use crate::display::{DisplayDriver, HealthSnapshot, HealthTracker};
use crate::error::Result;
use crate::metrics::Metrics;
use crate::storage::{ImageStore, StorageStats};
use crate::system::{
    PowerAction, ServiceAction, ServiceStatus, SystemCollector, SystemControl, SystemStats,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error};

/// The aggregate returned by the status query.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub status: &'static str,
    pub system: SystemReport,
    pub storage: StorageStats,
    pub display: HealthSnapshot,
}

/// System sub-document: host statistics plus the managed unit's state.
#[derive(Debug, Clone, Serialize)]
pub struct SystemReport {
    #[serde(flatten)]
    pub stats: SystemStats,
    pub service: ServiceStatus,
}

/// High-level controller mediating between the HTTP boundary and the
/// hardware/collectors.
pub struct Controller {
    driver: Arc<DisplayDriver>,
    health: HealthTracker,
    system: Mutex<SystemCollector>,
    control: SystemControl,
    store: ImageStore,
    metrics: Arc<Metrics>,
    display_config: DisplayConfig,
}

impl Controller {
    pub fn new(
        driver: Arc<DisplayDriver>,
        system: SystemCollector,
        control: SystemControl,
        store: ImageStore,
        metrics: Arc<Metrics>,
        display_config: DisplayConfig,
    ) -> Self {
        Self {
            health: HealthTracker::new(Arc::clone(&driver)),
            driver,
            system: Mutex::new(system),
            control,
            store,
            metrics,
            display_config,
        }
    }

    pub fn driver(&self) -> &Arc<DisplayDriver> {
        &self.driver
    }

    /// Assemble the full status aggregate.
    ///
    /// Each source is collected independently; one failing collaborator
    /// degrades its sub-document to defaults instead of failing the
    /// whole call.
    pub async fn status(&self) -> StatusReport {
        let stats = match self.system.lock().await.collect() {
            Ok(stats) => stats,
            Err(err) => {
                error!(error = %err, "failed to collect system stats");
                SystemStats::default()
            }
        };
        let service = self.control.service_status().await;

        let storage = match self.store.stats().await {
            Ok(stats) => stats,
            Err(err) => {
                error!(error = %err, "failed to collect storage stats");
                StorageStats::default()
            }
        };

        let display = self
            .health
            .snapshot(self.display_config.probe_timeout())
            .await;

        StatusReport {
            status: "online",
            system: SystemReport { stats, service },
            storage,
            display,
        }
    }

    /// Persist an uploaded image and render it to the panel.
    ///
    /// Returns the stored path on success. Driver error kinds survive
    /// the call, so the boundary can map bad input and hardware
    /// failures to different responses.
    pub async fn save_and_update(&self, original_name: &str, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.store.save(original_name, bytes).await?;
        self.update_display(&path).await?;
        Ok(path)
    }

    /// Render an already-persisted image to the panel.
    pub async fn update_display(&self, path: &Path) -> Result<()> {
        self.driver
            .refresh(path, self.display_config.refresh_timeout())
            .await
    }

    /// One background sampling cycle: system stats, storage stats, and
    /// a display probe, each isolated so one failure never aborts the
    /// others.
    pub async fn sample_once(&self) {
        match self.system.lock().await.collect() {
            Ok(stats) => {
                self.metrics.set_system(
                    stats.cpu.percent as f64,
                    stats.memory.percent as f64,
                    stats.disk.percent as f64,
                    stats.cpu.temperature_celsius.map(f64::from),
                );
            }
            Err(err) => error!(error = %err, "system stats sampling failed"),
        }

        match self.store.stats().await {
            Ok(stats) => {
                self.metrics
                    .set_storage(stats.image_count as i64, stats.total_size_bytes as i64);
            }
            Err(err) => error!(error = %err, "storage stats sampling failed"),
        }

        // The driver records its own outcome metrics either way
        if let Err(err) = self
            .driver
            .probe(self.display_config.probe_timeout())
            .await
        {
            debug!(error = %err, "display probe failed during sampling");
        }
    }

    /// Render the metrics registry in text exposition format.
    pub fn render_metrics(&self) -> Result<String> {
        self.metrics.render()
    }

    /// Start, stop, or restart the managed service unit.
    pub async fn control_service(&self, action: ServiceAction) -> Result<String> {
        self.control.control_service(action).await
    }

    /// Shut down or reboot the host.
    pub async fn control_power(&self, action: PowerAction) -> Result<String> {
        self.control.control_power(action).await
    }
}
