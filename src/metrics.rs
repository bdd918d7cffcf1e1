//! Prometheus metric families for display, system, and storage health.
//!
//! The registry is owned by the composition root and handed to whoever
//! records into it; nothing self-registers against a global default.

use crate::error::{MirageError, Result};
use prometheus::{
    Encoder, Gauge, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};

/// Outcome label value for successful display operations.
pub const LABEL_SUCCESS: &str = "success";

/// Outcome label value for failed display operations.
pub const LABEL_FAILURE: &str = "failure";

/// All metric families exposed at `/metrics`.
pub struct Metrics {
    registry: Registry,

    /// Whether the e-ink display is connected and responding (1=yes, 0=no)
    pub display_connected: IntGauge,
    /// Unix timestamp of the last successful display update
    pub display_last_update_timestamp: Gauge,
    /// Monotonic count of display operation failures
    pub display_consecutive_failures: IntCounter,
    /// Display operation attempts, labeled by outcome
    pub display_updates_total: IntCounterVec,
    /// Caller-visible display operation latency
    pub display_update_duration: Histogram,

    pub system_cpu_percent: Gauge,
    pub system_memory_percent: Gauge,
    pub system_disk_percent: Gauge,
    pub system_temperature: Gauge,

    pub stored_images: IntGauge,
    pub image_storage_bytes: IntGauge,
}

fn metric_err(err: prometheus::Error) -> MirageError {
    MirageError::config(format!("metric registration failed: {}", err))
}

fn register<M>(registry: &Registry, metric: M) -> Result<M>
where
    M: prometheus::core::Collector + Clone + 'static,
{
    registry
        .register(Box::new(metric.clone()))
        .map_err(metric_err)?;
    Ok(metric)
}

impl Metrics {
    /// Build all metric families against a fresh registry.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let display_connected = register(
            &registry,
            IntGauge::new(
                "mirage_display_connected",
                "Whether the e-ink display is connected and responding (1=yes, 0=no)",
            )
            .map_err(metric_err)?,
        )?;

        let display_last_update_timestamp = register(
            &registry,
            Gauge::new(
                "mirage_display_last_update_timestamp_seconds",
                "Unix timestamp of last successful display update",
            )
            .map_err(metric_err)?,
        )?;

        let display_consecutive_failures = register(
            &registry,
            IntCounter::new(
                "mirage_display_consecutive_failures",
                "Number of consecutive display update failures",
            )
            .map_err(metric_err)?,
        )?;

        let display_updates_total = register(
            &registry,
            IntCounterVec::new(
                Opts::new(
                    "mirage_display_updates_total",
                    "Total number of display update attempts",
                ),
                &["status"],
            )
            .map_err(metric_err)?,
        )?;

        let display_update_duration = register(
            &registry,
            Histogram::with_opts(
                HistogramOpts::new(
                    "mirage_display_update_duration_seconds",
                    "Time spent updating the display",
                )
                // e-ink updates are slow
                .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0]),
            )
            .map_err(metric_err)?,
        )?;

        let system_cpu_percent = register(
            &registry,
            Gauge::new(
                "mirage_system_cpu_percent",
                "Current CPU utilization percentage",
            )
            .map_err(metric_err)?,
        )?;

        let system_memory_percent = register(
            &registry,
            Gauge::new(
                "mirage_system_memory_percent",
                "Current memory utilization percentage",
            )
            .map_err(metric_err)?,
        )?;

        let system_disk_percent = register(
            &registry,
            Gauge::new(
                "mirage_system_disk_percent",
                "Current disk utilization percentage",
            )
            .map_err(metric_err)?,
        )?;

        let system_temperature = register(
            &registry,
            Gauge::new(
                "mirage_system_temperature_celsius",
                "Current CPU temperature in Celsius",
            )
            .map_err(metric_err)?,
        )?;

        let stored_images = register(
            &registry,
            IntGauge::new(
                "mirage_stored_images_total",
                "Number of images currently stored",
            )
            .map_err(metric_err)?,
        )?;

        let image_storage_bytes = register(
            &registry,
            IntGauge::new(
                "mirage_image_storage_bytes",
                "Total bytes used by stored images",
            )
            .map_err(metric_err)?,
        )?;

        Ok(Self {
            registry,
            display_connected,
            display_last_update_timestamp,
            display_consecutive_failures,
            display_updates_total,
            display_update_duration,
            system_cpu_percent,
            system_memory_percent,
            system_disk_percent,
            system_temperature,
            stored_images,
            image_storage_bytes,
        })
    }

    /// Record system stat gauges from one collection cycle.
    pub fn set_system(
        &self,
        cpu_percent: f64,
        memory_percent: f64,
        disk_percent: f64,
        temperature_celsius: Option<f64>,
    ) {
        self.system_cpu_percent.set(cpu_percent);
        self.system_memory_percent.set(memory_percent);
        self.system_disk_percent.set(disk_percent);
        if let Some(temp) = temperature_celsius {
            self.system_temperature.set(temp);
        }
    }

    /// Record storage gauges from one collection cycle.
    pub fn set_storage(&self, image_count: i64, total_bytes: i64) {
        self.stored_images.set(image_count);
        self.image_storage_bytes.set(total_bytes);
    }

    /// Render all families in the Prometheus text exposition format.
    pub fn render(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(|e| MirageError::web_server(format!("metrics encoding failed: {}", e)))?;
        String::from_utf8(buffer)
            .map_err(|e| MirageError::web_server(format!("metrics encoding failed: {}", e)))
    }
}
