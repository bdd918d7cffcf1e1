//! # Mirage - E-ink Display Controller
//!
//! A network-attached controller for a physical e-ink display on a
//! single-board computer. It accepts image uploads over HTTP, renders
//! them to the attached panel, reports system and hardware health, and
//! exposes operational metrics.
//!
//! ## Features
//!
//! - **Serialized hardware access**: one bounded lock guards the slow
//!   e-ink panel across concurrent requests and background probes
//! - **Health tracking**: consecutive-failure counts and last-success
//!   timestamps, surfaced in every status response
//! - **Background sampling**: a periodic loop keeps the Prometheus
//!   gauges fresh even with no request traffic
//! - **Pluggable panel driver**: implement [`Panel`] over your device;
//!   a file-backed simulator ships in the box
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mirage::{
//!     config::{DisplayConfig, StorageConfig},
//!     ColourMode, Controller, DisplayDriver, ImageStore, Metrics, Resolution, SimPanel,
//!     SystemCollector, SystemControl,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let metrics = Arc::new(Metrics::new()?);
//!     let panel = SimPanel::new(Resolution::new(600, 448), ColourMode::Red, "panel.png");
//!     let driver = Arc::new(
//!         DisplayDriver::new(Box::new(panel), DisplayConfig::default(), metrics.clone()).await?,
//!     );
//!     let controller = Controller::new(
//!         driver,
//!         SystemCollector::new()?,
//!         SystemControl::new("mirage"),
//!         ImageStore::new(StorageConfig::default()),
//!         metrics,
//!         DisplayConfig::default(),
//!     );
//!     println!("{}", serde_json::to_string_pretty(&controller.status().await)?);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod controller;
pub mod display;
pub mod error;
pub mod metrics;
pub mod sampler;
pub mod storage;
pub mod system;
pub mod web;

// Re-export public API
pub use config::{DisplayConfig, SamplerConfig, StorageConfig};
pub use controller::{Controller, StatusReport, SystemReport};
pub use display::{
    ColourMode, DisplayDriver, HardwareLock, HealthSnapshot, HealthTracker, Panel, PanelInfo,
    Resolution, SimPanel,
};
pub use error::{MirageError, Result};
pub use metrics::Metrics;
pub use sampler::PeriodicSampler;
pub use storage::{ImageStore, StorageStats};
pub use system::{SystemCollector, SystemControl, SystemStats};
pub use web::{serve, AppState, WebConfig};

/// The default web server port
pub const DEFAULT_WEB_PORT: u16 = 8080;
