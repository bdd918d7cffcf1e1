//! The hardware seam for the e-ink panel.
//!
//! Real deployments implement [`Panel`] over their device driver; the
//! crate ships a file-backed [`SimPanel`] so the controller runs
//! unchanged on machines without a panel attached.

use crate::error::{MirageError, Result};
use async_trait::async_trait;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Fixed pixel dimensions of the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// The panel's colour capability, fixed at manufacture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColourMode {
    Black,
    Red,
    Yellow,
    Multi,
}

/// Identifying properties read from the hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelInfo {
    pub resolution: Resolution,
    pub colour: ColourMode,
}

/// Interface to one physical e-ink panel.
///
/// Implementations must be `Send`; the driver serializes all calls
/// behind its hardware lock, so `Sync` is not required. Both operations
/// may block for as long as the device needs; bounding the wait is the
/// caller's job.
#[async_trait]
pub trait Panel: Send {
    /// Read identifying properties without transmitting an image.
    async fn describe(&mut self) -> Result<PanelInfo>;

    /// Transmit `image` to the device buffer and command a full
    /// physical redraw. `image` is already sized to the panel.
    async fn draw(&mut self, image: &DynamicImage) -> Result<()>;
}

/// A panel simulator that renders draws to a PNG file on disk.
///
/// Useful for development off-device and as the default panel when no
/// hardware driver is plugged in.
pub struct SimPanel {
    info: PanelInfo,
    output: PathBuf,
}

impl SimPanel {
    /// Create a simulated panel with the given properties. Draws land
    /// at `output`.
    pub fn new(resolution: Resolution, colour: ColourMode, output: impl Into<PathBuf>) -> Self {
        Self {
            info: PanelInfo { resolution, colour },
            output: output.into(),
        }
    }
}

#[async_trait]
impl Panel for SimPanel {
    async fn describe(&mut self) -> Result<PanelInfo> {
        Ok(self.info)
    }

    async fn draw(&mut self, image: &DynamicImage) -> Result<()> {
        if let Some(parent) = self.output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        image
            .save(&self.output)
            .map_err(|e| MirageError::hardware(format!("simulated panel write failed: {}", e)))
    }
}
