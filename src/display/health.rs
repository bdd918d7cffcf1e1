//! Point-in-time health snapshots for the display.

use crate::display::driver::DisplayDriver;
use crate::display::panel::{ColourMode, Resolution};
use crate::error::MirageError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Reason string reported when the panel could not be reached before
/// the probe deadline.
pub const BUSY_MESSAGE: &str = "Display busy/locked";

/// An immutable health report, assembled on demand and discarded after
/// serialization.
#[derive(Debug, Clone, Serialize)]
pub struct HealthSnapshot {
    /// Live-read panel dimensions; absent when the panel could not be
    /// reached, never stale
    pub resolution: Option<Resolution>,
    /// Live-read colour capability; absent when the panel could not be
    /// reached
    pub colour: Option<ColourMode>,
    pub connected: bool,
    pub consecutive_failures: u32,
    pub last_successful_update: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub supported_formats: Vec<String>,
}

/// Derives health snapshots from driver state plus a live probe.
pub struct HealthTracker {
    driver: Arc<DisplayDriver>,
}

impl HealthTracker {
    pub fn new(driver: Arc<DisplayDriver>) -> Self {
        Self { driver }
    }

    /// Probe the panel, bounded by `timeout`, and assemble a snapshot.
    ///
    /// When the probe cannot reach the panel, the hardware-read fields
    /// come back absent rather than echoing the last-seen values, so a
    /// swapped panel is never masked. Failure history is always
    /// reported from the driver's published counters regardless of this
    /// call's outcome.
    pub async fn snapshot(&self, timeout: Duration) -> HealthSnapshot {
        let (resolution, colour, connected, last_error) =
            match self.driver.probe(timeout).await {
                Ok(info) => (Some(info.resolution), Some(info.colour), true, None),
                Err(MirageError::LockTimeout(_)) => {
                    (None, None, false, Some(BUSY_MESSAGE.to_string()))
                }
                Err(err) => (None, None, false, Some(err.to_string())),
            };

        HealthSnapshot {
            resolution,
            colour,
            connected,
            consecutive_failures: self.driver.consecutive_failures(),
            last_successful_update: self.driver.last_success(),
            last_error,
            supported_formats: self.driver.supported_formats().to_vec(),
        }
    }
}
