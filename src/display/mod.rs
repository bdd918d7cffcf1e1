//! Display-update concurrency and health-tracking core.
//!
//! The panel is a single slow, stateful resource shared by concurrent
//! request handlers and the background sampler. [`HardwareLock`]
//! serializes every hardware-touching operation with a bounded wait,
//! [`DisplayDriver`] owns the handle and the consecutive-failure state,
//! and [`HealthTracker`] turns both into on-demand snapshots.

pub mod driver;
pub mod health;
pub mod lock;
pub mod panel;

// Re-export commonly used items
pub use driver::DisplayDriver;
pub use health::{HealthSnapshot, HealthTracker, BUSY_MESSAGE};
pub use lock::{HardwareLock, Permit};
pub use panel::{ColourMode, Panel, PanelInfo, Resolution, SimPanel};
