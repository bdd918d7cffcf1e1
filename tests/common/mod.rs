//! Shared fixtures: an instrumented fake panel and image helpers.

#![allow(dead_code)]

use async_trait::async_trait;
use image::DynamicImage;
use mirage::{ColourMode, MirageError, Panel, PanelInfo, Resolution};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Instrumentation handle shared with a [`MockPanel`].
///
/// The panel asserts non-reentrancy by flagging any operation that
/// starts while another is still in flight.
#[derive(Clone, Default)]
pub struct PanelProbe {
    pub describe_calls: Arc<AtomicU32>,
    pub draw_calls: Arc<AtomicU32>,
    pub overlap_violations: Arc<AtomicU32>,
    pub busy_millis: Arc<AtomicU64>,
    in_flight: Arc<AtomicBool>,
    fail_remaining: Arc<AtomicU32>,
}

impl PanelProbe {
    /// Make the next `n` device operations fail.
    pub fn fail_next(&self, n: u32) {
        self.fail_remaining.store(n, Ordering::SeqCst);
    }

    pub fn total_ops(&self) -> u32 {
        self.describe_calls.load(Ordering::SeqCst) + self.draw_calls.load(Ordering::SeqCst)
    }
}

/// A fake panel that sleeps per operation and records everything it is
/// asked to do.
pub struct MockPanel {
    info: PanelInfo,
    delay: Duration,
    probe: PanelProbe,
}

impl MockPanel {
    pub fn new(delay: Duration) -> (Self, PanelProbe) {
        let probe = PanelProbe::default();
        let panel = Self {
            info: PanelInfo {
                resolution: Resolution::new(250, 122),
                colour: ColourMode::Black,
            },
            delay,
            probe: probe.clone(),
        };
        (panel, probe)
    }

    async fn device_op(&self) -> Result<(), MirageError> {
        if self.probe.in_flight.swap(true, Ordering::SeqCst) {
            self.probe.overlap_violations.fetch_add(1, Ordering::SeqCst);
        }

        let start = Instant::now();
        tokio::time::sleep(self.delay).await;
        self.probe
            .busy_millis
            .fetch_add(start.elapsed().as_millis() as u64, Ordering::SeqCst);

        self.probe.in_flight.store(false, Ordering::SeqCst);

        let should_fail = self
            .probe
            .fail_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            Err(MirageError::hardware("simulated device failure"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Panel for MockPanel {
    async fn describe(&mut self) -> mirage::Result<PanelInfo> {
        self.probe.describe_calls.fetch_add(1, Ordering::SeqCst);
        self.device_op().await?;
        Ok(self.info)
    }

    async fn draw(&mut self, _image: &DynamicImage) -> mirage::Result<()> {
        self.probe.draw_calls.fetch_add(1, Ordering::SeqCst);
        self.device_op().await
    }
}

/// Write a small valid PNG and return its path.
pub fn write_test_png(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    DynamicImage::new_rgb8(4, 4).save(&path).unwrap();
    path
}
