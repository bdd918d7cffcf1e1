//! Driver-level tests: mutual exclusion, failure counting, and the
//! error taxonomy.

mod common;

use common::{write_test_png, MockPanel};
use mirage::{
    ColourMode, DisplayConfig, DisplayDriver, HealthTracker, Metrics, MirageError, Panel,
    PanelInfo, Resolution,
};
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

async fn driver_with_delay(
    delay: Duration,
) -> (Arc<DisplayDriver>, common::PanelProbe, Arc<Metrics>) {
    let metrics = Arc::new(Metrics::new().unwrap());
    let (panel, probe) = MockPanel::new(delay);
    let driver = DisplayDriver::new(
        Box::new(panel),
        DisplayConfig::default(),
        Arc::clone(&metrics),
    )
    .await
    .unwrap();
    (Arc::new(driver), probe, metrics)
}

#[tokio::test]
async fn unsupported_extension_never_touches_the_lock() {
    let (driver, probe, _) = driver_with_delay(Duration::from_millis(1)).await;
    let init_ops = probe.total_ops();

    let err = driver
        .refresh(Path::new("animated.gif"), Duration::from_secs(1))
        .await
        .unwrap_err();

    assert!(matches!(err, MirageError::UnsupportedFormat { .. }));
    assert_eq!(driver.lock_acquisitions(), 0);
    assert_eq!(probe.total_ops(), init_ops);
    // Rejected input still counts as a failure
    assert_eq!(driver.consecutive_failures(), 1);
}

#[tokio::test]
async fn decode_error_reaches_the_lock_but_not_the_device() {
    let (driver, probe, _) = driver_with_delay(Duration::from_millis(1)).await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("junk.png");
    std::fs::write(&path, b"this is not a png").unwrap();

    let err = driver
        .refresh(&path, Duration::from_secs(1))
        .await
        .unwrap_err();

    assert!(matches!(err, MirageError::ImageDecode(_)));
    assert_eq!(driver.lock_acquisitions(), 1);
    assert_eq!(probe.draw_calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    assert_eq!(driver.consecutive_failures(), 1);
}

#[tokio::test]
async fn concurrent_refreshes_never_overlap() {
    let (driver, probe, _) = driver_with_delay(Duration::from_millis(50)).await;
    let dir = tempfile::tempdir().unwrap();
    let first = write_test_png(dir.path(), "first.png");
    let second = write_test_png(dir.path(), "second.png");

    let started = Instant::now();
    let (a, b) = tokio::join!(
        driver.refresh(&first, Duration::from_secs(5)),
        driver.refresh(&second, Duration::from_secs(5)),
    );
    a.unwrap();
    b.unwrap();

    let busy = probe.busy_millis.load(std::sync::atomic::Ordering::SeqCst);
    assert!(busy >= 100, "device-busy time was {}ms", busy);
    assert!(started.elapsed() >= Duration::from_millis(100));
    assert_eq!(
        probe
            .overlap_violations
            .load(std::sync::atomic::Ordering::SeqCst),
        0
    );
    assert_eq!(probe.draw_calls.load(std::sync::atomic::Ordering::SeqCst), 2);
}

#[tokio::test]
async fn probe_storm_stays_serialized() {
    let (driver, probe, _) = driver_with_delay(Duration::from_millis(10)).await;

    let calls = (0..8).map(|_| {
        let driver = Arc::clone(&driver);
        async move { driver.probe(Duration::from_secs(5)).await }
    });
    for result in futures_util::future::join_all(calls).await {
        result.unwrap();
    }

    assert_eq!(
        probe
            .overlap_violations
            .load(std::sync::atomic::Ordering::SeqCst),
        0
    );
    // 8 probes + the construction-time property read
    assert_eq!(
        probe
            .describe_calls
            .load(std::sync::atomic::Ordering::SeqCst),
        9
    );
    assert_eq!(driver.lock_acquisitions(), 8);
}

#[tokio::test]
async fn failure_trace_counts_up_then_resets() {
    let (driver, probe, metrics) = driver_with_delay(Duration::from_millis(1)).await;
    probe.fail_next(3);

    let mut trace = Vec::new();
    for _ in 0..3 {
        driver.probe(Duration::from_secs(1)).await.unwrap_err();
        trace.push(driver.consecutive_failures());
    }
    driver.probe(Duration::from_secs(1)).await.unwrap();
    trace.push(driver.consecutive_failures());

    assert_eq!(trace, vec![1, 2, 3, 0]);
    assert_eq!(metrics.display_consecutive_failures.get(), 3);

    // Probes never stamp the refresh timestamp
    assert!(driver.last_success().is_none());
}

#[tokio::test]
async fn successful_refresh_stamps_last_success() {
    let (driver, _, metrics) = driver_with_delay(Duration::from_millis(1)).await;
    let dir = tempfile::tempdir().unwrap();
    let path = write_test_png(dir.path(), "photo.png");

    assert!(driver.last_success().is_none());
    let before = chrono::Utc::now();
    driver.refresh(&path, Duration::from_secs(1)).await.unwrap();

    let stamped = driver.last_success().unwrap();
    assert!(stamped >= before - chrono::Duration::seconds(1));
    assert_eq!(driver.consecutive_failures(), 0);
    assert!(metrics.display_last_update_timestamp.get() > 0.0);
}

#[tokio::test]
async fn lock_timeout_is_a_counted_failure() {
    let (driver, _, metrics) = driver_with_delay(Duration::from_millis(300)).await;
    let dir = tempfile::tempdir().unwrap();
    let path = write_test_png(dir.path(), "slow.png");

    let holder = {
        let driver = Arc::clone(&driver);
        tokio::spawn(async move { driver.refresh(&path, Duration::from_secs(5)).await })
    };
    // Give the refresh time to take the lock
    tokio::time::sleep(Duration::from_millis(50)).await;

    let err = driver
        .probe(Duration::from_millis(20))
        .await
        .unwrap_err();
    assert!(matches!(err, MirageError::LockTimeout(_)));
    assert_eq!(driver.consecutive_failures(), 1);
    // The timed-out attempt was still recorded as an observation
    assert_eq!(
        metrics
            .display_updates_total
            .with_label_values(&["failure"])
            .get(),
        1
    );

    holder.await.unwrap().unwrap();
    assert_eq!(driver.consecutive_failures(), 0);
}

/// Panel that records the driver's failure counter the moment a permit
/// holder reaches the device, and fails every draw slowly.
struct CounterWatchPanel {
    driver: Arc<OnceLock<Arc<DisplayDriver>>>,
    failures_at_describe: Arc<AtomicU32>,
}

#[async_trait::async_trait]
impl Panel for CounterWatchPanel {
    async fn describe(&mut self) -> mirage::Result<PanelInfo> {
        if let Some(driver) = self.driver.get() {
            self.failures_at_describe
                .store(driver.consecutive_failures(), Ordering::SeqCst);
        }
        Ok(PanelInfo {
            resolution: Resolution::new(250, 122),
            colour: ColourMode::Black,
        })
    }

    async fn draw(&mut self, _image: &image::DynamicImage) -> mirage::Result<()> {
        tokio::time::sleep(Duration::from_millis(80)).await;
        Err(MirageError::hardware("draw rejected"))
    }
}

#[tokio::test]
async fn counters_commit_before_the_permit_is_released() {
    let slot = Arc::new(OnceLock::new());
    let seen = Arc::new(AtomicU32::new(u32::MAX));
    let panel = CounterWatchPanel {
        driver: Arc::clone(&slot),
        failures_at_describe: Arc::clone(&seen),
    };
    let metrics = Arc::new(Metrics::new().unwrap());
    let driver = Arc::new(
        DisplayDriver::new(Box::new(panel), DisplayConfig::default(), metrics)
            .await
            .unwrap(),
    );
    assert!(slot.set(Arc::clone(&driver)).is_ok());

    let dir = tempfile::tempdir().unwrap();
    let path = write_test_png(dir.path(), "doomed.png");

    let refresh = {
        let driver = Arc::clone(&driver);
        tokio::spawn(async move { driver.refresh(&path, Duration::from_secs(5)).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    // Queued behind the failing refresh; describe runs as the very next
    // permit holder and must already see that refresh's failure
    driver.probe(Duration::from_secs(5)).await.unwrap();

    refresh.await.unwrap().unwrap_err();
    assert_eq!(seen.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn snapshot_while_busy_returns_within_probe_timeout() {
    let (driver, _, _) = driver_with_delay(Duration::from_millis(400)).await;
    let tracker = HealthTracker::new(Arc::clone(&driver));
    let dir = tempfile::tempdir().unwrap();
    let path = write_test_png(dir.path(), "busy.png");

    let refresh = {
        let driver = Arc::clone(&driver);
        tokio::spawn(async move { driver.refresh(&path, Duration::from_secs(5)).await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;

    let started = Instant::now();
    let snapshot = tracker.snapshot(Duration::from_millis(150)).await;
    let elapsed = started.elapsed();

    assert!(
        elapsed < Duration::from_millis(350),
        "snapshot took {:?}",
        elapsed
    );
    assert!(!snapshot.connected);
    assert_eq!(snapshot.last_error.as_deref(), Some(mirage::display::BUSY_MESSAGE));
    // Hardware-read fields are absent rather than stale
    assert!(snapshot.resolution.is_none());
    assert!(snapshot.colour.is_none());
    assert!(snapshot.consecutive_failures >= 1);

    refresh.await.unwrap().unwrap();
}

#[tokio::test]
async fn snapshot_reports_live_properties_when_idle() {
    let (driver, _, _) = driver_with_delay(Duration::from_millis(1)).await;
    let tracker = HealthTracker::new(Arc::clone(&driver));

    let snapshot = tracker.snapshot(Duration::from_secs(1)).await;
    assert!(snapshot.connected);
    assert_eq!(snapshot.resolution, Some(mirage::Resolution::new(250, 122)));
    assert!(snapshot.last_error.is_none());
    assert_eq!(snapshot.consecutive_failures, 0);
    assert!(snapshot
        .supported_formats
        .contains(&".png".to_string()));
}
