//! Runtime configuration for the display core and sampler.

use crate::error::{MirageError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default bound for probe-style lock acquisitions, in seconds.
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 10;

/// Default bound for full refresh operations, in seconds. E-ink redraws
/// are physically slow, so this is much larger than the probe bound.
pub const DEFAULT_REFRESH_TIMEOUT_SECS: u64 = 120;

/// Default background sampling interval in seconds.
pub const DEFAULT_SAMPLER_INTERVAL_SECS: u64 = 30;

/// Smallest sampling interval the configuration will accept.
pub const MIN_SAMPLER_INTERVAL_SECS: u64 = 5;

/// Default grace period for sampler shutdown in seconds.
pub const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 15;

/// Default number of uploaded images kept on disk.
pub const DEFAULT_KEEP_IMAGES: usize = 5;

/// Configuration for the display driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Accepted file extensions, lowercase, dot included
    pub supported_formats: Vec<String>,
    /// Lock timeout for probes, in seconds
    pub probe_timeout_secs: u64,
    /// Lock timeout for refreshes, in seconds
    pub refresh_timeout_secs: u64,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            supported_formats: vec![".png".into(), ".jpg".into(), ".jpeg".into()],
            probe_timeout_secs: DEFAULT_PROBE_TIMEOUT_SECS,
            refresh_timeout_secs: DEFAULT_REFRESH_TIMEOUT_SECS,
        }
    }
}

impl DisplayConfig {
    /// Set the probe lock timeout in seconds.
    pub fn with_probe_timeout(mut self, secs: u64) -> Self {
        self.probe_timeout_secs = secs;
        self
    }

    /// Set the refresh lock timeout in seconds.
    pub fn with_refresh_timeout(mut self, secs: u64) -> Self {
        self.refresh_timeout_secs = secs;
        self
    }

    /// Set the accepted file extensions.
    pub fn with_supported_formats(mut self, formats: Vec<String>) -> Self {
        self.supported_formats = formats;
        self
    }

    /// Probe lock timeout as a [`Duration`].
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    /// Refresh lock timeout as a [`Duration`].
    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_secs(self.refresh_timeout_secs)
    }

    /// Validate the configuration.
    ///
    /// Refreshes transmit an image and wait out a physical redraw, so
    /// their bound must exceed the probe bound.
    pub fn validate(&self) -> Result<()> {
        if self.supported_formats.is_empty() {
            return Err(MirageError::config("supported_formats must not be empty"));
        }
        if self.probe_timeout_secs == 0 {
            return Err(MirageError::config("probe_timeout_secs must be positive"));
        }
        if self.refresh_timeout_secs <= self.probe_timeout_secs {
            return Err(MirageError::config(format!(
                "refresh_timeout_secs ({}) must exceed probe_timeout_secs ({})",
                self.refresh_timeout_secs, self.probe_timeout_secs
            )));
        }
        Ok(())
    }
}

/// Check `path`'s extension against an accepted set (lowercase, dot
/// included). Both the driver and the image store reject through this,
/// so nothing unsupported is ever persisted or contends for the lock.
pub fn check_extension(path: &Path, supported: &[String]) -> Result<()> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
        .unwrap_or_default();

    if supported.iter().any(|f| *f == extension) {
        Ok(())
    } else {
        Err(MirageError::UnsupportedFormat {
            extension,
            supported: supported.join(", "),
        })
    }
}

/// Configuration for the background sampler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplerConfig {
    /// Seconds between sampling cycles
    pub interval_secs: u64,
    /// Seconds to wait for the loop to exit at shutdown
    pub shutdown_grace_secs: u64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_SAMPLER_INTERVAL_SECS,
            shutdown_grace_secs: DEFAULT_SHUTDOWN_GRACE_SECS,
        }
    }
}

impl SamplerConfig {
    /// Set the sampling interval in seconds.
    pub fn with_interval(mut self, secs: u64) -> Self {
        self.interval_secs = secs;
        self
    }

    /// Sampling interval as a [`Duration`].
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Shutdown grace period as a [`Duration`].
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.interval_secs < MIN_SAMPLER_INTERVAL_SECS {
            return Err(MirageError::config(format!(
                "interval_secs must be at least {}",
                MIN_SAMPLER_INTERVAL_SECS
            )));
        }
        Ok(())
    }
}

/// Configuration for the on-disk image store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory uploaded images are stored in
    pub image_dir: PathBuf,
    /// Number of most recent images retained after each save
    pub keep_last: usize,
    /// Accepted file extensions, lowercase, dot included
    pub supported_formats: Vec<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            image_dir: PathBuf::from("instance/images"),
            keep_last: DEFAULT_KEEP_IMAGES,
            supported_formats: vec![".png".into(), ".jpg".into(), ".jpeg".into()],
        }
    }
}

impl StorageConfig {
    /// Set the image directory.
    pub fn with_image_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.image_dir = dir.into();
        self
    }

    /// Set the retention count.
    pub fn with_keep_last(mut self, keep_last: usize) -> Self {
        self.keep_last = keep_last;
        self
    }

    /// Set the accepted file extensions.
    pub fn with_supported_formats(mut self, formats: Vec<String>) -> Self {
        self.supported_formats = formats;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_config_defaults() {
        let config = DisplayConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.probe_timeout(), Duration::from_secs(10));
        assert_eq!(config.refresh_timeout(), Duration::from_secs(120));
        assert!(config.supported_formats.contains(&".png".to_string()));
    }

    #[test]
    fn test_display_config_rejects_inverted_timeouts() {
        let config = DisplayConfig::default()
            .with_probe_timeout(30)
            .with_refresh_timeout(20);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_display_config_rejects_empty_formats() {
        let config = DisplayConfig::default().with_supported_formats(Vec::new());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_check_extension() {
        let formats = DisplayConfig::default().supported_formats;
        assert!(check_extension(Path::new("photo.png"), &formats).is_ok());
        assert!(check_extension(Path::new("PHOTO.JPG"), &formats).is_ok());

        let err = check_extension(Path::new("clip.gif"), &formats).unwrap_err();
        assert!(matches!(err, MirageError::UnsupportedFormat { .. }));

        assert!(check_extension(Path::new("no_extension"), &formats).is_err());
    }

    #[test]
    fn test_sampler_config_minimum_interval() {
        let config = SamplerConfig::default().with_interval(1);
        assert!(config.validate().is_err());

        let config = SamplerConfig::default().with_interval(MIN_SAMPLER_INTERVAL_SECS);
        assert!(config.validate().is_ok());
    }
}
