//! System statistics collection and service/power control.

pub mod control;

pub use control::{PowerAction, ServiceAction, ServiceStatus, SystemControl};

use crate::error::{MirageError, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::path::Path;
use sysinfo::{Disks, System};

/// One cycle of host statistics for the status aggregate.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SystemStats {
    pub cpu: CpuStats,
    pub memory: MemoryStats,
    pub disk: DiskStats,
    pub uptime_seconds: u64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CpuStats {
    /// Overall utilization percentage (0.0 to 100.0)
    pub percent: f32,
    pub count: usize,
    /// CPU temperature in Celsius, when a sensor is readable
    pub temperature_celsius: Option<f32>,
    pub frequency_mhz: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MemoryStats {
    pub total_bytes: u64,
    pub available_bytes: u64,
    pub percent: f32,
    pub swap_percent: f32,
}

/// Usage of the root filesystem.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DiskStats {
    pub total_bytes: u64,
    pub free_bytes: u64,
    pub percent: f32,
}

/// Host statistics collector backed by sysinfo and direct sysfs reads.
pub struct SystemCollector {
    system: System,
    disks: Disks,
}

impl SystemCollector {
    pub fn new() -> Result<Self> {
        let mut system = System::new_all();
        system.refresh_all();
        let mut disks = Disks::new_with_refreshed_list();
        disks.refresh();

        Ok(Self { system, disks })
    }

    /// Refresh and collect one round of statistics.
    pub fn collect(&mut self) -> Result<SystemStats> {
        self.system.refresh_all();
        self.disks.refresh();

        Ok(SystemStats {
            cpu: self.collect_cpu()?,
            memory: self.collect_memory(),
            disk: self.collect_disk(),
            uptime_seconds: System::uptime(),
            timestamp: Utc::now(),
        })
    }

    fn collect_cpu(&self) -> Result<CpuStats> {
        let cpus = self.system.cpus();
        if cpus.is_empty() {
            return Err(MirageError::collector("no CPU information available"));
        }

        let percent = cpus.iter().map(|cpu| cpu.cpu_usage()).sum::<f32>() / cpus.len() as f32;

        Ok(CpuStats {
            percent,
            count: cpus.len(),
            temperature_celsius: read_cpu_temperature(),
            frequency_mhz: cpus[0].frequency(),
        })
    }

    fn collect_memory(&self) -> MemoryStats {
        let total = self.system.total_memory();
        let used = self.system.used_memory();
        let swap_total = self.system.total_swap();

        MemoryStats {
            total_bytes: total,
            available_bytes: self.system.available_memory(),
            percent: percent_of(used, total),
            swap_percent: percent_of(self.system.used_swap(), swap_total),
        }
    }

    fn collect_disk(&self) -> DiskStats {
        let root = self
            .disks
            .iter()
            .find(|disk| disk.mount_point() == Path::new("/"))
            .or_else(|| self.disks.iter().next());

        match root {
            Some(disk) => {
                let total = disk.total_space();
                let free = disk.available_space();
                DiskStats {
                    total_bytes: total,
                    free_bytes: free,
                    percent: percent_of(total.saturating_sub(free), total),
                }
            }
            None => DiskStats::default(),
        }
    }
}

fn percent_of(used: u64, total: u64) -> f32 {
    if total > 0 {
        (used as f32 / total as f32) * 100.0
    } else {
        0.0
    }
}

/// Read the CPU temperature from the Pi's thermal zone, falling back to
/// `vcgencmd` when sysfs is unavailable.
fn read_cpu_temperature() -> Option<f32> {
    if let Ok(raw) = fs::read_to_string("/sys/class/thermal/thermal_zone0/temp") {
        if let Ok(millicelsius) = raw.trim().parse::<i32>() {
            return Some(millicelsius as f32 / 1000.0);
        }
    }

    let output = std::process::Command::new("vcgencmd")
        .arg("measure_temp")
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    // Output looks like "temp=45.8'C"
    let text = String::from_utf8_lossy(&output.stdout);
    text.trim()
        .strip_prefix("temp=")?
        .strip_suffix("'C")?
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collector_creation_and_collection() {
        let mut collector = SystemCollector::new().unwrap();
        let stats = collector.collect().unwrap();

        assert!(stats.cpu.count > 0);
        assert!(stats.memory.total_bytes > 0);
        assert!(stats.memory.percent >= 0.0 && stats.memory.percent <= 100.0);
    }

    #[test]
    fn test_percent_of() {
        assert_eq!(percent_of(50, 100), 50.0);
        assert_eq!(percent_of(0, 0), 0.0);
        assert_eq!(percent_of(10, 0), 0.0);
    }

    #[test]
    fn test_stats_serialization() {
        let stats = SystemStats::default();
        let json = serde_json::to_value(&stats).unwrap();
        assert!(json.get("cpu").is_some());
        assert!(json.get("memory").is_some());
        assert!(json.get("disk").is_some());
        assert!(json.get("uptime_seconds").is_some());
    }
}
