//! Service and power control via `systemctl` and `shutdown`.

use crate::error::{MirageError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::process::Command;
use tracing::warn;

const COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

/// Allowed actions on the managed systemd unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceAction {
    Start,
    Stop,
    Restart,
}

impl ServiceAction {
    fn as_str(self) -> &'static str {
        match self {
            ServiceAction::Start => "start",
            ServiceAction::Stop => "stop",
            ServiceAction::Restart => "restart",
        }
    }
}

/// Allowed host power actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerAction {
    Shutdown,
    Reboot,
}

/// Parsed output of `systemctl status`.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceStatus {
    pub active: bool,
    pub state: String,
    pub details: String,
}

/// Thin subprocess wrapper for host-level operations.
pub struct SystemControl {
    service_name: String,
}

impl SystemControl {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    async fn run(&self, program: &str, args: &[&str]) -> Result<(bool, String)> {
        let output = tokio::time::timeout(
            COMMAND_TIMEOUT,
            Command::new(program).args(args).output(),
        )
        .await
        .map_err(|_| MirageError::collector(format!("{} timed out", program)))??;

        let text = if output.status.success() {
            String::from_utf8_lossy(&output.stdout)
        } else {
            String::from_utf8_lossy(&output.stderr)
        };
        Ok((output.status.success(), text.trim().to_string()))
    }

    /// Query the managed unit's status.
    pub async fn service_status(&self) -> ServiceStatus {
        match self
            .run("systemctl", &["status", self.service_name.as_str()])
            .await
        {
            Ok((success, output)) => {
                let (active, state) = if success {
                    parse_active_line(&output)
                } else {
                    (false, "unknown".to_string())
                };
                ServiceStatus {
                    active,
                    state,
                    details: output,
                }
            }
            Err(err) => ServiceStatus {
                active: false,
                state: "unknown".to_string(),
                details: err.to_string(),
            },
        }
    }

    /// Start, stop, or restart the managed unit.
    pub async fn control_service(&self, action: ServiceAction) -> Result<String> {
        warn!(service = %self.service_name, action = action.as_str(), "service control requested");
        let (success, output) = self
            .run(
                "sudo",
                &["systemctl", action.as_str(), self.service_name.as_str()],
            )
            .await?;
        if success {
            Ok(output)
        } else {
            Err(MirageError::collector(output))
        }
    }

    /// Shut down or reboot the host.
    pub async fn control_power(&self, action: PowerAction) -> Result<String> {
        warn!(action = ?action, "power control requested");
        let args: &[&str] = match action {
            PowerAction::Shutdown => &["shutdown", "-h", "now"],
            PowerAction::Reboot => &["shutdown", "-r", "now"],
        };
        let (success, output) = self.run("sudo", args).await?;
        if success {
            Ok(output)
        } else {
            Err(MirageError::collector(output))
        }
    }
}

/// Pull the active flag and state text out of an `Active:` line.
fn parse_active_line(output: &str) -> (bool, String) {
    for line in output.lines() {
        if let Some((label, rest)) = line.split_once(':') {
            if label.trim() == "Active" {
                let state = rest.trim().to_string();
                let active = state.to_lowercase().contains("active (running)");
                return (active, state);
            }
        }
    }
    (false, "unknown".to_string())
}
