use std::{collections::BTreeMap, process::Stdio, sync::Weak};

use async_trait::async_trait;
use gourd_core::RestartAction;
use serde_json::Value;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tokio::process::Command;
use tracing::{error, info, warn};

use crate::agent::EdgeAgent;

pub const REBOOT_REASON_KEY: &str = "rebootReason";
pub const REBOOT_TIME_KEY: &str = "rebootTime";

/// Restarts the device through a shell command.
///
/// Capture tasks are stopped first. The reason and time are persisted so the
/// next boot can report them, then reported right away on a best-effort basis.
pub struct DeviceRestart {
    agent: Weak<EdgeAgent>,
    command: String,
}

impl DeviceRestart {
    pub fn new(agent: Weak<EdgeAgent>, command: impl Into<String>) -> Self {
        Self {
            agent,
            command: command.into(),
        }
    }
}

#[async_trait]
impl RestartAction for DeviceRestart {
    async fn restart(&self, reason: &str) {
        error!(%reason, "device restart invoked");
        let Some(agent) = self.agent.upgrade() else {
            warn!("agent already dropped; restart skipped");
            return;
        };

        let stopped = agent.stop_capture();
        info!(?stopped, "capture tasks stopped for restart");

        let reboot_time = now_rfc3339();
        if let Err(e) = agent.config().set(REBOOT_REASON_KEY, reason) {
            error!(error = %e, "failed to persist reboot reason");
        }
        if let Err(e) = agent.config().set(REBOOT_TIME_KEY, reboot_time.clone()) {
            error!(error = %e, "failed to persist reboot time");
        }

        let reported = BTreeMap::from([
            (REBOOT_REASON_KEY.to_string(), Value::from(reason)),
            (REBOOT_TIME_KEY.to_string(), Value::from(reboot_time)),
            ("deviceStatus".to_string(), Value::from("rebooting")),
        ]);
        if let Err(e) = agent.channel().report(reported).await {
            warn!(error = %e, "failed to report reboot");
        }

        run_restart_command(&self.command).await;
    }
}

pub(crate) fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| OffsetDateTime::now_utc().unix_timestamp().to_string())
}

async fn run_restart_command(command: &str) {
    info!(%command, "running restart command");
    let status = Command::new("sh")
        .arg("-c")
        .arg(command)
        .stdin(Stdio::null())
        .status()
        .await;
    match status {
        Ok(s) if s.success() => {}
        Ok(s) => error!(%command, status = %s, "restart command failed"),
        Err(e) => error!(%command, error = %e, "failed to spawn restart command"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reboot_time_is_rfc3339_utc() {
        let t = now_rfc3339();
        assert!(t.ends_with('Z'), "{t}");
        assert!(OffsetDateTime::parse(&t, &Rfc3339).is_ok());
    }
}
