// Power-off hook run once the backup has finished.
//
// The library only reports that a run is complete; acting on the machine is
// left to the binary.

use std::process::Command;

use s3backup_rs::config::ShutdownConfig;
use tracing::{error, info};

pub struct ShutdownHook {
    enabled: bool,
    command: String,
}

impl ShutdownHook {
    pub fn new(config: &ShutdownConfig) -> Self {
        ShutdownHook {
            enabled: config.enabled,
            command: config.command.clone(),
        }
    }

    /// Run the shutdown command if the hook is enabled.
    ///
    /// Returns true when the command ran and exited successfully.
    pub fn fire(&self) -> bool {
        if !self.enabled {
            return false;
        }

        let mut parts = self.command.split_whitespace();
        let Some(program) = parts.next() else {
            error!("shutdown command is empty.");
            return false;
        };

        info!(command = self.command, "running shutdown command.");

        match Command::new(program).args(parts).status() {
            Ok(status) if status.success() => true,
            Ok(status) => {
                error!(
                    command = self.command,
                    exit_code = status.code(),
                    "shutdown command failed."
                );
                false
            }
            Err(e) => {
                error!(
                    command = self.command,
                    error = e.to_string(),
                    "failed to run shutdown command."
                );
                false
            }
        }
    }
}
