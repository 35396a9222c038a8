//! Invocation of the external transfer tool.
//!
//! The tool is opaque: it copies the source tree into the destination folder
//! named after the run and prints statistics to stderr. Only its exit status
//! and captured streams are used.

use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::TransferConfig;
use crate::types::error::S3BackupError;

/// Everything captured from one transfer invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferOutput {
    pub success: bool,
    pub exit_code: Option<i32>,
    /// Terminating signal, when the process was killed (unix only).
    pub signal: Option<i32>,
    /// The command line, for logs.
    pub command: String,
    pub stdout: String,
    pub stderr: String,
    /// Time limit in seconds, set when the process was killed for exceeding it.
    pub timed_out_after: Option<u64>,
}

impl TransferOutput {
    /// Description of a non-zero exit, `None` when the transfer succeeded.
    pub fn failure(&self) -> Option<TransferFailure> {
        if self.success {
            return None;
        }

        let message = match (self.timed_out_after, self.exit_code, self.signal) {
            (Some(limit), _, _) => format!(
                "Command did not finish within {limit} seconds: {}",
                self.command
            ),
            (None, Some(code), _) => {
                format!("Command failed with exit code {code}: {}", self.command)
            }
            (None, None, Some(signal)) => {
                format!("Command killed by signal {signal}: {}", self.command)
            }
            (None, None, None) => format!("Command failed: {}", self.command),
        };

        Some(TransferFailure {
            message,
            command: self.command.clone(),
            exit_code: self.exit_code,
            signal: self.signal,
            killed: self.signal.is_some() || self.timed_out_after.is_some(),
        })
    }
}

/// Serializable description of a failed transfer, stored in the run log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferFailure {
    pub message: String,
    pub command: String,
    pub exit_code: Option<i32>,
    pub signal: Option<i32>,
    pub killed: bool,
}

impl TransferFailure {
    /// Describe a transfer that could not run to completion.
    pub fn from_error(e: &anyhow::Error, command: &str) -> Self {
        let exit_code = match e.downcast_ref::<S3BackupError>() {
            Some(S3BackupError::SubprocessFailure { exit_code, .. }) => *exit_code,
            _ => None,
        };

        TransferFailure {
            message: format!("{e:#}"),
            command: command.to_string(),
            exit_code,
            signal: None,
            killed: false,
        }
    }

    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| format!("{self:?}"))
    }
}

impl From<&TransferFailure> for S3BackupError {
    fn from(failure: &TransferFailure) -> Self {
        S3BackupError::SubprocessFailure {
            exit_code: failure.exit_code,
            message: failure.message.clone(),
        }
    }
}

/// Runs one transfer into `<destination>/<backup_name>`.
///
/// Returns `Err` only when the tool could not be run to completion (spawn
/// failure, I/O error, timeout). A non-zero exit is an `Ok` output with
/// `success == false`, so that the captured streams can still be logged.
#[async_trait]
pub trait Transferrer: Send + Sync {
    async fn transfer(&self, backup_name: &str) -> Result<TransferOutput>;

    /// The command line a transfer into `backup_name` runs, for logs.
    fn describe(&self, _backup_name: &str) -> String {
        String::new()
    }
}

pub struct RcloneTransferrer {
    config: TransferConfig,
}

impl RcloneTransferrer {
    pub fn new(config: TransferConfig) -> Self {
        RcloneTransferrer { config }
    }

    pub fn build_args(&self, backup_name: &str) -> Vec<String> {
        let mut args = Vec::with_capacity(4);
        if let Some(ref rclone_config) = self.config.rclone_config {
            args.push(format!("--config={rclone_config}"));
        }
        args.push("copy".to_string());
        args.push(self.config.src_path.clone());
        args.push(format!(
            "{}/{backup_name}",
            self.config.dest_path.trim_end_matches('/')
        ));
        args
    }

    fn command_line(&self, args: &[String]) -> String {
        std::iter::once(self.config.rclone_binary.as_str())
            .chain(args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[async_trait]
impl Transferrer for RcloneTransferrer {
    fn describe(&self, backup_name: &str) -> String {
        self.command_line(&self.build_args(backup_name))
    }

    async fn transfer(&self, backup_name: &str) -> Result<TransferOutput> {
        let args = self.build_args(backup_name);
        let command = self.command_line(&args);

        info!(command = command, "Starting transfer.");

        let mut child = Command::new(&self.config.rclone_binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                anyhow!(S3BackupError::SubprocessFailure {
                    exit_code: None,
                    message: format!("failed to spawn '{}': {e}", self.config.rclone_binary),
                })
            })?;

        let stdout = StreamCapture::start(child.stdout.take());
        let stderr = StreamCapture::start(child.stderr.take());

        let (status, timed_out_after) = match self.config.timeout_seconds {
            Some(timeout_seconds) => {
                match tokio::time::timeout(Duration::from_secs(timeout_seconds), child.wait()).await
                {
                    Ok(status) => (status, None),
                    Err(_) => {
                        warn!(
                            command = command,
                            timeout_seconds = timeout_seconds,
                            "Transfer did not finish in time, killing it."
                        );
                        if let Err(e) = child.kill().await {
                            warn!(error = %e, "Failed to kill the transfer process.");
                        }
                        (child.wait().await, Some(timeout_seconds))
                    }
                }
            }
            None => (child.wait().await, None),
        };

        let status = status.map_err(|e| {
            anyhow!(S3BackupError::SubprocessFailure {
                exit_code: None,
                message: format!("failed to wait for '{command}': {e}"),
            })
        })?;

        // A killed process may leave children holding the pipes open.
        let drain_limit = timed_out_after.map(|_| KILLED_STREAM_DRAIN_LIMIT);
        let transfer_output = TransferOutput {
            success: status.success() && timed_out_after.is_none(),
            exit_code: status.code(),
            signal: exit_signal(&status),
            command,
            stdout: stdout.finish(drain_limit).await,
            stderr: stderr.finish(drain_limit).await,
            timed_out_after,
        };

        debug!(
            success = transfer_output.success,
            exit_code = transfer_output.exit_code,
            stdout_length = transfer_output.stdout.len(),
            stderr_length = transfer_output.stderr.len(),
            "Transfer process exited."
        );

        Ok(transfer_output)
    }
}

const KILLED_STREAM_DRAIN_LIMIT: Duration = Duration::from_secs(2);

/// Output of one child stream, collected by a background reader.
///
/// The buffer is shared with the reader so that whatever arrived before an
/// abandoned drain is still returned.
struct StreamCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
    reader: JoinHandle<()>,
}

impl StreamCapture {
    fn start<R>(stream: Option<R>) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&buffer);

        let reader = tokio::spawn(async move {
            let Some(mut stream) = stream else {
                return;
            };
            let mut chunk = [0u8; 8192];
            loop {
                match stream.read(&mut chunk).await {
                    Ok(0) => break,
                    Ok(n) => sink.lock().await.extend_from_slice(&chunk[..n]),
                    Err(e) => {
                        debug!(error = %e, "Stopped reading transfer output.");
                        break;
                    }
                }
            }
        });

        StreamCapture { buffer, reader }
    }

    /// Wait for end of stream, or at most `limit` when given.
    async fn finish(mut self, limit: Option<Duration>) -> String {
        match limit {
            Some(limit) => {
                if tokio::time::timeout(limit, &mut self.reader).await.is_err() {
                    self.reader.abort();
                }
            }
            None => {
                let _ = (&mut self.reader).await;
            }
        }

        String::from_utf8_lossy(&self.buffer.lock().await).into_owned()
    }
}

#[cfg(unix)]
fn exit_signal(status: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: &ExitStatus) -> Option<i32> {
    None
}
