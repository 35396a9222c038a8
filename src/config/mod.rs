pub mod args;

use crate::types::{ClientConfigLocation, S3Credentials};
use aws_sdk_s3::types::RequestPayer;
use aws_smithy_types::checksum_config::RequestChecksumCalculation;

/// Main configuration for a backup run.
///
/// Holds everything a [`BackupOrchestrator`](crate::BackupOrchestrator) needs:
/// the destination bucket, the retention window, how to invoke rclone, where
/// to send notifications, and the AWS client settings.
///
/// The value is immutable once the run starts; the orchestrator receives it
/// at construction together with its storage, transfer and notifier
/// capabilities.
///
/// # Quick Start
///
/// ```
/// use s3backup_rs::Config;
///
/// let config = Config::for_bucket("my-backups", 7);
/// assert_eq!(config.num_days_kept, 7);
/// assert_eq!(config.max_keys, 1000);
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    pub bucket: String,
    pub num_days_kept: u32,
    pub transfer_config: TransferConfig,
    pub notification_config: NotificationConfig,
    pub shutdown_config: ShutdownConfig,
    pub client_config: Option<ClientConfig>,
    pub tracing_config: Option<TracingConfig>,
    pub dry_run: bool,
    pub warn_as_error: bool,
    pub max_keys: i32,
    pub auto_complete_shell: Option<clap_complete::shells::Shell>,
}

impl Config {
    /// Create a `Config` with defaults for the given bucket and retention window.
    pub fn for_bucket(bucket: &str, num_days_kept: u32) -> Self {
        Config {
            bucket: bucket.to_string(),
            num_days_kept,
            ..Config::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bucket: String::new(),
            num_days_kept: 7,
            transfer_config: TransferConfig::default(),
            notification_config: NotificationConfig::default(),
            shutdown_config: ShutdownConfig::default(),
            client_config: None,
            tracing_config: None,
            dry_run: false,
            warn_as_error: false,
            max_keys: 1000,
            auto_complete_shell: None,
        }
    }
}

/// How the transfer subprocess is invoked.
///
/// The command line is
/// `<rclone_binary> [--config=<rclone_config>] copy <src_path> <dest_path>/<backup-name>`.
#[derive(Debug, Clone)]
pub struct TransferConfig {
    pub rclone_binary: String,
    pub rclone_config: Option<String>,
    pub src_path: String,
    pub dest_path: String,
    pub timeout_seconds: Option<u64>,
}

impl Default for TransferConfig {
    fn default() -> Self {
        TransferConfig {
            rclone_binary: "rclone".to_string(),
            rclone_config: None,
            src_path: String::new(),
            dest_path: String::new(),
            timeout_seconds: None,
        }
    }
}

/// Slack incoming-webhook settings.
///
/// Without a webhook URL, notifications are only written to the local log.
#[derive(Debug, Clone)]
pub struct NotificationConfig {
    pub slack_webhook_url: Option<String>,
    pub slack_channel: Option<String>,
    pub slack_username: Option<String>,
    pub slack_icon_emoji: Option<String>,
    pub timeout_milliseconds: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        NotificationConfig {
            slack_webhook_url: None,
            slack_channel: None,
            slack_username: None,
            slack_icon_emoji: None,
            timeout_milliseconds: 10_000,
        }
    }
}

/// Power-off hook executed by the binary when the process finishes.
#[derive(Debug, Clone)]
pub struct ShutdownConfig {
    pub enabled: bool,
    pub command: String,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        ShutdownConfig {
            enabled: false,
            command: "shutdown -h now".to_string(),
        }
    }
}

/// AWS S3 client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub client_config_location: ClientConfigLocation,
    pub credential: S3Credentials,
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
    pub force_path_style: bool,
    pub accelerate: bool,
    pub request_payer: Option<RequestPayer>,
    pub retry_config: RetryConfig,
    pub cli_timeout_config: CLITimeoutConfig,
    pub disable_stalled_stream_protection: bool,
    pub request_checksum_calculation: RequestChecksumCalculation,
}

/// Retry configuration for AWS SDK operations.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub aws_max_attempts: u32,
    pub initial_backoff_milliseconds: u64,
}

/// Timeout configuration for AWS SDK operations.
#[derive(Debug, Clone)]
pub struct CLITimeoutConfig {
    pub operation_timeout_milliseconds: Option<u64>,
    pub operation_attempt_timeout_milliseconds: Option<u64>,
    pub connect_timeout_milliseconds: Option<u64>,
    pub read_timeout_milliseconds: Option<u64>,
}

/// Tracing (logging) configuration.
#[derive(Debug, Clone, Copy)]
pub struct TracingConfig {
    pub tracing_level: log::Level,
    pub json_tracing: bool,
    pub aws_sdk_tracing: bool,
    pub span_events_tracing: bool,
    pub disable_color_tracing: bool,
}
