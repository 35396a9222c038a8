use crate::config::{
    CLITimeoutConfig, ClientConfig, Config, NotificationConfig, RetryConfig, ShutdownConfig,
    TracingConfig, TransferConfig,
};
use crate::types::{AccessKeys, ClientConfigLocation, S3Credentials};
use aws_sdk_s3::types::RequestPayer;
use aws_smithy_types::checksum_config::RequestChecksumCalculation;
use clap::Parser;
use clap::builder::NonEmptyStringValueParser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use std::ffi::OsString;
use std::path::PathBuf;

pub mod value_parser;


use value_parser::file_exist::is_file_exist;
use value_parser::url::check_scheme;

// ---------------------------------------------------------------------------
// Default constants
// ---------------------------------------------------------------------------

const DEFAULT_NUM_DAYS_KEPT: u32 = 7;
const DEFAULT_RCLONE_BINARY: &str = "rclone";
const DEFAULT_SHUTDOWN: bool = false;
const DEFAULT_SHUTDOWN_COMMAND: &str = "shutdown -h now";
const DEFAULT_NOTIFICATION_TIMEOUT_MILLISECONDS: u64 = 10_000;
const DEFAULT_AWS_MAX_ATTEMPTS: u32 = 10;
const DEFAULT_INITIAL_BACKOFF_MILLISECONDS: u64 = 100;
const DEFAULT_JSON_TRACING: bool = false;
const DEFAULT_AWS_SDK_TRACING: bool = false;
const DEFAULT_SPAN_EVENTS_TRACING: bool = false;
const DEFAULT_DISABLE_COLOR_TRACING: bool = false;
const DEFAULT_WARN_AS_ERROR: bool = false;
const DEFAULT_FORCE_PATH_STYLE: bool = false;
const DEFAULT_DRY_RUN: bool = false;
const DEFAULT_MAX_KEYS: i32 = 1000;
const DEFAULT_DISABLE_STALLED_STREAM_PROTECTION: bool = false;
const DEFAULT_ACCELERATE: bool = false;
const DEFAULT_REQUEST_PAYER: bool = false;

// ---------------------------------------------------------------------------
// Error messages
// ---------------------------------------------------------------------------

const ERROR_MESSAGE_INVALID_BUCKET: &str =
    "Bucket must be a bare bucket name without scheme or '/' (e.g., my-backups).";
const ERROR_MESSAGE_MAX_KEYS_OUT_OF_RANGE: &str = "Max keys must be between 1 and 1000.";
const ERROR_MESSAGE_EMPTY_SHUTDOWN_COMMAND: &str =
    "Shutdown command must not be empty when --shutdown is set.";
const ERROR_MESSAGE_SECRET_KEY_REQUIRED: &str =
    "--secret-access-key is required when --access-key is set.";

// ---------------------------------------------------------------------------
// Value parser helpers
// ---------------------------------------------------------------------------

fn check_bucket_name(s: &str) -> Result<String, String> {
    if s.is_empty() || s.contains('/') || s.contains("://") {
        Err(ERROR_MESSAGE_INVALID_BUCKET.to_string())
    } else {
        Ok(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// CLIArgs (clap-derived argument struct)
// ---------------------------------------------------------------------------

/// s3backup - Unattended rclone backups to Amazon S3 with date-based retention.
///
/// Copies a source tree into a dated folder of the destination, uploads the
/// transfer log next to it, reports the transfer statistics to Slack and
/// deletes backups older than the retention window.
///
/// Example:
///   s3backup --bucket my-backups --src-path gdrive: --dest-path s3:my-backups
///   s3backup --bucket my-backups --src-path gdrive: --dest-path s3:my-backups --num-days-kept 14 --shutdown
#[derive(Parser, Clone, Debug)]
#[command(name = "s3backup", version, about, long_about = None)]
pub struct CLIArgs {
    /// Bucket that holds the dated backup folders.
    #[arg(
        long,
        env,
        value_parser = check_bucket_name,
        default_value_if("auto_complete_shell", clap::builder::ArgPredicate::IsPresent, "ignored"),
        required = false,
        required_unless_present = "auto_complete_shell",
        help_heading = "General"
    )]
    pub bucket: String,

    /// Number of days a backup is kept. Backups dated within [today - N, today] survive.
    #[arg(long, env, default_value_t = DEFAULT_NUM_DAYS_KEPT, help_heading = "General")]
    pub num_days_kept: u32,

    /// Lists expired backups but does not delete them.
    #[arg(short = 'd', long, env, default_value_t = DEFAULT_DRY_RUN, help_heading = "General")]
    pub dry_run: bool,

    // -----------------------------------------------------------------------
    // Transfer options
    // -----------------------------------------------------------------------
    /// rclone source path (e.g. gdrive: or /srv/data).
    #[arg(
        long,
        env,
        value_parser = NonEmptyStringValueParser::new(),
        default_value_if("auto_complete_shell", clap::builder::ArgPredicate::IsPresent, "ignored"),
        required = false,
        required_unless_present = "auto_complete_shell",
        help_heading = "Transfer"
    )]
    pub src_path: String,

    /// rclone destination path; the backup name is appended (e.g. s3:my-backups).
    #[arg(
        long,
        env,
        value_parser = NonEmptyStringValueParser::new(),
        default_value_if("auto_complete_shell", clap::builder::ArgPredicate::IsPresent, "ignored"),
        required = false,
        required_unless_present = "auto_complete_shell",
        help_heading = "Transfer"
    )]
    pub dest_path: String,

    /// rclone executable.
    #[arg(long, env, default_value = DEFAULT_RCLONE_BINARY, value_parser = NonEmptyStringValueParser::new(), help_heading = "Transfer")]
    pub rclone_binary: String,

    /// rclone configuration file passed as --config.
    #[arg(long, env, value_parser = is_file_exist, help_heading = "Transfer")]
    pub rclone_config: Option<String>,

    /// Kill the transfer and treat it as failed after this many seconds.
    #[arg(long, env, help_heading = "Transfer")]
    pub transfer_timeout_seconds: Option<u64>,

    // -----------------------------------------------------------------------
    // Notification options
    // -----------------------------------------------------------------------
    /// Slack incoming webhook URL. Without it, notifications are only logged.
    #[arg(long, env, value_parser = check_scheme, help_heading = "Notification")]
    pub slack_webhook_url: Option<String>,

    /// Slack channel override.
    #[arg(long, env, value_parser = NonEmptyStringValueParser::new(), help_heading = "Notification")]
    pub slack_channel: Option<String>,

    /// Slack username override.
    #[arg(long, env, value_parser = NonEmptyStringValueParser::new(), help_heading = "Notification")]
    pub slack_username: Option<String>,

    /// Slack icon emoji override (e.g. :floppy_disk:).
    #[arg(long, env, value_parser = NonEmptyStringValueParser::new(), help_heading = "Notification")]
    pub slack_icon_emoji: Option<String>,

    /// Webhook request timeout in milliseconds. Default: 10000.
    #[arg(long, env, default_value_t = DEFAULT_NOTIFICATION_TIMEOUT_MILLISECONDS, help_heading = "Notification")]
    pub notification_timeout_milliseconds: u64,

    // -----------------------------------------------------------------------
    // Shutdown options
    // -----------------------------------------------------------------------
    /// Power off the machine when the process finishes.
    #[arg(long, env, default_value_t = DEFAULT_SHUTDOWN, help_heading = "Shutdown")]
    pub shutdown: bool,

    /// Command executed by --shutdown.
    #[arg(long, env, default_value = DEFAULT_SHUTDOWN_COMMAND, help_heading = "Shutdown")]
    pub shutdown_command: String,

    // -----------------------------------------------------------------------
    // Logging options
    // -----------------------------------------------------------------------
    /// Verbosity level. -q (quiet), default (normal), -v, -vv.
    #[command(flatten)]
    pub verbosity: Verbosity<InfoLevel>,

    /// Output logs in JSON format.
    #[arg(long, env, default_value_t = DEFAULT_JSON_TRACING, help_heading = "Logging")]
    pub json_tracing: bool,

    /// Enable AWS SDK tracing.
    #[arg(long, env, default_value_t = DEFAULT_AWS_SDK_TRACING, help_heading = "Logging")]
    pub aws_sdk_tracing: bool,

    /// Enable tracing span events.
    #[arg(long, env, default_value_t = DEFAULT_SPAN_EVENTS_TRACING, help_heading = "Logging")]
    pub span_events_tracing: bool,

    /// Disable colored output in logs.
    #[arg(long, env, default_value_t = DEFAULT_DISABLE_COLOR_TRACING, help_heading = "Logging")]
    pub disable_color_tracing: bool,

    // -----------------------------------------------------------------------
    // Retry options
    // -----------------------------------------------------------------------
    /// Maximum retry attempts for AWS SDK operations. Default: 10.
    #[arg(long, env, default_value_t = DEFAULT_AWS_MAX_ATTEMPTS, help_heading = "Retry")]
    pub aws_max_attempts: u32,

    /// Initial backoff in milliseconds for retries. Default: 100.
    #[arg(long, env, default_value_t = DEFAULT_INITIAL_BACKOFF_MILLISECONDS, help_heading = "Retry")]
    pub initial_backoff_milliseconds: u64,

    // -----------------------------------------------------------------------
    // Timeout options
    // -----------------------------------------------------------------------
    /// Overall operation timeout in milliseconds.
    #[arg(long, env, help_heading = "Timeout")]
    pub operation_timeout_milliseconds: Option<u64>,

    /// Per-attempt operation timeout in milliseconds.
    #[arg(long, env, help_heading = "Timeout")]
    pub operation_attempt_timeout_milliseconds: Option<u64>,

    /// Connection timeout in milliseconds.
    #[arg(long, env, help_heading = "Timeout")]
    pub connect_timeout_milliseconds: Option<u64>,

    /// Read timeout in milliseconds.
    #[arg(long, env, help_heading = "Timeout")]
    pub read_timeout_milliseconds: Option<u64>,

    // -----------------------------------------------------------------------
    // AWS configuration
    // -----------------------------------------------------------------------
    /// AWS config file path.
    #[arg(long, env, help_heading = "AWS")]
    pub aws_config_file: Option<PathBuf>,

    /// AWS shared credentials file path.
    #[arg(long, env, help_heading = "AWS")]
    pub aws_shared_credentials_file: Option<PathBuf>,

    /// AWS profile. If not set, uses the default credential chain.
    #[arg(long, env, value_parser = NonEmptyStringValueParser::new(), conflicts_with = "access_key", help_heading = "AWS")]
    pub profile: Option<String>,

    /// AWS access key ID.
    #[arg(long, env, value_parser = NonEmptyStringValueParser::new(), help_heading = "AWS")]
    pub access_key: Option<String>,

    /// AWS secret access key.
    #[arg(long, env, value_parser = NonEmptyStringValueParser::new(), help_heading = "AWS")]
    pub secret_access_key: Option<String>,

    /// AWS session token.
    #[arg(long, env, value_parser = NonEmptyStringValueParser::new(), help_heading = "AWS")]
    pub session_token: Option<String>,

    /// AWS region.
    #[arg(long, env, value_parser = NonEmptyStringValueParser::new(), help_heading = "AWS")]
    pub region: Option<String>,

    /// Custom S3-compatible endpoint URL (e.g. MinIO, Wasabi).
    #[arg(long, env, value_parser = check_scheme, help_heading = "AWS")]
    pub endpoint_url: Option<String>,

    /// Force path-style access (required for some S3-compatible services).
    #[arg(long, env, default_value_t = DEFAULT_FORCE_PATH_STYLE, help_heading = "AWS")]
    pub force_path_style: bool,

    /// Enable S3 Transfer Acceleration.
    #[arg(long, env, default_value_t = DEFAULT_ACCELERATE, help_heading = "AWS")]
    pub accelerate: bool,

    /// Enable requester-pays for the bucket.
    #[arg(long, env, default_value_t = DEFAULT_REQUEST_PAYER, help_heading = "AWS")]
    pub request_payer: bool,

    /// Disable stalled stream protection.
    #[arg(long, env, default_value_t = DEFAULT_DISABLE_STALLED_STREAM_PROTECTION, help_heading = "AWS")]
    pub disable_stalled_stream_protection: bool,

    // -----------------------------------------------------------------------
    // Advanced options
    // -----------------------------------------------------------------------
    /// Treat warnings as errors (exit code 1 instead of 3).
    #[arg(long, env, default_value_t = DEFAULT_WARN_AS_ERROR, help_heading = "Advanced")]
    pub warn_as_error: bool,

    /// Max keys per listing request while deleting an expired backup. Default: 1000.
    #[arg(long, env, default_value_t = DEFAULT_MAX_KEYS, help_heading = "Advanced")]
    pub max_keys: i32,

    /// Generate shell completions.
    #[arg(long, env, help_heading = "Advanced")]
    pub auto_complete_shell: Option<clap_complete::shells::Shell>,
}

// ---------------------------------------------------------------------------
// parse_from_args (public API)
// ---------------------------------------------------------------------------

/// Parse command-line arguments into a `CLIArgs` struct.
///
/// # Example
///
/// ```
/// use s3backup_rs::config::args::parse_from_args;
///
/// let args = vec![
///     "s3backup",
///     "--bucket", "my-backups",
///     "--src-path", "gdrive:",
///     "--dest-path", "s3:my-backups",
///     "--dry-run",
/// ];
/// let cli_args = parse_from_args(args).unwrap();
/// assert!(cli_args.dry_run);
/// ```
pub fn parse_from_args<I, T>(args: I) -> Result<CLIArgs, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    CLIArgs::try_parse_from(args)
}

/// Parse arguments and build a Config in one step.
pub fn build_config_from_args<I, T>(args: I) -> Result<Config, String>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli_args = CLIArgs::try_parse_from(args).map_err(|e| e.to_string())?;
    Config::try_from(cli_args)
}

// ---------------------------------------------------------------------------
// Validation and Config conversion
// ---------------------------------------------------------------------------

impl CLIArgs {
    fn validate(&self) -> Result<(), String> {
        if !(1..=1000).contains(&self.max_keys) {
            return Err(ERROR_MESSAGE_MAX_KEYS_OUT_OF_RANGE.to_string());
        }
        if self.shutdown && self.shutdown_command.trim().is_empty() {
            return Err(ERROR_MESSAGE_EMPTY_SHUTDOWN_COMMAND.to_string());
        }
        if self.access_key.is_some() && self.secret_access_key.is_none() {
            return Err(ERROR_MESSAGE_SECRET_KEY_REQUIRED.to_string());
        }
        Ok(())
    }

    fn build_transfer_config(&self) -> TransferConfig {
        TransferConfig {
            rclone_binary: self.rclone_binary.clone(),
            rclone_config: self.rclone_config.clone(),
            src_path: self.src_path.clone(),
            dest_path: self.dest_path.trim_end_matches('/').to_string(),
            timeout_seconds: self.transfer_timeout_seconds,
        }
    }

    fn build_notification_config(&self) -> NotificationConfig {
        NotificationConfig {
            slack_webhook_url: self.slack_webhook_url.clone(),
            slack_channel: self.slack_channel.clone(),
            slack_username: self.slack_username.clone(),
            slack_icon_emoji: self.slack_icon_emoji.clone(),
            timeout_milliseconds: self.notification_timeout_milliseconds,
        }
    }

    fn build_client_config(&self) -> Option<ClientConfig> {
        let credential = if let Some(ref profile) = self.profile {
            S3Credentials::Profile(profile.clone())
        } else if let Some(ref access_key) = self.access_key {
            S3Credentials::Credentials {
                access_keys: AccessKeys {
                    access_key: access_key.clone(),
                    secret_access_key: self.secret_access_key.clone().unwrap_or_default(),
                    session_token: self.session_token.clone(),
                },
            }
        } else {
            S3Credentials::FromEnvironment
        };

        let request_payer = if self.request_payer {
            Some(RequestPayer::Requester)
        } else {
            None
        };

        Some(ClientConfig {
            client_config_location: ClientConfigLocation {
                aws_config_file: self.aws_config_file.clone(),
                aws_shared_credentials_file: self.aws_shared_credentials_file.clone(),
            },
            credential,
            region: self.region.clone(),
            endpoint_url: self.endpoint_url.clone(),
            force_path_style: self.force_path_style,
            accelerate: self.accelerate,
            request_payer,
            retry_config: RetryConfig {
                aws_max_attempts: self.aws_max_attempts,
                initial_backoff_milliseconds: self.initial_backoff_milliseconds,
            },
            cli_timeout_config: CLITimeoutConfig {
                operation_timeout_milliseconds: self.operation_timeout_milliseconds,
                operation_attempt_timeout_milliseconds: self.operation_attempt_timeout_milliseconds,
                connect_timeout_milliseconds: self.connect_timeout_milliseconds,
                read_timeout_milliseconds: self.read_timeout_milliseconds,
            },
            disable_stalled_stream_protection: self.disable_stalled_stream_protection,
            request_checksum_calculation: RequestChecksumCalculation::WhenRequired,
        })
    }

    fn build_tracing_config(&self) -> Option<TracingConfig> {
        let log_level = self.verbosity.log_level()?;

        Some(TracingConfig {
            tracing_level: log_level,
            json_tracing: self.json_tracing,
            aws_sdk_tracing: self.aws_sdk_tracing,
            span_events_tracing: self.span_events_tracing,
            disable_color_tracing: self.disable_color_tracing,
        })
    }
}

impl TryFrom<CLIArgs> for Config {
    type Error = String;

    fn try_from(args: CLIArgs) -> Result<Self, Self::Error> {
        args.validate()?;

        Ok(Config {
            bucket: args.bucket.clone(),
            num_days_kept: args.num_days_kept,
            transfer_config: args.build_transfer_config(),
            notification_config: args.build_notification_config(),
            shutdown_config: ShutdownConfig {
                enabled: args.shutdown,
                command: args.shutdown_command.clone(),
            },
            client_config: args.build_client_config(),
            tracing_config: args.build_tracing_config(),
            dry_run: args.dry_run,
            warn_as_error: args.warn_as_error,
            max_keys: args.max_keys,
            auto_complete_shell: args.auto_complete_shell,
        })
    }
}
