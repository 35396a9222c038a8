use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use tracing::{debug, error, trace, warn};

use s3backup_rs::config::Config;
use s3backup_rs::{
    BackupOrchestrator, CLIArgs, RcloneTransferrer, S3BackupError, create_notifier,
    create_storage, exit_code_from_error,
};

use crate::shutdown_hook::ShutdownHook;

mod shutdown_hook;
mod tracing_init;

/// s3backup - Unattended rclone backups to Amazon S3 with date-based retention.
///
/// This binary is a thin wrapper over the s3backup-rs library. It parses the
/// command line, sets up tracing, wires the S3, rclone and Slack
/// capabilities into a run and fires the shutdown hook once the run is over.
#[cfg_attr(coverage_nightly, coverage(off))]
#[tokio::main]
async fn main() -> Result<()> {
    let config = load_config_exit_if_err();

    if let Some(shell) = config.auto_complete_shell {
        generate(
            shell,
            &mut CLIArgs::command(),
            "s3backup",
            &mut std::io::stdout(),
        );

        return Ok(());
    }

    start_tracing_if_necessary(&config);

    trace!("config = {:?}", config);

    let shutdown_hook = ShutdownHook::new(&config.shutdown_config);
    let exit_code = run(config).await;

    shutdown_hook.fire();

    if exit_code != 0 {
        std::process::exit(exit_code);
    }

    Ok(())
}

#[cfg_attr(coverage_nightly, coverage(off))]
fn load_config_exit_if_err() -> Config {
    match build_config(CLIArgs::parse()) {
        Ok(config) => config,
        Err(e) => {
            let _ = clap::Error::raw(clap::error::ErrorKind::ValueValidation, format!("{e}\n")).print();
            std::process::exit(e.exit_code());
        }
    }
}

fn build_config(args: CLIArgs) -> Result<Config, S3BackupError> {
    Config::try_from(args).map_err(S3BackupError::InvalidConfig)
}

fn start_tracing_if_necessary(config: &Config) -> bool {
    let Some(tracing_config) = config.tracing_config.as_ref() else {
        return false;
    };

    tracing_init::init_tracing(tracing_config);
    true
}

#[cfg_attr(coverage_nightly, coverage(off))]
async fn run(config: Config) -> i32 {
    let notifier = match create_notifier(&config.notification_config) {
        Ok(notifier) => notifier,
        Err(e) => {
            error!(error = format!("{e:#}"), "failed to create notifier.");
            return exit_code_from_error(&e);
        }
    };

    let start_time = tokio::time::Instant::now();
    debug!("backup run start.");

    let storage = create_storage(&config).await;
    let transferrer = Box::new(RcloneTransferrer::new(config.transfer_config.clone()));
    let warn_as_error = config.warn_as_error;

    let summary = BackupOrchestrator::new(config, storage, transferrer, notifier)
        .run()
        .await;

    let duration_sec = format!("{:.3}", start_time.elapsed().as_secs_f32());
    let exit_code = summary.exit_code(warn_as_error);

    if summary.has_error() {
        error!(
            backup_name = summary.backup_name,
            duration_sec = duration_sec,
            "s3backup failed."
        );
    } else if summary.has_warning() {
        warn!(
            backup_name = summary.backup_name,
            duration_sec = duration_sec,
            log_uploaded = summary.log_uploaded,
            failed_deletions = summary.failed_deletions.len(),
            "s3backup completed with warnings."
        );
    } else {
        debug!(
            backup_name = summary.backup_name,
            duration_sec = duration_sec,
            deleted_backups = summary.deleted_backups.len(),
            "s3backup has been completed."
        );
    }

    exit_code
}
