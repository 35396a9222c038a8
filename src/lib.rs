/*!
# Overview
s3backup-rs runs unattended backups of a data tree into Amazon S3 (or an
S3-compatible store) with rclone, and prunes old backups by date.

## Features
- **Dated backups**: each run copies into `backup-DD-MMM-YYYY/`
- **Run log**: the transfer's stdout/stderr is stored as `backup-DD-MMM-YYYY/backup-log.txt`
- **Retention**: backups older than `--num-days-kept` days are deleted with the S3 batch API
- **Notifications**: start, failure, report and deletion messages via a Slack incoming webhook
- **Library-First**: the s3backup CLI is a thin wrapper over this library

## As a Library
Every capability the orchestrator uses (storage, transfer, notifier) is a
trait object, so a run can be assembled from custom parts.

Example usage
=============

```toml
[dependencies]
s3backup-rs = "0.1"
tokio = { version = "1", features = ["full"] }
```

```no_run
use s3backup_rs::config::Config;
use s3backup_rs::config::args::parse_from_args;
use s3backup_rs::{BackupOrchestrator, RcloneTransferrer, create_notifier, create_storage};

#[tokio::main]
async fn main() {
    let args = vec![
        "s3backup",
        "--bucket", "my-backups",
        "--src-path", "gdrive:",
        "--dest-path", "s3:my-backups",
        "--num-days-kept", "14",
    ];

    let parsed_args = parse_from_args(args).unwrap();
    let config = Config::try_from(parsed_args).unwrap();

    let storage = create_storage(&config).await;
    let transferrer = Box::new(RcloneTransferrer::new(config.transfer_config.clone()));
    let notifier = create_notifier(&config.notification_config).unwrap();

    let summary = BackupOrchestrator::new(config, storage, transferrer, notifier)
        .run()
        .await;

    if summary.has_error() {
        eprintln!("backup {} failed", summary.backup_name);
    }
}
```
*/

#![allow(clippy::collapsible_if)]

pub mod config;
pub mod deleter;
pub mod notifier;
pub mod orchestrator;
pub mod parser;
pub mod report;
pub mod retention;
pub mod storage;
pub mod transfer;
pub mod types;

pub use config::Config;
pub use config::args::{CLIArgs, build_config_from_args, parse_from_args};
pub use deleter::{DeletePrefixStats, PrefixDeleter};
pub use notifier::{LogNotifier, Notifier, SlackNotifier, create_notifier};
pub use orchestrator::{BackupOrchestrator, BackupRun, RunOutcome, RunStage, RunSummary};
pub use parser::parse_transfer_output;
pub use storage::{Storage, StorageTrait, create_storage};
pub use transfer::{RcloneTransferrer, TransferOutput, Transferrer};
pub use types::error::{S3BackupError, exit_code_from_error};
pub use types::{BackupEntry, TransferResult};

#[cfg(test)]
mod property_tests;
