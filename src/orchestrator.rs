//! The backup run: transfer, log upload, report, retention.
//!
//! Stages are strictly sequential. A failed transfer stops the run right
//! after its log has been uploaded; a failed listing stops it before the
//! retention pass. Everything else that fails (log upload, a notification,
//! the deletion of one expired backup) is logged and the run continues.

use chrono::{DateTime, Local, NaiveDate};
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::config::Config;
use crate::deleter::PrefixDeleter;
use crate::notifier::Notifier;
use crate::parser::parse_transfer_output;
use crate::report;
use crate::retention::{self, RetentionWindow};
use crate::storage::Storage;
use crate::transfer::{TransferFailure, TransferOutput, Transferrer};
use crate::types::TransferResult;
use crate::types::error::S3BackupError;

const LOG_CONTENT_TYPE: &str = "text/plain; charset=utf-8";
const TOP_LEVEL_DELIMITER: &str = "/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Pending,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    Started,
    TransferInvoked,
    TransferFailed,
    TransferSucceeded,
    LogUploaded,
    MetricsReported,
    BackupsListed,
    RetentionEvaluated,
    Done,
}

/// The in-memory record of one run. Never persisted; it only names the
/// destination prefix.
#[derive(Debug, Clone)]
pub struct BackupRun {
    pub name: String,
    pub date: NaiveDate,
    pub started_at: DateTime<Local>,
    pub destination_prefix: String,
    pub outcome: RunOutcome,
    pub stage: RunStage,
}

impl BackupRun {
    pub fn new(date: NaiveDate, started_at: DateTime<Local>) -> Self {
        let name = retention::backup_name(date);
        BackupRun {
            destination_prefix: format!("{name}/"),
            name,
            date,
            started_at,
            outcome: RunOutcome::Pending,
            stage: RunStage::Started,
        }
    }

    fn advance(&mut self, stage: RunStage) {
        debug!(
            backup_name = self.name,
            from = ?self.stage,
            to = ?stage,
            "Backup run stage transition."
        );
        self.stage = stage;
    }
}

/// What a run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub backup_name: String,
    pub outcome: RunOutcome,
    pub stage: RunStage,
    pub log_uploaded: bool,
    pub transfer_result: Option<TransferResult>,
    /// Backups outside the retention window (deleted, failed, or left alone in a dry run).
    pub expired_backups: Vec<String>,
    pub deleted_backups: Vec<String>,
    pub failed_deletions: Vec<String>,
    pub kept_backups: Vec<String>,
    pub listing_failed: bool,
}

impl RunSummary {
    fn new(run: &BackupRun) -> Self {
        RunSummary {
            backup_name: run.name.clone(),
            outcome: run.outcome,
            stage: run.stage,
            log_uploaded: false,
            transfer_result: None,
            expired_backups: Vec::new(),
            deleted_backups: Vec::new(),
            failed_deletions: Vec::new(),
            kept_backups: Vec::new(),
            listing_failed: false,
        }
    }

    /// The transfer failed or the existing backups could not be listed.
    pub fn has_error(&self) -> bool {
        self.outcome == RunOutcome::Failed || self.listing_failed
    }

    /// The backup itself succeeded but a best-effort step did not.
    pub fn has_warning(&self) -> bool {
        !self.log_uploaded || !self.failed_deletions.is_empty()
    }

    /// Process exit code: 0 ok, 1 error, 3 warning (1 with `warn_as_error`).
    pub fn exit_code(&self, warn_as_error: bool) -> i32 {
        if self.has_error() {
            1
        } else if self.has_warning() {
            if warn_as_error { 1 } else { 3 }
        } else {
            0
        }
    }
}

/// Runs one backup with the given capabilities.
///
/// # Example
///
/// ```no_run
/// use s3backup_rs::config::args::build_config_from_args;
/// use s3backup_rs::{BackupOrchestrator, RcloneTransferrer, create_notifier, create_storage};
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = build_config_from_args([
///     "s3backup",
///     "--bucket", "my-backups",
///     "--src-path", "gdrive:",
///     "--dest-path", "s3:my-backups",
/// ])
/// .map_err(anyhow::Error::msg)?;
///
/// let storage = create_storage(&config).await;
/// let transferrer = Box::new(RcloneTransferrer::new(config.transfer_config.clone()));
/// let notifier = create_notifier(&config.notification_config)?;
///
/// let summary = BackupOrchestrator::new(config, storage, transferrer, notifier)
///     .run()
///     .await;
/// println!("exit code: {}", summary.exit_code(false));
/// # Ok(())
/// # }
/// ```
pub struct BackupOrchestrator {
    config: Config,
    storage: Storage,
    transferrer: Box<dyn Transferrer>,
    notifier: Box<dyn Notifier>,
}

impl BackupOrchestrator {
    pub fn new(
        config: Config,
        storage: Storage,
        transferrer: Box<dyn Transferrer>,
        notifier: Box<dyn Notifier>,
    ) -> Self {
        BackupOrchestrator {
            config,
            storage,
            transferrer,
            notifier,
        }
    }

    /// Run the backup for the local calendar day.
    pub async fn run(&self) -> RunSummary {
        self.run_on(Local::now().date_naive()).await
    }

    /// Run the backup as if `today` were the current date.
    pub async fn run_on(&self, today: NaiveDate) -> RunSummary {
        let run = BackupRun::new(today, Local::now());
        let span = info_span!("backup_run", backup_name = %run.name);
        self.execute(run).instrument(span).await
    }

    async fn execute(&self, mut run: BackupRun) -> RunSummary {
        info!(
            bucket = self.config.bucket,
            backup_name = run.name,
            num_days_kept = self.config.num_days_kept,
            dry_run = self.config.dry_run,
            "Starting backup of {}.",
            run.name
        );
        self.notifier.send(&report::starting_message(&run.name)).await;

        run.advance(RunStage::TransferInvoked);
        let (output, failure) = self.invoke_transfer(&run).await;

        if let Some(ref failure) = failure {
            let e = S3BackupError::from(failure);
            error!(
                backup_name = run.name,
                exit_code = failure.exit_code,
                stderr = output.stderr,
                "{e}"
            );
            run.outcome = RunOutcome::Failed;
            run.advance(RunStage::TransferFailed);
            self.notifier.send(report::ERROR_ALERT_MESSAGE).await;
        } else {
            run.outcome = RunOutcome::Succeeded;
            run.advance(RunStage::TransferSucceeded);
        }

        let log_json = failure.as_ref().map(TransferFailure::to_pretty_json);
        let log_uploaded = self
            .upload_log(&run, &output, log_json.as_deref())
            .await;
        run.advance(RunStage::LogUploaded);

        let mut summary = RunSummary::new(&run);
        summary.log_uploaded = log_uploaded;

        if failure.is_some() {
            return summary;
        }

        let transfer_result = parse_transfer_output(&output.stderr);
        let report = report::compose_report(&transfer_result);
        info!(backup_name = run.name, "{report}");
        self.notifier.send(&report).await;
        summary.transfer_result = Some(transfer_result);
        run.advance(RunStage::MetricsReported);

        let prefixes = match self
            .storage
            .list_common_prefixes("", TOP_LEVEL_DELIMITER)
            .await
        {
            Ok(prefixes) => prefixes,
            Err(e) => {
                let e = S3BackupError::ListFailure(format!("{e:#}"));
                error!(bucket = self.config.bucket, "{e}");
                summary.listing_failed = true;
                summary.stage = run.stage;
                return summary;
            }
        };
        run.advance(RunStage::BackupsListed);

        self.apply_retention(run.date, &prefixes, &mut summary)
            .await;
        run.advance(RunStage::RetentionEvaluated);

        run.advance(RunStage::Done);
        summary.outcome = run.outcome;
        summary.stage = run.stage;

        info!(
            backup_name = run.name,
            deleted = summary.deleted_backups.len(),
            failed = summary.failed_deletions.len(),
            kept = summary.kept_backups.len(),
            elapsed_seconds = (Local::now() - run.started_at).num_seconds(),
            "Backup run finished."
        );

        summary
    }

    /// Returns the captured output and, if the transfer did not succeed, a
    /// description of the failure.
    async fn invoke_transfer(&self, run: &BackupRun) -> (TransferOutput, Option<TransferFailure>) {
        match self.transferrer.transfer(&run.name).await {
            Ok(output) => {
                let failure = output.failure();
                (output, failure)
            }
            Err(e) => {
                let command = self.transferrer.describe(&run.name);
                let failure = TransferFailure::from_error(&e, &command);
                (
                    TransferOutput {
                        command,
                        ..Default::default()
                    },
                    Some(failure),
                )
            }
        }
    }

    async fn upload_log(&self, run: &BackupRun, output: &TransferOutput, error: Option<&str>) -> bool {
        let key = retention::log_key(&run.name);
        let document = report::compose_log_document(&output.stdout, &output.stderr, error);

        match self
            .storage
            .put_object(&key, LOG_CONTENT_TYPE, document.into_bytes())
            .await
        {
            Ok(_) => {
                info!(
                    bucket = self.storage.bucket(),
                    key = key,
                    "Uploaded backup log."
                );
                true
            }
            Err(e) => {
                let e = S3BackupError::PutFailure(format!("{e:#}"));
                error!(bucket = self.storage.bucket(), key = key, "{e}");
                false
            }
        }
    }

    async fn apply_retention(&self, today: NaiveDate, prefixes: &[String], summary: &mut RunSummary) {
        let window = RetentionWindow::new(today, self.config.num_days_kept);
        let deleter = PrefixDeleter::new(self.storage.clone(), self.config.max_keys);

        debug!(
            lower_bound = %window.lower_bound(),
            today = %window.today(),
            candidates = prefixes.len(),
            "Evaluating retention."
        );

        for prefix in prefixes {
            let Some(entry) = retention::backup_entry(prefix) else {
                debug!(prefix = prefix, "Skipping prefix that is not a backup.");
                continue;
            };
            let name = entry.prefix.trim_end_matches('/').to_string();

            if window.contains(entry.date) {
                summary.kept_backups.push(name);
                continue;
            }

            summary.expired_backups.push(name.clone());

            if self.config.dry_run {
                info!(
                    prefix = entry.prefix,
                    "[dry-run] Would delete expired backup {}.",
                    name
                );
                continue;
            }

            match deleter.delete_prefix(&entry.prefix).await {
                Ok(stats) => {
                    info!(
                        prefix = entry.prefix,
                        deleted_objects = stats.deleted_objects,
                        "Deleted expired backup {}.",
                        name
                    );
                    self.notifier
                        .send(&report::deleted_message(&retention::display_date(
                            entry.date,
                        )))
                        .await;
                    summary.deleted_backups.push(name);
                }
                Err(e) => {
                    warn!(
                        prefix = entry.prefix,
                        error = %format!("{e:#}"),
                        "Failed to delete expired backup {}.",
                        name
                    );
                    summary.failed_deletions.push(name);
                }
            }
        }
    }
}
