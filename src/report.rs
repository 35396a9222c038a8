//! Human-readable texts produced by a backup run: notification messages,
//! the transfer report, and the log document uploaded next to the backup.

use crate::types::TransferResult;

/// Rendered in place of a metric the parser could not find.
pub const MISSING_METRIC_PLACEHOLDER: &str = "n/a";

pub const ERROR_ALERT_MESSAGE: &str = ":x: An error occurred! Check the logs for details.";

const LOG_STDOUT_HEADER: &str = "***** STDOUT *****";
const LOG_STDERR_HEADER: &str = "***** STDERR *****";
const LOG_ERROR_HEADER: &str = "***** ERROR *****";

pub fn starting_message(backup_name: &str) -> String {
    format!(":hourglass_flowing_sand: Starting backup of {backup_name}!")
}

pub fn deleted_message(display_date: &str) -> String {
    format!(":wastebasket: The backup from {display_date} was deleted!")
}

/// Compose the completion report sent after a successful transfer.
pub fn compose_report(result: &TransferResult) -> String {
    let field = |value: &Option<String>| {
        value
            .as_deref()
            .unwrap_or(MISSING_METRIC_PLACEHOLDER)
            .to_string()
    };

    format!(
        "✅ *Finished backup!* Transferred *{}* in *{}* (Average rate: _{}_).\n>_Errors: {} - Checks: {} - Transferred objects: {}_",
        field(&result.size),
        field(&result.duration),
        field(&result.avg_rate),
        field(&result.errors),
        field(&result.checks),
        field(&result.num_objects),
    )
}

/// Assemble the log document stored at `<backup-name>/backup-log.txt`.
///
/// `error` is a pretty-printed description of the failure; when present it
/// is placed in its own section ahead of the captured streams.
pub fn compose_log_document(stdout: &str, stderr: &str, error: Option<&str>) -> String {
    let mut document = String::with_capacity(stdout.len() + stderr.len() + 128);

    if let Some(error) = error {
        document.push_str(LOG_ERROR_HEADER);
        document.push_str("\n\n");
        document.push_str(error);
        document.push_str("\n\n");
    }

    document.push_str(LOG_STDOUT_HEADER);
    document.push_str("\n\n");
    document.push_str(stdout);
    document.push_str("\n\n");
    document.push_str(LOG_STDERR_HEADER);
    document.push_str("\n\n");
    document.push_str(stderr);

    document
}
