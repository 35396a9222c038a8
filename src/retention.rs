//! Backup naming and the date-based retention window.
//!
//! A backup lives under the top-level folder `backup-DD-MMM-YYYY/` where the
//! month is the English three-letter abbreviation (`backup-07-Jan-2024`).
//! Anything at the bucket root that does not follow this pattern is never
//! touched by the retention pass.

use chrono::{Days, NaiveDate};

use crate::types::BackupEntry;

pub const BACKUP_NAME_PREFIX: &str = "backup-";
pub const BACKUP_LOG_FILE_NAME: &str = "backup-log.txt";

const BACKUP_DATE_FORMAT: &str = "%d-%b-%Y";

/// Name of the backup folder for `date`, e.g. `backup-07-Jan-2024`.
pub fn backup_name(date: NaiveDate) -> String {
    format!("{BACKUP_NAME_PREFIX}{}", date.format(BACKUP_DATE_FORMAT))
}

/// Key of the run log inside a backup folder.
pub fn log_key(backup_name: &str) -> String {
    format!("{backup_name}/{BACKUP_LOG_FILE_NAME}")
}

/// Human-readable date used in notifications, e.g. `07-Jan-2024`.
pub fn display_date(date: NaiveDate) -> String {
    date.format(BACKUP_DATE_FORMAT).to_string()
}

/// Extract the date from a backup folder name.
///
/// Accepts the bare name or a listing prefix with a trailing `/`. Returns
/// `None` for anything that does not follow the naming convention, including
/// impossible dates such as `backup-31-Feb-2024`.
pub fn parse_backup_date(name: &str) -> Option<NaiveDate> {
    let name = name.strip_suffix('/').unwrap_or(name);
    let date_part = name.strip_prefix(BACKUP_NAME_PREFIX)?;
    let date = NaiveDate::parse_from_str(date_part, BACKUP_DATE_FORMAT).ok()?;

    // chrono is lenient about padding and month case; only exact names count.
    (backup_name(date) == name).then_some(date)
}

/// Turn a listed prefix into a [`BackupEntry`] if it names a backup.
pub fn backup_entry(prefix: &str) -> Option<BackupEntry> {
    parse_backup_date(prefix).map(|date| BackupEntry {
        prefix: prefix.to_string(),
        date,
    })
}

/// The set of dates whose backups are kept on a given day.
///
/// With `num_days_kept = N` the window is the `N + 1` calendar days from
/// `today - N` through `today`, both inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionWindow {
    today: NaiveDate,
    lower_bound: NaiveDate,
}

impl RetentionWindow {
    pub fn new(today: NaiveDate, num_days_kept: u32) -> Self {
        let lower_bound = today
            .checked_sub_days(Days::new(num_days_kept as u64))
            .unwrap_or(NaiveDate::MIN);
        RetentionWindow { today, lower_bound }
    }

    pub fn lower_bound(&self) -> NaiveDate {
        self.lower_bound
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// Dates after today are outside the window.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.lower_bound <= date && date <= self.today
    }
}

/// Whether a backup taken on `date` is kept on `today`.
pub fn keep(date: NaiveDate, today: NaiveDate, num_days_kept: u32) -> bool {
    RetentionWindow::new(today, num_days_kept).contains(date)
}
