use std::fmt;
use std::fmt::{Debug, Formatter};
use std::path::PathBuf;

use chrono::NaiveDate;
use zeroize_derive::{Zeroize, ZeroizeOnDrop};

pub mod error;

/// Metrics extracted from the transfer tool's summary output.
///
/// Every field holds the value captured from the *last* matching line of the
/// output. A metric that never appeared is `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferResult {
    pub size: Option<String>,
    pub avg_rate: Option<String>,
    pub duration: Option<String>,
    pub errors: Option<String>,
    pub checks: Option<String>,
    pub num_objects: Option<String>,
}

impl TransferResult {
    /// True when none of the metrics could be found in the output.
    pub fn is_empty(&self) -> bool {
        self.size.is_none()
            && self.avg_rate.is_none()
            && self.duration.is_none()
            && self.errors.is_none()
            && self.checks.is_none()
            && self.num_objects.is_none()
    }
}

/// A top-level prefix in the bucket that follows the backup naming convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupEntry {
    /// The common prefix as returned by the store, e.g. `backup-07-Jan-2024/`.
    pub prefix: String,
    pub date: NaiveDate,
}

/// One page of object keys under a prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectPage {
    pub keys: Vec<String>,
    /// More objects exist beyond this page.
    pub is_truncated: bool,
}

/// AWS configuration file locations.
#[derive(Debug, Clone)]
pub struct ClientConfigLocation {
    pub aws_config_file: Option<PathBuf>,
    pub aws_shared_credentials_file: Option<PathBuf>,
}

/// AWS credential sources.
#[derive(Debug, Clone)]
pub enum S3Credentials {
    Profile(String),
    Credentials { access_keys: AccessKeys },
    FromEnvironment,
}

/// AWS access key pair.
///
/// The secret_access_key and session_token are cleared from memory on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct AccessKeys {
    pub access_key: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl Debug for AccessKeys {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut keys = f.debug_struct("AccessKeys");
        let session_token = self
            .session_token
            .as_ref()
            .map_or("None", |_| "** redacted **");
        keys.field("access_key", &self.access_key)
            .field("secret_access_key", &"** redacted **")
            .field("session_token", &session_token);
        keys.finish()
    }
}
