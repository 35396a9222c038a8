//! Removal of every object under a backup prefix.
//!
//! The coordinator lists the first page under the prefix, deletes exactly
//! those keys with one DeleteObjects call, and repeats while the listing
//! reports more objects. It never carries a continuation token: each round
//! lists the store's current state, which after a successful delete no
//! longer contains the keys just removed.

use std::future::Future;
use std::pin::Pin;

use anyhow::{Result, anyhow};
use tracing::{debug, info};

use crate::storage::Storage;
use crate::types::error::S3BackupError;

pub mod batch;

pub use batch::{DeleteBatch, MAX_BATCH_SIZE};

/// Result of one DeleteObjects request.
#[derive(Debug, Clone, Default)]
pub struct DeleteResult {
    pub deleted: Vec<String>,
    pub failed: Vec<FailedKey>,
}

/// A key the store refused to delete.
#[derive(Debug, Clone)]
pub struct FailedKey {
    pub key: String,
    pub error_code: String,
    pub error_message: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeletePrefixStats {
    /// List + delete rounds performed.
    pub round_trips: u64,
    pub deleted_objects: u64,
}

pub struct PrefixDeleter {
    target: Storage,
    max_keys: i32,
}

impl PrefixDeleter {
    /// `max_keys` is clamped to the DeleteObjects limit.
    pub fn new(target: Storage, max_keys: i32) -> Self {
        PrefixDeleter {
            target,
            max_keys: max_keys.clamp(1, MAX_BATCH_SIZE as i32),
        }
    }

    /// Delete all objects under `prefix`.
    ///
    /// Listing or delete failures abort immediately. A response that reports
    /// any per-key error also aborts with [`S3BackupError::DeleteFailure`],
    /// since the same keys would otherwise be listed again on every round.
    pub async fn delete_prefix(&self, prefix: &str) -> Result<DeletePrefixStats> {
        if prefix.is_empty() || prefix == "/" {
            return Err(anyhow!(S3BackupError::DeleteFailure(
                "refusing to delete the bucket root.".to_string()
            )));
        }

        let mut stats = DeletePrefixStats::default();
        self.delete_page_and_recurse(prefix, &mut stats).await?;

        info!(
            bucket = self.target.bucket(),
            prefix = prefix,
            round_trips = stats.round_trips,
            deleted_objects = stats.deleted_objects,
            "Deleted all objects under s3://{}/{}.",
            self.target.bucket(),
            prefix,
        );

        Ok(stats)
    }

    fn delete_page_and_recurse<'a>(
        &'a self,
        prefix: &'a str,
        stats: &'a mut DeletePrefixStats,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let page = self
                .target
                .list_objects_page(prefix, self.max_keys)
                .await
                .map_err(|e| {
                    anyhow!(S3BackupError::ListFailure(format!(
                        "listing objects under '{prefix}' failed: {e:#}"
                    )))
                })?;

            if page.keys.is_empty() {
                debug!(prefix = prefix, "No objects left under prefix.");
                return Ok(());
            }

            let is_truncated = page.is_truncated;
            let result = DeleteBatch::new(prefix, page.keys)?
                .submit(&self.target)
                .await?;

            stats.round_trips += 1;
            stats.deleted_objects += result.deleted.len() as u64;

            if let Some(first) = result.failed.first() {
                return Err(anyhow!(S3BackupError::DeleteFailure(format!(
                    "{} object(s) under '{prefix}' could not be deleted (first: '{}': {} ({})).",
                    result.failed.len(),
                    first.key,
                    first.error_code,
                    first.error_message,
                ))));
            }

            if is_truncated {
                debug!(
                    prefix = prefix,
                    round_trips = stats.round_trips,
                    "Listing was truncated, listing again."
                );
                self.delete_page_and_recurse(prefix, stats).await?;
            }

            Ok(())
        })
    }
}
