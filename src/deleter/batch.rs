//! One DeleteObjects request for up to 1000 keys.

use anyhow::{Context, Result, anyhow};
use aws_sdk_s3::types::ObjectIdentifier;
use tracing::{debug, warn};

use crate::storage::Storage;
use crate::types::error::S3BackupError;

use super::{DeleteResult, FailedKey};

/// Maximum objects per DeleteObjects API call (S3 limit).
pub const MAX_BATCH_SIZE: usize = 1000;

/// Keys listed under one backup prefix, removed with a single request.
#[derive(Debug, Clone)]
pub struct DeleteBatch {
    prefix: String,
    keys: Vec<String>,
}

impl DeleteBatch {
    pub fn new(prefix: &str, keys: Vec<String>) -> Result<Self> {
        if keys.len() > MAX_BATCH_SIZE {
            return Err(anyhow!(S3BackupError::DeleteFailure(format!(
                "batch of {} keys exceeds the DeleteObjects limit of {MAX_BATCH_SIZE}.",
                keys.len()
            ))));
        }

        Ok(DeleteBatch {
            prefix: prefix.to_string(),
            keys,
        })
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Send the batch.
    ///
    /// A failed request is returned as an error. Per-key failures reported in
    /// the response are returned in [`DeleteResult::failed`].
    pub async fn submit(self, target: &Storage) -> Result<DeleteResult> {
        let mut result = DeleteResult::default();
        if self.keys.is_empty() {
            return Ok(result);
        }

        let identifiers = self
            .keys
            .iter()
            .map(|key| {
                ObjectIdentifier::builder()
                    .key(key)
                    .build()
                    .context("Failed to build ObjectIdentifier")
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(
            prefix = self.prefix,
            batch_size = identifiers.len(),
            "sending DeleteObjects batch request."
        );

        let response = target.delete_objects(identifiers).await.map_err(|e| {
            anyhow!(S3BackupError::DeleteFailure(format!(
                "DeleteObjects request for prefix '{}' failed: {e:#}",
                self.prefix
            )))
        })?;

        result.deleted.extend(
            response
                .deleted()
                .iter()
                .filter_map(|deleted| deleted.key().map(String::from)),
        );

        for err in response.errors() {
            let key = err.key().unwrap_or("unknown").to_string();
            let code = err.code().unwrap_or("unknown").to_string();
            let message = err.message().unwrap_or("no message").to_string();

            warn!(
                prefix = self.prefix,
                key = key,
                code = code,
                message = message,
                "S3 DeleteObjects partial failure for key '{}': {} ({}).",
                key,
                code,
                message,
            );

            result.failed.push(FailedKey {
                key,
                error_code: code,
                error_message: message,
            });
        }

        debug!(
            prefix = self.prefix,
            deleted = result.deleted.len(),
            failed = result.failed.len(),
            "DeleteObjects batch completed."
        );

        Ok(result)
    }
}
