use anyhow::Result;
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::operation::delete_objects::DeleteObjectsOutput;
use aws_sdk_s3::operation::put_object::PutObjectOutput;
use aws_sdk_s3::types::{ObjectIdentifier, RequestPayer};
use dyn_clone::DynClone;
use std::sync::Arc;

use crate::config::{ClientConfig, Config};
use crate::types::ObjectPage;

pub mod s3;

/// Type alias for a boxed Storage trait object.
pub type Storage = Box<dyn StorageTrait + Send + Sync>;

/// Factory trait for creating Storage instances.
#[async_trait]
pub trait StorageFactory {
    async fn create(
        bucket: String,
        client_config: Option<ClientConfig>,
        request_payer: Option<RequestPayer>,
    ) -> Storage;
}

/// Object-store operations needed by a backup run.
///
/// All keys are full keys inside [`StorageTrait::bucket`]; no prefix is
/// prepended by the implementation.
///
/// Methods:
/// - `put_object`: upload the run log
/// - `list_common_prefixes`: enumerate top-level backup folders
/// - `list_objects_page`: one page of keys under a backup folder
/// - `delete_objects`: batch removal via DeleteObjects
#[async_trait]
pub trait StorageTrait: DynClone {
    fn bucket(&self) -> &str;

    /// Upload `body` as a single object at `key`.
    async fn put_object(&self, key: &str, content_type: &str, body: Vec<u8>)
    -> Result<PutObjectOutput>;

    /// Every common prefix directly under `prefix` for the given delimiter.
    ///
    /// Follows continuation tokens until the listing is exhausted. Listing
    /// failures are unrecoverable for the caller.
    async fn list_common_prefixes(&self, prefix: &str, delimiter: &str) -> Result<Vec<String>>;

    /// List the first page (at most `max_keys` keys) under `prefix`.
    ///
    /// No continuation token is carried; callers that delete what they list
    /// simply list again.
    async fn list_objects_page(&self, prefix: &str, max_keys: i32) -> Result<ObjectPage>;

    /// Delete up to 1000 objects in a single DeleteObjects request.
    ///
    /// Returns the raw output, including per-key errors (partial failure).
    async fn delete_objects(&self, objects: Vec<ObjectIdentifier>) -> Result<DeleteObjectsOutput>;

    /// Get the underlying AWS S3 Client for direct API access.
    fn get_client(&self) -> Option<Arc<Client>>;
}

dyn_clone::clone_trait_object!(StorageTrait);

/// Create the S3 storage for the configured bucket.
pub async fn create_storage(config: &Config) -> Storage {
    let client_config = config.client_config.clone();
    let request_payer = client_config.as_ref().and_then(|c| c.request_payer.clone());

    s3::S3StorageFactory::create(config.bucket.clone(), client_config, request_payer).await
}
