pub mod client_builder;

use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::operation::delete_objects::DeleteObjectsOutput;
use aws_sdk_s3::operation::put_object::PutObjectOutput;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{Delete, ObjectIdentifier, RequestPayer};
use aws_smithy_types::error::metadata::ProvideErrorMetadata;
use std::sync::Arc;

use crate::config::ClientConfig;
use crate::storage::{Storage, StorageFactory, StorageTrait};
use crate::types::ObjectPage;

/// Extracts the S3 error code and message from an AWS SDK error.
///
/// For service errors, returns the S3 error code (e.g. "AccessDenied") and
/// the message from the response. For anything else (network, timeout,
/// construction failure) the code is "N/A" and the message is the full
/// error description.
fn extract_sdk_error_details<E: std::fmt::Display + ProvideErrorMetadata>(
    e: &SdkError<E>,
) -> (String, String) {
    if let Some(service_err) = e.as_service_error() {
        (
            service_err.code().unwrap_or("unknown").to_string(),
            service_err.message().unwrap_or("no message").to_string(),
        )
    } else {
        ("N/A".to_string(), e.to_string())
    }
}

pub struct S3StorageFactory;

#[async_trait]
impl StorageFactory for S3StorageFactory {
    async fn create(
        bucket: String,
        client_config: Option<ClientConfig>,
        request_payer: Option<RequestPayer>,
    ) -> Storage {
        let client = if let Some(ref client_config) = client_config {
            Some(Arc::new(client_config.create_client().await))
        } else {
            None
        };

        Box::new(S3Storage {
            bucket,
            client,
            request_payer,
        })
    }
}

#[derive(Clone)]
struct S3Storage {
    bucket: String,
    client: Option<Arc<Client>>,
    request_payer: Option<RequestPayer>,
}

impl S3Storage {
    fn client(&self) -> Result<&Client> {
        self.client
            .as_deref()
            .context("S3 client is not configured.")
    }
}

#[async_trait]
impl StorageTrait for S3Storage {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn put_object(
        &self,
        key: &str,
        content_type: &str,
        body: Vec<u8>,
    ) -> Result<PutObjectOutput> {
        let content_length = body.len();

        self.client()?
            .put_object()
            .set_request_payer(self.request_payer.clone())
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| {
                let (s3_error_code, s3_error_message) = extract_sdk_error_details(&e);
                tracing::error!(
                    bucket = self.bucket,
                    key = key,
                    content_length = content_length,
                    s3_error_code = s3_error_code,
                    s3_error_message = s3_error_message,
                    "S3 PutObject API call failed for s3://{}/{}: {} ({}).",
                    self.bucket,
                    key,
                    s3_error_code,
                    s3_error_message,
                );
                anyhow::anyhow!(e).context("aws_sdk_s3::client::put_object() failed.")
            })
    }

    async fn list_common_prefixes(&self, prefix: &str, delimiter: &str) -> Result<Vec<String>> {
        let client = self.client()?;
        let mut continuation_token: Option<String> = None;
        let mut prefixes = Vec::new();

        loop {
            let output = client
                .list_objects_v2()
                .set_request_payer(self.request_payer.clone())
                .bucket(&self.bucket)
                .prefix(prefix)
                .delimiter(delimiter)
                .set_continuation_token(continuation_token.clone())
                .send()
                .await
                .map_err(|e| {
                    let (s3_error_code, s3_error_message) = extract_sdk_error_details(&e);
                    tracing::error!(
                        bucket = self.bucket,
                        prefix = prefix,
                        s3_error_code = s3_error_code,
                        s3_error_message = s3_error_message,
                        "S3 ListObjectsV2 API call failed for s3://{}/{}: {} ({}).",
                        self.bucket,
                        prefix,
                        s3_error_code,
                        s3_error_message,
                    );
                    anyhow::anyhow!(e).context("aws_sdk_s3::client::list_objects_v2() failed.")
                })?;

            prefixes.extend(
                output
                    .common_prefixes()
                    .iter()
                    .filter_map(|common_prefix| common_prefix.prefix().map(String::from)),
            );

            if output.is_truncated() == Some(true) {
                continuation_token = output.next_continuation_token().map(String::from);
                if continuation_token.is_none() {
                    break;
                }
            } else {
                break;
            }
        }

        tracing::debug!(
            bucket = self.bucket,
            prefix = prefix,
            count = prefixes.len(),
            "Listed common prefixes."
        );

        Ok(prefixes)
    }

    async fn list_objects_page(&self, prefix: &str, max_keys: i32) -> Result<ObjectPage> {
        let output = self
            .client()?
            .list_objects_v2()
            .set_request_payer(self.request_payer.clone())
            .bucket(&self.bucket)
            .prefix(prefix)
            .max_keys(max_keys)
            .send()
            .await
            .map_err(|e| {
                let (s3_error_code, s3_error_message) = extract_sdk_error_details(&e);
                tracing::error!(
                    bucket = self.bucket,
                    prefix = prefix,
                    s3_error_code = s3_error_code,
                    s3_error_message = s3_error_message,
                    "S3 ListObjectsV2 API call failed for s3://{}/{}: {} ({}).",
                    self.bucket,
                    prefix,
                    s3_error_code,
                    s3_error_message,
                );
                anyhow::anyhow!(e).context("aws_sdk_s3::client::list_objects_v2() failed.")
            })?;

        Ok(ObjectPage {
            keys: output
                .contents()
                .iter()
                .filter_map(|object| object.key().map(String::from))
                .collect(),
            is_truncated: output.is_truncated() == Some(true),
        })
    }

    async fn delete_objects(&self, objects: Vec<ObjectIdentifier>) -> Result<DeleteObjectsOutput> {
        let client = self.client()?;
        let object_count = objects.len();

        let delete = Delete::builder()
            .set_objects(Some(objects))
            .build()
            .context("Failed to build Delete request")?;

        client
            .delete_objects()
            .set_request_payer(self.request_payer.clone())
            .bucket(&self.bucket)
            .delete(delete)
            .send()
            .await
            .map_err(|e| {
                let (s3_error_code, s3_error_message) = extract_sdk_error_details(&e);
                tracing::error!(
                    bucket = self.bucket,
                    object_count = object_count,
                    s3_error_code = s3_error_code,
                    s3_error_message = s3_error_message,
                    "S3 DeleteObjects API call failed for {} objects in s3://{}: {} ({}).",
                    object_count,
                    self.bucket,
                    s3_error_code,
                    s3_error_message,
                );
                anyhow::anyhow!(e).context("aws_sdk_s3::client::delete_objects() failed.")
            })
    }

    fn get_client(&self) -> Option<Arc<Client>> {
        self.client.clone()
    }
}
