//! Shared E2E test infrastructure for s3backup-rs.
//!
//! Provides `TestHelper` for bucket management and object operations against
//! real AWS S3, plus scripted stand-ins for the rclone transfer and the Slack
//! notifier so that a full backup run can be driven without either. All
//! helpers use the `s3backup-e2e-test` AWS profile.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::Client;
use aws_sdk_s3::types::{
    BucketLocationConstraint, CreateBucketConfiguration, Delete, ObjectIdentifier,
};
use chrono::NaiveDate;
use s3backup_rs::config::args::build_config_from_args;
use s3backup_rs::{
    BackupOrchestrator, Config, Notifier, RunSummary, TransferOutput, Transferrer, create_storage,
};
use uuid::Uuid;

/// AWS profile used for all E2E tests.
const AWS_PROFILE: &str = "s3backup-e2e-test";

/// Location constraint fallback when the profile has no region.
const DEFAULT_REGION: &str = "us-east-1";

/// rclone statistics block as printed to stderr at the end of a copy.
pub const RCLONE_STATS_STDERR: &str = "\
2024/01/20 03:00:05 INFO  :
Transferred:        1.234 GB / 1.234 GB, 100%, 2.0 MB/s, ETA 0s
Errors:                 0
Checks:                12 / 12, 100%
Transferred:           42 / 42, 100%
Elapsed time:        3m4s
";

/// Deletes all objects and then the bucket when dropped, unless
/// [`BucketGuard::cleanup`] already did so.
pub struct BucketGuard {
    helper: Arc<TestHelper>,
    bucket: String,
    cleaned: bool,
}

impl BucketGuard {
    pub async fn cleanup(mut self) {
        self.helper.delete_bucket_cascade(&self.bucket).await;
        self.cleaned = true;
    }
}

impl Drop for BucketGuard {
    fn drop(&mut self) {
        if self.cleaned {
            return;
        }

        // The test runtime may be unwinding, so clean up on a fresh one.
        let helper = self.helper.clone();
        let bucket = self.bucket.clone();
        let _ = std::thread::spawn(move || {
            if let Ok(runtime) = tokio::runtime::Runtime::new() {
                runtime.block_on(async move { helper.delete_bucket_cascade(&bucket).await });
            }
        })
        .join();
    }
}

/// Shared test helper for E2E tests.
pub struct TestHelper {
    client: Client,
    region: String,
}

impl TestHelper {
    pub async fn new() -> Arc<Self> {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .profile_name(AWS_PROFILE)
            .load()
            .await;

        let region = sdk_config
            .region()
            .map(|r| r.to_string())
            .unwrap_or_else(|| DEFAULT_REGION.to_string());

        let client = Client::new(&sdk_config);

        Arc::new(Self { client, region })
    }

    pub fn bucket_guard(self: &Arc<Self>, bucket: &str) -> BucketGuard {
        BucketGuard {
            helper: Arc::clone(self),
            bucket: bucket.to_string(),
            cleaned: false,
        }
    }

    /// Unique bucket name like `s3backup-e2e-<uuid>`.
    pub fn generate_bucket_name(&self) -> String {
        format!("s3backup-e2e-{}", Uuid::new_v4())
    }

    // -----------------------------------------------------------------------
    // Bucket management
    // -----------------------------------------------------------------------

    pub async fn create_bucket(&self, bucket: &str) {
        let mut builder = self.client.create_bucket().bucket(bucket);

        // us-east-1 must NOT specify a location constraint
        if self.region != "us-east-1" {
            let constraint = BucketLocationConstraint::from(self.region.as_str());
            let config = CreateBucketConfiguration::builder()
                .location_constraint(constraint)
                .build();
            builder = builder.create_bucket_configuration(config);
        }

        builder
            .send()
            .await
            .unwrap_or_else(|e| panic!("Failed to create bucket {bucket}: {e}"));
    }

    pub async fn delete_bucket_cascade(&self, bucket: &str) {
        loop {
            let keys = match self.try_list_objects(bucket, "").await {
                Some(keys) if !keys.is_empty() => keys,
                _ => break,
            };

            for chunk in keys.chunks(1000) {
                let objects: Vec<ObjectIdentifier> = chunk
                    .iter()
                    .filter_map(|key| ObjectIdentifier::builder().key(key).build().ok())
                    .collect();
                let Ok(delete) = Delete::builder()
                    .set_objects(Some(objects))
                    .quiet(true)
                    .build()
                else {
                    return;
                };
                if self
                    .client
                    .delete_objects()
                    .bucket(bucket)
                    .delete(delete)
                    .send()
                    .await
                    .is_err()
                {
                    return;
                }
            }
        }

        let _ = self.client.delete_bucket().bucket(bucket).send().await;
    }

    // -----------------------------------------------------------------------
    // Object operations
    // -----------------------------------------------------------------------

    pub async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body.into())
            .send()
            .await
            .unwrap_or_else(|e| panic!("Failed to put object {key} in {bucket}: {e}"));
    }

    /// Upload `count` small objects named `<prefix>file-NNNNN.dat`, 50 at a time.
    pub async fn put_objects_under(self: &Arc<Self>, bucket: &str, prefix: &str, count: usize) {
        let keys: Vec<String> = (0..count)
            .map(|i| format!("{prefix}file-{i:05}.dat"))
            .collect();

        for chunk in keys.chunks(50) {
            let mut set = tokio::task::JoinSet::new();
            for key in chunk {
                let helper = Arc::clone(self);
                let bucket = bucket.to_string();
                let key = key.clone();
                set.spawn(async move { helper.put_object(&bucket, &key, vec![b'x'; 16]).await });
            }
            while let Some(result) = set.join_next().await {
                result.expect("Upload task panicked");
            }
        }
    }

    pub async fn get_object_text(&self, bucket: &str, key: &str) -> String {
        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .unwrap_or_else(|e| panic!("Failed to get object {key} from {bucket}: {e}"));
        let bytes = output
            .body
            .collect()
            .await
            .unwrap_or_else(|e| panic!("Failed to read object {key}: {e}"))
            .into_bytes();

        String::from_utf8_lossy(&bytes).into_owned()
    }

    pub async fn list_objects(&self, bucket: &str, prefix: &str) -> Vec<String> {
        self.try_list_objects(bucket, prefix)
            .await
            .unwrap_or_else(|| panic!("Failed to list objects in {bucket}/{prefix}"))
    }

    async fn try_list_objects(&self, bucket: &str, prefix: &str) -> Option<Vec<String>> {
        let mut keys = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut req = self.client.list_objects_v2().bucket(bucket).prefix(prefix);
            if let Some(ref token) = continuation_token {
                req = req.continuation_token(token);
            }

            let resp = req.send().await.ok()?;
            keys.extend(resp.contents().iter().filter_map(|obj| obj.key()).map(String::from));

            if resp.is_truncated() == Some(true) {
                continuation_token = resp.next_continuation_token().map(|s| s.to_string());
            } else {
                break;
            }
        }

        Some(keys)
    }

    pub async fn count_objects(&self, bucket: &str, prefix: &str) -> usize {
        self.list_objects(bucket, prefix).await.len()
    }

    // -----------------------------------------------------------------------
    // Run helpers
    // -----------------------------------------------------------------------

    /// Build a `Config` for `bucket` with the e2e profile and extra arguments.
    pub fn build_config(bucket: &str, extra_args: Vec<&str>) -> Config {
        let dest_path = format!("s3:{bucket}");
        let mut args: Vec<&str> = vec![
            "s3backup",
            "--bucket",
            bucket,
            "--src-path",
            "local:/srv/data",
            "--dest-path",
            &dest_path,
        ];
        if !extra_args.iter().any(|arg| arg.starts_with("--profile")) {
            args.extend(["--profile", AWS_PROFILE]);
        }
        args.extend(extra_args);

        build_config_from_args(args)
            .unwrap_or_else(|e| panic!("Failed to build config from args: {e}"))
    }

    /// Run one backup against the real bucket with a scripted transfer.
    pub async fn run_backup(
        config: Config,
        transferrer: ScriptedTransferrer,
        today: NaiveDate,
    ) -> (RunSummary, Vec<String>) {
        let notifier = RecordingNotifier::default();
        let storage = create_storage(&config).await;

        let summary = BackupOrchestrator::new(
            config,
            storage,
            Box::new(transferrer),
            Box::new(notifier.clone()),
        )
        .run_on(today)
        .await;

        (summary, notifier.messages())
    }
}

/// Transfer stand-in that reports a fixed rclone result without copying.
#[derive(Clone)]
pub struct ScriptedTransferrer {
    output: TransferOutput,
}

impl ScriptedTransferrer {
    pub fn succeeding(stderr: &str) -> Self {
        ScriptedTransferrer {
            output: TransferOutput {
                success: true,
                exit_code: Some(0),
                command: "rclone copy local:/srv/data".to_string(),
                stderr: stderr.to_string(),
                ..Default::default()
            },
        }
    }

    pub fn failing(exit_code: i32, stderr: &str) -> Self {
        ScriptedTransferrer {
            output: TransferOutput {
                success: false,
                exit_code: Some(exit_code),
                command: "rclone copy local:/srv/data".to_string(),
                stderr: stderr.to_string(),
                ..Default::default()
            },
        }
    }
}

#[async_trait]
impl Transferrer for ScriptedTransferrer {
    async fn transfer(&self, _backup_name: &str) -> Result<TransferOutput> {
        Ok(self.output.clone())
    }
}

#[derive(Clone, Default)]
pub struct RecordingNotifier {
    messages: Arc<Mutex<Vec<String>>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, text: &str) {
        self.messages.lock().unwrap().push(text.to_string());
    }
}

/// Default timeout for E2E tests (5 minutes).
pub const E2E_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(300);

/// Wraps an async E2E test body with a timeout.
#[macro_export]
macro_rules! e2e_timeout {
    ($body:expr) => {
        tokio::time::timeout(common::E2E_TIMEOUT, $body)
            .await
            .expect("E2E test timed out")
    };
}
