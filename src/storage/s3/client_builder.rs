use aws_config::retry::RetryConfig;
use aws_config::stalled_stream_protection::StalledStreamProtectionConfig;
use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, ConfigLoader, Region};
use aws_sdk_s3::Client;
use aws_runtime::env_config::file::{EnvConfigFileKind, EnvConfigFiles};
use aws_sdk_s3::config::Credentials;
use std::time::Duration;

use crate::config::ClientConfig;
use crate::types::S3Credentials;

const CREDENTIALS_PROVIDER_NAME: &str = "s3backup";

impl ClientConfig {
    /// Build an S3 client from this configuration.
    ///
    /// Region, endpoint, retry, timeout and credential settings that are not
    /// given explicitly fall back to the SDK default provider chains.
    pub async fn create_client(&self) -> Client {
        let sdk_config = self.load_sdk_config().await;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(self.force_path_style)
            .accelerate(self.accelerate)
            .request_checksum_calculation(self.request_checksum_calculation)
            .build();

        Client::from_conf(s3_config)
    }

    async fn load_sdk_config(&self) -> aws_config::SdkConfig {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .retry_config(self.build_retry_config())
            .timeout_config(self.build_timeout_config())
            .stalled_stream_protection(self.build_stalled_stream_protection_config());

        if let Some(ref region) = self.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(ref endpoint_url) = self.endpoint_url {
            loader = loader.endpoint_url(endpoint_url);
        }

        loader = self.load_credentials(loader);

        loader.load().await
    }

    fn load_credentials(&self, loader: ConfigLoader) -> ConfigLoader {
        let loader = match self.profile_files() {
            Some(profile_files) => loader.profile_files(profile_files),
            None => loader,
        };

        match &self.credential {
            S3Credentials::Profile(profile_name) => loader.profile_name(profile_name),
            S3Credentials::Credentials { access_keys } => {
                loader.credentials_provider(Credentials::new(
                    access_keys.access_key.clone(),
                    access_keys.secret_access_key.clone(),
                    access_keys.session_token.clone(),
                    None,
                    CREDENTIALS_PROVIDER_NAME,
                ))
            }
            S3Credentials::FromEnvironment => loader,
        }
    }

    // Only overrides the SDK's own lookup when a file location was given.
    fn profile_files(&self) -> Option<EnvConfigFiles> {
        let location = &self.client_config_location;
        if location.aws_config_file.is_none() && location.aws_shared_credentials_file.is_none() {
            return None;
        }

        let mut builder = EnvConfigFiles::builder();
        builder = match location.aws_config_file {
            Some(ref path) => builder.with_file(EnvConfigFileKind::Config, path),
            None => builder.include_default_config_file(true),
        };
        builder = match location.aws_shared_credentials_file {
            Some(ref path) => builder.with_file(EnvConfigFileKind::Credentials, path),
            None => builder.include_default_credentials_file(true),
        };

        Some(builder.build())
    }

    fn build_retry_config(&self) -> RetryConfig {
        RetryConfig::standard()
            .with_max_attempts(self.retry_config.aws_max_attempts)
            .with_initial_backoff(Duration::from_millis(
                self.retry_config.initial_backoff_milliseconds,
            ))
    }

    fn build_timeout_config(&self) -> TimeoutConfig {
        let timeouts = &self.cli_timeout_config;

        let mut builder = TimeoutConfig::builder();
        builder
            .set_operation_timeout(timeouts.operation_timeout_milliseconds.map(Duration::from_millis))
            .set_operation_attempt_timeout(
                timeouts
                    .operation_attempt_timeout_milliseconds
                    .map(Duration::from_millis),
            )
            .set_connect_timeout(timeouts.connect_timeout_milliseconds.map(Duration::from_millis))
            .set_read_timeout(timeouts.read_timeout_milliseconds.map(Duration::from_millis));
        builder.build()
    }

    fn build_stalled_stream_protection_config(&self) -> StalledStreamProtectionConfig {
        if self.disable_stalled_stream_protection {
            StalledStreamProtectionConfig::disabled()
        } else {
            StalledStreamProtectionConfig::enabled().build()
        }
    }
}
