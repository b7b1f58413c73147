//! Report upload and completion notifications.
//!
//! The [`Publisher`] uploads a finished report to an object store, presigns a
//! download link and posts a markdown message to a chat webhook. Both ends sit
//! behind traits so the pipeline can run without network access.

use crate::config::{ConfigError, PublishConfig};
use serde_json::json;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while publishing a report
#[derive(Error, Debug)]
pub enum PublishError {
    #[error("Failed to read report: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Webhook request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Webhook returned status {0}")]
    WebhookStatus(u16),

    #[error("Upload failed: {0}")]
    UploadError(String),

    #[error("Failed to presign download URL: {0}")]
    PresignError(String),

    #[error("Invalid publish configuration: {0}")]
    ConfigError(#[from] ConfigError),

    #[error("Object store support is not compiled in (enable the `object-store` feature)")]
    ObjectStoreUnavailable,
}

/// Remote storage for report files
pub trait ObjectStore {
    /// Store `body` under `key`
    ///
    /// # Errors
    ///
    /// Returns an error if the upload fails.
    fn put(&self, key: &str, body: Vec<u8>) -> Result<(), PublishError>;

    /// Time-limited download URL for `key`
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be signed.
    fn presigned_url(&self, key: &str, expiry: Duration) -> Result<String, PublishError>;
}

/// Delivery of markdown messages
pub trait Notifier {
    /// Send one markdown message
    ///
    /// # Errors
    ///
    /// Returns an error if the message is not accepted.
    fn notify(&self, markdown: &str) -> Result<(), PublishError>;
}

/// Chat webhook accepting `{"msgtype": "markdown", ...}` payloads
pub struct WebhookNotifier {
    url: String,
    client: reqwest::blocking::Client,
}

impl WebhookNotifier {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::blocking::Client::new(),
        }
    }
}

/// Webhook body for a markdown message
#[must_use]
pub fn webhook_payload(content: &str) -> serde_json::Value {
    json!({
        "msgtype": "markdown",
        "markdown": { "content": content }
    })
}

impl Notifier for WebhookNotifier {
    fn notify(&self, markdown: &str) -> Result<(), PublishError> {
        let response = self
            .client
            .post(&self.url)
            .json(&webhook_payload(markdown))
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(PublishError::WebhookStatus(status.as_u16()));
        }
        tracing::info!("Webhook message sent");
        Ok(())
    }
}

/// Message announcing a published report
#[must_use]
pub fn success_message(url: &str, user: &str) -> String {
    format!(
        "# 🥳 Auto Performance Test Done\n\nSee summary report via [report]({url})\n{}",
        mention(user)
    )
}

/// Message announcing a failed run
#[must_use]
pub fn failure_message(reason: &str, user: &str) -> String {
    format!(
        "# 😭 Auto Performance Test Failed\n\nReason: {reason}\n{}",
        mention(user)
    )
}

/// Trailing mention line; empty when no recipient is known
fn mention(user: &str) -> String {
    let user = user.trim();
    if user.is_empty() {
        String::new()
    } else {
        format!("\n<@{user}>\n")
    }
}

/// Uploads reports and notifies about the outcome
pub struct Publisher {
    store: Option<Box<dyn ObjectStore>>,
    notifier: Option<Box<dyn Notifier>>,
    key_prefix: String,
    url_expiry: Duration,
}

impl Publisher {
    /// A publisher that does nothing
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            store: None,
            notifier: None,
            key_prefix: String::new(),
            url_expiry: Duration::ZERO,
        }
    }

    /// Assemble a publisher from explicit collaborators
    #[must_use]
    pub fn new(
        store: Option<Box<dyn ObjectStore>>,
        notifier: Option<Box<dyn Notifier>>,
        config: &PublishConfig,
    ) -> Self {
        Self {
            store,
            notifier,
            key_prefix: config.key_prefix.clone(),
            url_expiry: Duration::from_secs(config.url_expiry_secs),
        }
    }

    /// Build the S3 store and webhook notifier described by `config`.
    ///
    /// A config with `enabled: false` yields a disabled publisher.
    ///
    /// # Errors
    ///
    /// Returns an error if required fields are missing or the object store
    /// cannot be set up.
    pub fn from_config(config: &PublishConfig) -> Result<Self, PublishError> {
        if !config.enabled {
            tracing::debug!("Publishing disabled");
            return Ok(Self::disabled());
        }
        config.validate()?;

        let store = build_store(config)?;
        let notifier = config
            .webhook_url
            .as_ref()
            .map(|url| Box::new(WebhookNotifier::new(url.clone())) as Box<dyn Notifier>);

        Ok(Self::new(Some(store), notifier, config))
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    fn object_key(&self, file_name: &str) -> String {
        format!("{}/{file_name}", self.key_prefix.trim_end_matches('/'))
    }

    /// Upload the report at `path`, then announce its download link to `user`.
    ///
    /// Returns the presigned URL, or `None` when publishing is disabled.
    /// A failed notification is logged and does not fail the upload.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, uploaded or signed.
    pub fn publish_report(&self, path: &Path, user: &str) -> Result<Option<String>, PublishError> {
        let Some(store) = &self.store else {
            return Ok(None);
        };

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let key = self.object_key(&file_name);

        let body = std::fs::read(path)?;
        store.put(&key, body)?;
        let url = store.presigned_url(&key, self.url_expiry)?;
        tracing::info!(%key, "Report uploaded");

        if let Some(notifier) = &self.notifier {
            if let Err(e) = notifier.notify(&success_message(&url, user)) {
                tracing::warn!(error = %e, "Failed to send completion message");
            }
        }

        Ok(Some(url))
    }

    /// Tell `user` that the run failed
    ///
    /// # Errors
    ///
    /// Returns an error if the notifier rejects the message.
    pub fn notify_failure(&self, reason: &str, user: &str) -> Result<(), PublishError> {
        match (&self.store, &self.notifier) {
            (Some(_), Some(notifier)) => notifier.notify(&failure_message(reason, user)),
            _ => Ok(()),
        }
    }
}

#[cfg(feature = "object-store")]
fn build_store(config: &PublishConfig) -> Result<Box<dyn ObjectStore>, PublishError> {
    Ok(Box::new(s3::S3Store::new(config)?))
}

#[cfg(not(feature = "object-store"))]
fn build_store(_config: &PublishConfig) -> Result<Box<dyn ObjectStore>, PublishError> {
    Err(PublishError::ObjectStoreUnavailable)
}

#[cfg(feature = "object-store")]
pub mod s3 {
    //! S3-compatible object store backed by `aws-sdk-s3`.

    use super::{ObjectStore, PublishError};
    use crate::config::PublishConfig;
    use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
    use aws_sdk_s3::error::DisplayErrorContext;
    use aws_sdk_s3::presigning::PresigningConfig;
    use aws_sdk_s3::primitives::ByteStream;
    use std::time::Duration;

    /// Bucket access with static credentials.
    ///
    /// The SDK is async; calls are driven on a private current-thread runtime.
    pub struct S3Store {
        client: aws_sdk_s3::Client,
        bucket: String,
        runtime: tokio::runtime::Runtime,
    }

    impl S3Store {
        /// Connect to the bucket described by `config`
        ///
        /// # Errors
        ///
        /// Returns an error if the runtime cannot be started.
        pub fn new(config: &PublishConfig) -> Result<Self, PublishError> {
            let credentials = Credentials::new(
                config.access_key.clone(),
                config.secret_key.clone(),
                None,
                None,
                "perf-visualizer",
            );

            let mut builder = aws_sdk_s3::Config::builder()
                .behavior_version(BehaviorVersion::latest())
                .region(Region::new(config.region.clone()))
                .credentials_provider(credentials);
            if let Some(endpoint) = &config.endpoint {
                builder = builder.endpoint_url(endpoint.clone()).force_path_style(true);
            }

            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;

            Ok(Self {
                client: aws_sdk_s3::Client::from_conf(builder.build()),
                bucket: config.bucket.clone(),
                runtime,
            })
        }
    }

    impl ObjectStore for S3Store {
        fn put(&self, key: &str, body: Vec<u8>) -> Result<(), PublishError> {
            let request = self
                .client
                .put_object()
                .bucket(&self.bucket)
                .key(key)
                .body(ByteStream::from(body))
                .send();

            self.runtime
                .block_on(request)
                .map_err(|e| PublishError::UploadError(DisplayErrorContext(&e).to_string()))?;
            Ok(())
        }

        fn presigned_url(&self, key: &str, expiry: Duration) -> Result<String, PublishError> {
            let presigning = PresigningConfig::expires_in(expiry)
                .map_err(|e| PublishError::PresignError(e.to_string()))?;

            let request = self
                .client
                .get_object()
                .bucket(&self.bucket)
                .key(key)
                .presigned(presigning);

            let presigned = self
                .runtime
                .block_on(request)
                .map_err(|e| PublishError::PresignError(DisplayErrorContext(&e).to_string()))?;
            Ok(presigned.uri().to_string())
        }
    }
}
