//! S3-compatible storage client.

use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{Builder, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};

/// Default endpoint: the GCS S3-interoperability API.
const DEFAULT_ENDPOINT: &str = "https://storage.googleapis.com";

/// Configuration for the storage client.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// S3 API endpoint
    pub endpoint_url: String,
    /// Access key ID (GCS HMAC key when using the interop endpoint)
    pub access_key_id: String,
    /// Secret access key
    pub secret_access_key: String,
    /// Bucket name
    pub bucket: String,
    /// Region ("auto" works for the interop endpoint)
    pub region: String,
    /// Base URL for public object links
    pub public_base_url: String,
}

impl StorageConfig {
    /// Create config from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        let bucket = std::env::var("STORAGE_BUCKET")
            .map_err(|_| StorageError::config_error("STORAGE_BUCKET not set"))?;
        let endpoint_url =
            std::env::var("STORAGE_ENDPOINT_URL").unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());
        let public_base_url = std::env::var("STORAGE_PUBLIC_BASE_URL")
            .unwrap_or_else(|_| format!("{}/{}", DEFAULT_ENDPOINT, bucket));

        Ok(Self {
            endpoint_url,
            access_key_id: std::env::var("STORAGE_ACCESS_KEY_ID")
                .map_err(|_| StorageError::config_error("STORAGE_ACCESS_KEY_ID not set"))?,
            secret_access_key: std::env::var("STORAGE_SECRET_ACCESS_KEY")
                .map_err(|_| StorageError::config_error("STORAGE_SECRET_ACCESS_KEY not set"))?,
            bucket,
            region: std::env::var("STORAGE_REGION").unwrap_or_else(|_| "auto".to_string()),
            public_base_url,
        })
    }
}

/// Object storage client for uploaded videos.
#[derive(Clone)]
pub struct StorageClient {
    client: Client,
    bucket: String,
    public_base_url: String,
}

impl StorageClient {
    /// Create a new client from configuration.
    pub async fn new(config: StorageConfig) -> StorageResult<Self> {
        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "vtrans",
        );

        let sdk_config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(&config.endpoint_url)
            .region(Region::new(config.region))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        let client = Client::from_conf(sdk_config);

        Ok(Self {
            client,
            bucket: config.bucket,
            public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create from environment variables.
    pub async fn from_env() -> StorageResult<Self> {
        let config = StorageConfig::from_env()?;
        Self::new(config).await
    }

    /// The bucket this client writes to.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Public URL for an object key.
    pub fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url, key)
    }

    /// `gs://` URI for an object key, as the transcoder consumes it.
    pub fn object_uri(&self, key: &str) -> String {
        format!("gs://{}/{}", self.bucket, key)
    }

    /// Upload raw bytes under a key.
    pub async fn upload_bytes(
        &self,
        data: Vec<u8>,
        key: &str,
        content_type: &str,
    ) -> StorageResult<()> {
        debug!("Uploading {} bytes to {}", data.len(), key);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(format!("{}: {}", key, e)))?;

        info!("Uploaded {}", key);
        Ok(())
    }

    /// Delete an object. Deleting a missing key succeeds (S3 semantics),
    /// which keeps compensating cleanup idempotent.
    pub async fn delete_object(&self, key: &str) -> StorageResult<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::delete_failed(format!("{}: {}", key, e)))?;

        debug!("Deleted {}", key);
        Ok(())
    }

    /// Check whether an object exists.
    pub async fn exists(&self, key: &str) -> StorageResult<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                let msg = e.to_string();
                if msg.contains("NotFound") || msg.contains("NoSuchKey") {
                    Ok(false)
                } else {
                    Err(StorageError::unavailable(format!("{}: {}", key, msg)))
                }
            }
        }
    }

    /// Verify the bucket is reachable with the configured credentials.
    pub async fn check_connectivity(&self) -> StorageResult<()> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| StorageError::unavailable(format!("{}: {}", self.bucket, e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn test_client_blocking(config: StorageConfig) -> StorageClient {
        tokio_test::block_on(StorageClient::new(config)).unwrap()
    }

    fn test_config() -> StorageConfig {
        StorageConfig {
            endpoint_url: DEFAULT_ENDPOINT.to_string(),
            access_key_id: "key".to_string(),
            secret_access_key: "secret".to_string(),
            bucket: "videos".to_string(),
            region: "auto".to_string(),
            public_base_url: "https://storage.googleapis.com/videos/".to_string(),
        }
    }

    #[test]
    fn test_public_url_composition() {
        let client = test_client_blocking(test_config());
        assert_eq!(
            client.public_url("abc-cat.mp4"),
            "https://storage.googleapis.com/videos/abc-cat.mp4"
        );
    }

    #[test]
    fn test_object_uri_composition() {
        let client = test_client_blocking(test_config());
        assert_eq!(client.object_uri("abc-cat.mp4"), "gs://videos/abc-cat.mp4");
        assert_eq!(client.object_uri("output/abc/"), "gs://videos/output/abc/");
    }

    #[test]
    #[serial]
    fn test_config_from_env_requires_bucket() {
        std::env::remove_var("STORAGE_BUCKET");
        std::env::set_var("STORAGE_ACCESS_KEY_ID", "k");
        std::env::set_var("STORAGE_SECRET_ACCESS_KEY", "s");
        assert!(StorageConfig::from_env().is_err());
        std::env::remove_var("STORAGE_ACCESS_KEY_ID");
        std::env::remove_var("STORAGE_SECRET_ACCESS_KEY");
    }

    #[test]
    #[serial]
    fn test_config_from_env_defaults() {
        std::env::set_var("STORAGE_BUCKET", "videos");
        std::env::set_var("STORAGE_ACCESS_KEY_ID", "k");
        std::env::set_var("STORAGE_SECRET_ACCESS_KEY", "s");
        std::env::remove_var("STORAGE_ENDPOINT_URL");
        std::env::remove_var("STORAGE_PUBLIC_BASE_URL");
        std::env::remove_var("STORAGE_REGION");

        let config = StorageConfig::from_env().unwrap();
        assert_eq!(config.endpoint_url, DEFAULT_ENDPOINT);
        assert_eq!(
            config.public_base_url,
            "https://storage.googleapis.com/videos"
        );
        assert_eq!(config.region, "auto");

        std::env::remove_var("STORAGE_BUCKET");
        std::env::remove_var("STORAGE_ACCESS_KEY_ID");
        std::env::remove_var("STORAGE_SECRET_ACCESS_KEY");
    }
}
