use crate::config::S3Config;
use crate::error::{TransferError, TransferResult};
use crate::ports::backend::{Backend, ContentSource};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;
use tokio::io::AsyncReadExt;

/// MIME type players expect for `.m3u8` playlists
pub const PLAYLIST_CONTENT_TYPE: &str = "application/vnd.apple.mpegurl";
/// MIME type for MPEG transport stream segments
pub const SEGMENT_CONTENT_TYPE: &str = "video/MP2T";

pub fn content_type_for(name: &str) -> &'static str {
    if name.ends_with(".m3u8") {
        PLAYLIST_CONTENT_TYPE
    } else {
        SEGMENT_CONTENT_TYPE
    }
}

/// Load the shared AWS configuration for one transfer profile. Explicit keys win over the
/// default credential chain.
pub async fn load_sdk_config(config: &S3Config) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = &config.region {
        loader = loader.region(Region::new(region.clone()));
    }
    if let (Some(key_id), Some(secret)) = (&config.access_key_id, &config.secret_access_key) {
        loader = loader.credentials_provider(Credentials::new(
            key_id.clone(),
            secret.clone(),
            None,
            None,
            "hls-transfer",
        ));
    }
    loader.load().await
}

/// S3 (or S3-compatible) bucket destination.
#[derive(Clone, Debug)]
pub struct S3Backend {
    client: Client,
    bucket: String,
    key_prefix: String,
}

impl S3Backend {
    pub fn new(client: Client, bucket: String, key_prefix: String) -> Self {
        Self {
            client,
            bucket,
            key_prefix,
        }
    }

    pub fn from_sdk_config(sdk_config: &SdkConfig, config: &S3Config) -> Self {
        let mut builder = aws_sdk_s3::config::Builder::from(sdk_config);
        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }
        Self::new(
            Client::from_conf(builder.build()),
            config.bucket.clone(),
            config.key_prefix.clone(),
        )
    }

    /// Object key for a destination name.
    pub fn key_for(&self, name: &str) -> String {
        object_key(&self.key_prefix, name)
    }
}

pub(crate) fn object_key(key_prefix: &str, name: &str) -> String {
    format!("{}{}", key_prefix, name)
}

#[async_trait]
impl Backend for S3Backend {
    fn kind(&self) -> &'static str {
        "s3"
    }

    async fn create_file(
        &self,
        name: &str,
        content: &mut dyn ContentSource,
    ) -> TransferResult<()> {
        let mut data = Vec::new();
        content.read_to_end(&mut data).await?;

        let key = self.key_for(name);
        let size = data.len();
        let start = std::time::Instant::now();

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type(content_type_for(name))
            .body(ByteStream::from(Bytes::from(data)))
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %key,
                    size_bytes = size,
                    "S3 upload failed"
                );
                TransferError::ObjectStorage(e.to_string())
            })?;

        tracing::debug!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );
        Ok(())
    }

    async fn try_delete_file(&self, name: &str) -> TransferResult<()> {
        // DeleteObject succeeds for keys that do not exist
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(self.key_for(name))
            .send()
            .await
            .map_err(|e| TransferError::ObjectStorage(e.to_string()))?;
        Ok(())
    }
}
