use super::s3::{object_key, S3Backend};
use crate::config::CdnConfig;
use crate::error::{TransferError, TransferResult};
use crate::ports::backend::{Backend, BackendCapabilities, ContentSource};
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_cloudfront::types::{InvalidationBatch, Paths};
use aws_sdk_cloudfront::Client;
use uuid::Uuid;

/// S3 bucket served through a CloudFront distribution. Uploads go to the bucket, invalidation
/// purges the distribution's edge caches.
#[derive(Clone, Debug)]
pub struct CdnBackend {
    storage: S3Backend,
    client: Client,
    distribution_id: String,
    key_prefix: String,
}

impl CdnBackend {
    pub fn new(storage: S3Backend, client: Client, distribution_id: String, key_prefix: String) -> Self {
        Self {
            storage,
            client,
            distribution_id,
            key_prefix,
        }
    }

    pub fn from_sdk_config(sdk_config: &SdkConfig, config: &CdnConfig) -> Self {
        Self::new(
            S3Backend::from_sdk_config(sdk_config, &config.storage),
            Client::new(sdk_config),
            config.distribution_id.clone(),
            config.storage.key_prefix.clone(),
        )
    }
}

/// Distribution path of an object key; CloudFront paths start with `/`.
pub(crate) fn invalidation_path(key_prefix: &str, name: &str) -> String {
    format!("/{}", object_key(key_prefix, name).trim_start_matches('/'))
}

#[async_trait]
impl Backend for CdnBackend {
    fn kind(&self) -> &'static str {
        "cf"
    }

    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities { invalidate: true }
    }

    async fn create_file(
        &self,
        name: &str,
        content: &mut dyn ContentSource,
    ) -> TransferResult<()> {
        self.storage.create_file(name, content).await
    }

    async fn try_delete_file(&self, name: &str) -> TransferResult<()> {
        self.storage.try_delete_file(name).await
    }

    async fn invalidate(&self, name: &str) -> TransferResult<()> {
        let path = invalidation_path(&self.key_prefix, name);
        let paths = Paths::builder()
            .quantity(1)
            .items(path.clone())
            .build()
            .map_err(|e| TransferError::Invalidation(e.to_string()))?;
        let batch = InvalidationBatch::builder()
            .paths(paths)
            .caller_reference(Uuid::new_v4().to_string())
            .build()
            .map_err(|e| TransferError::Invalidation(e.to_string()))?;

        let output = self
            .client
            .create_invalidation()
            .distribution_id(&self.distribution_id)
            .invalidation_batch(batch)
            .send()
            .await
            .map_err(|e| TransferError::Invalidation(e.to_string()))?;

        tracing::debug!(
            distribution = %self.distribution_id,
            path = %path,
            invalidation_id = ?output.invalidation().map(|i| i.id()),
            "CloudFront invalidation created"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalidation_path() {
        assert_eq!(
            invalidation_path("live/", "index_ep.m3u8"),
            "/live/index_ep.m3u8"
        );
        assert_eq!(invalidation_path("", "index_ep.m3u8"), "/index_ep.m3u8");
        assert_eq!(invalidation_path("/abs/", "a.m3u8"), "/abs/a.m3u8");
    }
}
