use std::time::Duration;

use anyhow::Context;
use aws_config::{defaults, BehaviorVersion};
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    config::{Builder as S3ConfigBuilder, Region},
    presigning::PresigningConfig,
    Client,
};
use aws_smithy_types::byte_stream::ByteStream;
use async_trait::async_trait;
use bytes::Bytes;
use tracing::{info, warn};

use crate::config::StorageConfig;

/// Object storage holding meal photos. Only keys are persisted in the database.
#[async_trait]
pub trait StorageClient: Send + Sync {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()>;
    async fn delete_object(&self, key: &str) -> anyhow::Result<()>;
    async fn presign_get(&self, key: &str, seconds: u64) -> anyhow::Result<String>;
}

/// S3 or MinIO bucket behind [`StorageClient`].
#[derive(Clone)]
pub struct S3PhotoStore {
    client: Client,
    bucket: String,
}

async fn s3_client(cfg: &StorageConfig) -> Client {
    let creds = Credentials::new(&cfg.access_key, &cfg.secret_key, None, None, "memberfit-env");
    let shared = defaults(BehaviorVersion::latest())
        .region(Region::new(cfg.region.clone()))
        .credentials_provider(creds)
        .load()
        .await;

    // MinIO only understands path-style addressing
    let conf = S3ConfigBuilder::from(&shared)
        .endpoint_url(&cfg.endpoint)
        .force_path_style(true)
        .build();
    Client::from_conf(conf)
}

impl S3PhotoStore {
    pub async fn connect(cfg: &StorageConfig) -> anyhow::Result<Self> {
        let store = Self {
            client: s3_client(cfg).await,
            bucket: cfg.bucket.clone(),
        };
        store.ensure_bucket().await?;
        Ok(store)
    }

    /// Creates the photo bucket on first start against an empty MinIO.
    async fn ensure_bucket(&self) -> anyhow::Result<()> {
        if self
            .client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .is_ok()
        {
            return Ok(());
        }
        warn!(bucket = %self.bucket, "photo bucket missing, creating it");
        self.client
            .create_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .with_context(|| format!("create bucket {}", self.bucket))?;
        info!(bucket = %self.bucket, "photo bucket created");
        Ok(())
    }
}

#[async_trait]
impl StorageClient for S3PhotoStore {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()> {
        let req = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body));
        req.send()
            .await
            .with_context(|| format!("upload {key} to {}", self.bucket))?;
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> anyhow::Result<()> {
        let req = self.client.delete_object().bucket(&self.bucket).key(key);
        req.send()
            .await
            .with_context(|| format!("delete {key} from {}", self.bucket))?;
        Ok(())
    }

    async fn presign_get(&self, key: &str, seconds: u64) -> anyhow::Result<String> {
        let ttl = PresigningConfig::expires_in(Duration::from_secs(seconds))
            .context("presign ttl")?;
        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(ttl)
            .await
            .with_context(|| format!("presign {key}"))?;
        Ok(presigned.uri().to_string())
    }
}
