use async_trait::async_trait;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::primitives::ByteStream;
use uuid::Uuid;

use super::{object_key, RecordMirror};
use crate::config::S3Config;
use crate::store::RecordKey;

/// Mirrors records into an S3 bucket (AWS or a MinIO endpoint).
pub struct S3Mirror {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3Mirror {
    pub async fn connect(config: &S3Config) -> Self {
        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "dietlog-static",
        );

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials);
        if let Some(endpoint) = &config.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;

        Self {
            client: aws_sdk_s3::Client::new(&sdk_config),
            bucket: config.bucket.clone(),
        }
    }
}

#[async_trait]
impl RecordMirror for S3Mirror {
    async fn mirror(&self, user_id: Uuid, key: &RecordKey, content: &str) -> anyhow::Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(object_key(user_id, key))
            .body(ByteStream::from(content.as_bytes().to_vec()))
            .content_type("application/yaml")
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("S3 upload failed: {e}"))?;
        Ok(())
    }
}
