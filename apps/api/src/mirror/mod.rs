//! Best-effort remote copies of stored records.
//!
//! A mirror runs after the local append has succeeded. Its outcome is logged
//! and otherwise ignored: the local write is the record of truth.

pub mod s3;

use async_trait::async_trait;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::store::RecordKey;

pub use s3::S3Mirror;

#[async_trait]
pub trait RecordMirror: Send + Sync {
    async fn mirror(&self, user_id: Uuid, key: &RecordKey, content: &str) -> anyhow::Result<()>;
}

/// Used when no remote storage is configured.
pub struct NoopMirror;

#[async_trait]
impl RecordMirror for NoopMirror {
    async fn mirror(&self, _user_id: Uuid, _key: &RecordKey, _content: &str) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Remote object name for a record: `<user_id>/<key>.yaml`.
pub fn object_key(user_id: Uuid, key: &RecordKey) -> String {
    format!("{user_id}/{key}.yaml")
}

pub async fn mirror_best_effort(
    mirror: &dyn RecordMirror,
    user_id: Uuid,
    key: &RecordKey,
    content: &str,
) {
    match mirror.mirror(user_id, key, content).await {
        Ok(()) => debug!("Mirrored {}", object_key(user_id, key)),
        Err(e) => warn!("Mirror of {} failed: {e:#}", object_key(user_id, key)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_object_key_layout() {
        let user_id = Uuid::nil();
        let key = RecordKey::new(
            NaiveDate::from_ymd_opt(2024, 5, 1)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap(),
        )
        .with_revision(1);
        assert_eq!(
            object_key(user_id, &key),
            "00000000-0000-0000-0000-000000000000/20240501T1200.rev01.yaml"
        );
    }
}
