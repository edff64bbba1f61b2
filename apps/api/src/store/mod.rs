//! Per-user append-only record storage.
//!
//! Records are keyed by [`RecordKey`]; `list_records` always returns entries
//! in lexical key order, which is chronological order. Nothing in this module
//! overwrites or deletes a record.

pub mod fs;
pub mod key;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::record::StructuredRecord;
use crate::models::user::UserProfile;

pub use fs::FsRecordStore;
pub use key::{RecordId, RecordKey};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unknown user {0}")]
    UnknownUser(Uuid),

    #[error("user {0} already exists")]
    UserExists(Uuid),

    #[error("record {0} already exists")]
    KeyExists(String),

    #[error("record {0} not found")]
    NotFound(String),

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed stored document: {0}")]
    Parse(#[from] serde_yaml::Error),
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn register_user(&self, profile: &UserProfile) -> Result<(), StoreError>;

    async fn load_user(&self, user_id: Uuid) -> Result<UserProfile, StoreError>;

    /// All `(key, raw_content)` pairs for a user, sorted by key.
    async fn list_records(&self, user_id: Uuid) -> Result<Vec<(String, String)>, StoreError>;

    /// Atomically adds a record. Fails with `KeyExists` rather than overwrite.
    async fn append_record(
        &self,
        user_id: Uuid,
        key: &RecordKey,
        content: &str,
    ) -> Result<(), StoreError>;

    async fn read_raw(&self, user_id: Uuid, key: &RecordKey) -> Result<String, StoreError>;

    async fn read_record(
        &self,
        user_id: Uuid,
        key: &RecordKey,
    ) -> Result<StructuredRecord, StoreError> {
        let raw = self.read_raw(user_id, key).await?;
        Ok(StructuredRecord::from_yaml(&raw)?)
    }
}

/// Parses listed records, dropping documents that no longer parse.
pub fn parse_listed(user_id: Uuid, raw: Vec<(String, String)>) -> Vec<(String, StructuredRecord)> {
    raw.into_iter()
        .filter_map(|(key, content)| match StructuredRecord::from_yaml(&content) {
            Ok(record) => Some((key, record)),
            Err(e) => {
                tracing::warn!("Skipping unreadable record {key} for user {user_id}: {e}");
                None
            }
        })
        .collect()
}
