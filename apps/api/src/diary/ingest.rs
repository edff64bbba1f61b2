//! Write path: allocate a free key, append, then mirror.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::mirror::{mirror_best_effort, RecordMirror};
use crate::models::record::{RecordVersion, StructuredRecord};
use crate::store::key::MAX_QUALIFIER;
use crate::store::{RecordKey, RecordStore, StoreError};

/// Fields a correction may not touch.
const RESERVED_FIELDS: &[&str] = &["entry_type", "version", "revision_of", "revised_time"];

#[derive(Debug, Clone)]
pub struct Stored {
    pub key: RecordKey,
    pub record: StructuredRecord,
    pub yaml: String,
}

/// A correction to apply on top of the latest version of a record.
#[derive(Debug, Clone, Default)]
pub struct RevisionPatch {
    pub content: Option<String>,
    pub fields: BTreeMap<String, Value>,
}

impl RevisionPatch {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.content.is_none() && self.fields.is_empty() {
            return Err(AppError::Validation(
                "a revision needs content or fields".to_string(),
            ));
        }
        if self
            .content
            .as_deref()
            .is_some_and(|c| c.trim().is_empty())
        {
            return Err(AppError::Validation("content cannot be empty".to_string()));
        }
        if let Some(name) = self
            .fields
            .keys()
            .find(|k| RESERVED_FIELDS.contains(&k.as_str()))
        {
            return Err(AppError::Validation(format!("field '{name}' cannot be revised")));
        }
        Ok(())
    }

    fn apply(&self, record: &mut StructuredRecord) {
        for (name, value) in &self.fields {
            record.set(name, value.clone());
        }
        if let Some(content) = &self.content {
            record.set("content", content.as_str());
        }
    }
}

/// Appends a new record at `at`, taking the next free same-minute slot.
pub async fn append_new(
    store: &dyn RecordStore,
    mirror: &dyn RecordMirror,
    user_id: Uuid,
    at: NaiveDateTime,
    record: StructuredRecord,
) -> Result<Stored, AppError> {
    let base = RecordKey::new(at);
    let yaml = record.to_yaml().map_err(anyhow::Error::from)?;

    for seq in 0..=MAX_QUALIFIER {
        let key = base.with_seq(seq);
        match store.append_record(user_id, &key, &yaml).await {
            Ok(()) => {
                info!("Stored {} record {key} for user {user_id}", record.entry_type);
                mirror_best_effort(mirror, user_id, &key, &yaml).await;
                return Ok(Stored { key, record, yaml });
            }
            Err(StoreError::KeyExists(_)) => continue,
            Err(e) => return Err(e.into()),
        }
    }

    Err(AppError::Conflict(format!("no free key left at {base}")))
}

/// Appends a correction of `target` as the next revision of the same record.
///
/// The original and earlier revisions are left untouched; the new revision
/// starts from the latest existing version so earlier corrections carry over.
pub async fn append_revision(
    store: &dyn RecordStore,
    mirror: &dyn RecordMirror,
    user_id: Uuid,
    target: RecordKey,
    patch: &RevisionPatch,
    now: DateTime<FixedOffset>,
) -> Result<Stored, AppError> {
    patch.validate()?;

    let original_key = target.with_revision(0);
    // 404 on a missing original, before anything is written.
    store.read_record(user_id, &original_key).await?;

    let latest_revision = store
        .list_records(user_id)
        .await?
        .iter()
        .filter_map(|(k, _)| k.parse::<RecordKey>().ok())
        .filter(|k| k.id() == original_key.id())
        .map(|k| k.revision)
        .max()
        .unwrap_or(0);

    let mut record = store
        .read_record(user_id, &original_key.with_revision(latest_revision))
        .await?;
    patch.apply(&mut record);
    record.version = RecordVersion::Updated;
    record.set("revision_of", original_key.to_string());
    record.set("revised_time", now.to_rfc3339());
    let yaml = record.to_yaml().map_err(anyhow::Error::from)?;

    for revision in latest_revision.saturating_add(1)..=MAX_QUALIFIER {
        let key = original_key.with_revision(revision);
        match store.append_record(user_id, &key, &yaml).await {
            Ok(()) => {
                info!("Stored revision {key} for user {user_id}");
                mirror_best_effort(mirror, user_id, &key, &yaml).await;
                return Ok(Stored { key, record, yaml });
            }
            Err(StoreError::KeyExists(_)) => continue,
            Err(e) => return Err(e.into()),
        }
    }

    Err(AppError::Conflict(format!(
        "record {original_key} has reached the revision limit"
    )))
}
