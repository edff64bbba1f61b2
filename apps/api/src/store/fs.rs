use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, info};
use uuid::Uuid;

use super::{RecordKey, RecordStore, StoreError};
use crate::models::user::UserProfile;

const PROFILE_FILE: &str = "profile.yaml";
const RECORDS_DIR: &str = "records";
const RECORD_EXT: &str = ".yaml";

/// Directory-backed store:
///
/// ```text
/// <root>/users/<user_id>/profile.yaml
/// <root>/users/<user_id>/records/<key>.yaml
/// ```
#[derive(Debug, Clone)]
pub struct FsRecordStore {
    root: PathBuf,
}

impl FsRecordStore {
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(root.join("users")).await?;
        info!("Record store opened at {}", root.display());
        Ok(Self { root })
    }

    fn user_dir(&self, user_id: Uuid) -> PathBuf {
        self.root.join("users").join(user_id.to_string())
    }

    fn records_dir(&self, user_id: Uuid) -> PathBuf {
        self.user_dir(user_id).join(RECORDS_DIR)
    }

    fn record_path(&self, user_id: Uuid, key: &RecordKey) -> PathBuf {
        self.records_dir(user_id).join(format!("{key}{RECORD_EXT}"))
    }

    async fn ensure_user(&self, user_id: Uuid) -> Result<(), StoreError> {
        if fs::try_exists(self.user_dir(user_id).join(PROFILE_FILE)).await? {
            Ok(())
        } else {
            Err(StoreError::UnknownUser(user_id))
        }
    }
}

/// Writes `content` to a hidden sibling, then links it into place.
/// `hard_link` refuses to replace an existing file, so readers see either
/// nothing or the complete document.
async fn write_new_file(path: &Path, content: &str) -> std::io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("record");
    let tmp = dir.join(format!(".{name}.{}.tmp", Uuid::new_v4()));

    fs::write(&tmp, content).await?;
    let linked = fs::hard_link(&tmp, path).await;
    if let Err(e) = fs::remove_file(&tmp).await {
        debug!("Could not remove temp file {}: {e}", tmp.display());
    }
    linked
}

#[async_trait]
impl RecordStore for FsRecordStore {
    async fn register_user(&self, profile: &UserProfile) -> Result<(), StoreError> {
        let dir = self.user_dir(profile.user_id);
        match fs::create_dir(&dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(StoreError::UserExists(profile.user_id))
            }
            Err(e) => return Err(e.into()),
        }
        fs::create_dir_all(dir.join(RECORDS_DIR)).await?;

        let yaml = serde_yaml::to_string(profile)?;
        write_new_file(&dir.join(PROFILE_FILE), &yaml).await?;
        info!("Registered user {}", profile.user_id);
        Ok(())
    }

    async fn load_user(&self, user_id: Uuid) -> Result<UserProfile, StoreError> {
        match fs::read_to_string(self.user_dir(user_id).join(PROFILE_FILE)).await {
            Ok(raw) => Ok(serde_yaml::from_str(&raw)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::UnknownUser(user_id)),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_records(&self, user_id: Uuid) -> Result<Vec<(String, String)>, StoreError> {
        self.ensure_user(user_id).await?;

        let mut records = Vec::new();
        let mut dir = fs::read_dir(self.records_dir(user_id)).await?;
        while let Some(entry) = dir.next_entry().await? {
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            let Some(key) = name.strip_suffix(RECORD_EXT) else {
                continue;
            };
            let content = fs::read_to_string(entry.path()).await?;
            records.push((key.to_string(), content));
        }

        records.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(records)
    }

    async fn append_record(
        &self,
        user_id: Uuid,
        key: &RecordKey,
        content: &str,
    ) -> Result<(), StoreError> {
        self.ensure_user(user_id).await?;

        match write_new_file(&self.record_path(user_id, key), content).await {
            Ok(()) => {
                debug!("Appended record {key} for user {user_id}");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                Err(StoreError::KeyExists(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn read_raw(&self, user_id: Uuid, key: &RecordKey) -> Result<String, StoreError> {
        self.ensure_user(user_id).await?;

        match fs::read_to_string(self.record_path(user_id, key)).await {
            Ok(raw) => Ok(raw),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::NotFound(key.to_string())),
            Err(e) => Err(e.into()),
        }
    }
}
