//! Axum route handlers for the diary API.

use std::collections::BTreeMap;

use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use bytes::Bytes;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::diary::advice;
use crate::diary::capture_time::{extract_capture_time, CaptureTime};
use crate::diary::health_export::read_export_zip;
use crate::diary::ingest::{append_new, append_revision, RevisionPatch, Stored};
use crate::diary::summary::{select_window, DayWindow, RevisionPolicy};
use crate::errors::AppError;
use crate::models::record::{EntryType, StructuredRecord};
use crate::state::AppState;
use crate::store::{parse_listed, RecordKey};

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TextLogRequest {
    pub user_id: Uuid,
    #[serde(default)]
    pub entry_type: Option<String>,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct RevisionRequest {
    pub user_id: Uuid,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct SummaryRequest {
    pub user_id: Uuid,
    /// `YYYY-MM-DD`
    pub date: String,
    #[serde(default)]
    pub policy: RevisionPolicy,
}

#[derive(Debug, Serialize)]
pub struct LogResponse {
    pub key: String,
    pub record: StructuredRecord,
    pub yaml: String,
    pub advice: String,
}

impl LogResponse {
    fn new(stored: Stored, advice: String) -> Self {
        Self {
            key: stored.key.to_string(),
            record: stored.record,
            yaml: stored.yaml,
            advice,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SummaryEntry {
    pub key: String,
    pub record: StructuredRecord,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub date: NaiveDate,
    pub window_start: chrono::NaiveDateTime,
    pub window_end: chrono::NaiveDateTime,
    pub policy: RevisionPolicy,
    pub entries: Vec<SummaryEntry>,
    pub meals: usize,
    pub steps: u64,
    /// Selected records as one multi-document YAML stream.
    pub yaml: String,
    pub advice: String,
}

struct Upload {
    user_id: Uuid,
    filename: Option<String>,
    bytes: Bytes,
}

async fn read_upload(mut multipart: Multipart) -> Result<Upload, AppError> {
    let bad_form = |e: axum::extract::multipart::MultipartError| AppError::Validation(e.body_text());

    let mut user_id = None;
    let mut file = None;
    while let Some(field) = multipart.next_field().await.map_err(bad_form)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "user_id" => {
                let text = field.text().await.map_err(bad_form)?;
                let id = Uuid::parse_str(text.trim())
                    .map_err(|_| AppError::Validation(format!("invalid user_id '{text}'")))?;
                user_id = Some(id);
            }
            "file" => {
                let filename = field.file_name().map(str::to_string);
                let bytes = field.bytes().await.map_err(bad_form)?;
                file = Some((filename, bytes));
            }
            _ => {}
        }
    }

    let user_id =
        user_id.ok_or_else(|| AppError::Validation("missing form field 'user_id'".to_string()))?;
    let (filename, bytes) =
        file.ok_or_else(|| AppError::Validation("missing form field 'file'".to_string()))?;
    Ok(Upload {
        user_id,
        filename,
        bytes,
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/logs
pub async fn handle_text_log(
    State(state): State<AppState>,
    Json(req): Json<TextLogRequest>,
) -> Result<Json<LogResponse>, AppError> {
    if let Some(entry_type) = req.entry_type.as_deref() {
        if entry_type != EntryType::Text.as_str() {
            return Err(AppError::Validation(format!(
                "entry_type '{entry_type}' cannot be submitted as text; use the photo or health export endpoints"
            )));
        }
    }
    if req.content.trim().is_empty() {
        return Err(AppError::Validation("content cannot be empty".to_string()));
    }

    let now = state.now_local();
    let record = StructuredRecord::new(EntryType::Text)
        .with_field("content", req.content)
        .with_field("posted_time", now.to_rfc3339());

    let stored = append_new(
        state.store.as_ref(),
        state.mirror.as_ref(),
        req.user_id,
        now.naive_local(),
        record,
    )
    .await?;

    Ok(Json(LogResponse::new(stored, advice::for_text_log())))
}

/// POST /api/v1/logs/photo
///
/// Keys the record by the photo's capture time when it has one, so the meal
/// lands in the day it was eaten rather than the day it was uploaded.
pub async fn handle_photo_log(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<LogResponse>, AppError> {
    let upload = read_upload(multipart).await?;
    let now = state.now_local();
    let capture = extract_capture_time(&upload.bytes);

    let mut record = StructuredRecord::new(EntryType::Photo)
        .with_field("filename", upload.filename.unwrap_or_default())
        .with_field("photo_metadata", capture.label())
        .with_field("posted_time", now.to_rfc3339());
    match &capture {
        CaptureTime::Found(taken) => record.set("photo_taken", taken.as_str()),
        CaptureTime::Failed(reason) => {
            tracing::warn!("Photo metadata unreadable for user {}: {reason}", upload.user_id);
            record.set("metadata_error", reason.as_str());
        }
        CaptureTime::NotPresent | CaptureTime::MetadataNoTimestamp => {}
    }

    let at = capture
        .as_local_datetime()
        .unwrap_or_else(|| now.naive_local());
    let stored = append_new(
        state.store.as_ref(),
        state.mirror.as_ref(),
        upload.user_id,
        at,
        record,
    )
    .await?;

    Ok(Json(LogResponse::new(stored, advice::for_photo(&capture))))
}

/// POST /api/v1/logs/:key/revisions
pub async fn handle_revision(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(req): Json<RevisionRequest>,
) -> Result<Json<LogResponse>, AppError> {
    let target: RecordKey = key
        .parse()
        .map_err(|e| AppError::Validation(format!("{e}")))?;
    let patch = RevisionPatch {
        content: req.content,
        fields: req.fields,
    };

    let stored = append_revision(
        state.store.as_ref(),
        state.mirror.as_ref(),
        req.user_id,
        target,
        &patch,
        state.now_local(),
    )
    .await?;

    let advice = match stored.record.entry_type {
        EntryType::HealthExport => advice::for_steps(stored.record.steps()),
        _ => advice::for_text_log(),
    };
    Ok(Json(LogResponse::new(stored, advice)))
}

/// POST /api/v1/summary/daily
pub async fn handle_daily_summary(
    State(state): State<AppState>,
    Json(req): Json<SummaryRequest>,
) -> Result<Json<SummaryResponse>, AppError> {
    let date = NaiveDate::parse_from_str(req.date.trim(), "%Y-%m-%d").map_err(|_| {
        AppError::Validation(format!("date '{}' is not a YYYY-MM-DD date", req.date))
    })?;

    let raw = state.store.list_records(req.user_id).await?;
    let records = parse_listed(req.user_id, raw);
    let offset = state.config.day_start_offset_hours;
    let selected = select_window(&records, date, offset, req.policy);

    let meals = selected
        .iter()
        .filter(|(_, r)| r.entry_type.is_meal())
        .count();
    let steps = selected
        .iter()
        .fold(0u64, |total, (_, r)| total.saturating_add(r.steps()));

    let mut yaml = String::new();
    for (_, record) in &selected {
        yaml.push_str("---\n");
        yaml.push_str(&record.to_yaml().map_err(anyhow::Error::from)?);
    }

    let window = DayWindow::for_date(date, offset);
    Ok(Json(SummaryResponse {
        date,
        window_start: window.start,
        window_end: window.end,
        policy: req.policy,
        entries: selected
            .into_iter()
            .map(|(key, record)| SummaryEntry {
                key: key.clone(),
                record: record.clone(),
            })
            .collect(),
        meals,
        steps,
        yaml,
        advice: advice::for_summary(date, meals),
    }))
}

/// POST /api/v1/health-export
pub async fn handle_health_export(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<LogResponse>, AppError> {
    let upload = read_upload(multipart).await?;
    let summary = read_export_zip(&upload.bytes)
        .map_err(|e| AppError::UnprocessableEntity(format!("Health export unreadable: {e}")))?;

    let now = state.now_local();
    let steps = summary.steps;
    let record = StructuredRecord::new(EntryType::HealthExport)
        .with_field("date", now.date_naive().to_string())
        .with_field(
            "apple_health",
            serde_json::to_value(&summary).map_err(anyhow::Error::from)?,
        )
        .with_field("posted_time", now.to_rfc3339());

    let stored = append_new(
        state.store.as_ref(),
        state.mirror.as_ref(),
        upload.user_id,
        now.naive_local(),
        record,
    )
    .await?;

    Ok(Json(LogResponse::new(stored, advice::for_steps(steps))))
}
