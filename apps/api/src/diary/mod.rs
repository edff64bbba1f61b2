//! Diary: text, photo and health-export logs, corrections, and daily summaries.
//! Handlers stay thin; extraction and aggregation are pure functions.

pub mod advice;
pub mod capture_time;
pub mod handlers;
pub mod health_export;
pub mod ingest;
pub mod summary;
