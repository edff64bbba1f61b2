use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};

use crate::config::Config;
use crate::mirror::RecordMirror;
use crate::store::RecordStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    /// Best-effort remote copy of each written record. `NoopMirror` when unset.
    pub mirror: Arc<dyn RecordMirror>,
    pub config: Config,
}

impl AppState {
    /// Current wall-clock time in the zone record keys are written in.
    pub fn now_local(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.config.local_offset())
    }
}
