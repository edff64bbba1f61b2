mod config;
mod diary;
mod errors;
mod mirror;
mod models;
mod routes;
mod state;
mod store;
mod users;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::mirror::{NoopMirror, RecordMirror, S3Mirror};
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::FsRecordStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on invalid env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Diet Log API v{}", env!("CARGO_PKG_VERSION"));

    let store = FsRecordStore::open(&config.data_dir).await?;

    let mirror: Arc<dyn RecordMirror> = match &config.s3 {
        Some(s3) => {
            info!("Mirroring records to s3://{}", s3.bucket);
            Arc::new(S3Mirror::connect(s3).await)
        }
        None => {
            info!("S3_BUCKET not set; records are kept locally only");
            Arc::new(NoopMirror)
        }
    };

    info!(
        "Day window starts at {:02}:00, local offset UTC{:+}",
        config.day_start_offset_hours, config.utc_offset_hours
    );

    let state = AppState {
        store: Arc::new(store),
        mirror,
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
