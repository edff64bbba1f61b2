use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::user::UserProfile;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// POST /api/v1/users
///
/// The body is optional; an empty POST registers an anonymous user.
pub async fn handle_register(
    State(state): State<AppState>,
    body: Option<Json<RegisterRequest>>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    let req = body.map(|Json(r)| r).unwrap_or_default();
    let display_name = req
        .display_name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());

    let profile = UserProfile {
        user_id: Uuid::new_v4(),
        display_name,
        created_at: Utc::now(),
    };
    state.store.register_user(&profile).await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user_id: profile.user_id,
            created_at: profile.created_at,
        }),
    ))
}

/// GET /api/v1/users/:user_id
pub async fn handle_get_user(
    State(state): State<AppState>,
    axum::extract::Path(user_id): axum::extract::Path<Uuid>,
) -> Result<Json<UserProfile>, AppError> {
    Ok(Json(state.store.load_user(user_id).await?))
}
