// handlers/public/auth/refresh.rs - POST /auth/refresh handler

use axum::Json;
use serde::Deserialize;

use crate::database::DatabaseManager;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::auth_service::{AuthService, AuthSession};

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// POST /auth/refresh - Rotate a refresh token into a new session
pub async fn refresh_post(Json(payload): Json<RefreshRequest>) -> ApiResult<AuthSession> {
    let pool = DatabaseManager::pool().await?;
    let session = AuthService::new(pool).refresh(payload.refresh_token.trim()).await?;
    Ok(ApiResponse::success(session))
}
