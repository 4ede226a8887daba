// handlers/public/auth/login.rs - POST /auth/login handler

use axum::Json;

use crate::database::DatabaseManager;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::auth_service::{AuthService, AuthSession, LoginRequest};

/// POST /auth/login - Authenticate with email and password
///
/// Every credential failure returns the same 401 so the response does not reveal
/// whether the email exists. Inactive accounts and inactive firms get 403.
pub async fn login_post(Json(payload): Json<LoginRequest>) -> ApiResult<AuthSession> {
    let pool = DatabaseManager::pool().await?;
    let session = AuthService::new(pool).login(payload).await?;
    Ok(ApiResponse::success(session))
}
