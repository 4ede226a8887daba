// handlers/public/auth/register.rs - POST /auth/register handler

use axum::Json;

use crate::database::DatabaseManager;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::auth_service::{AuthService, AuthSession, RegisterRequest};

/// POST /auth/register - Self-service firm signup
///
/// ```json
/// { "firm_name": "Silva Advogados", "tier": "composta",
///   "name": "Ana Silva", "email": "ana@silva.adv.br", "password": "..." }
/// ```
///
/// Provisions the firm's schema and its first admin, then signs the admin in.
pub async fn register_post(Json(payload): Json<RegisterRequest>) -> ApiResult<AuthSession> {
    let pool = DatabaseManager::pool().await?;
    let session = AuthService::new(pool).register(payload).await?;
    Ok(ApiResponse::created(session))
}
