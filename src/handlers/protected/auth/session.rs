use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::database::DatabaseManager;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::auth_service::{AuthService, TenantSummary};
use crate::services::tenant_service::TenantService;
use crate::services::user_service::{self, UserSummary};
use crate::error::ApiError;

#[derive(Debug, Serialize)]
pub struct WhoAmI {
    pub user: UserSummary,
    pub tenant: Option<TenantSummary>,
}

/// GET /api/auth/whoami - Current user and firm, read fresh from the registry
pub async fn session_whoami(Extension(auth): Extension<AuthUser>) -> ApiResult<WhoAmI> {
    let pool = DatabaseManager::pool().await?;
    let user = user_service::find_by_id(&pool, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("User no longer exists"))?;

    let tenant = match user.tenant_id {
        Some(id) => Some(TenantSummary::from(&TenantService::with_pool(pool).get(id).await?)),
        None => None,
    };

    Ok(ApiResponse::success(WhoAmI {
        user: user.into(),
        tenant,
    }))
}

#[derive(Deserialize)]
pub struct LogoutRequest {
    pub refresh_token: String,
}

/// POST /api/auth/logout - Revoke one of the caller's refresh tokens
pub async fn session_logout(
    Extension(auth): Extension<AuthUser>,
    Json(payload): Json<LogoutRequest>,
) -> ApiResult<Value> {
    let pool = DatabaseManager::pool().await?;
    let revoked = AuthService::new(pool).logout(auth.user_id, payload.refresh_token.trim()).await?;
    Ok(ApiResponse::success(json!({ "revoked": revoked })))
}
