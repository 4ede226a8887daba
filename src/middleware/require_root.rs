use axum::{extract::Request, middleware::Next, response::Response};

use super::auth::AuthUser;
use crate::database::DatabaseManager;
use crate::error::ApiError;
use crate::services::user_service;
use crate::types::Role;

/// Allows only active platform root users through
pub async fn require_root_middleware(request: Request, next: Next) -> Result<Response, ApiError> {
    let auth_user = request
        .extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or_else(|| ApiError::unauthorized("JWT authentication required"))?;

    if auth_user.role != Role::Root {
        tracing::warn!("Root access denied for user {}", auth_user.user_id);
        return Err(ApiError::forbidden("Root access required"));
    }

    let pool = DatabaseManager::pool().await?;
    let active_root = user_service::find_by_id(&pool, auth_user.user_id)
        .await?
        .map_or(false, |u| u.is_active && u.role == Role::Root);
    if !active_root {
        return Err(ApiError::forbidden("Root access required"));
    }

    Ok(next.run(request).await)
}
