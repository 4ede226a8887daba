use axum::{extract::Path, Extension, Json};
use uuid::Uuid;

use crate::middleware::{ApiResponse, ApiResult, TenantContext};
use crate::services::user_service::{NewTeamUser, TeamService, UserSummary, UserUpdate};

fn team(ctx: &TenantContext) -> TeamService<'_> {
    TeamService::new(&ctx.pool, &ctx.tenant)
}

/// GET /api/users
pub async fn list(Extension(ctx): Extension<TenantContext>) -> ApiResult<Vec<UserSummary>> {
    ctx.require_admin()?;
    Ok(ApiResponse::success(team(&ctx).list().await?))
}

/// POST /api/users - bounded by the tier's user limit
pub async fn create(Extension(ctx): Extension<TenantContext>, Json(payload): Json<NewTeamUser>) -> ApiResult<UserSummary> {
    ctx.require_admin()?;
    Ok(ApiResponse::created(team(&ctx).create(payload).await?))
}

/// PATCH /api/users/:id
pub async fn update(
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UserUpdate>,
) -> ApiResult<UserSummary> {
    ctx.require_admin()?;
    Ok(ApiResponse::success(team(&ctx).update(ctx.user_id(), id, payload).await?))
}

/// DELETE /api/users/:id - deactivates; accounts are never removed
pub async fn delete(Extension(ctx): Extension<TenantContext>, Path(id): Path<Uuid>) -> ApiResult<UserSummary> {
    ctx.require_admin()?;
    Ok(ApiResponse::success(team(&ctx).deactivate(ctx.user_id(), id).await?))
}
