use axum::{
    extract::{Path, Query},
    Extension, Json,
};
use uuid::Uuid;

use crate::database::models::task::Task;
use crate::middleware::{ApiResponse, ApiResult, TenantContext};
use crate::services::task_service::{NewTask, StatusChange, TaskQuery, TaskService, TaskUpdate};
use crate::types::Feature;

fn service(ctx: &TenantContext) -> TaskService<'_> {
    TaskService::new(&ctx.pool, &ctx.schema, ctx.tenant.id)
}

/// GET /api/tasks
pub async fn list(Extension(ctx): Extension<TenantContext>, Query(query): Query<TaskQuery>) -> ApiResult<Vec<Task>> {
    ctx.require(Feature::Tasks)?;
    Ok(ApiResponse::success(service(&ctx).list(query).await?))
}

/// GET /api/tasks/:id
pub async fn get(Extension(ctx): Extension<TenantContext>, Path(id): Path<Uuid>) -> ApiResult<Task> {
    ctx.require(Feature::Tasks)?;
    Ok(ApiResponse::success(service(&ctx).get(id).await?))
}

/// POST /api/tasks
pub async fn create(Extension(ctx): Extension<TenantContext>, Json(payload): Json<NewTask>) -> ApiResult<Task> {
    ctx.require(Feature::Tasks)?;
    Ok(ApiResponse::created(service(&ctx).create(payload).await?))
}

/// PATCH /api/tasks/:id
pub async fn update(
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TaskUpdate>,
) -> ApiResult<Task> {
    ctx.require(Feature::Tasks)?;
    Ok(ApiResponse::success(service(&ctx).update(id, payload).await?))
}

/// PATCH /api/tasks/:id/status
pub async fn change_status(
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<Uuid>,
    Json(payload): Json<StatusChange>,
) -> ApiResult<Task> {
    ctx.require(Feature::Tasks)?;
    Ok(ApiResponse::success(service(&ctx).change_status(id, payload.status).await?))
}

/// DELETE /api/tasks/:id
pub async fn delete(Extension(ctx): Extension<TenantContext>, Path(id): Path<Uuid>) -> ApiResult<()> {
    ctx.require(Feature::Tasks)?;
    service(&ctx).delete(id).await?;
    Ok(ApiResponse::no_content())
}
