use axum::{
    extract::{Path, Query},
    Extension, Json,
};
use uuid::Uuid;

use crate::database::models::project::Project;
use crate::middleware::{ApiResponse, ApiResult, TenantContext};
use crate::services::project_service::{NewProject, ProjectDetails, ProjectQuery, ProjectService, ProjectUpdate};
use crate::types::Feature;

fn service(ctx: &TenantContext) -> ProjectService<'_> {
    ProjectService::new(&ctx.pool, &ctx.schema, ctx.tenant.id)
}

/// GET /api/projects
pub async fn list(Extension(ctx): Extension<TenantContext>, Query(query): Query<ProjectQuery>) -> ApiResult<Vec<Project>> {
    ctx.require(Feature::Projects)?;
    Ok(ApiResponse::success(service(&ctx).list(query).await?))
}

/// GET /api/projects/:id - includes task counts by status
pub async fn get(Extension(ctx): Extension<TenantContext>, Path(id): Path<Uuid>) -> ApiResult<ProjectDetails> {
    ctx.require(Feature::Projects)?;
    Ok(ApiResponse::success(service(&ctx).details(id).await?))
}

/// POST /api/projects
pub async fn create(Extension(ctx): Extension<TenantContext>, Json(payload): Json<NewProject>) -> ApiResult<Project> {
    ctx.require(Feature::Projects)?;
    Ok(ApiResponse::created(service(&ctx).create(payload).await?))
}

/// PATCH /api/projects/:id
pub async fn update(
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ProjectUpdate>,
) -> ApiResult<Project> {
    ctx.require(Feature::Projects)?;
    Ok(ApiResponse::success(service(&ctx).update(id, payload).await?))
}

/// DELETE /api/projects/:id - removes the project's tasks too
pub async fn delete(Extension(ctx): Extension<TenantContext>, Path(id): Path<Uuid>) -> ApiResult<()> {
    ctx.require(Feature::Projects)?;
    service(&ctx).delete(id).await?;
    Ok(ApiResponse::no_content())
}
