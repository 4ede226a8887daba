use axum::{
    extract::{Path, Query},
    Extension, Json,
};
use serde_json::Value;
use uuid::Uuid;

use crate::database::models::publication::Publication;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, TenantContext};
use crate::services::publication_service::{
    DeliveryReceipt, NewPublication, PublicationQuery, PublicationService, UnreadCount,
};
use crate::types::Feature;

/// The caller's own inbox; no handler can address another user's
fn inbox(ctx: &TenantContext) -> PublicationService<'_> {
    PublicationService::for_user(&ctx.pool, &ctx.schema, ctx.user_id())
}

/// GET /api/publications
pub async fn list(
    Extension(ctx): Extension<TenantContext>,
    Query(query): Query<PublicationQuery>,
) -> ApiResult<Vec<Publication>> {
    ctx.require(Feature::Publications)?;
    Ok(ApiResponse::success(inbox(&ctx).list(query).await?))
}

/// GET /api/publications/unread-count
pub async fn unread_count(Extension(ctx): Extension<TenantContext>) -> ApiResult<UnreadCount> {
    ctx.require(Feature::Publications)?;
    Ok(ApiResponse::success(inbox(&ctx).unread_count().await?))
}

/// GET /api/publications/:id
pub async fn get(Extension(ctx): Extension<TenantContext>, Path(id): Path<Uuid>) -> ApiResult<Publication> {
    ctx.require(Feature::Publications)?;
    Ok(ApiResponse::success(inbox(&ctx).get(id).await?))
}

/// POST /api/publications - into the caller's inbox, or (admins) another user's
pub async fn create(Extension(ctx): Extension<TenantContext>, Json(payload): Json<NewPublication>) -> ApiResult<Value> {
    ctx.require(Feature::Publications)?;
    let is_admin = ctx.user.role.is_tenant_admin();
    let publication = inbox(&ctx).create(ctx.tenant.id, is_admin, payload).await?;

    let body = if publication.user_id == ctx.user_id() {
        serde_json::to_value(&publication)
    } else {
        serde_json::to_value(DeliveryReceipt::from(&publication))
    }
    .map_err(|e| ApiError::internal_server_error(e.to_string()))?;
    Ok(ApiResponse::created(body))
}

/// POST /api/publications/:id/read
pub async fn mark_read(Extension(ctx): Extension<TenantContext>, Path(id): Path<Uuid>) -> ApiResult<Publication> {
    ctx.require(Feature::Publications)?;
    Ok(ApiResponse::success(inbox(&ctx).mark_read(id).await?))
}

/// POST /api/publications/:id/unread
pub async fn mark_unread(Extension(ctx): Extension<TenantContext>, Path(id): Path<Uuid>) -> ApiResult<Publication> {
    ctx.require(Feature::Publications)?;
    Ok(ApiResponse::success(inbox(&ctx).mark_unread(id).await?))
}

/// POST /api/publications/:id/archive
pub async fn archive(Extension(ctx): Extension<TenantContext>, Path(id): Path<Uuid>) -> ApiResult<Publication> {
    ctx.require(Feature::Publications)?;
    Ok(ApiResponse::success(inbox(&ctx).archive(id).await?))
}

/// DELETE /api/publications/:id
pub async fn delete(Extension(ctx): Extension<TenantContext>, Path(id): Path<Uuid>) -> ApiResult<()> {
    ctx.require(Feature::Publications)?;
    inbox(&ctx).delete(id).await?;
    Ok(ApiResponse::no_content())
}
