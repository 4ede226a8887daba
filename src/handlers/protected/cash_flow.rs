use axum::{
    extract::{Path, Query},
    Extension, Json,
};
use uuid::Uuid;

use crate::database::models::cash_flow::CashFlowEntry;
use crate::middleware::{ApiResponse, ApiResult, TenantContext};
use crate::services::cash_flow_service::{CashFlowService, CashFlowSummary, EntryQuery, EntryUpdate, NewEntry, Period};
use crate::types::Feature;

fn service(ctx: &TenantContext) -> CashFlowService<'_> {
    CashFlowService::new(&ctx.pool, &ctx.schema)
}

/// GET /api/cash-flow
pub async fn list(Extension(ctx): Extension<TenantContext>, Query(query): Query<EntryQuery>) -> ApiResult<Vec<CashFlowEntry>> {
    ctx.require(Feature::CashFlow)?;
    Ok(ApiResponse::success(service(&ctx).list(query).await?))
}

/// GET /api/cash-flow/summary?from&to - per-category totals need Reports
pub async fn summary(Extension(ctx): Extension<TenantContext>, Query(period): Query<Period>) -> ApiResult<CashFlowSummary> {
    ctx.require(Feature::CashFlow)?;
    let with_breakdown = ctx.allows(Feature::Reports);
    Ok(ApiResponse::success(service(&ctx).summary(period, with_breakdown).await?))
}

/// GET /api/cash-flow/:id
pub async fn get(Extension(ctx): Extension<TenantContext>, Path(id): Path<Uuid>) -> ApiResult<CashFlowEntry> {
    ctx.require(Feature::CashFlow)?;
    Ok(ApiResponse::success(service(&ctx).get(id).await?))
}

/// POST /api/cash-flow
pub async fn create(Extension(ctx): Extension<TenantContext>, Json(payload): Json<NewEntry>) -> ApiResult<CashFlowEntry> {
    ctx.require(Feature::CashFlow)?;
    Ok(ApiResponse::created(service(&ctx).create(payload, ctx.user_id()).await?))
}

/// PATCH /api/cash-flow/:id
pub async fn update(
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<Uuid>,
    Json(payload): Json<EntryUpdate>,
) -> ApiResult<CashFlowEntry> {
    ctx.require(Feature::CashFlow)?;
    Ok(ApiResponse::success(service(&ctx).update(id, payload).await?))
}

/// POST /api/cash-flow/:id/pay
pub async fn pay(Extension(ctx): Extension<TenantContext>, Path(id): Path<Uuid>) -> ApiResult<CashFlowEntry> {
    ctx.require(Feature::CashFlow)?;
    Ok(ApiResponse::success(service(&ctx).pay(id).await?))
}

/// DELETE /api/cash-flow/:id
pub async fn delete(Extension(ctx): Extension<TenantContext>, Path(id): Path<Uuid>) -> ApiResult<()> {
    ctx.require(Feature::CashFlow)?;
    service(&ctx).delete(id).await?;
    Ok(ApiResponse::no_content())
}
