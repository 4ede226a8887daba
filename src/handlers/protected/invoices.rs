use axum::{
    extract::{Path, Query},
    Extension, Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::models::invoice::{Invoice, InvoiceWithItems};
use crate::middleware::{ApiResponse, ApiResult, TenantContext};
use crate::services::invoice_service::{InvoiceQuery, InvoiceService, InvoiceUpdate, NewInvoice, PaidInvoice};
use crate::types::Feature;

fn service(ctx: &TenantContext) -> InvoiceService<'_> {
    InvoiceService::new(&ctx.pool, &ctx.schema)
}

/// GET /api/invoices
pub async fn list(Extension(ctx): Extension<TenantContext>, Query(query): Query<InvoiceQuery>) -> ApiResult<Vec<Invoice>> {
    ctx.require(Feature::Billing)?;
    Ok(ApiResponse::success(service(&ctx).list(query).await?))
}

/// GET /api/invoices/:id
pub async fn get(Extension(ctx): Extension<TenantContext>, Path(id): Path<Uuid>) -> ApiResult<InvoiceWithItems> {
    ctx.require(Feature::Billing)?;
    Ok(ApiResponse::success(service(&ctx).get(id).await?))
}

/// POST /api/invoices - created as a numbered draft
pub async fn create(Extension(ctx): Extension<TenantContext>, Json(payload): Json<NewInvoice>) -> ApiResult<InvoiceWithItems> {
    ctx.require(Feature::Billing)?;
    Ok(ApiResponse::created(service(&ctx).create(payload, ctx.user_id()).await?))
}

/// PATCH /api/invoices/:id - drafts only
pub async fn update(
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<Uuid>,
    Json(payload): Json<InvoiceUpdate>,
) -> ApiResult<InvoiceWithItems> {
    ctx.require(Feature::Billing)?;
    Ok(ApiResponse::success(service(&ctx).update(id, payload).await?))
}

/// DELETE /api/invoices/:id - drafts only
pub async fn delete(Extension(ctx): Extension<TenantContext>, Path(id): Path<Uuid>) -> ApiResult<()> {
    ctx.require(Feature::Billing)?;
    service(&ctx).delete(id).await?;
    Ok(ApiResponse::no_content())
}

/// POST /api/invoices/:id/send
pub async fn send(Extension(ctx): Extension<TenantContext>, Path(id): Path<Uuid>) -> ApiResult<InvoiceWithItems> {
    ctx.require(Feature::Billing)?;
    Ok(ApiResponse::success(service(&ctx).send(id).await?))
}

/// POST /api/invoices/:id/cancel
pub async fn cancel(Extension(ctx): Extension<TenantContext>, Path(id): Path<Uuid>) -> ApiResult<InvoiceWithItems> {
    ctx.require(Feature::Billing)?;
    Ok(ApiResponse::success(service(&ctx).cancel(id).await?))
}

/// POST /api/invoices/:id/pay - also records the income in cash flow
pub async fn pay(Extension(ctx): Extension<TenantContext>, Path(id): Path<Uuid>) -> ApiResult<PaidInvoice> {
    ctx.require(Feature::Billing)?;
    Ok(ApiResponse::success(service(&ctx).pay(id, ctx.user_id()).await?))
}

/// POST /api/invoices/refresh-overdue
pub async fn refresh_overdue(Extension(ctx): Extension<TenantContext>) -> ApiResult<Value> {
    ctx.require(Feature::Billing)?;
    let updated = service(&ctx).refresh_overdue().await?;
    Ok(ApiResponse::success(json!({ "updated": updated })))
}
