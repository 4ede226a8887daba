use axum::{
    extract::{Path, Query},
    Extension, Json,
};
use uuid::Uuid;

use crate::database::models::client::Client;
use crate::middleware::{ApiResponse, ApiResult, TenantContext};
use crate::services::client_service::{ClientQuery, ClientService, ClientUpdate, NewClient};
use crate::types::Feature;

/// GET /api/clients
pub async fn list(Extension(ctx): Extension<TenantContext>, Query(query): Query<ClientQuery>) -> ApiResult<Vec<Client>> {
    ctx.require(Feature::Crm)?;
    let clients = ClientService::new(&ctx.pool, &ctx.schema).list(query).await?;
    Ok(ApiResponse::success(clients))
}

/// GET /api/clients/:id
pub async fn get(Extension(ctx): Extension<TenantContext>, Path(id): Path<Uuid>) -> ApiResult<Client> {
    ctx.require(Feature::Crm)?;
    let client = ClientService::new(&ctx.pool, &ctx.schema).get(id).await?;
    Ok(ApiResponse::success(client))
}

/// POST /api/clients
pub async fn create(Extension(ctx): Extension<TenantContext>, Json(payload): Json<NewClient>) -> ApiResult<Client> {
    ctx.require(Feature::Crm)?;
    let client = ClientService::new(&ctx.pool, &ctx.schema)
        .create(payload, ctx.user_id())
        .await?;
    Ok(ApiResponse::created(client))
}

/// PATCH /api/clients/:id
pub async fn update(
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ClientUpdate>,
) -> ApiResult<Client> {
    ctx.require(Feature::Crm)?;
    let client = ClientService::new(&ctx.pool, &ctx.schema).update(id, payload).await?;
    Ok(ApiResponse::success(client))
}

/// DELETE /api/clients/:id - 409 while projects or invoices reference the client
pub async fn delete(Extension(ctx): Extension<TenantContext>, Path(id): Path<Uuid>) -> ApiResult<()> {
    ctx.require(Feature::Crm)?;
    ClientService::new(&ctx.pool, &ctx.schema).delete(id).await?;
    Ok(ApiResponse::no_content())
}
