// handlers/elevated/root/tenant/update.rs - PATCH /api/root/tenant/:id handler

use axum::{extract::Path, Json};
use uuid::Uuid;

use crate::database::models::tenant::Tenant;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::tenant_service::{TenantService, TenantUpdate};

/// PATCH /api/root/tenant/:id - Rename, change tier, or (de)activate a firm
pub async fn tenant_update(Path(id): Path<Uuid>, Json(payload): Json<TenantUpdate>) -> ApiResult<Tenant> {
    let tenant = TenantService::new().await?.update(id, payload).await?;
    Ok(ApiResponse::success(tenant))
}
