// handlers/elevated/root/tenant/delete.rs - DELETE /api/root/tenant/:id handler

use axum::extract::Path;
use uuid::Uuid;

use crate::database::models::tenant::Tenant;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::tenant_service::TenantService;

/// DELETE /api/root/tenant/:id - Soft delete; the schema and its data are kept
pub async fn tenant_delete(Path(id): Path<Uuid>) -> ApiResult<Tenant> {
    let tenant = TenantService::new().await?.trash(id).await?;
    Ok(ApiResponse::success(tenant))
}
