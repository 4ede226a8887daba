// handlers/elevated/root/tenant/restore.rs - POST /api/root/tenant/:id/restore handler

use axum::extract::Path;
use uuid::Uuid;

use crate::database::models::tenant::Tenant;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::tenant_service::TenantService;

/// POST /api/root/tenant/:id/restore - Undo a soft delete
pub async fn tenant_restore(Path(id): Path<Uuid>) -> ApiResult<Tenant> {
    let tenant = TenantService::new().await?.restore(id).await?;
    Ok(ApiResponse::success(tenant))
}
