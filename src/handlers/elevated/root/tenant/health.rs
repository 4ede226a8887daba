// handlers/elevated/root/tenant/health.rs - GET /api/root/tenant/:id/health handler

use axum::extract::Path;
use uuid::Uuid;

use crate::middleware::{ApiResponse, ApiResult};
use crate::services::tenant_service::{TenantHealth, TenantService};

/// GET /api/root/tenant/:id/health - Schema presence, version and table row counts
pub async fn tenant_health(Path(id): Path<Uuid>) -> ApiResult<TenantHealth> {
    let health = TenantService::new().await?.health(id).await?;
    if !health.healthy {
        tracing::warn!("Tenant {} is unhealthy (schema {})", id, health.schema);
    }
    Ok(ApiResponse::success(health))
}
