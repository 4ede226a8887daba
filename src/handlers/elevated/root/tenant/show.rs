// handlers/elevated/root/tenant/show.rs - GET /api/root/tenant/:id handler

use axum::extract::Path;
use uuid::Uuid;

use crate::middleware::{ApiResponse, ApiResult};
use crate::services::tenant_service::{TenantDetails, TenantService};

/// GET /api/root/tenant/:id - Registry row plus active user count and enabled features
pub async fn tenant_show(Path(id): Path<Uuid>) -> ApiResult<TenantDetails> {
    let details = TenantService::new().await?.details(id).await?;
    Ok(ApiResponse::success(details))
}
