// handlers/elevated/root/tenant/migrate.rs - POST /api/root/tenant/:id/migrate handler

use axum::extract::Path;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::migrations::latest_tenant_version;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::tenant_service::TenantService;

/// POST /api/root/tenant/:id/migrate - Bring one tenant schema up to the latest version
pub async fn tenant_migrate(Path(id): Path<Uuid>) -> ApiResult<Value> {
    let applied = TenantService::new().await?.migrate(id).await?;
    Ok(ApiResponse::success(json!({
        "tenant_id": id,
        "applied": applied,
        "schema_version": latest_tenant_version(),
    })))
}
