// handlers/elevated/root/tenant/create.rs - POST /api/root/tenant handler

use axum::Json;
use serde::Serialize;

use crate::database::models::tenant::Tenant;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::tenant_service::{NewTenant, TenantService};
use crate::services::user_service::UserSummary;

#[derive(Debug, Serialize)]
pub struct ProvisionedTenant {
    pub tenant: Tenant,
    pub admin: UserSummary,
}

/// POST /api/root/tenant - Provision a firm with its schema and first admin
///
/// ```json
/// {
///   "name": "Silva & Souza Advogados",
///   "tier": "composta",
///   "admin": { "name": "Ana Silva", "email": "ana@silva.adv.br", "password": "..." }
/// }
/// ```
pub async fn tenant_create(Json(payload): Json<NewTenant>) -> ApiResult<ProvisionedTenant> {
    let (tenant, admin) = TenantService::new().await?.provision(payload).await?;
    Ok(ApiResponse::created(ProvisionedTenant {
        tenant,
        admin: admin.into(),
    }))
}
