// handlers/elevated/root/tenant/list.rs - GET /api/root/tenant handler

use axum::extract::Query;
use serde::Deserialize;

use crate::database::models::tenant::Tenant;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::tenant_service::TenantService;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub include_trashed: bool,
}

/// GET /api/root/tenant?include_trashed=true
pub async fn tenant_list(Query(query): Query<ListQuery>) -> ApiResult<Vec<Tenant>> {
    let tenants = TenantService::new().await?.list(query.include_trashed).await?;
    Ok(ApiResponse::success(tenants))
}
