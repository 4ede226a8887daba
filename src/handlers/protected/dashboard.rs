use axum::Extension;

use crate::middleware::{ApiResponse, ApiResult, TenantContext};
use crate::services::dashboard_service::{Dashboard, DashboardService};

/// GET /api/dashboard
pub async fn dashboard_get(Extension(ctx): Extension<TenantContext>) -> ApiResult<Dashboard> {
    let dashboard = DashboardService::new(&ctx.pool, &ctx.schema)
        .summary(ctx.tenant.tier, ctx.user_id())
        .await?;
    Ok(ApiResponse::success(dashboard))
}
