use axum::{extract::Path, Extension, Json};

use crate::error::ApiError;
use crate::filter::FilterData;
use crate::middleware::{ApiResponse, ApiResult, TenantContext};
use crate::services::find_service::{FindResult, FindService, Resource};

/// POST /api/find/:resource - advanced filtered find
///
/// ```json
/// { "where": { "status": "active", "name": { "$ilike": "%silva%" } },
///   "order": "created_at desc", "limit": 50, "offset": 0 }
/// ```
pub async fn find_post(
    Extension(ctx): Extension<TenantContext>,
    Path(resource): Path<String>,
    Json(filter_data): Json<FilterData>,
) -> ApiResult<FindResult> {
    let resource: Resource = resource
        .parse()
        .map_err(|_| ApiError::not_found(format!("Unknown resource '{}'", resource)))?;
    ctx.require(resource.feature())?;

    let result = FindService::new(&ctx.pool, &ctx.schema, ctx.user_id())
        .find(resource, filter_data)
        .await?;
    Ok(ApiResponse::success(result))
}
