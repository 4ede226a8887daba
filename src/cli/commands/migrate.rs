use serde_json::json;

use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::database::migrations::{self, latest_tenant_version};
use crate::database::DatabaseManager;
use crate::services::tenant_service::TenantService;

pub async fn handle(output_format: OutputFormat) -> anyhow::Result<()> {
    let pool = DatabaseManager::pool().await?;
    migrations::run_main(&pool).await?;

    let service = TenantService::with_pool(pool);
    // trashed firms are migrated too so a restore lands on a current schema
    let tenants = service.list(true).await?;

    let mut results = Vec::with_capacity(tenants.len());
    let mut applied_total = 0;
    for tenant in &tenants {
        let applied = service.migrate(tenant.id).await?;
        applied_total += applied;
        if matches!(output_format, OutputFormat::Text) && applied > 0 {
            println!("  {} ({}): {} migration(s) applied", tenant.name, tenant.id, applied);
        }
        results.push(json!({ "id": tenant.id, "name": tenant.name, "applied": applied }));
    }

    output_success(
        &output_format,
        &format!(
            "Migrated {} tenant(s) to v{} ({} migration(s) applied)",
            tenants.len(),
            latest_tenant_version(),
            applied_total
        ),
        Some(json!({ "tenants": results, "latest_version": latest_tenant_version() })),
    )
}
