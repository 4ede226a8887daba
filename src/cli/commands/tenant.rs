use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::services::tenant_service::{NewTenant, TenantService};
use crate::services::user_service::NewUser;
use crate::types::AccountTier;

#[derive(Subcommand)]
pub enum TenantCommands {
    #[command(about = "List firms")]
    List {
        #[arg(long, help = "Include soft-deleted firms")]
        all: bool,
    },

    #[command(about = "Provision a firm with its first admin")]
    Create {
        #[arg(help = "Firm name")]
        name: String,

        #[arg(long, default_value = "simples", help = "simples, composta or gerencial")]
        tier: AccountTier,

        #[arg(long)]
        admin_email: String,

        #[arg(long)]
        admin_name: String,

        #[arg(long, help = "Defaults to $LAWDESK_ADMIN_PASSWORD")]
        admin_password: Option<String>,
    },
}

pub async fn handle(cmd: TenantCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let service = TenantService::new().await?;

    match cmd {
        TenantCommands::List { all } => {
            let tenants = service.list(all).await?;
            if tenants.is_empty() {
                return output_empty_collection(&output_format, "tenants", "No tenants found");
            }

            match output_format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&json!({ "tenants": tenants }))?);
                }
                OutputFormat::Text => {
                    println!("{:<36} {:<30} {:<10} {:<8} {}", "ID", "NAME", "TIER", "SCHEMA", "STATE");
                    println!("{}", "-".repeat(96));
                    for t in &tenants {
                        let state = if t.trashed_at.is_some() {
                            "trashed"
                        } else if t.is_active {
                            "active"
                        } else {
                            "inactive"
                        };
                        println!(
                            "{:<36} {:<30} {:<10} v{:<7} {}",
                            t.id, t.name, t.tier, t.schema_version, state
                        );
                    }
                }
            }
            Ok(())
        }
        TenantCommands::Create {
            name,
            tier,
            admin_email,
            admin_name,
            admin_password,
        } => {
            let password = value_or_env(admin_password, "LAWDESK_ADMIN_PASSWORD")?;
            let (tenant, admin) = service
                .provision(NewTenant {
                    name,
                    tier,
                    admin: NewUser {
                        name: admin_name,
                        email: admin_email,
                        password,
                    },
                })
                .await?;

            output_success(
                &output_format,
                &format!("Created tenant '{}' ({}) with admin {}", tenant.name, tenant.id, admin.email),
                Some(json!({
                    "tenant": tenant,
                    "admin": { "id": admin.id, "email": admin.email },
                })),
            )
        }
    }
}
