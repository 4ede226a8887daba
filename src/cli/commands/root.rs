use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::database::DatabaseManager;
use crate::services::user_service::{self, NewUser};

#[derive(Subcommand)]
pub enum RootCommands {
    #[command(about = "Create a platform root account")]
    Create {
        #[arg(long)]
        email: String,

        #[arg(long)]
        name: String,

        #[arg(long, help = "Defaults to $LAWDESK_ROOT_PASSWORD")]
        password: Option<String>,
    },
}

pub async fn handle(cmd: RootCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        RootCommands::Create { email, name, password } => {
            let password = value_or_env(password, "LAWDESK_ROOT_PASSWORD")?;
            let pool = DatabaseManager::pool().await?;
            let user = user_service::create_root(&pool, &NewUser { name, email, password }).await?;

            output_success(
                &output_format,
                &format!("Created root user {}", user.email),
                Some(json!({ "id": user.id, "email": user.email })),
            )
        }
    }
}
