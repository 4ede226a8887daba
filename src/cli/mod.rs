pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "lawdesk")]
#[command(about = "lawdesk - operator CLI for migrations, firms and platform accounts")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Apply the registry migration and pending tenant migrations")]
    Migrate,

    #[command(about = "Firm (tenant) management")]
    Tenant {
        #[command(subcommand)]
        cmd: commands::tenant::TenantCommands,
    },

    #[command(about = "Platform root accounts")]
    Root {
        #[command(subcommand)]
        cmd: commands::root::RootCommands,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Migrate => commands::migrate::handle(output_format).await,
        Commands::Tenant { cmd } => commands::tenant::handle(cmd, output_format).await,
        Commands::Root { cmd } => commands::root::handle(cmd, output_format).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tenant_create() {
        let cli = Cli::try_parse_from([
            "lawdesk",
            "--json",
            "tenant",
            "create",
            "Silva Advogados",
            "--tier",
            "composta",
            "--admin-email",
            "ana@silva.adv.br",
            "--admin-name",
            "Ana Silva",
            "--admin-password",
            "long enough password",
        ])
        .unwrap();
        assert!(matches!(OutputFormat::from_cli(&cli), OutputFormat::Json));
        match cli.command {
            Commands::Tenant {
                cmd: commands::tenant::TenantCommands::Create { name, tier, .. },
            } => {
                assert_eq!(name, "Silva Advogados");
                assert_eq!(tier, crate::types::AccountTier::Composta);
            }
            _ => panic!("expected tenant create"),
        }
    }

    #[test]
    fn rejects_unknown_tier() {
        assert!(Cli::try_parse_from([
            "lawdesk", "tenant", "create", "X", "--tier", "premium", "--admin-email", "a@b.c",
            "--admin-name", "A", "--admin-password", "long enough password",
        ])
        .is_err());
    }

    #[test]
    fn migrate_takes_no_arguments() {
        let cli = Cli::try_parse_from(["lawdesk", "migrate"]).unwrap();
        assert!(matches!(cli.command, Commands::Migrate));
        assert!(matches!(OutputFormat::from_cli(&cli), OutputFormat::Text));
    }
}
