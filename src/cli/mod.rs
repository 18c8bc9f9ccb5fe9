pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "market")]
#[command(about = "Marketplace CLI - operator tasks for the marketplace API")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Apply pending database migrations")]
    Migrate,

    #[command(about = "Administrator account management")]
    Admin {
        #[command(subcommand)]
        cmd: commands::admin::AdminCommands,
    },

    #[command(about = "Export users, orders or products to a CSV/XLS file")]
    Export(commands::export::ExportArgs),

    #[command(about = "Query a running server")]
    Server {
        #[command(subcommand)]
        cmd: commands::server::ServerCommands,
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
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
        Commands::Admin { cmd } => commands::admin::handle(cmd, output_format).await,
        Commands::Export(args) => commands::export::handle(args, output_format).await,
        Commands::Server { cmd } => commands::server::handle(cmd, output_format).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_export_arguments() {
        let cli = Cli::try_parse_from(["market", "--json", "export", "orders", "--format", "xls"]).unwrap();
        assert!(matches!(OutputFormat::from_cli(&cli), OutputFormat::Json));
        match cli.command {
            Commands::Export(args) => {
                assert_eq!(args.resource.as_str(), "orders");
                assert_eq!(args.format.extension(), "xls");
                assert!(args.output.is_none());
            }
            _ => panic!("expected export"),
        }
    }

    #[test]
    fn rejects_unknown_resource() {
        assert!(Cli::try_parse_from(["market", "export", "invoices"]).is_err());
    }
}
