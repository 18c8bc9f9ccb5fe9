use clap::Subcommand;
use serde_json::Value;

use crate::cli::utils::output_value;
use crate::cli::OutputFormat;

const DEFAULT_URL: &str = "http://localhost:3000";

#[derive(Subcommand)]
pub enum ServerCommands {
    #[command(about = "Show server information from the API root endpoint")]
    Info {
        #[arg(long, env = "MARKET_API_URL", default_value = DEFAULT_URL)]
        url: String,
    },

    #[command(about = "Check server and database health from /health")]
    Health {
        #[arg(long, env = "MARKET_API_URL", default_value = DEFAULT_URL)]
        url: String,
    },
}

async fn fetch(base: &str, path: &str) -> anyhow::Result<(reqwest::StatusCode, Value)> {
    let url = url::Url::parse(base)?.join(path)?;
    let response = reqwest::get(url).await?;
    let status = response.status();
    let body: Value = response.json().await?;
    Ok((status, body))
}

pub async fn handle(cmd: ServerCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        ServerCommands::Info { url } => {
            let (_, body) = fetch(&url, "/").await?;
            output_value(output_format, body.get("data").unwrap_or(&body))
        }
        ServerCommands::Health { url } => {
            let (status, body) = fetch(&url, "/health").await?;
            output_value(output_format, body.get("data").unwrap_or(&body))?;
            if !status.is_success() {
                anyhow::bail!("server reported {}", status);
            }
            Ok(())
        }
    }
}
