use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::{connect, output_success};
use crate::cli::OutputFormat;
use crate::services::admin_service::AdminService;

#[derive(Subcommand)]
pub enum AdminCommands {
    #[command(about = "Create an administrator account")]
    Create {
        #[arg(long, help = "Display name")]
        name: String,
        #[arg(long, help = "Login email")]
        email: String,
        #[arg(long, env = "MARKET_ADMIN_PASSWORD", help = "Password (or set MARKET_ADMIN_PASSWORD)")]
        password: String,
    },
}

pub async fn handle(cmd: AdminCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        AdminCommands::Create { name, email, password } => {
            let db = connect()?;
            let user = AdminService::new(db.pool().clone())
                .create_admin(&name, &email, &password)
                .await?;
            db.close().await;

            output_success(
                output_format,
                &format!("Created admin {}", user.email),
                Some(json!({ "id": user.id, "email": user.email })),
            )
        }
    }
}
