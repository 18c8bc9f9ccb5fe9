use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use clap::Args;
use serde_json::json;

use crate::cli::utils::{connect, output_success};
use crate::cli::OutputFormat;
use crate::services::admin_service::{AdminService, UserFilter};
use crate::services::export::{encode, ExportFormat, ExportResource};
use crate::services::mailer::LogMailer;
use crate::services::order_service::{OrderFilter, OrderService};
use crate::services::product_service::{ProductFilter, ProductService};

#[derive(Args)]
pub struct ExportArgs {
    #[arg(help = "users, orders or products")]
    pub resource: ExportResource,

    #[arg(long, default_value = "csv", help = "csv or xls")]
    pub format: ExportFormat,

    #[arg(long, short, help = "Output file (defaults to <resource>-<date>.<ext>)")]
    pub output: Option<PathBuf>,
}

pub async fn handle(args: ExportArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    let db = connect()?;
    let pool = db.pool().clone();

    let (rows, body) = match args.resource {
        ExportResource::Users => {
            let rows = AdminService::new(pool).export_users(&UserFilter::default()).await?;
            (rows.len(), encode(&rows, args.format)?)
        }
        ExportResource::Orders => {
            let rows = OrderService::new(pool, Arc::new(LogMailer))
                .export_rows(&OrderFilter::default())
                .await?;
            (rows.len(), encode(&rows, args.format)?)
        }
        ExportResource::Products => {
            let rows = ProductService::new(pool)
                .export_rows(&ProductFilter::default())
                .await?;
            (rows.len(), encode(&rows, args.format)?)
        }
    };
    db.close().await;

    let path = args.output.unwrap_or_else(|| {
        PathBuf::from(args.format.filename(args.resource.as_str(), Utc::now().date_naive()))
    });
    tokio::fs::write(&path, body).await?;

    output_success(
        output_format,
        &format!("Exported {} {} to {}", rows, args.resource.as_str(), path.display()),
        Some(json!({ "rows": rows, "path": path.display().to_string() })),
    )
}
