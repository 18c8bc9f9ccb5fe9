use crate::cli::utils::{connect, output_success};
use crate::cli::OutputFormat;

pub async fn handle(output_format: OutputFormat) -> anyhow::Result<()> {
    let db = connect()?;
    db.run_migrations().await?;
    db.close().await;
    output_success(output_format, "Migrations applied", None)
}
