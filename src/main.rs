use anyhow::Result;
use spot_deals::{config::AppConfig, pipeline, utils};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    utils::init_logging();

    let config = AppConfig::load()?;
    tracing::info!(
        output = %config.output_path.display(),
        max_concurrency = config.max_concurrency,
        "[INIT] spot-deals refresh starting"
    );

    let outcome = pipeline::run(&config).await?;
    tracing::info!(?outcome, "[RUN] finished");
    Ok(())
}
