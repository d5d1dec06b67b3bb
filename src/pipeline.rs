//! One refresh run: regions → aggregate → merge with stored state → persist.

use crate::{
    aggregator::Aggregator,
    config::AppConfig,
    errors::Result,
    merge::merge,
    source::{PriceSource, RegionCatalog, RegionPriceFetcher, RegionSource},
    store::{DatasetStore, JsonFileStore},
    utils,
};
use chrono::{DateTime, SubsecRound, Utc};
use tracing::info;

/// What a run did to the stored dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Written,
    Unchanged,
}

/// Runs the pipeline against the live endpoints and the configured file.
pub async fn run(config: &AppConfig) -> Result<RunOutcome> {
    config.validate()?;
    let client = utils::build_http_client(config)?;
    let catalog = RegionCatalog::new(client.clone(), config);
    let aggregator = Aggregator::new(RegionPriceFetcher::new(client, config), config);
    let store = JsonFileStore::new(&config.output_path);
    run_with_clock(&catalog, &aggregator, &store, || Utc::now().trunc_subsecs(0)).await
}

/// Runs the pipeline with explicit collaborators and start time.
///
/// A failing region list or store aborts the run before anything is written.
pub async fn run_at<R, P, S>(
    regions: &R,
    aggregator: &Aggregator<P>,
    store: &S,
    started_at: DateTime<Utc>,
) -> Result<RunOutcome>
where
    R: RegionSource,
    P: PriceSource,
    S: DatasetStore,
{
    run_with_clock(regions, aggregator, store, || started_at).await
}

/// `clock` is read once the region list is in hand, right before fan-out.
async fn run_with_clock<R, P, S, C>(
    regions: &R,
    aggregator: &Aggregator<P>,
    store: &S,
    clock: C,
) -> Result<RunOutcome>
where
    R: RegionSource,
    P: PriceSource,
    S: DatasetStore,
    C: FnOnce() -> DateTime<Utc>,
{
    let region_ids = regions.list_regions().await?;
    let fresh = aggregator.aggregate_at(&region_ids, clock()).await;
    let previous = store.load().await?;

    let outcome = merge(previous, fresh);
    if !outcome.changed {
        info!("[RUN] no changes in spot data, skipping write");
        return Ok(RunOutcome::Unchanged);
    }
    store.store(&outcome.dataset).await?;
    info!(
        regions = outcome.dataset.regions.len(),
        leaders = outcome.dataset.global_top_5.len(),
        "[RUN] updated spot data written"
    );
    Ok(RunOutcome::Written)
}
