//! Fan-out over regions and leaderboard selection.

use crate::{
    config::AppConfig,
    errors::{AppError, Result},
    models::{GlobalDeal, Offer, RegionSnapshot, SpotDataset},
    source::PriceSource,
};
use chrono::{DateTime, Utc};
use futures::{StreamExt, stream};
use std::collections::BTreeMap;
use std::time::Duration;

/// Runs one price fetch per region and assembles a fresh dataset.
pub struct Aggregator<P> {
    source: P,
    top_n: usize,
    max_concurrency: usize,
    request_timeout: Duration,
}

impl<P: PriceSource> Aggregator<P> {
    pub fn new(source: P, config: &AppConfig) -> Self {
        Self {
            source,
            top_n: config.top_n,
            max_concurrency: config.max_concurrency.max(1),
            request_timeout: config.request_timeout,
        }
    }

    /// Fetches every region, at most `max_concurrency` at a time.
    ///
    /// Regions whose fetch failed or timed out are absent from the result;
    /// regions that answered with no qualifying offers map to an empty list.
    pub async fn aggregate_at(&self, regions: &[String], started_at: DateTime<Utc>) -> SpotDataset {
        let results: Vec<(String, Result<Vec<Offer>>)> = stream::iter(regions.iter().cloned())
            .map(|region| async move {
                let res = self.fetch_with_deadline(&region).await;
                (region, res)
            })
            .buffer_unordered(self.max_concurrency)
            .collect()
            .await;

        let mut dataset = SpotDataset::new(started_at);
        let mut failed = 0usize;
        for (region, res) in results {
            match res {
                Ok(offers) => {
                    dataset.regions.insert(region, offers);
                }
                Err(e) => {
                    failed += 1;
                    tracing::warn!(region = %region, error = %e, "[FETCH] region skipped");
                }
            }
        }
        dataset.global_top_5 = leaderboard(&dataset.regions, self.top_n);

        tracing::info!(
            requested = regions.len(),
            fetched = dataset.regions.len(),
            failed,
            leaders = dataset.global_top_5.len(),
            "[AGG] aggregation complete"
        );
        dataset
    }

    async fn fetch_with_deadline(&self, region: &str) -> Result<Vec<Offer>> {
        match tokio::time::timeout(self.request_timeout, self.source.fetch_region(region)).await {
            Ok(res) => res,
            Err(_) => Err(AppError::Timeout {
                region: region.to_string(),
                secs: self.request_timeout.as_secs(),
            }),
        }
    }
}

/// The `top_n` cheapest per-vCPU offers, taking at most one (the best) per region.
pub fn leaderboard(regions: &BTreeMap<String, RegionSnapshot>, top_n: usize) -> Vec<GlobalDeal> {
    let mut pool: Vec<GlobalDeal> = regions
        .iter()
        .filter_map(|(region, offers)| GlobalDeal::from_offer(region, offers.first()?))
        .collect();
    pool.sort_by(|a, b| a.price_per_vcpu.total_cmp(&b.price_per_vcpu));
    pool.truncate(top_n);
    pool
}
