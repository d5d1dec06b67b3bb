//! Upstream collaborators: the region directory and the pricing endpoint.
//!
//! Both are reached through small traits so the aggregator and pipeline can
//! be driven by in-memory fakes in tests.

use crate::errors::Result;
use crate::models::Offer;
use std::future::Future;

pub mod catalog;
pub mod ec2shop;

pub use catalog::RegionCatalog;
pub use ec2shop::{RegionPriceFetcher, select_offers};

/// Lists the region identifiers a run should cover.
pub trait RegionSource {
    fn list_regions(&self) -> impl Future<Output = Result<Vec<String>>> + Send;
}

/// Fetches the qualifying offers of one region, cheapest per vCPU first.
///
/// An empty vector means the region was checked and nothing qualified.
pub trait PriceSource {
    fn fetch_region(&self, region: &str) -> impl Future<Output = Result<Vec<Offer>>> + Send;
}

#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use crate::errors::AppError;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Clone)]
    pub enum Reply {
        Offers(Vec<Offer>),
        Fail,
        Hang,
    }

    /// Scripted price source that also records peak concurrency.
    #[derive(Clone, Default)]
    pub struct FakePrices {
        pub replies: HashMap<String, Reply>,
        pub delay: Duration,
        pub in_flight: Arc<AtomicUsize>,
        pub peak: Arc<AtomicUsize>,
    }

    impl FakePrices {
        pub fn with(mut self, region: &str, reply: Reply) -> Self {
            self.replies.insert(region.to_string(), reply);
            self
        }
    }

    impl PriceSource for FakePrices {
        async fn fetch_region(&self, region: &str) -> Result<Vec<Offer>> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            let reply = self.replies.get(region).cloned().unwrap_or(Reply::Fail);
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            match reply {
                Reply::Offers(o) => Ok(o),
                Reply::Fail => Err(AppError::Config(format!("no data for {region}"))),
                Reply::Hang => std::future::pending().await,
            }
        }
    }

    pub struct FakeRegions(pub Vec<String>);

    impl RegionSource for FakeRegions {
        async fn list_regions(&self) -> Result<Vec<String>> {
            Ok(self.0.clone())
        }
    }
}
