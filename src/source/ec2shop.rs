use super::PriceSource;
use crate::config::AppConfig;
use crate::errors::{AppError, Result};
use crate::models::{Offer, sort_snapshot};
use reqwest::header::ACCEPT;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct PricesMsg {
    #[serde(rename = "Prices", default)]
    prices: Vec<Value>,
}

/// Loosely typed offer record; numeric fields arrive as strings or numbers.
#[derive(Debug, Deserialize)]
struct OfferMsg {
    #[serde(rename = "InstanceType")]
    instance_type: String,
    #[serde(rename = "VCPUS", default)]
    vcpus: Value,
    #[serde(rename = "Memory", default)]
    memory: Value,
    #[serde(rename = "SpotSavingRate", default)]
    spot_saving_rate: Value,
    #[serde(rename = "SpotPrice", default)]
    spot_price: Value,
}

impl OfferMsg {
    fn into_offer(self) -> Option<Offer> {
        let vcpus = match &self.vcpus {
            Value::Number(n) => u32::try_from(n.as_u64()?).ok()?,
            Value::String(s) => s.trim().parse().ok()?,
            _ => return None,
        };
        Some(Offer {
            instance_type: self.instance_type,
            vcpus,
            memory: text(&self.memory).unwrap_or_default(),
            spot_saving_rate: text(&self.spot_saving_rate)?,
            spot_price: text(&self.spot_price)?,
        })
    }
}

fn text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Queries the pricing endpoint for a single region.
#[derive(Clone)]
pub struct RegionPriceFetcher {
    client: reqwest::Client,
    url: String,
    filter: String,
    min_savings_pct: f64,
}

impl RegionPriceFetcher {
    pub fn new(client: reqwest::Client, config: &AppConfig) -> Self {
        Self {
            client,
            url: config.pricing_url.clone(),
            filter: config.pricing_filter(),
            min_savings_pct: config.min_savings_pct,
        }
    }
}

impl PriceSource for RegionPriceFetcher {
    async fn fetch_region(&self, region: &str) -> Result<Vec<Offer>> {
        let resp = self
            .client
            .get(&self.url)
            .query(&[("region", region), ("filter", self.filter.as_str())])
            .header(ACCEPT, "json")
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(AppError::Status {
                url: resp.url().to_string(),
                status: resp.status(),
            });
        }
        let body = resp.text().await?;
        let candidates = parse_offers(&body)?;
        let total = candidates.len();
        let offers = select_offers(candidates, self.min_savings_pct);
        debug!(region, total, kept = offers.len(), "[FETCH] region priced");
        Ok(offers)
    }
}

/// Decodes a pricing response body. Records that cannot be read are skipped.
pub fn parse_offers(body: &str) -> Result<Vec<Offer>> {
    let msg: PricesMsg = serde_json::from_str(body)?;
    let offers = msg
        .prices
        .into_iter()
        .filter_map(|raw| match serde_json::from_value::<OfferMsg>(raw) {
            Ok(m) => m.into_offer(),
            Err(e) => {
                warn!(error = %e, "[FETCH] offer record skipped");
                None
            }
        })
        .collect();
    Ok(offers)
}

/// Keeps offers saving strictly more than `min_savings_pct` whose price and
/// vCPU count are usable, ordered by price-per-vCPU (stable).
pub fn select_offers(candidates: Vec<Offer>, min_savings_pct: f64) -> Vec<Offer> {
    let mut kept: Vec<Offer> = candidates
        .into_iter()
        .filter(|o| o.savings_ratio().is_some_and(|s| s > min_savings_pct))
        .filter(|o| o.price_per_vcpu().is_some())
        .collect();
    sort_snapshot(&mut kept);
    kept
}
