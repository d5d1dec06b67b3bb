//! Shared data structures used throughout the application.
//!
//! Field names on the wire are fixed by the display layer that reads the
//! output file: region entries use the capitalized upstream names while
//! leaderboard entries are camelCase.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// One instance type's spot price in a region, as reported upstream.
///
/// Numeric fields stay in their upstream textual form so a persisted file
/// reads back exactly as it was written. Derived values are always
/// recomputed through the accessors below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    #[serde(rename = "InstanceType")]
    pub instance_type: String,
    #[serde(rename = "VCPUS")]
    pub vcpus: u32,
    #[serde(rename = "Memory")]
    pub memory: String,
    /// Savings versus on-demand, e.g. `"62%"`.
    #[serde(rename = "SpotSavingRate")]
    pub spot_saving_rate: String,
    /// Decimal currency amount, e.g. `"0.0412"`.
    #[serde(rename = "SpotPrice")]
    pub spot_price: String,
}

impl Offer {
    /// Savings percentage with the trailing `%` stripped.
    pub fn savings_ratio(&self) -> Option<f64> {
        let raw = self.spot_saving_rate.trim();
        let raw = raw.strip_suffix('%').unwrap_or(raw);
        raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
    }

    pub fn price(&self) -> Option<f64> {
        self.spot_price
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && *v >= 0.0)
    }

    /// Spot price divided by vCPU count. `None` when either is unusable.
    pub fn price_per_vcpu(&self) -> Option<f64> {
        if self.vcpus == 0 {
            return None;
        }
        Some(self.price()? / f64::from(self.vcpus))
    }

    /// Ascending by price-per-vCPU; unpriceable offers sort last.
    pub fn cmp_price_per_vcpu(&self, other: &Self) -> Ordering {
        let a = self.price_per_vcpu().unwrap_or(f64::INFINITY);
        let b = other.price_per_vcpu().unwrap_or(f64::INFINITY);
        a.total_cmp(&b)
    }
}

/// Filtered offers for one region, cheapest per vCPU first.
pub type RegionSnapshot = Vec<Offer>;

/// Stable sort of a snapshot by price-per-vCPU.
pub fn sort_snapshot(offers: &mut RegionSnapshot) {
    offers.sort_by(Offer::cmp_price_per_vcpu);
}

/// A region's best offer, as it appears on the leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalDeal {
    pub instance_type: String,
    #[serde(rename = "cpus")]
    pub vcpus: u32,
    pub memory: String,
    pub price: f64,
    #[serde(rename = "pricePerVCPU")]
    pub price_per_vcpu: f64,
    pub region: String,
}

impl GlobalDeal {
    /// Builds a leaderboard entry; `None` if the offer cannot be priced.
    pub fn from_offer(region: &str, offer: &Offer) -> Option<Self> {
        Some(Self {
            instance_type: offer.instance_type.clone(),
            vcpus: offer.vcpus,
            memory: offer.memory.clone(),
            price: offer.price()?,
            price_per_vcpu: offer.price_per_vcpu()?,
            region: region.to_string(),
        })
    }
}

/// The persisted artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpotDataset {
    #[serde(with = "rfc3339")]
    pub last_updated: DateTime<Utc>,
    #[serde(default)]
    pub regions: BTreeMap<String, RegionSnapshot>,
    #[serde(default)]
    pub global_top_5: Vec<GlobalDeal>,
}

impl SpotDataset {
    pub fn new(last_updated: DateTime<Utc>) -> Self {
        Self {
            last_updated,
            regions: BTreeMap::new(),
            global_top_5: Vec::new(),
        }
    }
}

mod rfc3339 {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(D::Error::custom)
    }
}
