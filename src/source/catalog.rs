use super::RegionSource;
use crate::config::AppConfig;
use crate::errors::{AppError, Result};
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
struct LocationMsg {
    #[serde(default)]
    code: Option<String>,
    #[serde(rename = "type", default)]
    kind: String,
}

/// Reads the provider's location directory and keeps primary regions only.
#[derive(Clone)]
pub struct RegionCatalog {
    client: reqwest::Client,
    url: String,
    region_type: String,
}

impl RegionCatalog {
    pub fn new(client: reqwest::Client, config: &AppConfig) -> Self {
        Self {
            client,
            url: config.regions_url.clone(),
            region_type: config.region_type.clone(),
        }
    }
}

impl RegionSource for RegionCatalog {
    async fn list_regions(&self) -> Result<Vec<String>> {
        let resp = self.client.get(&self.url).send().await?;
        if !resp.status().is_success() {
            return Err(AppError::Status {
                url: self.url.clone(),
                status: resp.status(),
            });
        }
        let body = resp.text().await?;
        let regions = parse_regions(&body, &self.region_type)?;
        info!(count = regions.len(), "[REGIONS] catalog loaded");
        Ok(regions)
    }
}

/// Extracts sorted, deduplicated identifiers of locations tagged `region_type`.
///
/// The descriptor's `code` wins over the map key when present.
pub fn parse_regions(body: &str, region_type: &str) -> Result<Vec<String>> {
    let locations: HashMap<String, LocationMsg> = serde_json::from_str(body)?;
    let mut skipped = 0usize;
    let mut ids = BTreeSet::new();
    for (key, loc) in locations {
        if loc.kind != region_type {
            skipped += 1;
            continue;
        }
        let id = loc
            .code
            .filter(|c| !c.trim().is_empty())
            .unwrap_or(key);
        ids.insert(id);
    }
    debug!(skipped, "[REGIONS] non-region locations ignored");
    Ok(ids.into_iter().collect())
}
