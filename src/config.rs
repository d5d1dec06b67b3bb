//! Configuration loader and pipeline settings.

use crate::errors::{AppError, Result};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

const DEFAULT_REGIONS_URL: &str =
    "https://b0.p.awsstatic.com/locations/1.0/aws/current/locations.json";
const DEFAULT_PRICING_URL: &str = "https://ec2.shop";

/// Consolidated application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Directory document listing every known location.
    pub regions_url: String,
    /// Pricing endpoint queried once per region.
    pub pricing_url: String,
    /// Location `type` tag kept by the region catalog.
    pub region_type: String,
    /// Storage attachment filter passed to the pricing endpoint.
    pub storage_filter: String,
    pub min_vcpus: u32,
    pub max_vcpus: u32,
    /// Offers must save strictly more than this percentage.
    pub min_savings_pct: f64,
    /// Leaderboard length
    pub top_n: usize,
    /// Where the dataset is persisted.
    pub output_path: PathBuf,
    /// Upper bound on in-flight region fetches.
    pub max_concurrency: usize,
    /// Deadline for a single region fetch.
    pub request_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            regions_url: DEFAULT_REGIONS_URL.to_string(),
            pricing_url: DEFAULT_PRICING_URL.to_string(),
            region_type: "AWS Region".to_string(),
            storage_filter: "ebs".to_string(),
            min_vcpus: 4,
            max_vcpus: 32,
            min_savings_pct: 50.0,
            top_n: 5,
            output_path: PathBuf::from("docs/spot_data.json"),
            max_concurrency: 8,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl AppConfig {
    /// Start from the defaults and apply any `SPOT_*` environment overrides.
    pub fn load() -> Result<Self> {
        let mut cfg = Self::default();
        if let Some(v) = env_var("SPOT_REGIONS_URL") {
            cfg.regions_url = v;
        }
        if let Some(v) = env_var("SPOT_PRICING_URL") {
            cfg.pricing_url = v;
        }
        if let Some(v) = env_var("SPOT_OUTPUT_PATH") {
            cfg.output_path = PathBuf::from(v);
        }
        if let Some(v) = env_var("SPOT_MAX_CONCURRENCY") {
            cfg.max_concurrency = parse_env("SPOT_MAX_CONCURRENCY", &v)?;
        }
        if let Some(v) = env_var("SPOT_REQUEST_TIMEOUT_SECS") {
            cfg.request_timeout =
                Duration::from_secs(parse_env("SPOT_REQUEST_TIMEOUT_SECS", &v)?);
        }
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.regions_url)?;
        Url::parse(&self.pricing_url)?;
        if self.min_vcpus == 0 || self.min_vcpus > self.max_vcpus {
            return Err(AppError::Config(format!(
                "invalid vCPU range {}..={}",
                self.min_vcpus, self.max_vcpus
            )));
        }
        if self.max_concurrency == 0 {
            return Err(AppError::Config(
                "max_concurrency must be at least 1".to_string(),
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(AppError::Config(
                "request_timeout must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Value of the `filter` query parameter, e.g. `ebs,cpu>=4,cpu<=32`.
    pub fn pricing_filter(&self) -> String {
        format!(
            "{},cpu>={},cpu<={}",
            self.storage_filter, self.min_vcpus, self.max_vcpus
        )
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T: FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| AppError::Config(format!("{key} has invalid value {raw:?}")))
}
