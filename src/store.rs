//! Persistence of the dataset behind a minimal load/store contract.

use crate::errors::Result;
use crate::models::SpotDataset;
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Where datasets live between runs.
pub trait DatasetStore {
    /// Previously stored dataset, or `None` if there is nothing usable.
    fn load(&self) -> impl Future<Output = Result<Option<SpotDataset>>> + Send;
    /// Replaces the stored dataset in a single step.
    fn store(&self, dataset: &SpotDataset) -> impl Future<Output = Result<()>> + Send;
}

/// Pretty-printed JSON file, replaced atomically via a sibling temp file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

/// Canonical file contents: two-space indentation, trailing newline.
pub fn to_canonical_json(dataset: &SpotDataset) -> Result<String> {
    let mut text = serde_json::to_string_pretty(dataset)?;
    text.push('\n');
    Ok(text)
}

impl DatasetStore for JsonFileStore {
    async fn load(&self) -> Result<Option<SpotDataset>> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(t) => t,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str(&text) {
            Ok(ds) => Ok(Some(ds)),
            Err(e) => {
                // An unreadable file is rewritten from scratch on this run.
                warn!(path = %self.path.display(), error = %e, "[STORE] existing dataset unreadable");
                Ok(None)
            }
        }
    }

    async fn store(&self, dataset: &SpotDataset) -> Result<()> {
        let text = to_canonical_json(dataset)?;
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await?;
        }
        let tmp = self.temp_path();
        tokio::fs::write(&tmp, text.as_bytes()).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        info!(
            path = %self.path.display(),
            bytes = text.len(),
            regions = dataset.regions.len(),
            "[STORE] dataset written"
        );
        Ok(())
    }
}
