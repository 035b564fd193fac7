//! Production collaborators for image post-processing: a filesystem-backed
//! object store and a `pdftoppm`-based document converter.

use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::traits::{DocumentConverter, ObjectStore};

/// Root data directory, controlled by `DATA_DIR` env var (default: `"data"`).
pub fn data_dir() -> PathBuf {
    PathBuf::from(std::env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string()))
}

// ---------------------------------------------------------------------------
// LocalAssetStore
// ---------------------------------------------------------------------------

/// Writes assets under `{root}/assets/{key}` and returns
/// `{base_url}/{key}` as the public URL. Good enough for single-host
/// deployments with the assets directory served statically.
pub struct LocalAssetStore {
    root: PathBuf,
    base_url: String,
}

impl LocalAssetStore {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ObjectStore for LocalAssetStore {
    async fn upload(&self, key: &str, bytes: Vec<u8>) -> Result<String> {
        let path = self.root.join("assets").join(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        tokio::fs::write(&path, &bytes)
            .await
            .with_context(|| format!("writing {}", path.display()))?;
        debug!(key, bytes = bytes.len(), "Stored asset");
        Ok(format!("{}/{key}", self.base_url))
    }
}

// ---------------------------------------------------------------------------
// PdftoppmConverter
// ---------------------------------------------------------------------------

/// Converts an exported PDF into one PNG per page by shelling out to
/// `pdftoppm` (poppler-utils). Pages come back in page order.
pub struct PdftoppmConverter {
    /// Render resolution in DPI.
    resolution: u32,
}

impl PdftoppmConverter {
    pub fn new() -> Self {
        Self { resolution: 150 }
    }
}

impl Default for PdftoppmConverter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentConverter for PdftoppmConverter {
    async fn convert(&self, document: &[u8]) -> Result<Vec<Vec<u8>>> {
        let work_dir = std::env::temp_dir().join(format!("ripple-convert-{}", Uuid::new_v4()));
        tokio::fs::create_dir_all(&work_dir).await?;

        let result = self.convert_in(&work_dir, document).await;

        if let Err(e) = tokio::fs::remove_dir_all(&work_dir).await {
            warn!(dir = %work_dir.display(), error = %e, "Failed to clean up conversion dir");
        }

        result
    }
}

impl PdftoppmConverter {
    async fn convert_in(&self, work_dir: &PathBuf, document: &[u8]) -> Result<Vec<Vec<u8>>> {
        let input = work_dir.join("document.pdf");
        tokio::fs::write(&input, document).await?;

        let prefix = work_dir.join("page");
        let output = Command::new("pdftoppm")
            .arg("-png")
            .arg("-r")
            .arg(self.resolution.to_string())
            .arg(&input)
            .arg(&prefix)
            .output()
            .await
            .context("running pdftoppm (is poppler-utils installed?)")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("pdftoppm exited with error: {stderr}");
        }

        // pdftoppm names pages `page-1.png`, `page-2.png`, ... zero-padded
        // for multi-digit counts; lexicographic order is not page order, so
        // sort on the parsed page number.
        let mut pages: Vec<(u32, PathBuf)> = Vec::new();
        let mut entries = tokio::fs::read_dir(work_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().to_string();
            if let Some(number) = name
                .strip_prefix("page-")
                .and_then(|rest| rest.strip_suffix(".png"))
                .and_then(|n| n.parse::<u32>().ok())
            {
                pages.push((number, path));
            }
        }
        pages.sort_by_key(|(number, _)| *number);

        let mut buffers = Vec::with_capacity(pages.len());
        for (_, path) in pages {
            buffers.push(tokio::fs::read(&path).await?);
        }
        debug!(pages = buffers.len(), "Converted document to images");
        Ok(buffers)
    }
}
