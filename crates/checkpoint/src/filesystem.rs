//! Filesystem-based watermark storage implementation.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::store::WatermarkStore;

/// Filesystem implementation of WatermarkStore trait.
///
/// Stores the watermark as the entire contents of a plain-text file. Saves
/// write a sibling temporary file and rename it over the target, so a crash
/// mid-write leaves either the previous value or no file at all.
#[derive(Debug, Clone)]
pub struct FileWatermarkStore {
    path: PathBuf,
}

impl FileWatermarkStore {
    /// Create a new FileWatermarkStore for the given file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the file path.
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

#[async_trait]
impl WatermarkStore for FileWatermarkStore {
    async fn load(&self) -> Result<Option<String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => {
                tracing::debug!("Loaded watermark from {}", self.path.display());
                Ok(Some(content))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(
                    "No watermark file at {}, starting from scratch",
                    self.path.display()
                );
                Ok(None)
            }
            Err(e) => Err(e).with_context(|| {
                format!("Failed to read watermark file {}", self.path.display())
            }),
        }
    }

    async fn save(&self, value: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.with_context(|| {
                    format!("Failed to create directory {}", parent.display())
                })?;
            }
        }

        let temp = self.temp_path();
        tokio::fs::write(&temp, value)
            .await
            .with_context(|| format!("Failed to write {}", temp.display()))?;
        tokio::fs::rename(&temp, &self.path).await.with_context(|| {
            format!(
                "Failed to move {} over {}",
                temp.display(),
                self.path.display()
            )
        })?;

        tracing::info!("Stored watermark to {}", self.path.display());
        Ok(())
    }
}
