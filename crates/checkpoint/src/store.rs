//! Watermark storage trait
//!
//! This module defines the WatermarkStore trait for reading and writing the
//! single scalar value that bounds incremental queries.

use anyhow::Result;
use async_trait::async_trait;

/// Trait for watermark storage operations.
///
/// Implementations are single-writer: only one connector instance may own a
/// given location.
#[async_trait]
pub trait WatermarkStore: Send + Sync {
    /// Read the stored watermark.
    ///
    /// Returns None if no watermark has been stored yet. The value is
    /// returned verbatim, including any trailing whitespace.
    async fn load(&self) -> Result<Option<String>>;

    /// Overwrite the stored watermark.
    async fn save(&self, value: &str) -> Result<()>;
}

/// Store used when incremental extraction is disabled.
///
/// Never returns a watermark and discards every save.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullWatermarkStore;

#[async_trait]
impl WatermarkStore for NullWatermarkStore {
    async fn load(&self) -> Result<Option<String>> {
        Ok(None)
    }

    async fn save(&self, _value: &str) -> Result<()> {
        Ok(())
    }
}
