//! Watermark persistence for salesforce-sync
//!
//! A watermark is the tracking-field value of the most recent record seen
//! across all prior extraction cycles. It is stored as a single scalar string
//! with no wrapping structure, so an operator can inspect or reset it with a
//! text editor.
//!
//! # Architecture
//!
//! - `WatermarkStore` - Trait for loading and saving the watermark
//! - `FileWatermarkStore` - Plain-text file, overwritten on every save
//! - `NullWatermarkStore` - Used when no watermark file is configured
//!
//! A missing file is always treated as "no watermark yet", which makes the
//! next cycle a full load.

mod filesystem;
pub mod store;

#[cfg(test)]
mod tests;

// Re-export store trait and types
pub use store::{NullWatermarkStore, WatermarkStore};

// Re-export storage implementations
pub use filesystem::FileWatermarkStore;
