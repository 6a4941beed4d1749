//! Unit tests for the checkpoint crate.

use tempfile::TempDir;

use crate::{FileWatermarkStore, NullWatermarkStore, WatermarkStore};

// ============================================================================
// FileWatermarkStore Tests
// ============================================================================

#[tokio::test]
async fn test_load_missing_file_returns_none() {
    let dir = TempDir::new().unwrap();
    let store = FileWatermarkStore::new(dir.path().join("watermark"));

    assert_eq!(store.load().await.unwrap(), None);
}

#[tokio::test]
async fn test_save_then_load_returns_value() {
    let dir = TempDir::new().unwrap();
    let store = FileWatermarkStore::new(dir.path().join("watermark"));

    store.save("2024-01-01T00:00:00.000+0000").await.unwrap();
    assert_eq!(
        store.load().await.unwrap().as_deref(),
        Some("2024-01-01T00:00:00.000+0000")
    );
}

#[tokio::test]
async fn test_save_overwrites_previous_value() {
    let dir = TempDir::new().unwrap();
    let store = FileWatermarkStore::new(dir.path().join("watermark"));

    store.save("a much longer first value").await.unwrap();
    store.save("short").await.unwrap();

    assert_eq!(store.load().await.unwrap().as_deref(), Some("short"));
    let raw = std::fs::read_to_string(store.path()).unwrap();
    assert_eq!(raw, "short");
}

#[tokio::test]
async fn test_load_returns_trailing_whitespace_verbatim() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("watermark");
    // Written by hand, e.g. an editor adding a final newline
    std::fs::write(&path, "2024-01-01T00:00:00Z\n").unwrap();

    let store = FileWatermarkStore::new(&path);
    assert_eq!(
        store.load().await.unwrap().as_deref(),
        Some("2024-01-01T00:00:00Z\n")
    );
}

#[tokio::test]
async fn test_save_creates_parent_directories() {
    let dir = TempDir::new().unwrap();
    let store = FileWatermarkStore::new(dir.path().join("state").join("lead").join("watermark"));

    store.save("42").await.unwrap();
    assert_eq!(store.load().await.unwrap().as_deref(), Some("42"));
}

#[tokio::test]
async fn test_save_leaves_no_temp_file() {
    let dir = TempDir::new().unwrap();
    let store = FileWatermarkStore::new(dir.path().join("watermark"));

    store.save("v1").await.unwrap();

    let names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(names, vec!["watermark".to_string()]);
}

#[tokio::test]
async fn test_load_directory_is_an_error() {
    let dir = TempDir::new().unwrap();
    let store = FileWatermarkStore::new(dir.path());

    assert!(store.load().await.is_err());
}

// ============================================================================
// NullWatermarkStore Tests
// ============================================================================

#[tokio::test]
async fn test_null_store_never_returns_a_watermark() {
    let store = NullWatermarkStore;
    store.save("ignored").await.unwrap();
    assert_eq!(store.load().await.unwrap(), None);
}
