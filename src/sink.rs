//! JSON lines event sink.

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sync_core::{EventSink, NormalizedEvent};
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};

/// Writes one JSON object per event, one event per line.
///
/// Keys appear in projection order and timestamps as RFC 3339 strings.
/// Output is buffered and flushed at the end of every cycle.
pub struct JsonlSink {
    writer: BufWriter<Box<dyn AsyncWrite + Unpin + Send>>,
    written: u64,
}

impl JsonlSink {
    pub fn new(writer: impl AsyncWrite + Unpin + Send + 'static) -> Self {
        Self {
            writer: BufWriter::new(Box::new(writer)),
            written: 0,
        }
    }

    /// Write to standard output.
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }

    /// Append to a file, creating it if needed.
    pub async fn append_to(path: &Path) -> Result<Self> {
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .with_context(|| format!("Failed to open output file {}", path.display()))?;
        Ok(Self::new(file))
    }

    /// Number of events written so far.
    pub fn written(&self) -> u64 {
        self.written
    }
}

#[async_trait]
impl EventSink for JsonlSink {
    async fn emit(&mut self, event: NormalizedEvent) -> Result<()> {
        let mut line = serde_json::to_vec(&event).context("Failed to serialize event")?;
        line.push(b'\n');
        self.writer
            .write_all(&line)
            .await
            .context("Failed to write event")?;
        self.written += 1;
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        self.writer.flush().await.context("Failed to flush output")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use sync_core::UniversalValue;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_writes_one_line_per_event() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("events.jsonl");

        let mut sink = JsonlSink::append_to(&path).await.unwrap();
        for id in ["001", "002"] {
            let mut event = NormalizedEvent::new();
            event.insert("id", UniversalValue::from(id));
            event.insert(
                "created_date",
                UniversalValue::DateTime(Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap()),
            );
            sink.emit(event).await.unwrap();
        }
        sink.flush().await.unwrap();
        assert_eq!(sink.written(), 2);

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(
            lines,
            vec![
                r#"{"id":"001","created_date":"2024-01-15T10:30:00Z"}"#,
                r#"{"id":"002","created_date":"2024-01-15T10:30:00Z"}"#,
            ]
        );
    }

    #[tokio::test]
    async fn test_appends_across_runs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("events.jsonl");

        for _ in 0..2 {
            let mut sink = JsonlSink::append_to(&path).await.unwrap();
            let mut event = NormalizedEvent::new();
            event.insert("id", UniversalValue::from("001"));
            sink.emit(event).await.unwrap();
            sink.flush().await.unwrap();
        }

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
    }
}
