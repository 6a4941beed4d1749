//! Duration parsing utilities.

use anyhow::Context;
use std::time::Duration;

/// Parse a duration string like "1h", "30m", "300s", "300" into seconds.
/// Supports:
/// - Plain numbers (interpreted as seconds): "300"
/// - Seconds suffix: "300s"
/// - Minutes suffix: "30m"
/// - Hours suffix: "1h"
///
/// Negative values parse, so "-1" can be used as the one-shot sentinel.
pub fn parse_duration_to_secs(s: &str) -> anyhow::Result<i64> {
    let s = s.trim();
    if s.is_empty() {
        anyhow::bail!("Empty duration string");
    }

    // Check for suffix
    if let Some(num_str) = s.strip_suffix('h') {
        let hours: i64 = num_str
            .parse()
            .with_context(|| format!("Invalid hours value: {num_str}"))?;
        return hours
            .checked_mul(3600)
            .with_context(|| format!("Duration too large: {s}"));
    }
    if let Some(num_str) = s.strip_suffix('m') {
        let minutes: i64 = num_str
            .parse()
            .with_context(|| format!("Invalid minutes value: {num_str}"))?;
        return minutes
            .checked_mul(60)
            .with_context(|| format!("Duration too large: {s}"));
    }
    if let Some(num_str) = s.strip_suffix('s') {
        let secs: i64 = num_str
            .parse()
            .with_context(|| format!("Invalid seconds value: {num_str}"))?;
        return Ok(secs);
    }

    // No suffix - treat as seconds
    s.parse::<i64>()
        .with_context(|| format!("Invalid duration value: {s}"))
}

/// Parse a request timeout. Must be at least one second.
pub fn parse_timeout(s: &str) -> anyhow::Result<Duration> {
    let secs = parse_duration_to_secs(s)?;
    if secs <= 0 {
        anyhow::bail!("Timeout must be positive, got {s}");
    }
    Ok(Duration::from_secs(secs as u64))
}
