//! Timers backing `sleep`
//!
//! Every delay goes through a [`Timer`], including zero-length ones, so a
//! sleep never completes synchronously. [`MockClock`] records each requested
//! delay instead of waiting, which makes sleeps instant and inspectable in
//! tests and in `clock: virtual` runs.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

#[async_trait]
pub trait Timer: Send + Sync + fmt::Debug {
    /// Suspend the current future for `duration`
    async fn delay(&self, duration: Duration);
}

/// Wall-clock timer backed by tokio
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioTimer;

#[async_trait]
impl Timer for TokioTimer {
    async fn delay(&self, duration: Duration) {
        if duration.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(duration).await;
        }
    }
}

/// Which timer a run uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClockMode {
    #[default]
    Real,
    Virtual,
}

impl ClockMode {
    pub fn timer(&self) -> Arc<dyn Timer> {
        match self {
            ClockMode::Real => Arc::new(TokioTimer),
            ClockMode::Virtual => Arc::new(MockClock::new()),
        }
    }
}

/// Virtual timer: every delay is recorded and completes immediately
#[derive(Debug, Clone, Default)]
pub struct MockClock {
    /// Every delay requested through the timer, in order
    delays: Arc<RwLock<Vec<Duration>>>,
}

impl MockClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn delays(&self) -> Vec<Duration> {
        self.delays.read().await.clone()
    }

    pub async fn last_delay(&self) -> Option<Duration> {
        self.delays.read().await.last().copied()
    }
}

#[async_trait]
impl Timer for MockClock {
    async fn delay(&self, duration: Duration) {
        self.delays.write().await.push(duration);
        tokio::task::yield_now().await;
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    #[error("Invalid duration format: {0}")]
    InvalidDurationFormat(String),
}

/// Parse a duration string like "1h30m", "500ms", "2d"
///
/// A bare number is read as seconds.
pub fn parse_duration(s: &str) -> Result<Duration, ClockError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(ClockError::InvalidDurationFormat(
            "empty string".to_string(),
        ));
    }

    if let Ok(secs) = s.parse::<f64>() {
        return seconds(secs, s);
    }

    let mut total = Duration::ZERO;
    let mut chars = s.chars().peekable();

    while chars.peek().is_some() {
        let mut num = String::new();
        while let Some(c) = chars.peek().copied().filter(|c| c.is_ascii_digit() || *c == '.') {
            num.push(c);
            chars.next();
        }

        let mut unit = String::new();
        while let Some(c) = chars.peek().copied().filter(|c| c.is_ascii_alphabetic()) {
            unit.push(c);
            chars.next();
        }

        if num.is_empty() {
            return Err(ClockError::InvalidDurationFormat(format!(
                "expected number before unit '{}'",
                unit
            )));
        }

        let value: f64 = num.parse().map_err(|_| {
            ClockError::InvalidDurationFormat(format!("invalid number: {}", num))
        })?;

        let secs = match unit.as_str() {
            "ms" => value / 1000.0,
            "s" | "" => value,
            "m" => value * 60.0,
            "h" => value * 60.0 * 60.0,
            "d" => value * 24.0 * 60.0 * 60.0,
            other => {
                return Err(ClockError::InvalidDurationFormat(format!(
                    "unknown unit '{}'",
                    other
                )))
            }
        };

        total += seconds(secs, s)?;
    }

    Ok(total)
}

fn seconds(secs: f64, original: &str) -> Result<Duration, ClockError> {
    Duration::try_from_secs_f64(secs).map_err(|_| {
        ClockError::InvalidDurationFormat(format!("'{}' is not a valid duration", original))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_clock_records_delays() {
        let clock = MockClock::new();

        clock.delay(Duration::from_millis(10_000)).await;
        clock.delay(Duration::ZERO).await;
        clock.delay(Duration::from_millis(500)).await;

        assert_eq!(
            clock.delays().await,
            vec![
                Duration::from_millis(10_000),
                Duration::ZERO,
                Duration::from_millis(500)
            ]
        );
        assert_eq!(clock.last_delay().await, Some(Duration::from_millis(500)));
    }

    #[tokio::test]
    async fn test_tokio_timer_zero_delay_completes() {
        TokioTimer.delay(Duration::ZERO).await;
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_duration("30m").unwrap(), Duration::from_secs(1800));
        assert_eq!(parse_duration("1h30m").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("1d").unwrap(), Duration::from_secs(86400));
        assert_eq!(parse_duration("2.5").unwrap(), Duration::from_millis(2500));
        assert_eq!(parse_duration("10").unwrap(), Duration::from_secs(10));
    }

    #[test]
    fn test_parse_duration_rejects_garbage() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("ms").is_err());
        assert!(parse_duration("5y").is_err());
        assert!(parse_duration("-1").is_err());
    }

    #[test]
    fn test_clock_mode_parses() {
        let mode: ClockMode = serde_yaml::from_str("virtual").unwrap();
        assert_eq!(mode, ClockMode::Virtual);
        assert_eq!(ClockMode::default(), ClockMode::Real);
    }
}
