use serde::Deserialize;
use std::time::Duration;
use tokio::time::Instant;

/// Unit of the window over which `request_limit` applies.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    #[serde(alias = "millisecond", alias = "ms")]
    Milliseconds,
    #[serde(alias = "second", alias = "s")]
    Seconds,
    #[serde(alias = "minute", alias = "m")]
    Minutes,
    #[serde(alias = "hour", alias = "h")]
    Hours,
    #[serde(alias = "day", alias = "d")]
    Days,
}

impl TimeUnit {
    /// Length of exactly one unit.
    pub fn duration(self) -> Duration {
        match self {
            TimeUnit::Milliseconds => Duration::from_millis(1),
            TimeUnit::Seconds => Duration::from_secs(1),
            TimeUnit::Minutes => Duration::from_secs(60),
            TimeUnit::Hours => Duration::from_secs(60 * 60),
            TimeUnit::Days => Duration::from_secs(24 * 60 * 60),
        }
    }
}

pub fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}
