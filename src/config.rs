//! Scan tuning knobs.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default maximum number of probes in flight.
pub const DEFAULT_CONCURRENCY: usize = 50;
/// Default bound on a single TCP connect.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);
/// Default bound on the banner read after a successful connect.
pub const DEFAULT_BANNER_TIMEOUT: Duration = Duration::from_secs(2);

/// Upper clamp for the concurrency ceiling.
pub const MAX_CONCURRENCY: usize = 5_000;

/// Parameters fixed for the duration of one scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Max concurrent probes.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Connect timeout per port.
    #[serde(default = "default_connect_timeout", with = "duration_ms")]
    pub connect_timeout: Duration,

    /// Banner read timeout per open port.
    #[serde(default = "default_banner_timeout", with = "duration_ms")]
    pub banner_timeout: Duration,
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

fn default_connect_timeout() -> Duration {
    DEFAULT_CONNECT_TIMEOUT
}

fn default_banner_timeout() -> Duration {
    DEFAULT_BANNER_TIMEOUT
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            banner_timeout: DEFAULT_BANNER_TIMEOUT,
        }
    }
}

impl ScanConfig {
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_banner_timeout(mut self, timeout: Duration) -> Self {
        self.banner_timeout = timeout;
        self
    }

    /// Concurrency ceiling actually used by the worker pool.
    pub fn effective_concurrency(&self) -> usize {
        self.concurrency.clamp(1, MAX_CONCURRENCY)
    }
}

/// Durations are written as whole milliseconds in JSON.
mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
