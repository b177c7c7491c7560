use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Classification of a single port probe.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ProbeStatus {
    /// TCP handshake completed within the connect timeout.
    Open,
    /// Peer actively refused the connection.
    Closed,
    /// No answer before the connect timeout.
    Filtered,
    /// The local OS denied the attempt.
    Blocked,
    /// Any other transport failure.
    Error,
}

impl fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProbeStatus::Open => "open",
            ProbeStatus::Closed => "closed",
            ProbeStatus::Filtered => "filtered",
            ProbeStatus::Blocked => "blocked",
            ProbeStatus::Error => "error",
        };
        f.write_str(s)
    }
}

/// Outcome of probing one port.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub port: u16,
    pub status: ProbeStatus,
    pub latency_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub banner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProbeResult {
    pub fn open(port: u16, latency: Duration, banner: Option<String>, service: &str) -> Self {
        Self {
            port,
            status: ProbeStatus::Open,
            latency_ms: latency.as_millis() as u64,
            banner,
            service: Some(service.to_string()),
            error: None,
        }
    }

    /// Result for any non-open outcome other than [`ProbeStatus::Error`].
    pub fn unreachable(port: u16, status: ProbeStatus, latency: Duration) -> Self {
        debug_assert!(!matches!(status, ProbeStatus::Open | ProbeStatus::Error));
        Self {
            port,
            status,
            latency_ms: latency.as_millis() as u64,
            banner: None,
            service: None,
            error: None,
        }
    }

    pub fn error(port: u16, latency: Duration, detail: impl Into<String>) -> Self {
        Self {
            port,
            status: ProbeStatus::Error,
            latency_ms: latency.as_millis() as u64,
            banner: None,
            service: None,
            error: Some(detail.into()),
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == ProbeStatus::Open
    }
}

/// Aggregate over every result of one run.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ScanSummary {
    pub target: String,
    pub address: String,
    /// RFC3339 UTC timestamp taken when dispatch began.
    pub started_at: String,
    /// Ports requested for this run.
    pub scanned_total: u64,
    /// Ports whose probe actually completed.
    pub scanned_done: u64,
    pub open_count: u64,
    pub closed_count: u64,
    pub filtered_count: u64,
    pub blocked_count: u64,
    pub error_count: u64,
    pub elapsed_ms: u64,
    /// Set when the run was stopped before every port completed.
    pub cancelled: bool,
}

impl ScanSummary {
    pub fn elapsed(&self) -> Duration {
        Duration::from_millis(self.elapsed_ms)
    }

    /// Fold one completed probe into the counters.
    pub(crate) fn record(&mut self, result: &ProbeResult) {
        self.scanned_done += 1;
        let slot = match result.status {
            ProbeStatus::Open => &mut self.open_count,
            ProbeStatus::Closed => &mut self.closed_count,
            ProbeStatus::Filtered => &mut self.filtered_count,
            ProbeStatus::Blocked => &mut self.blocked_count,
            ProbeStatus::Error => &mut self.error_count,
        };
        *slot += 1;
    }
}

/// Summary plus every per-port result, sorted by port.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct ScanReport {
    pub summary: ScanSummary,
    pub results: Vec<ProbeResult>,
}

impl ScanReport {
    pub fn open_ports(&self) -> impl Iterator<Item = &ProbeResult> {
        self.results.iter().filter(|r| r.is_open())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_tallies_each_status_once() {
        let mut summary = ScanSummary::default();
        let d = Duration::from_millis(3);
        summary.record(&ProbeResult::open(80, d, None, "HTTP"));
        summary.record(&ProbeResult::unreachable(81, ProbeStatus::Closed, d));
        summary.record(&ProbeResult::unreachable(82, ProbeStatus::Filtered, d));
        summary.record(&ProbeResult::unreachable(83, ProbeStatus::Blocked, d));
        summary.record(&ProbeResult::error(84, d, "boom"));
        summary.record(&ProbeResult::open(85, d, Some("hi".into()), "unknown"));

        assert_eq!(summary.scanned_done, 6);
        assert_eq!(summary.open_count, 2);
        assert_eq!(summary.closed_count, 1);
        assert_eq!(summary.filtered_count, 1);
        assert_eq!(summary.blocked_count, 1);
        assert_eq!(summary.error_count, 1);
    }

    #[test]
    fn optional_fields_are_omitted_from_json() {
        let r = ProbeResult::unreachable(22, ProbeStatus::Closed, Duration::ZERO);
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["status"], "closed");
        assert!(v.get("banner").is_none());
        assert!(v.get("error").is_none());
    }
}
