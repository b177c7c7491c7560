use crate::config::ScanConfig;
use crate::error::{Result, ScanError};
use crate::ports::PortSelection;
use crate::probe::{PortProbe, TcpProber};
use crate::types::{ProbeResult, ScanReport, ScanSummary};
use ::time::{format_description::well_known, OffsetDateTime};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Live counters for observers outside the scan loop (progress bars, status endpoints).
///
/// Only the coordinator loop writes to these.
#[derive(Clone, Debug)]
pub struct SharedProgress {
    pub scanned_total: Arc<AtomicU64>,
    pub scanned_done: Arc<AtomicU64>,
    pub open_count: Arc<AtomicU64>,
}

impl SharedProgress {
    pub fn new() -> Self {
        Self {
            scanned_total: Arc::new(AtomicU64::new(0)),
            scanned_done: Arc::new(AtomicU64::new(0)),
            open_count: Arc::new(AtomicU64::new(0)),
        }
    }

    /// `(done, total, open)` at this instant.
    pub fn snapshot(&self) -> (u64, u64, u64) {
        (
            self.scanned_done.load(Ordering::Relaxed),
            self.scanned_total.load(Ordering::Relaxed),
            self.open_count.load(Ordering::Relaxed),
        )
    }

    fn reset(&self, total: u64) {
        self.scanned_total.store(total, Ordering::Relaxed);
        self.scanned_done.store(0, Ordering::Relaxed);
        self.open_count.store(0, Ordering::Relaxed);
    }

    fn record(&self, result: &ProbeResult) {
        if result.is_open() {
            self.open_count.fetch_add(1, Ordering::Relaxed);
        }
        self.scanned_done.fetch_add(1, Ordering::Relaxed);
    }
}

impl Default for SharedProgress {
    fn default() -> Self {
        Self::new()
    }
}

/// Scan coordinator: fans probes out under a concurrency ceiling and folds
/// their results back in as they complete.
#[derive(Debug)]
pub struct Scanner<P = TcpProber> {
    config: ScanConfig,
    prober: Arc<P>,
    progress: SharedProgress,
}

impl Scanner<TcpProber> {
    pub fn new(config: ScanConfig) -> Self {
        let prober = TcpProber::from(&config);
        Self::with_prober(config, prober)
    }
}

impl<P: PortProbe> Scanner<P> {
    pub fn with_prober(config: ScanConfig, prober: P) -> Self {
        Self {
            config,
            prober: Arc::new(prober),
            progress: SharedProgress::new(),
        }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Handle to the live counters of this scanner.
    pub fn progress(&self) -> SharedProgress {
        self.progress.clone()
    }

    /// Resolve `target` and scan every selected port.
    pub async fn run(
        &self,
        target: &str,
        ports: &PortSelection,
        cancel: CancellationToken,
    ) -> Result<ScanReport> {
        self.run_with(target, ports, cancel, |_| {}).await
    }

    /// Like [`Scanner::run`], calling `on_result` for each port as soon as its probe completes.
    pub async fn run_with<F>(
        &self,
        target: &str,
        ports: &PortSelection,
        cancel: CancellationToken,
        on_result: F,
    ) -> Result<ScanReport>
    where
        F: FnMut(&ProbeResult),
    {
        let addr = resolve_target(target).await?;
        self.run_addr(target, addr, ports, cancel, on_result).await
    }

    /// Scan an already resolved address. `label` is reported as the summary's target.
    ///
    /// Returns once every dispatched probe has completed, or promptly after
    /// `cancel` fires. A cancelled run aborts in-flight probes (closing their
    /// sockets) and returns the partial report with `summary.cancelled` set.
    pub async fn run_addr<F>(
        &self,
        label: &str,
        addr: IpAddr,
        ports: &PortSelection,
        cancel: CancellationToken,
        mut on_result: F,
    ) -> Result<ScanReport>
    where
        F: FnMut(&ProbeResult),
    {
        let total = ports.len() as u64;
        let limit = self.config.effective_concurrency();
        self.progress.reset(total);

        let mut summary = ScanSummary {
            target: label.to_string(),
            address: addr.to_string(),
            started_at: now_iso_like(),
            scanned_total: total,
            ..Default::default()
        };
        let mut results: Vec<ProbeResult> = Vec::with_capacity(ports.len());

        info!(host = label, %addr, ports = total, concurrency = limit, "scan started");

        let sem = Arc::new(Semaphore::new(limit));
        let mut set: JoinSet<ProbeResult> = JoinSet::new();
        let mut in_flight: HashMap<tokio::task::Id, u16> = HashMap::new();
        let mut queue = ports.iter().peekable();
        let start = Instant::now();

        loop {
            let more = queue.peek().is_some();
            if !more && set.is_empty() {
                break;
            }

            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    warn!(
                        in_flight = set.len(),
                        completed = summary.scanned_done,
                        "scan cancelled, abandoning in-flight probes"
                    );
                    set.abort_all();
                    summary.cancelled = true;
                    break;
                }

                Some(joined) = set.join_next_with_id(), if !set.is_empty() => {
                    let result = match joined {
                        Ok((id, result)) => {
                            in_flight.remove(&id);
                            result
                        }
                        Err(e) => {
                            let Some(port) = in_flight.remove(&e.id()) else {
                                continue;
                            };
                            if e.is_cancelled() {
                                continue;
                            }
                            error!(port, "probe task panicked");
                            ProbeResult::error(port, Duration::ZERO, format!("probe task failed: {e}"))
                        }
                    };
                    summary.record(&result);
                    self.progress.record(&result);
                    on_result(&result);
                    results.push(result);
                }

                permit = sem.clone().acquire_owned(), if more => {
                    let permit = permit.map_err(|_| ScanError::PoolClosed)?;
                    if let Some(port) = queue.next() {
                        let prober = Arc::clone(&self.prober);
                        let handle = set.spawn(async move {
                            let _permit = permit; // keep permit until the probe completes
                            prober.probe(addr, port).await
                        });
                        in_flight.insert(handle.id(), port);
                    }
                }
            }
        }

        summary.elapsed_ms = start.elapsed().as_millis() as u64;
        results.sort_by_key(|r| r.port);

        info!(
            host = label,
            scanned = summary.scanned_done,
            open = summary.open_count,
            elapsed_ms = summary.elapsed_ms,
            cancelled = summary.cancelled,
            "scan finished"
        );

        Ok(ScanReport { summary, results })
    }
}

/// Scan ports `1..=port_count` of `target` with a fresh, uncancellable scanner.
pub async fn scan_range(target: &str, port_count: u16, config: ScanConfig) -> Result<ScanReport> {
    Scanner::new(config)
        .run(target, &PortSelection::Range(port_count), CancellationToken::new())
        .await
}

/// Resolve a host name or IP literal to the single address every probe will use.
pub async fn resolve_target(target: &str) -> Result<IpAddr> {
    let target = target.trim();
    if let Ok(ip) = target.parse::<IpAddr>() {
        return Ok(ip);
    }

    let mut addrs = tokio::net::lookup_host((target, 0))
        .await
        .map_err(|e| ScanError::Resolve {
            target: target.to_string(),
            reason: e.to_string(),
        })?;
    let addr = addrs.next().map(|sa| sa.ip()).ok_or_else(|| ScanError::Resolve {
        target: target.to_string(),
        reason: "no addresses returned".to_string(),
    })?;
    debug!(host = target, %addr, "resolved target");
    Ok(addr)
}

fn now_iso_like() -> String {
    let now = OffsetDateTime::now_utc();
    now.format(&well_known::Rfc3339)
        .unwrap_or_else(|_| String::from("1970-01-01T00:00:00Z"))
}
