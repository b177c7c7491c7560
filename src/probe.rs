//! Single-port TCP connect probe with opportunistic banner capture.

use std::future::Future;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{self, Instant};
use tracing::{debug, warn};

use crate::config::ScanConfig;
use crate::services;
use crate::types::{ProbeResult, ProbeStatus};

/// Bytes written to every freshly opened socket to coax a reply out of HTTP-like services.
pub const BANNER_PROBE: &[u8] = b"HEAD / HTTP/1.1\r\n\r\n";

/// Largest banner kept per port.
pub const BANNER_MAX_BYTES: usize = 1024;

/// Something that can classify one port of a target.
///
/// Implementations must never fail as a whole: every outcome is folded into
/// the returned [`ProbeResult`].
pub trait PortProbe: Send + Sync + 'static {
    fn probe(&self, target: IpAddr, port: u16) -> impl Future<Output = ProbeResult> + Send;
}

/// Real TCP connect prober.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcpProber {
    pub connect_timeout: Duration,
    pub banner_timeout: Duration,
}

impl TcpProber {
    pub fn new(connect_timeout: Duration, banner_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            banner_timeout,
        }
    }
}

impl From<&ScanConfig> for TcpProber {
    fn from(cfg: &ScanConfig) -> Self {
        Self::new(cfg.connect_timeout, cfg.banner_timeout)
    }
}

impl Default for TcpProber {
    fn default() -> Self {
        Self::from(&ScanConfig::default())
    }
}

impl PortProbe for TcpProber {
    fn probe(&self, target: IpAddr, port: u16) -> impl Future<Output = ProbeResult> + Send {
        probe_port(target, port, self.connect_timeout, self.banner_timeout)
    }
}

/// Probe `target:port`.
///
/// - Connect is bounded by `connect_timeout`; expiry means the port is filtered.
/// - On connect, [`BANNER_PROBE`] is sent and up to [`BANNER_MAX_BYTES`] are read,
///   bounded by `banner_timeout`. Silence leaves the banner empty and the port open.
/// - The socket is dropped on every path.
pub async fn probe_port(
    target: IpAddr,
    port: u16,
    connect_timeout: Duration,
    banner_timeout: Duration,
) -> ProbeResult {
    let addr = SocketAddr::new(target, port);
    let start = Instant::now();
    match time::timeout(connect_timeout, TcpStream::connect(addr)).await {
        Ok(Ok(mut stream)) => {
            let latency = start.elapsed();
            let banner = grab_banner(&mut stream, banner_timeout).await;
            debug!(%addr, latency_ms = latency.as_millis() as u64, has_banner = banner.is_some(), "port open");
            ProbeResult::open(port, latency, banner, services::service_name(port))
        }
        Ok(Err(e)) => classify_connect_error(port, start.elapsed(), &e),
        Err(_) => ProbeResult::unreachable(port, ProbeStatus::Filtered, start.elapsed()),
    }
}

/// Map a failed connect to a result kind.
pub fn classify_connect_error(port: u16, latency: Duration, err: &io::Error) -> ProbeResult {
    match err.kind() {
        io::ErrorKind::ConnectionRefused => {
            ProbeResult::unreachable(port, ProbeStatus::Closed, latency)
        }
        // OS gave up on the handshake before our own timer did.
        io::ErrorKind::TimedOut => ProbeResult::unreachable(port, ProbeStatus::Filtered, latency),
        io::ErrorKind::PermissionDenied => {
            warn!(port, error = %err, "connect denied by the operating system");
            ProbeResult::unreachable(port, ProbeStatus::Blocked, latency)
        }
        _ => {
            warn!(port, error = %err, "unexpected connect failure");
            ProbeResult::error(port, latency, err.to_string())
        }
    }
}

async fn grab_banner(stream: &mut TcpStream, banner_timeout: Duration) -> Option<String> {
    let exchange = async {
        // Some services close right after greeting; their banner may still be readable.
        if let Err(e) = stream.write_all(BANNER_PROBE).await {
            debug!(error = %e, "banner probe write failed");
        }
        let mut buf = vec![0u8; BANNER_MAX_BYTES];
        let n = stream.read(&mut buf).await?;
        buf.truncate(n);
        Ok::<_, io::Error>(buf)
    };

    match time::timeout(banner_timeout, exchange).await {
        Ok(Ok(buf)) => decode_banner(&buf),
        Ok(Err(e)) => {
            debug!(error = %e, "banner read failed");
            None
        }
        Err(_) => None,
    }
}

/// Lossy UTF-8 decode with surrounding whitespace stripped. Empty input yields `None`.
pub fn decode_banner(buf: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(buf);
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}
