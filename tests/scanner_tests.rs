use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr};
use std::time::{Duration, Instant};

use portsweep::config::ScanConfig;
use portsweep::ports::PortSelection;
use portsweep::probe::BANNER_PROBE;
use portsweep::scanner::{scan_range, Scanner};
use portsweep::types::ProbeStatus;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

fn fast_config() -> ScanConfig {
    ScanConfig::default()
        .with_concurrency(64)
        .with_connect_timeout(Duration::from_millis(300))
        .with_banner_timeout(Duration::from_millis(300))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn localhost_range_accounts_for_every_port() {
    let report = scan_range("127.0.0.1", 128, fast_config())
        .await
        .expect("scan runs");

    let ports: Vec<u16> = report.results.iter().map(|r| r.port).collect();
    assert_eq!(ports, (1..=128).collect::<Vec<u16>>());
    assert_eq!(report.summary.scanned_total, 128);
    assert_eq!(report.summary.scanned_done, 128);
    assert_eq!(report.summary.open_count, report.open_ports().count() as u64);
    assert_eq!(report.summary.address, "127.0.0.1");
    assert!(!report.summary.cancelled);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn listed_ports_report_open_and_closed() {
    let open = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let open_port = open.local_addr().expect("addr").port();
    let gone = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let closed_port = gone.local_addr().expect("addr").port();
    drop(gone);

    tokio::spawn(async move {
        while let Ok((mut s, _)) = open.accept().await {
            tokio::spawn(async move {
                let _ = s.write_all(b"SSH-2.0-mock\r\n").await;
                tokio::time::sleep(Duration::from_secs(1)).await;
            });
        }
    });

    let sel = PortSelection::List(vec![open_port, closed_port]);
    let scanner = Scanner::new(fast_config());
    let mut streamed = HashSet::new();
    let report = scanner
        .run_with("127.0.0.1", &sel, CancellationToken::new(), |r| {
            streamed.insert(r.port);
        })
        .await
        .expect("scan runs");

    assert_eq!(streamed, HashSet::from([open_port, closed_port]));
    let by_port = |p: u16| report.results.iter().find(|r| r.port == p).expect("present");
    let open_result = by_port(open_port);
    assert_eq!(open_result.status, ProbeStatus::Open);
    assert_eq!(open_result.banner.as_deref(), Some("SSH-2.0-mock"));
    assert_eq!(by_port(closed_port).status, ProbeStatus::Closed);
    assert_eq!(report.summary.open_count, 1);
    assert_eq!(report.summary.closed_count, 1);
}

#[tokio::test]
async fn resolved_address_is_reported() {
    let scanner = Scanner::new(fast_config());
    let addr = IpAddr::V4(Ipv4Addr::LOCALHOST);
    let report = scanner
        .run_addr("loopback", addr, &PortSelection::Range(0), CancellationToken::new(), |_| {})
        .await
        .expect("empty scan");
    assert_eq!(report.summary.target, "loopback");
    assert_eq!(report.summary.address, "127.0.0.1");
    assert!(report.results.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cancelling_closes_in_flight_sockets() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let port = listener.local_addr().expect("addr").port();

    // silent peer: reads until the scanner side closes, never answers
    let (closed_tx, closed_rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        let (mut s, _) = listener.accept().await.expect("accept");
        let mut got = Vec::new();
        let mut buf = [0u8; 64];
        loop {
            match s.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => got.extend_from_slice(&buf[..n]),
            }
        }
        let _ = closed_tx.send((got, Instant::now()));
    });

    let config = fast_config().with_banner_timeout(Duration::from_secs(30));
    let scanner = Scanner::new(config);
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let report = scanner
        .run("127.0.0.1", &PortSelection::List(vec![port]), cancel)
        .await
        .expect("scan runs");
    let returned = Instant::now();
    assert!(returned - started < Duration::from_secs(5));
    assert!(report.summary.cancelled);
    assert!(report.results.is_empty());
    assert_eq!(report.summary.scanned_done, 0);

    let (got, closed_at) = tokio::time::timeout(Duration::from_secs(2), closed_rx)
        .await
        .expect("peer saw the socket close")
        .expect("peer task finished");
    assert_eq!(got, BANNER_PROBE);
    assert!(closed_at.saturating_duration_since(returned) < Duration::from_secs(1));
}
