use std::fs::File;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use portsweep::config::{ScanConfig, DEFAULT_CONCURRENCY};
use portsweep::ports::PortSelection;
use portsweep::scanner::Scanner;
use portsweep::types::{ProbeResult, ProbeStatus, ScanReport, ScanSummary};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// portsweep: concurrent TCP connect scanner with banner grabbing.
/// Only scan hosts you own or are explicitly allowed to test.
#[derive(Debug, Clone, Parser)]
#[command(name = "portsweep", version, about, long_about = None)]
struct Cli {
    /// Target IP address or host name.
    #[arg(short, long)]
    target: String,

    /// Scan ports 1 through N.
    #[arg(
        short,
        long = "ports",
        value_name = "N",
        required_unless_present = "port_list",
        conflicts_with = "port_list"
    )]
    port_count: Option<u32>,

    /// Explicit port list instead of a count, e.g. `22,80,8000-8010`.
    #[arg(long = "port-list", value_name = "LIST")]
    port_list: Option<String>,

    /// Max concurrent probes.
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
    concurrency: usize,

    /// TCP connect timeout in milliseconds.
    #[arg(long = "connect-timeout-ms", default_value_t = 2000)]
    connect_timeout_ms: u64,

    /// Banner read timeout in milliseconds.
    #[arg(long = "banner-timeout-ms", default_value_t = 2000)]
    banner_timeout_ms: u64,

    /// Print every port, not just open ones and failures.
    #[arg(long, default_value_t = false)]
    all: bool,

    /// Skip the authorization prompt.
    #[arg(short = 'y', long, default_value_t = false)]
    yes: bool,

    /// Write the full report as pretty JSON to this path.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Enable debug logging (RUST_LOG overrides).
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let ports = match (&cli.port_list, cli.port_count) {
        (Some(list), _) => PortSelection::parse_list(list)?,
        (None, Some(n)) => PortSelection::first_n(n)?,
        (None, None) => anyhow::bail!("either --ports or --port-list is required"),
    };
    let config = ScanConfig::default()
        .with_concurrency(cli.concurrency)
        .with_connect_timeout(Duration::from_millis(cli.connect_timeout_ms))
        .with_banner_timeout(Duration::from_millis(cli.banner_timeout_ms));

    let scanner = Scanner::new(config);
    let cfg = scanner.config();

    println!("portsweep configuration:");
    println!("  target          : {}", cli.target);
    println!("  ports           : {}", describe_ports(&ports));
    println!("  concurrency     : {}", cfg.effective_concurrency());
    println!("  connect_timeout : {} ms", cfg.connect_timeout.as_millis());
    println!("  banner_timeout  : {} ms", cfg.banner_timeout.as_millis());

    if !cli.yes && !confirm_authorized().await? {
        println!("Scan cancelled.");
        return Ok(());
    }

    let cancel = CancellationToken::new();
    let cancel_ctrlc = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel_ctrlc.cancel();
        }
    });

    println!("{}", format!("Scanning ports of {}", cli.target).green());
    let show_all = cli.all;
    let report = scanner
        .run_with(&cli.target, &ports, cancel, |r| print_result(r, show_all))
        .await?;

    print_summary(&report.summary);

    if let Some(path) = cli.output.as_deref() {
        match write_report_json(path, &report) {
            Ok(()) => println!("Wrote JSON report to {}", path.display()),
            Err(e) => eprintln!("Failed to write JSON to {}: {e:#}", path.display()),
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn confirm_authorized() -> Result<bool> {
    let rule = "=".repeat(60);
    println!("{rule}");
    println!("{}", "WARNING: Only scan authorized targets!".red());
    println!("{}", "Unauthorized scanning may be illegal.".red());
    println!("{rule}");

    let mut stdout = tokio::io::stdout();
    stdout
        .write_all(b"Do you have permission to scan this target? (yes/no): ")
        .await?;
    stdout.flush().await?;

    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .context("failed to read confirmation")?;
    Ok(line.trim().eq_ignore_ascii_case("yes"))
}

fn describe_ports(ports: &PortSelection) -> String {
    match ports {
        PortSelection::Range(0) => "<none>".to_string(),
        PortSelection::Range(n) => format!("1-{n}"),
        PortSelection::List(v) => format!("{} listed", v.len()),
    }
}

fn print_result(r: &ProbeResult, show_all: bool) {
    match r.status {
        ProbeStatus::Open => {
            let banner = r
                .banner
                .as_deref()
                .map(banner_snippet)
                .unwrap_or_else(|| "None".to_string());
            let service = r.service.as_deref().unwrap_or("unknown");
            println!(
                "{} {} {} | {} {} | {} {}",
                "[+]".green(),
                format!("Port {}", r.port).cyan(),
                "OPEN".green().bold(),
                "Banner:".yellow(),
                banner.white(),
                "Service:".yellow(),
                service.magenta()
            );
        }
        ProbeStatus::Blocked => {
            println!("{}", format!("[-] Port {}: blocked by OS/firewall", r.port).yellow());
        }
        ProbeStatus::Error => {
            let detail = r.error.as_deref().unwrap_or("unknown error");
            println!("{}", format!("[-] Port {}: error ({detail})", r.port).red());
        }
        ProbeStatus::Closed | ProbeStatus::Filtered if show_all => {
            println!("{}", format!("[ ] Port {}: {}", r.port, r.status).dimmed());
        }
        ProbeStatus::Closed | ProbeStatus::Filtered => {}
    }
}

fn banner_snippet(banner: &str) -> String {
    let escaped = banner.replace('\n', "\\n").replace('\r', "\\r");
    if escaped.chars().count() > 60 {
        let cut: String = escaped.chars().take(60).collect();
        format!("{cut}...")
    } else {
        escaped
    }
}

fn print_summary(s: &ScanSummary) {
    let rule = "=".repeat(60);
    println!("{rule}");
    if s.cancelled {
        println!("{}", "SCAN CANCELLED".yellow().bold());
    } else {
        println!("SCAN COMPLETE");
    }
    println!("{rule}");
    println!("Target: {} ({})", s.target, s.address);
    println!("Total ports scanned: {} of {}", s.scanned_done, s.scanned_total);
    println!("Open Ports Found: {}", s.open_count);
    println!(
        "Closed: {} | Filtered: {} | Blocked: {} | Errors: {}",
        s.closed_count, s.filtered_count, s.blocked_count, s.error_count
    );
    println!("Scan Duration: {:.2} seconds", s.elapsed().as_secs_f64());
}

fn write_report_json(path: &std::path::Path, report: &ScanReport) -> anyhow::Result<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, report)?;
    Ok(())
}
