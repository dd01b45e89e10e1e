//! CLI entry point for the netmap-discover network mapper.

use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::watch;
use tracing_subscriber::{fmt, EnvFilter};

use netmap_discover::scanner::NmapScanner;
use netmap_discover::{config, export, report, NetworkMap, NetworkMapper};

#[derive(Parser)]
#[command(name = "netmap-discover")]
#[command(about = "Discover live hosts on a network segment and map them")]
struct Cli {
    /// Range to scan (CIDR notation, e.g., 192.168.1.0/24).
    #[arg(default_value = "192.168.1.0/24")]
    network: String,

    /// Output file base name; `.dot`, `_report.txt`, and `.json` are appended.
    #[arg(short, long)]
    output: Option<String>,

    /// Probe ports, services, and OS on every host (OS detection needs root).
    #[arg(short = 'p', long)]
    scan_ports: bool,

    /// Also write a JSON snapshot of the map.
    #[arg(long)]
    json: bool,

    /// Emit logs as JSON.
    #[arg(long)]
    json_logs: bool,

    /// Config file prefix (default: netmap).
    #[arg(short, long, default_value = "netmap")]
    config: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if cli.json_logs {
        fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
    }

    let discover_config = config::load(&cli.config)?;

    let scanner = NmapScanner::new(&discover_config);
    match scanner.verify_installation().await {
        Ok(version) => {
            let first_line = version.lines().next().unwrap_or_default();
            tracing::info!(nmap_version = %first_line, "Nmap verified");
        }
        Err(e) => tracing::warn!(error = %e, "Nmap unavailable; discovery will find nothing"),
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if relay_interrupts(tokio::signal::ctrl_c, shutdown_tx).await {
            tracing::warn!("Second interrupt, exiting");
            std::process::exit(130);
        }
    });

    let mapper = NetworkMapper::new(discover_config, Arc::new(scanner));
    let map = mapper.map(&cli.network, cli.scan_ports, shutdown_rx).await?;

    if map.hosts.is_empty() {
        println!("No live hosts found in {}", map.range);
        return Ok(());
    }

    let base = cli
        .output
        .unwrap_or_else(|| default_output_base(map.range.as_str()));
    let dot_path = PathBuf::from(format!("{base}.dot"));
    let report_path = PathBuf::from(format!("{base}_report.txt"));

    export::write_dot(&map, &dot_path)?;
    report::write_text_report(&map, &report_path)?;
    if cli.json {
        export::write_json(&map, &PathBuf::from(format!("{base}.json")))?;
    }

    print_summary(&map);
    println!("\nDiagram: {}", dot_path.display());
    println!("Report:  {}", report_path.display());

    Ok(())
}

/// The first interrupt asks the run to stop. Returns `true` on a second one,
/// since the listener has replaced the default SIGINT behaviour.
async fn relay_interrupts<S, F>(mut interrupt: S, shutdown_tx: watch::Sender<bool>) -> bool
where
    S: FnMut() -> F,
    F: Future<Output = io::Result<()>>,
{
    if interrupt().await.is_err() {
        return false;
    }
    tracing::warn!("Interrupt received, stopping after current step");
    let _ = shutdown_tx.send(true);
    interrupt().await.is_ok()
}

fn default_output_base(range: &str) -> String {
    format!("network_map_{}", range.replace(|c: char| matches!(c, '/' | '.' | ':'), "_"))
}

fn print_summary(map: &NetworkMap) {
    println!(
        "\n{} hosts | {} connections{}",
        map.hosts.len(),
        map.edge_count,
        if map.interrupted { " | interrupted" } else { "" }
    );

    for (i, host) in map.hosts.iter().enumerate() {
        println!("\n  {}. {} - {}", i + 1, host.address(), host.display_name);
        println!("     MAC: {}", host.hardware_address);
        if map.scan_ports {
            println!("     OS: {}", host.operating_system);
            if host.open_ports.is_empty() {
                println!("     No open ports found");
            }
            for port in host.open_ports.iter().take(8) {
                println!(
                    "       {}/{}: {}",
                    port.port_number, port.transport_protocol, port.service_description
                );
            }
        }
    }
}
