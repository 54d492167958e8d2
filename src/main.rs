use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::net::TcpStream;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use netpulse::source::spawn_feed;
use netpulse::{FileFetch, MetricsService, Settings, StoreView, UpdateBus};

#[derive(Parser, Debug)]
#[command(name = "netpulse")]
#[command(about = "Headless monitor for live network-interface metrics")]
struct Args {
    /// Path to the initial metrics payload (either wire shape)
    #[arg(short, long, default_value = "metrics.json")]
    file: PathBuf,

    /// Connect to a TCP endpoint pushing newline-delimited updates
    /// (host:port). Without it the monitor runs pull-only.
    #[arg(short, long)]
    connect: Option<String>,

    /// Settings file (TOML); NETPULSE_* environment variables override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Push topic override
    #[arg(long)]
    topic: Option<String>,

    /// History cap override (snapshots retained for charting)
    #[arg(long)]
    history_cap: Option<usize>,

    /// Restrict the KPI selection to these interfaces (comma-separated)
    #[arg(long, value_delimiter = ',')]
    select: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let mut settings = Settings::load(args.config.as_deref())?;
    if let Some(topic) = args.topic {
        settings.topic = topic;
    }
    if let Some(cap) = args.history_cap {
        settings.history_cap = cap;
    }

    // Optional push feed: bridge a TCP stream onto the bus. Pull-only
    // otherwise, which the store reports as channel-unavailable.
    let bus = match &args.connect {
        Some(addr) => {
            info!(addr = %addr, "connecting to push feed");
            let stream = TcpStream::connect(addr).await?;
            let bus = UpdateBus::new();
            spawn_feed(stream, bus.clone(), &settings.topic, addr);
            Some(bus)
        }
        None => None,
    };

    let handle = MetricsService::spawn(
        Arc::new(FileFetch::new(&args.file)),
        bus,
        settings.service_config(),
    );

    if !args.select.is_empty() {
        handle
            .set_selected(args.select.iter().cloned().collect())
            .await?;
    }

    let mut state = handle.watch();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                break;
            }
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = state.borrow().clone();
                report(&view);
            }
        }
    }

    Ok(())
}

fn report(view: &StoreView) {
    if let Some(error) = &view.error {
        warn!(%error, "metrics unavailable");
        return;
    }
    if view.loading {
        return;
    }

    info!(
        interfaces = view.selection.available.len(),
        selected = view.selection.selected.len(),
        points = view.series.len(),
        channel = if view.channel_available { "live" } else { "pull-only" },
        discarded = view.discarded_updates,
        latency_ms = %format!("{:.1}", view.kpis.latest_latency),
        throughput_mbps = %format!("{:.1}", view.kpis.latest_throughput),
        loss_pct = %format!("{:.1}", view.kpis.latest_packet_loss_pct),
        "state"
    );
}
