//! keyheat - Hot Key Analysis for memcached
//!
//! This is the main entry point for the keyheat analyzer.
//! It resolves configuration, opens the packet source, and runs the
//! ingestion thread alongside the reporting task until the capture ends or
//! Ctrl+C is pressed.

use anyhow::Context;
use clap::Parser;
use keyheat::capture::{self, PacketSource, PcapReader};
use keyheat::config::{Config, ConfigOverrides};
use keyheat::{HotKeyPool, IngestStats, Ingestor, KeyClassifier, ReportConfig, Reporter};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::oneshot;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Passive memcached hot key analyzer
#[derive(Debug, Parser)]
#[command(name = "keyheat", version, about)]
struct Cli {
    /// JSON configuration file
    #[arg(short = 'c', long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Seconds between reports [default: 5]
    #[arg(short = 'n', long, value_name = "SECS")]
    interval: Option<u64>,

    /// Interface to capture on [default: any]
    #[arg(short = 'i', long)]
    interface: Option<String>,

    /// memcached port [default: 11211]
    #[arg(short = 'p', long)]
    port: Option<u16>,

    /// Keys per report when no patterns are configured [default: 20]
    #[arg(short = 'r', long = "report", value_name = "N")]
    num_items_to_report: Option<usize>,

    /// Do not print reports to stdout
    #[arg(short = 'q', long)]
    quiet: bool,

    /// Overwrite this file with every report
    #[arg(short = 'w', long, value_name = "FILE")]
    output_file: Option<PathBuf>,

    /// Report parse and classification errors [default: true]
    #[arg(short = 'e', long, value_name = "BOOL")]
    show_errors: Option<bool>,

    /// Report keys no pattern matched under their raw name
    #[arg(long)]
    show_unmatched: bool,

    /// Metric name prefix [default: keyheat]
    #[arg(long)]
    namespace: Option<String>,

    /// Replay a classic pcap capture instead of capturing live ("-" for stdin)
    #[arg(long, value_name = "FILE")]
    read: Option<PathBuf>,
}

impl Cli {
    /// Options given on the command line; flags only ever switch on.
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            interval: self.interval,
            interface: self.interface.clone(),
            port: self.port,
            num_items_to_report: self.num_items_to_report,
            quiet: self.quiet.then_some(true),
            output_file: self.output_file.clone(),
            show_errors: self.show_errors,
            show_unmatched: self.show_unmatched.then_some(true),
            namespace: self.namespace.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries the reports
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::resolve(cli.config.as_deref(), cli.overrides())
        .context("failed to load configuration")?;

    let classifier = KeyClassifier::new(
        config
            .regexps
            .iter()
            .map(|r| (r.re.as_str(), r.name.as_str())),
    )
    .context("invalid key pattern")?;

    info!(
        version = keyheat::VERSION,
        port = config.port,
        patterns = classifier.len(),
        "keyheat starting"
    );

    let mut source = open_source(cli.read.as_ref(), &config)?;

    let keys = Arc::new(HotKeyPool::new());
    let errors = Arc::new(HotKeyPool::new());
    let ingestor = Ingestor::new(
        Arc::clone(&keys),
        Arc::clone(&errors),
        classifier,
        config.show_unmatched,
    );
    let stats = ingestor.stats();

    let reporter = Reporter::start(keys, errors, ReportConfig::from(&config));

    // A read blocked on an idle source must not hold up exit, so ingestion
    // gets a detached thread rather than a runtime blocking task.
    let (done_tx, done_rx) = oneshot::channel();
    std::thread::Builder::new()
        .name("keyheat-ingest".to_string())
        .spawn(move || {
            let _ = done_tx.send(ingestor.run(&mut source));
        })
        .context("failed to spawn ingestion thread")?;

    // Set up graceful shutdown
    let shutdown = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received, stopping...");
    };

    let outcome = tokio::select! {
        result = done_rx => match result {
            Ok(Ok(())) => {
                info!("Packet source exhausted");
                Ok(())
            }
            Ok(Err(e)) => Err(anyhow::Error::new(e).context("packet capture failed")),
            Err(_) => Err(anyhow::anyhow!("ingestion thread exited unexpectedly")),
        },
        _ = shutdown => Ok(()),
    };

    reporter.shutdown().await;
    log_totals(&stats);

    outcome
}

/// Opens the pcap replay named by `--read`, or the live interface.
fn open_source(
    read: Option<&PathBuf>,
    config: &Config,
) -> anyhow::Result<Box<dyn PacketSource + Send>> {
    match read {
        Some(path) if path.as_os_str() == "-" => {
            let reader = PcapReader::new(BufReader::new(std::io::stdin()), config.port)
                .context("failed to read capture from stdin")?;
            info!(link = ?reader.link_type(), "Replaying capture from stdin");
            Ok(Box::new(reader))
        }
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("failed to open {}", path.display()))?;
            let reader = PcapReader::new(BufReader::new(file), config.port)
                .with_context(|| format!("failed to read capture {}", path.display()))?;
            info!(path = %path.display(), link = ?reader.link_type(), "Replaying capture");
            Ok(Box::new(reader))
        }
        None => capture::open_live(&config.interface, config.port)
            .with_context(|| format!("failed to capture on {}", config.interface)),
    }
}

fn log_totals(stats: &IngestStats) {
    info!(
        payloads = stats.payloads.load(Ordering::Relaxed),
        bytes = stats.bytes.load(Ordering::Relaxed),
        commands = stats.commands.load(Ordering::Relaxed),
        parse_errors = stats.parse_errors.load(Ordering::Relaxed),
        keys_recorded = stats.keys_recorded.load(Ordering::Relaxed),
        unmatched = stats.unmatched.load(Ordering::Relaxed),
        "keyheat stopped"
    );
}
