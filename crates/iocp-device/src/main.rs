//! `iocp-device`: serve the IOCP device protocol on a TCP port.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use iocp_device::{serve, DeviceConfig, DeviceResult};
use tracing::error;
use tracing_subscriber::EnvFilter;

/// IOCP device: answers keep-alives and applies position updates from a host.
#[derive(Parser, Debug)]
#[command(name = "iocp-device", version, about)]
struct Args {
    /// YAML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to accept host connections on (overrides the config file).
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Send `Stat` diagnostics to the host.
    #[arg(short, long)]
    debug: bool,

    /// Log filter used when RUST_LOG is not set.
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn run(args: Args) -> DeviceResult<()> {
    let mut config = match &args.config {
        Some(path) => DeviceConfig::load(path)?,
        None => DeviceConfig::default(),
    };
    if let Some(listen) = args.listen {
        config.listen = listen;
    }
    config.debug |= args.debug;

    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&shutdown);
    ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed))
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;

    serve(&config, &shutdown)
}

fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)),
        )
        .init();
    iocp_messenger::telemetry::describe_metrics();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
