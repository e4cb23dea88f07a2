use clap::Parser;
use nts_radio::cli::{self, Args};
use nts_radio::state::clamp_volume;
use nts_radio::{Plugin, Settings};
use tokio::io::BufReader;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn init_logging(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let mut settings = match &args.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    if let Some(dir) = args.runtime_dir.clone() {
        settings.runtime_dir = dir;
    }
    if let Some(volume) = args.volume {
        settings.volume = clamp_volume(volume);
    }
    if args.no_autoconnect {
        settings.autoconnect = false;
    }

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    let shutdown = async move {
        tokio::select! {
            _ = interrupt.recv() => info!("interrupted"),
            _ = terminate.recv() => info!("terminated"),
        }
    };

    let plugin = Plugin::load(settings).await?;
    if let Err(e) = cli::run(&plugin, BufReader::new(tokio::io::stdin()), tokio::io::stdout(), shutdown).await {
        error!("reading commands failed: {}", e);
        return Err(e.into());
    }
    Ok(())
}
