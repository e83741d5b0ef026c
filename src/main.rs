use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;
use tokio::io::BufReader;
use tracing::info;

use txreview::api;
use txreview::cache::ResponseCache;
use txreview::config::{BackendKind, Config};
use txreview::coordinator::ViewCoordinator;
use txreview::fetch::Fetcher;
use txreview::logging;
use txreview::shell::Shell;

#[derive(Parser, Debug)]
#[command(name = "txreview")]
#[command(about = "Review and approve employee card transactions")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/txreview/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Backend to talk to
  #[arg(short, long, value_enum)]
  backend: Option<BackendKind>,

  /// Base URL of the http backend
  #[arg(short, long)]
  url: Option<String>,

  /// Artificial latency of the mock backend, in milliseconds
  #[arg(long)]
  latency_ms: Option<u64>,

  /// Log to stderr instead of the log file
  #[arg(long)]
  log_stderr: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let mut config = Config::load(args.config.as_deref())?;

  // Command line wins over the file
  if let Some(kind) = args.backend {
    config.backend.kind = kind;
  }
  if let Some(url) = args.url {
    config.backend.url = Some(url);
  }
  if let Some(latency_ms) = args.latency_ms {
    config.backend.latency_ms = latency_ms;
  }

  let _guard = logging::init(&config.log, args.log_stderr)?;
  info!(backend = ?config.backend.kind, "Starting txreview");

  let transport = api::connect(&config.backend)?;
  let coordinator = ViewCoordinator::new(Fetcher::new(transport, ResponseCache::new()));

  let mut shell = Shell::new(coordinator, std::io::stdout());
  shell.run(BufReader::new(tokio::io::stdin())).await?;

  Ok(())
}
