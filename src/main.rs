mod api;
mod app;
mod cache;
mod catalog;
mod commands;
mod config;
mod event;
mod logging;
mod query;
mod ui;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "p9s")]
#[command(about = "A terminal UI for product catalog administration, inspired by k9s")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/p9s/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Catalog API base URL (overrides config and P9S_API_URL)
  #[arg(short, long)]
  api_url: Option<String>,

  /// Initial location query string, e.g. "?page=2&size=20"
  #[arg(short, long, default_value = "")]
  location: String,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let mut config = config::Config::load(args.config.as_deref())?;

  // Override API URL if specified on command line
  if let Some(url) = args.api_url {
    config.api.url = url;
  }

  let _log_guard = logging::init(&config.log)?;

  // Initialize and run the app
  let mut app = app::App::new(config, &args.location)?;
  app.run().await?;

  Ok(())
}
