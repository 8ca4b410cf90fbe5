mod api;
mod app;
mod cache;
mod config;
mod error;
mod event;
mod headless;
mod issues;
mod logging;
mod query;
mod ui;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;

use crate::api::IssueFilter;
use crate::logging::LogTarget;

#[derive(Parser, Debug)]
#[command(name = "issuedeck")]
#[command(about = "Browse and search an issue tracker from the terminal")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/issuedeck/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Base URL of the issues API
  #[arg(long)]
  api_url: Option<String>,

  /// Only show issues with this label (repeatable)
  #[arg(short, long = "label")]
  labels: Vec<String>,

  /// Only show issues with this status
  #[arg(short, long)]
  status: Option<String>,

  /// Page to open
  #[arg(short, long, default_value_t = 1)]
  page: u32,

  /// Start with this search submitted
  #[arg(long)]
  search: Option<String>,

  /// Open this issue (with --print, print it instead of the list)
  #[arg(long)]
  issue: Option<u64>,

  /// Print the issues and exit instead of starting the UI
  #[arg(long)]
  print: bool,

  /// Log to stderr instead of the log file
  #[arg(long)]
  log_stderr: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let mut config = config::Config::load(args.config.as_deref())?;
  if let Some(url) = args.api_url {
    config.api.base_url = url;
  }

  let target = if args.log_stderr {
    LogTarget::Stderr
  } else {
    LogTarget::File
  };
  let _guard = logging::init(&config.log, target)?;

  let filter = IssueFilter::new(args.labels, args.status, args.page);

  if args.print {
    return match args.issue {
      Some(number) => headless::print_issue(&config, number).await,
      None => headless::run(&config, filter, args.search.as_deref()).await,
    };
  }

  // Initialize and run the app
  let mut app = app::App::new(config, filter, args.search.as_deref(), args.issue)?;
  app.run().await?;

  Ok(())
}
