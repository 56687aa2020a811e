mod app;
mod cache;
mod catalog;
mod commands;
mod config;
mod event;
mod logging;
mod session;
mod storage;
mod watchlist;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "cineverse")]
#[command(about = "Browse a movie catalog and keep a watchlist from the terminal")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/cineverse/config.yaml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: commands::Command,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let config = config::Config::load(args.config.as_deref())?;

  // Logs go to a file so stdout stays clean for command output
  let _log_guard = logging::init(&config::Config::data_dir()?.join("logs"))?;

  // Initialize and run the app
  let app = app::App::new(config)?;
  app.run(args.command).await?;

  Ok(())
}
