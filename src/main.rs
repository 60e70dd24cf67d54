mod app;
mod commands;
mod event;
mod ui;

use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use skyintel::{logging, CacheEntry, Config, QueryClient, SourceId};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "skyintel")]
#[command(about = "Marketing analytics dashboard for the terminal")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/skyintel/config.yaml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  /// Backend base URL, overriding config and SKYINTEL_API_URL
  #[arg(long, global = true)]
  api_url: Option<String>,

  /// Range start, YYYY-MM-DD
  #[arg(long, global = true, value_parser = parse_date)]
  start: Option<String>,

  /// Range end, YYYY-MM-DD
  #[arg(long, global = true, value_parser = parse_date)]
  end: Option<String>,

  #[command(subcommand)]
  command: Option<Cmd>,
}

#[derive(Subcommand, Debug)]
enum Cmd {
  /// Fetch one source and print its normalized dataset as JSON
  Fetch {
    /// facebook, instagram, ads, analytics, or overall
    source: String,

    /// Print the whole cache entry (status, error, fetched_at) instead of the data
    #[arg(long)]
    entry: bool,
  },
}

fn parse_date(s: &str) -> Result<String, String> {
  commands::parse_date(s).map(|date| date.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  let mut config = Config::load(args.config.as_deref())?;
  if let Some(url) = &args.api_url {
    config.apply_api_url(url);
  }

  let range = app::DateRange {
    start: args.start.or_else(|| config.dashboard.start_date.clone()),
    end: args.end.or_else(|| config.dashboard.end_date.clone()),
  };

  match args.command {
    Some(Cmd::Fetch { source, entry }) => {
      logging::init_stderr();
      fetch(&config, &source, &range, entry).await
    }
    None => {
      let _guard = logging::init_file()?;
      tracing::info!(base_url = %config.api.base_url, "starting dashboard");
      let mut app = app::App::new(&config, range)?;
      app.run().await
    }
  }
}

async fn fetch(
  config: &Config,
  source: &str,
  range: &app::DateRange,
  whole_entry: bool,
) -> Result<()> {
  let source: SourceId = source.parse()?;
  let client = QueryClient::from_config(config)?;

  let mut query = client.source(source);
  let entry: CacheEntry = query.fetch(range.start.as_deref(), range.end.as_deref()).await;

  let json = if whole_entry {
    serde_json::to_string_pretty(&entry)?
  } else {
    serde_json::to_string_pretty(&entry.data)?
  };
  println!("{}", json);

  match entry.error {
    Some(error) => Err(eyre!(error.message)),
    None => Ok(()),
  }
}
