use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use serde::Serialize;

use listing_lens::data::loader::{load_or_empty, FileSource};
use listing_lens::{AggregateRequest, DashboardConfig, DashboardState, Dataset, FilterSpec};

#[derive(Parser)]
#[command(
    name = "listing-lens",
    version,
    about = "Filter a listings dataset and print dashboard summaries as JSON"
)]
struct Cli {
    /// Configuration file (TOML).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Listings file; overrides `data.path` from the config.
    #[arg(long, value_name = "PATH")]
    data: Option<PathBuf>,

    /// Filter spec file (`.toml` or `.json`), e.g. `price = { min = 50, max = 200 }`.
    #[arg(long, value_name = "PATH")]
    filters: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Options for each filter control.
    Controls,
    /// Listing names and prices, with detail for one listing.
    Explore {
        /// Listing to show in detail (defaults to the first).
        #[arg(long)]
        name: Option<String>,
    },
    /// All analysis charts.
    Analysis,
    /// Map markers and view anchor.
    Map,
    /// Case-insensitive search across every column.
    Search { term: String },
    /// One summary described as JSON, e.g. `{"kind": "histogram", "attribute": "price", "bins": 10}`.
    Aggregate { request: String },
}

fn read_filters(path: &Path) -> Result<FilterSpec> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading filters from {}", path.display()))?;
    let spec = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::from_str(&text).context("parsing JSON filters")?,
        _ => toml::from_str(&text).context("parsing TOML filters")?,
    };
    Ok(spec)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => DashboardConfig::from_path(path)?,
        None => DashboardConfig::default(),
    };
    if let Some(path) = cli.data {
        config.data.path = Some(path);
    }

    let dataset = match &config.data.path {
        Some(path) => load_or_empty(FileSource::new(path.clone()), config.data.load_timeout()),
        None => {
            warn!("No data path configured; starting with an empty dataset");
            Dataset::empty()
        }
    };

    let mut state = DashboardState::new(dataset, config);
    if let Some(path) = &cli.filters {
        state.set_filters(read_filters(path)?);
    }
    info!(
        "{} of {} listings match the filters",
        state.visible_indices().len(),
        state.dataset().len()
    );
    if let Some(message) = &state.status_message {
        eprintln!("{message}");
    }

    match cli.command {
        Command::Controls => print_json(&state.controls()),
        Command::Explore { name } => print_json(&state.exploration(name.as_deref())),
        Command::Analysis => print_json(&state.analysis()),
        Command::Map => match state.map() {
            Ok(page) => print_json(&page),
            Err(err) if DashboardState::is_expected(&err) => {
                eprintln!("Nothing to show on the map: {err}");
                Ok(())
            }
            Err(err) => Err(err.into()),
        },
        Command::Search { term } => print_json(&state.search(&term)),
        Command::Aggregate { request } => {
            let request: AggregateRequest =
                serde_json::from_str(&request).context("parsing aggregate request")?;
            match state.aggregate(&request) {
                Ok(result) => print_json(&result),
                Err(err) if DashboardState::is_expected(&err) => {
                    eprintln!("{err}");
                    Ok(())
                }
                Err(err) => Err(err.into()),
            }
        }
    }
}
