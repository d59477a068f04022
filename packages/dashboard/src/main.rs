#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line explorer for accident datasets.
//!
//! Loads a dataset through one of the embedded load profiles and prints
//! filter options or a full dashboard response as JSON.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use road_safety_analytics_models::{FilterCriteria, HourRange, RegionSelection};
use road_safety_dashboard::{
    DEFAULT_PREVIEW_ROWS, Dashboard, DashboardError, SOURCE_ENV_VAR, resolve_config,
};
use road_safety_ingest::registry::{DEFAULT_PROFILE_ID, all_profiles, profile_by_id};
use road_safety_spatial::{DEFAULT_SAMPLE_CAP, GeoSampler};
use serde::Serialize;

/// Explore accident datasets.
#[derive(Parser)]
#[command(name = "road_safety")]
#[command(about = "Filter, summarize, and sample accident datasets")]
struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Which dataset to load.
#[derive(Args)]
struct SourceArgs {
    /// Load profile ID (see `profiles`).
    #[arg(long, default_value = DEFAULT_PROFILE_ID)]
    profile: String,

    /// Read from this file instead of the profile's source. Falls back to
    /// `ROAD_SAFETY_SOURCE` when omitted.
    #[arg(long)]
    source: Option<PathBuf>,

    /// Override the profile's row cap.
    #[arg(long)]
    row_cap: Option<u64>,
}

/// Top-level subcommands.
#[derive(Subcommand)]
enum Commands {
    /// List the embedded load profiles.
    Profiles,

    /// Print the selectable regions, localities, and weather conditions.
    Options {
        #[command(flatten)]
        source: SourceArgs,

        /// Region whose localities to list (default: all regions).
        #[arg(long)]
        region: Option<String>,
    },

    /// Filter the dataset and print the dashboard response.
    Query {
        #[command(flatten)]
        source: SourceArgs,

        /// Region to keep (default: all regions).
        #[arg(long)]
        region: Option<String>,

        /// City to keep. Repeat for several.
        #[arg(long = "city")]
        cities: Vec<String>,

        /// Inclusive hour window, e.g. `7-19`.
        #[arg(long, value_parser = parse_hour_range, default_value = "0-23")]
        hours: HourRange,

        /// Weather condition to keep. Repeat for several.
        #[arg(long = "weather")]
        weather: Vec<String>,

        /// Maximum number of map markers.
        #[arg(long, default_value_t = DEFAULT_SAMPLE_CAP)]
        sample_cap: usize,

        /// Seed for a reproducible map sample.
        #[arg(long)]
        seed: Option<u64>,

        /// Rows to include in the preview.
        #[arg(long, default_value_t = DEFAULT_PREVIEW_ROWS)]
        preview_rows: usize,
    },
}

/// Parses `"<lower>-<upper>"` into an [`HourRange`].
fn parse_hour_range(value: &str) -> Result<HourRange, String> {
    let (lower, upper) = value
        .split_once('-')
        .ok_or_else(|| format!("expected <lower>-<upper>, got '{value}'"))?;
    let parse = |bound: &str| {
        bound
            .trim()
            .parse::<u8>()
            .map_err(|e| format!("invalid hour '{bound}': {e}"))
    };
    Ok(HourRange::new(parse(lower)?, parse(upper)?))
}

fn open_dashboard(args: SourceArgs) -> Result<Dashboard, Box<dyn std::error::Error>> {
    let profile = profile_by_id(&args.profile)
        .ok_or_else(|| format!("Unknown profile '{}'", args.profile))?;
    let source = args
        .source
        .or_else(|| std::env::var_os(SOURCE_ENV_VAR).map(PathBuf::from));

    let config = resolve_config(&profile, source, args.row_cap);
    log::info!(
        "Using profile '{}' with source {} (row cap {})",
        profile.id,
        config.source.path.display(),
        config.params.row_cap
    );

    Ok(Dashboard::new(config))
}

fn print_json(value: &impl Serialize) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run(command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Profiles => print_json(&all_profiles()),
        Commands::Options { source, region } => {
            let dashboard = open_dashboard(source)?;
            let region = RegionSelection::from_option(region.as_deref());
            print_json(&dashboard.filter_options(&region)?)
        }
        Commands::Query {
            source,
            region,
            cities,
            hours,
            weather,
            sample_cap,
            seed,
            preview_rows,
        } => {
            let mut sampler = GeoSampler::new(sample_cap);
            if let Some(seed) = seed {
                sampler = sampler.with_seed(seed);
            }
            let dashboard = open_dashboard(source)?
                .with_sampler(sampler)
                .with_preview_rows(preview_rows);

            let criteria = FilterCriteria {
                region: RegionSelection::from_option(region.as_deref()),
                localities: cities.into_iter().collect(),
                hour_range: hours,
                weather_conditions: weather.into_iter().collect(),
            };
            print_json(&dashboard.query(&criteria)?)
        }
    }
}

fn main() {
    pretty_env_logger::init_custom_env("RUST_LOG");
    let cli = Cli::parse();

    if let Err(e) = run(cli.command) {
        match e.downcast_ref::<DashboardError>() {
            Some(dashboard_error) => {
                log::error!("{dashboard_error}");
                eprintln!("{}", dashboard_error.user_message());
            }
            None => eprintln!("Error: {e}"),
        }
        std::process::exit(1);
    }
}
