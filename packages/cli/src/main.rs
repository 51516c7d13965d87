#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line toolchain for the covid map.
//!
//! ```text
//! covid_map_cli build-cache
//! covid_map_cli rebuild-cache
//! covid_map_cli cache-status [--check]
//! covid_map_cli snapshot [--sort cases7_per_100k] [--direction desc] [--limit 20] [--json]
//! covid_map_cli serve [--bind 127.0.0.1] [--port 8080]
//! ```
//!
//! Running without a subcommand enters interactive mode.
//!
//! Uses `indicatif-log-bridge` (via [`covid_map_cli_utils::init_logger`])
//! to route `log` output through `indicatif::MultiProgress` so that log
//! lines and the geocoding progress bar never fight for the terminal.

mod commands;
mod interactive;

use clap::{Parser, Subcommand};
use covid_map_presentation::table::{SortColumn, SortDirection};

#[derive(Parser)]
#[command(
    name = "covid_map_cli",
    about = "Germany COVID-19 district map toolchain"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the coordinate cache, geocoding only districts it lacks
    BuildCache,
    /// Discard the coordinate cache and geocode every district again
    RebuildCache,
    /// Show what the coordinate cache contains
    CacheStatus {
        /// Also fetch the current statistics and list districts missing
        /// from the cache
        #[arg(long)]
        check: bool,
    },
    /// Fetch current statistics and print the merged district table
    Snapshot {
        /// Column to sort by
        #[arg(long, default_value = "district_name")]
        sort: SortColumn,
        /// Sort direction (asc or desc)
        #[arg(long, default_value = "asc")]
        direction: SortDirection,
        /// Print at most this many rows
        #[arg(long)]
        limit: Option<usize>,
        /// Print JSON instead of a text table
        #[arg(long)]
        json: bool,
    },
    /// Start the API server
    Serve {
        /// Bind address (defaults to `BIND_ADDR` or 127.0.0.1)
        #[arg(long)]
        bind: Option<String>,
        /// Port (defaults to `PORT` or 8080)
        #[arg(long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = covid_map_cli_utils::init_logger();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        return interactive::run(&multi).await;
    };

    match command {
        Commands::BuildCache => commands::build_cache(&multi, false).await?,
        Commands::RebuildCache => commands::build_cache(&multi, true).await?,
        Commands::CacheStatus { check } => commands::cache_status(check).await?,
        Commands::Snapshot {
            sort,
            direction,
            limit,
            json,
        } => commands::snapshot(sort, direction, limit, json).await?,
        Commands::Serve { bind, port } => {
            let mut config = covid_map_server::ServerConfig::from_env();
            if let Some(bind) = bind {
                config.bind_addr = bind;
            }
            if let Some(port) = port {
                config.port = port;
            }
            commands::serve(&multi, config).await?;
        }
    }

    Ok(())
}
