#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Standalone entry point for the covid map API server.
//!
//! Configured through `BIND_ADDR`, `PORT` and the `COVID_MAP_*` path
//! variables; see [`covid_map_server::ServerConfig`].

use covid_map_cli_utils::IndicatifProgress;
use covid_map_server::{ServerConfig, run_server};

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = covid_map_cli_utils::init_logger();
    let progress = IndicatifProgress::geocode_bar(&multi, "Preparing coordinate cache");

    run_server(ServerConfig::from_env(), progress).await?;

    Ok(())
}
