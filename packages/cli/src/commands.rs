//! Subcommand implementations.

use std::collections::BTreeSet;
use std::error::Error;

use covid_map_cli_utils::{IndicatifProgress, MultiProgress};
use covid_map_coordinates::{CacheError, CoordinateCache};
use covid_map_district_models::DistrictRecord;
use covid_map_presentation::table::{SortColumn, SortDirection, TableRow, build_table, sort_rows};
use covid_map_server::ServerConfig;
use covid_map_server::pipeline::{CacheMode, fetch_merged, prepare_coordinates};
use covid_map_source::rki::StatisticsFetcher;

/// Fetches the current statistics and builds or rebuilds the coordinate
/// cache from them.
pub async fn build_cache(multi: &MultiProgress, rebuild: bool) -> Result<(), Box<dyn Error>> {
    let fetcher = StatisticsFetcher::rki()?;
    let snapshot = fetcher.fetch().await?;

    let cache = CoordinateCache::at_default_path();
    let mode = if rebuild {
        CacheMode::Rebuild
    } else {
        CacheMode::Update
    };
    let progress = IndicatifProgress::geocode_bar(multi, "Fetching districts to geocode");

    let map = prepare_coordinates(&cache, &snapshot.records, mode, &progress).await?;

    println!(
        "{} districts cached ({} located) at {}",
        map.len(),
        map.found_count(),
        cache.path().display()
    );
    Ok(())
}

/// Prints a summary of the coordinate cache. With `check`, also lists
/// districts in the current statistics that the cache lacks.
pub async fn cache_status(check: bool) -> Result<(), Box<dyn Error>> {
    let cache = CoordinateCache::at_default_path();
    let map = match cache.load() {
        Ok(map) => map,
        Err(CacheError::Missing { path }) => {
            println!(
                "No coordinate cache at {}. Run `build-cache` first.",
                path.display()
            );
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    println!("Path:       {}", cache.path().display());
    println!("Districts:  {}", map.len());
    println!("Located:    {}", map.found_count());

    let not_found: Vec<&str> = map
        .iter()
        .filter(|(_, resolution)| !resolution.is_found())
        .map(|(name, _)| name)
        .collect();
    if !not_found.is_empty() {
        println!("Not found:  {}", not_found.len());
        for name in &not_found {
            println!("  {name}");
        }
    }

    if check {
        let snapshot = StatisticsFetcher::rki()?.fetch().await?;
        let missing: BTreeSet<String> = snapshot
            .records
            .iter()
            .map(DistrictRecord::display_name)
            .filter(|name| !map.contains(name))
            .collect();

        if missing.is_empty() {
            println!("All {} current districts are cached.", snapshot.records.len());
        } else {
            println!("Missing from cache: {}", missing.len());
            for name in &missing {
                println!("  {name}");
            }
            println!("Run `build-cache` to add them.");
        }
    }

    Ok(())
}

/// Fetches the current statistics, merges them with the coordinate cache
/// and prints the table.
pub async fn snapshot(
    sort: SortColumn,
    direction: SortDirection,
    limit: Option<usize>,
    json: bool,
) -> Result<(), Box<dyn Error>> {
    let coordinates = CoordinateCache::at_default_path().load()?;
    let fetcher = StatisticsFetcher::rki()?;
    let merged = fetch_merged(&fetcher, &coordinates).await?;

    let mut rows = build_table(&merged.entities);
    sort_rows(&mut rows, sort, direction);
    if let Some(limit) = limit {
        rows.truncate(limit);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!("{}", format_header());
    println!("{}", "-".repeat(HEADER_WIDTH));
    for row in &rows {
        println!("{}", format_row(row));
    }

    let updated = merged
        .snapshot
        .last_update
        .map_or_else(|| "unknown".to_string(), |t| t.to_string());
    println!(
        "\n{} of {} districts (RKI update: {updated})",
        rows.len(),
        merged.entities.len()
    );
    Ok(())
}

/// Starts the API server on its own Actix system.
pub async fn serve(multi: &MultiProgress, config: ServerConfig) -> Result<(), Box<dyn Error>> {
    let progress = IndicatifProgress::geocode_bar(multi, "Preparing coordinate cache");
    // actix-web needs its own runtime; run it off the tokio worker threads.
    tokio::task::spawn_blocking(move || {
        actix_rt::System::new().block_on(covid_map_server::run_server(config, progress))
    })
    .await??;
    Ok(())
}

const HEADER_WIDTH: usize = 40 + 1 + 16 + 1 + 24 + 1 + 14;

fn format_header() -> String {
    let [name, own, state, state_own] = [
        SortColumn::DistrictName,
        SortColumn::Cases7Per100k,
        SortColumn::State,
        SortColumn::Cases7BlPer100k,
    ]
    .map(SortColumn::label);
    format!("{name:<40} {own:>16} {state:<24} {state_own:>14}")
}

fn format_row(row: &TableRow) -> String {
    format!(
        "{:<40} {:>16.2} {:<24} {:>14.2}",
        row.district_name, row.cases7_per_100k, row.state, row.cases7_bl_per_100k
    )
}
