//! Interactive menu shown when no subcommand is given.

use std::error::Error;

use covid_map_cli_utils::{IndicatifProgress, MultiProgress};
use covid_map_presentation::table::{SortColumn, SortDirection};
use dialoguer::{Input, Select};

use crate::commands;

/// Top-level tool selection.
enum Tool {
    Snapshot,
    BuildCache,
    RebuildCache,
    CacheStatus,
    Server,
}

impl Tool {
    const ALL: &[Self] = &[
        Self::Snapshot,
        Self::BuildCache,
        Self::RebuildCache,
        Self::CacheStatus,
        Self::Server,
    ];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::Snapshot => "Show current district table",
            Self::BuildCache => "Build coordinate cache (new districts only)",
            Self::RebuildCache => "Rebuild coordinate cache from scratch",
            Self::CacheStatus => "Show coordinate cache status",
            Self::Server => "Start server",
        }
    }
}

/// Prompts for a tool and runs it.
pub async fn run(multi: &MultiProgress) -> Result<(), Box<dyn Error>> {
    println!("Covid Map Toolchain");
    println!();

    let labels: Vec<&str> = Tool::ALL.iter().map(Tool::label).collect();

    let idx = Select::new()
        .with_prompt("What would you like to do?")
        .items(&labels)
        .default(0)
        .interact()?;

    match Tool::ALL[idx] {
        Tool::Snapshot => {
            let columns: Vec<&str> = SortColumn::ALL.iter().map(|c| c.label()).collect();
            let column = Select::new()
                .with_prompt("Sort by")
                .items(&columns)
                .default(0)
                .interact()?;

            let direction = Select::new()
                .with_prompt("Direction")
                .items(&["Ascending", "Descending"])
                .default(0)
                .interact()?;
            let direction = if direction == 0 {
                SortDirection::Asc
            } else {
                SortDirection::Desc
            };

            let limit: usize = Input::new()
                .with_prompt("Rows to show (0 for all)")
                .default(0)
                .interact_text()?;

            commands::snapshot(
                SortColumn::ALL[column],
                direction,
                (limit > 0).then_some(limit),
                false,
            )
            .await?;
        }
        Tool::BuildCache => commands::build_cache(multi, false).await?,
        Tool::RebuildCache => commands::build_cache(multi, true).await?,
        Tool::CacheStatus => commands::cache_status(true).await?,
        Tool::Server => {
            let progress = IndicatifProgress::geocode_bar(multi, "Preparing coordinate cache");
            // The server uses actix-web's runtime, so run it in a blocking
            // task to avoid nesting runtimes.
            tokio::task::spawn_blocking(move || {
                actix_rt::System::new().block_on(covid_map_server::interactive::run(progress))
            })
            .await??;
        }
    }

    Ok(())
}
