#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the covid map application.
//!
//! Serves the merged district data as a map overlay, a sortable table and
//! a plain district list, plus the static Leaflet frontend from `app/`.
//! The coordinate cache is loaded (or built) once at startup; every data
//! request fetches a fresh statistics snapshot and merges it.

mod handlers;
pub mod interactive;
pub mod pipeline;

use std::path::PathBuf;
use std::sync::Arc;

use actix_cors::Cors;
use actix_files::Files;
use actix_web::{App, HttpServer, middleware, web};
use covid_map_coordinates::{CoordinateCache, CoordinateMap, paths};
use covid_map_source::progress::ProgressCallback;
use covid_map_source::rki::StatisticsFetcher;
use thiserror::Error;

use crate::pipeline::PipelineError;

/// Errors that stop the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Startup data could not be prepared.
    #[error("Startup failed: {0}")]
    Startup(#[from] PipelineError),

    /// Binding or running the HTTP server failed.
    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shared application state.
pub struct AppState {
    /// Statistics client.
    pub fetcher: StatisticsFetcher,
    /// Coordinate cache, loaded once at startup.
    pub coordinates: Arc<CoordinateMap>,
}

/// Where the server listens and what it serves.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: String,
    /// Port.
    pub port: u16,
    /// Directory holding the static frontend.
    pub static_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".to_string(),
            port: 8080,
            static_dir: paths::project_root().join("app"),
        }
    }
}

impl ServerConfig {
    /// Reads `BIND_ADDR` and `PORT`, falling back to the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let bind_addr = std::env::var("BIND_ADDR").unwrap_or(defaults.bind_addr);
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(defaults.port);
        Self {
            bind_addr,
            port,
            static_dir: defaults.static_dir,
        }
    }
}

/// Starts the covid map API server.
///
/// Loads the coordinate cache (building it if missing, which geocodes
/// every district and takes several minutes) and starts the Actix-Web
/// HTTP server. The caller provides the async runtime (e.g. via
/// `#[actix_web::main]`) and initializes logging.
///
/// # Errors
///
/// Returns [`ServerError::Startup`] if the coordinate cache cannot be
/// loaded or built, and [`ServerError::Io`] if the server fails to bind
/// or encounters a runtime error.
#[allow(clippy::future_not_send)]
pub async fn run_server(
    config: ServerConfig,
    progress: Arc<dyn ProgressCallback>,
) -> Result<(), ServerError> {
    let fetcher = StatisticsFetcher::rki().map_err(PipelineError::from)?;

    let cache = CoordinateCache::at_default_path();
    log::info!("Loading coordinate cache from {}...", cache.path().display());
    let coordinates = pipeline::load_or_build_coordinates(&fetcher, &cache, &progress).await?;
    log::info!(
        "Loaded {} districts ({} located)",
        coordinates.len(),
        coordinates.found_count()
    );

    let state = web::Data::new(AppState {
        fetcher,
        coordinates: Arc::new(coordinates),
    });

    let ServerConfig {
        bind_addr,
        port,
        static_dir,
    } = config;

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .service(
                web::scope("/api")
                    .route("/health", web::get().to(handlers::health))
                    .route("/districts", web::get().to(handlers::districts))
                    .route("/overlay", web::get().to(handlers::overlay))
                    .route("/table", web::get().to(handlers::table)),
            )
            .service(Files::new("/", static_dir.clone()).index_file("index.html"))
    })
    .bind((bind_addr, port))?
    .run()
    .await?;

    Ok(())
}
