//! HTTP handler functions for the covid map API.

use actix_web::{HttpResponse, web};
use covid_map_presentation::overlay::build_overlay;
use covid_map_presentation::table::{build_table, sort_rows};
use covid_map_server_models::{
    ApiDistrict, ApiDistricts, ApiError, ApiHealth, ApiOverlay, ApiSnapshotInfo, ApiTable,
    TableQueryParams,
};
use covid_map_source::SourceError;

use crate::AppState;
use crate::pipeline::{MergedSnapshot, fetch_merged};

/// `GET /api/health`
pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
        cached_districts: state.coordinates.len(),
    })
}

/// `GET /api/districts`
///
/// Returns the merged districts in snapshot order.
pub async fn districts(state: web::Data<AppState>) -> HttpResponse {
    match fetch_merged(&state.fetcher, &state.coordinates).await {
        Ok(merged) => {
            let snapshot = snapshot_info(&merged);
            let districts = merged.entities.into_iter().map(ApiDistrict::from).collect();
            HttpResponse::Ok().json(ApiDistricts {
                snapshot,
                districts,
            })
        }
        Err(e) => upstream_error(&e),
    }
}

/// `GET /api/overlay`
///
/// Returns circle markers and heat points for the map.
pub async fn overlay(state: web::Data<AppState>) -> HttpResponse {
    match fetch_merged(&state.fetcher, &state.coordinates).await {
        Ok(merged) => HttpResponse::Ok().json(ApiOverlay {
            snapshot: snapshot_info(&merged),
            overlay: build_overlay(&merged.entities),
        }),
        Err(e) => upstream_error(&e),
    }
}

/// `GET /api/table`
///
/// Returns table rows sorted by `sort` (default `district_name`) in
/// `direction` (default `asc`).
pub async fn table(
    state: web::Data<AppState>,
    params: web::Query<TableQueryParams>,
) -> HttpResponse {
    let sort = params.sort.unwrap_or_default();
    let direction = params.direction.unwrap_or_default();

    match fetch_merged(&state.fetcher, &state.coordinates).await {
        Ok(merged) => {
            let mut rows = build_table(&merged.entities);
            sort_rows(&mut rows, sort, direction);
            HttpResponse::Ok().json(ApiTable {
                snapshot: snapshot_info(&merged),
                sort,
                direction,
                rows,
            })
        }
        Err(e) => upstream_error(&e),
    }
}

fn snapshot_info(merged: &MergedSnapshot) -> ApiSnapshotInfo {
    ApiSnapshotInfo {
        fetched_at: merged.snapshot.fetched_at,
        last_update: merged.snapshot.last_update,
        source_records: merged.snapshot.records.len(),
        entities: merged.entities.len(),
    }
}

/// Maps a statistics fetch failure to `502 Bad Gateway`.
fn upstream_error(e: &SourceError) -> HttpResponse {
    log::error!("Failed to fetch statistics: {e}");
    HttpResponse::BadGateway().json(ApiError::new(format!("Failed to fetch statistics: {e}")))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::http::StatusCode;
    use actix_web::{App, test};
    use covid_map_coordinates::CoordinateMap;
    use covid_map_district_models::Resolution;
    use covid_map_source::rki::StatisticsFetcher;

    use super::*;

    fn state() -> web::Data<AppState> {
        let coordinates: CoordinateMap = [
            ("Berlin".to_string(), Resolution::NotFound),
            ("Musterstadt Kreis".to_string(), Resolution::NotFound),
        ]
        .into_iter()
        .collect();
        web::Data::new(AppState {
            fetcher: StatisticsFetcher::rki().unwrap(),
            coordinates: Arc::new(coordinates),
        })
    }

    #[actix_web::test]
    async fn health_reports_cache_size() {
        let app = test::init_service(
            App::new()
                .app_data(state())
                .route("/api/health", web::get().to(health)),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/health").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["healthy"], true);
        assert_eq!(body["cachedDistricts"], 2);
    }

    #[actix_web::test]
    async fn rejects_unknown_sort_column() {
        let app = test::init_service(
            App::new()
                .app_data(state())
                .route("/api/table", web::get().to(table)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/table?sort=population")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[::core::prelude::v1::test]
    fn upstream_failure_is_bad_gateway() {
        let resp = upstream_error(&SourceError::UpstreamUnavailable {
            message: "HTTP 503".to_string(),
        });
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    }
}
