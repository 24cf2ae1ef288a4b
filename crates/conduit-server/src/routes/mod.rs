//! Route table

mod mappings;
mod runs;
mod synchronizations;

use axum::Router;
use axum::routing::{get, post};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// List responses wrap their records as `{"results": [...]}`.
#[derive(Debug, Serialize)]
pub struct Results<T> {
    pub results: Vec<T>,
}

impl<T> From<Vec<T>> for Results<T> {
    fn from(results: Vec<T>) -> Self {
        Self { results }
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route(
            "/synchronizations",
            get(synchronizations::list).post(synchronizations::create),
        )
        .route(
            "/synchronizations/:id",
            get(synchronizations::show)
                .put(synchronizations::update)
                .delete(synchronizations::destroy),
        )
        .route("/synchronizations-run/:id", post(runs::run))
        .route("/synchronizations-test/:id", post(runs::test))
        .route("/synchronizations-logs/:id", get(runs::logs))
        .route("/synchronizations-contracts/:id", get(runs::contracts))
        .route("/mappings", get(mappings::list).post(mappings::create))
        .route("/mappings/test", post(mappings::test))
        .route(
            "/mappings/:id",
            get(mappings::show)
                .put(mappings::update)
                .delete(mappings::destroy),
        );

    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
