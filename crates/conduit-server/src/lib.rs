//! HTTP surface for Conduit
//!
//! A thin axum layer over `conduit-core`. Every route lives under `/api`:
//!
//! | route | purpose |
//! |---|---|
//! | `GET/POST /synchronizations` | list (filterable) and create definitions |
//! | `GET/PUT/DELETE /synchronizations/{id}` | read, update, delete one definition |
//! | `GET/POST /mappings` | list and create stored mappings |
//! | `GET/PUT/DELETE /mappings/{id}` | read, update, delete one mapping |
//! | `POST /mappings/test` | evaluate a mapping against an input object |
//! | `POST /synchronizations-run/{id}` | run a synchronization, returns its trace |
//! | `POST /synchronizations-test/{id}` | map without writing, returns trace and objects |
//! | `GET /synchronizations-logs/{id}` | job logs of a synchronization |
//! | `GET /synchronizations-contracts/{id}` | contracts of a synchronization |
//!
//! Runs execute on the blocking pool. A run with a numeric id always answers
//! 200 with its trace, whatever level it ended at; a malformed id is a 400.

pub mod error;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult, Error, Result};
pub use routes::router;
pub use state::AppState;

use std::net::SocketAddr;

/// Serve `state` on `addr` until Ctrl-C.
pub async fn serve(state: AppState, addr: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Cannot listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
