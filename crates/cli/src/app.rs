//! Relay assembly: blueprint in, router out.

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tracing::{info, instrument};

use contracts::RelayBlueprint;
use directory::{management_router, InMemoryDirectory};
use dispatcher::{DispatchMetrics, DispatcherConfig, FanOutDispatcher, ReqwestTransport};
use ingestion::{ingest_router, IngestionEngine};

use crate::error::Result;

pub const MSG_WELCOME: &str = "Welcome to Data Pusher API";
pub const MSG_ROUTE_NOT_FOUND: &str = "Route not found";

/// A fully wired relay, ready to be served
pub struct RelayApp {
    /// Ingestion endpoint + management API + `GET /`
    pub router: Router,
    /// Shared with the management API; handy for inspection
    pub directory: Arc<InMemoryDirectory>,
    /// Dispatcher counters, logged at shutdown
    pub metrics: Arc<DispatchMetrics>,
}

/// Wire every component described by `blueprint`
///
/// The blueprint is expected to be validated already.
#[instrument(
    name = "build_app",
    skip(blueprint),
    fields(
        ingest_path = %blueprint.server.ingest_path,
        timeout_ms = blueprint.dispatch.timeout_ms
    )
)]
pub fn build_app(blueprint: &RelayBlueprint) -> Result<RelayApp> {
    let directory = Arc::new(InMemoryDirectory::from_blueprint(blueprint)?);

    let transport = ReqwestTransport::new(&blueprint.dispatch.user_agent)?;
    let dispatcher = FanOutDispatcher::new(transport, DispatcherConfig::from(&blueprint.dispatch));
    let metrics = Arc::clone(dispatcher.metrics());

    let engine = Arc::new(IngestionEngine::new(
        Arc::clone(&directory),
        Arc::clone(&directory),
        dispatcher,
    ));

    let router = Router::new()
        .route("/", get(welcome))
        .merge(ingest_router(engine, &blueprint.server)?)
        .merge(management_router(Arc::clone(&directory)))
        .fallback(route_not_found);

    info!(
        status_policy = ?blueprint.dispatch.status_policy,
        "Relay assembled"
    );

    Ok(RelayApp {
        router,
        directory,
        metrics,
    })
}

async fn welcome() -> Json<serde_json::Value> {
    Json(json!({ "message": MSG_WELCOME }))
}

async fn route_not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "message": MSG_ROUTE_NOT_FOUND })),
    )
}
