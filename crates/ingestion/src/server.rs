//! Ingestion HTTP endpoint
//!
//! Check order on the ingestion path:
//! 1. token header absent → 401
//! 2. method other than POST, non-JSON content type, body not a JSON object → 400
//! 3. token unknown → 401
//!
//! Failure bodies are fixed strings; details only go to the log.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, HeaderName, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::{Json, Router};
use serde_json::{json, Value};
use tracing::{error, warn};

use contracts::{
    AccountResolver, DestinationDirectory, HttpTransport, InboundPayload, ServerConfig,
};

use crate::engine::{IngestReport, IngestionEngine};
use crate::error::IngestError;

pub const MSG_NO_DESTINATIONS: &str =
    "Data received successfully, but no destinations found for this account";
pub const MSG_PROCESSED: &str = "Data processed successfully";

struct IngestState<R, D, T> {
    engine: Arc<IngestionEngine<R, D, T>>,
    token_header: HeaderName,
}

impl<R, D, T> Clone for IngestState<R, D, T> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            token_header: self.token_header.clone(),
        }
    }
}

/// Router serving the ingestion path (any method, non-POST is rejected)
///
/// # Errors
/// `InvalidConfig` when the token header name is not a valid header name
pub fn ingest_router<R, D, T>(
    engine: Arc<IngestionEngine<R, D, T>>,
    server: &ServerConfig,
) -> Result<Router, IngestError>
where
    R: AccountResolver + Send + Sync + 'static,
    D: DestinationDirectory + Send + Sync + 'static,
    T: HttpTransport + Send + Sync + 'static,
{
    let token_header = HeaderName::from_bytes(server.token_header.as_bytes()).map_err(|e| {
        IngestError::invalid_config(format!("token header '{}': {e}", server.token_header))
    })?;

    let state = IngestState {
        engine,
        token_header,
    };

    Ok(Router::new()
        .route(&server.ingest_path, any(handle_ingest::<R, D, T>))
        .with_state(state))
}

async fn handle_ingest<R, D, T>(
    State(state): State<IngestState<R, D, T>>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response
where
    R: AccountResolver + Send + Sync + 'static,
    D: DestinationDirectory + Send + Sync + 'static,
    T: HttpTransport + Send + Sync + 'static,
{
    let result = ingest_call(&state, &method, &headers, &body).await;
    match result {
        Ok(report) => {
            observability::record_ingest(report.label());
            (StatusCode::OK, Json(report_body(&report))).into_response()
        }
        Err(err) => {
            observability::record_ingest(err.label());
            err.into_response()
        }
    }
}

async fn ingest_call<R, D, T>(
    state: &IngestState<R, D, T>,
    method: &Method,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<IngestReport, IngestError>
where
    R: AccountResolver + Send + Sync + 'static,
    D: DestinationDirectory + Send + Sync + 'static,
    T: HttpTransport + Send + Sync + 'static,
{
    let token = headers
        .get(&state.token_header)
        .and_then(|v| v.to_str().ok())
        .filter(|t| !t.is_empty())
        .ok_or(IngestError::Unauthenticated)?;

    if *method != Method::POST {
        return Err(IngestError::invalid_data(format!(
            "method {method} not allowed"
        )));
    }
    if !is_json(headers) {
        return Err(IngestError::invalid_data(
            "content type must be application/json",
        ));
    }
    let payload = InboundPayload::from_slice(body)?;

    state.engine.ingest(token, &payload).await
}

/// `application/json`, parameters (charset...) ignored
fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("application/json"))
}

fn report_body(report: &IngestReport) -> Value {
    match report {
        IngestReport::NoDestinations { account_id } => json!({
            "message": MSG_NO_DESTINATIONS,
            "accountId": account_id,
        }),
        IngestReport::Dispatched {
            account_id,
            summary,
            ..
        } => json!({
            "message": MSG_PROCESSED,
            "accountId": account_id,
            "stats": summary,
        }),
    }
}

impl IntoResponse for IngestError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            IngestError::Unauthenticated => {
                warn!("Ingestion rejected: unauthenticated");
                (StatusCode::UNAUTHORIZED, "Unauthenticated")
            }
            IngestError::InvalidData { message } => {
                warn!(reason = %message, "Ingestion rejected: invalid data");
                (StatusCode::BAD_REQUEST, "Invalid Data")
            }
            IngestError::InvalidConfig { .. } | IngestError::Internal { .. } => {
                error!(error = %self, "Ingestion failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };
        (status, Json(json!({ "message": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{account, destination, RecordingTransport, StaticDirectory};
    use axum::body::Body;
    use axum::http::Request;
    use contracts::StatusPolicy;
    use dispatcher::{DispatcherConfig, FanOutDispatcher};
    use std::time::Duration;
    use tower::ServiceExt as _;

    struct Harness {
        router: Router,
        directory: Arc<StaticDirectory>,
        transport: Arc<RecordingTransport>,
    }

    fn harness(directory: StaticDirectory) -> Harness {
        let directory = Arc::new(directory);
        let transport = Arc::new(RecordingTransport::default());
        let dispatcher = FanOutDispatcher::with_shared(
            Arc::clone(&transport),
            DispatcherConfig {
                timeout: Duration::from_secs(1),
                status_policy: StatusPolicy::AnyResponse,
            },
        );
        let engine = Arc::new(IngestionEngine::new(
            Arc::clone(&directory),
            Arc::clone(&directory),
            dispatcher,
        ));
        let router = ingest_router(engine, &ServerConfig::default()).unwrap();
        Harness {
            router,
            directory,
            transport,
        }
    }

    fn seeded() -> StaticDirectory {
        StaticDirectory {
            accounts: vec![account("A1", "T1"), account("A2", "T2")],
            destinations: vec![
                destination(1, "A1", "GET", "https://d1.example.com/"),
                destination(2, "A1", "POST", "https://d2.example.com/"),
            ],
            ..Default::default()
        }
    }

    fn request(
        method: &str,
        token: Option<&str>,
        content_type: Option<&str>,
        body: &str,
    ) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri("/server/incoming_data");
        if let Some(token) = token {
            builder = builder.header("cl-x-token", token);
        }
        if let Some(content_type) = content_type {
            builder = builder.header("content-type", content_type);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_dispatched_response() {
        let h = harness(seeded());
        let (status, body) = send(
            &h.router,
            request("POST", Some("T1"), Some("application/json"), r#"{"x":1}"#),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "message": "Data processed successfully",
                "accountId": "A1",
                "stats": {"totalDestinations": 2, "successful": 2, "failed": 0}
            })
        );
        assert_eq!(h.transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_no_destinations_response() {
        let h = harness(seeded());
        let (status, body) = send(
            &h.router,
            request(
                "POST",
                Some("T2"),
                Some("application/json; charset=utf-8"),
                "{}",
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], MSG_NO_DESTINATIONS);
        assert_eq!(body["accountId"], "A2");
        assert!(body.get("stats").is_none());
        assert!(h.transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_missing_token_wins_over_bad_body() {
        let h = harness(seeded());
        let (status, body) = send(&h.router, request("GET", None, None, "not json")).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({"message": "Unauthenticated"}));
    }

    #[tokio::test]
    async fn test_unknown_token_is_same_401() {
        let h = harness(seeded());
        let (status, body) = send(
            &h.router,
            request("POST", Some("nope"), Some("application/json"), r#"{"x":1}"#),
        )
        .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({"message": "Unauthenticated"}));
        assert_eq!(h.directory.lookups(), 0);
        assert!(h.transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_shape_checks_run_before_token_lookup() {
        let h = harness(seeded());
        let cases = [
            request("GET", Some("nope"), Some("application/json"), "{}"),
            request("PUT", Some("T1"), Some("application/json"), "{}"),
            request("POST", Some("T1"), Some("text/plain"), "{}"),
            request("POST", Some("T1"), None, "{}"),
            request("POST", Some("T1"), Some("application/json"), "[1,2]"),
            request("POST", Some("T1"), Some("application/json"), "{broken"),
        ];

        for case in cases {
            let (status, body) = send(&h.router, case).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body, json!({"message": "Invalid Data"}));
        }
        assert!(h.transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_directory_failure_is_500() {
        let h = harness(StaticDirectory {
            fail_listing: true,
            ..seeded()
        });
        let (status, body) = send(
            &h.router,
            request("POST", Some("T1"), Some("application/json"), "{}"),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"message": "Internal server error"}));
    }

    #[test]
    fn test_invalid_token_header_config() {
        let directory = Arc::new(StaticDirectory::default());
        let dispatcher = FanOutDispatcher::new(RecordingTransport::default(), DispatcherConfig::default());
        let engine = Arc::new(IngestionEngine::new(
            Arc::clone(&directory),
            directory,
            dispatcher,
        ));
        let server = ServerConfig {
            token_header: "bad header".into(),
            ..Default::default()
        };
        assert!(matches!(
            ingest_router(engine, &server),
            Err(IngestError::InvalidConfig { .. })
        ));
    }
}
