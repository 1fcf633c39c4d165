//! Management HTTP API
//!
//! JSON CRUD over accounts and destinations:
//!
//! | method | path                                   |
//! |--------|----------------------------------------|
//! | POST   | `/api/accounts`                        |
//! | GET    | `/api/accounts`                        |
//! | GET    | `/api/accounts/{accountId}`            |
//! | PUT    | `/api/accounts/{accountId}`            |
//! | DELETE | `/api/accounts/{accountId}`            |
//! | POST   | `/api/destinations`                    |
//! | GET    | `/api/destinations`                    |
//! | GET    | `/api/destinations/{id}`               |
//! | GET    | `/api/destinations/account/{accountId}`|
//! | PUT    | `/api/destinations/{id}`               |
//! | DELETE | `/api/destinations/{id}`               |

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use contracts::{AccountId, DestinationId};

use crate::error::DirectoryError;
use crate::store::{AccountPatch, DestinationPatch, InMemoryDirectory, NewAccount, NewDestination};

type Directory = Arc<InMemoryDirectory>;

/// Build the management router over a shared directory
pub fn management_router(directory: Directory) -> Router {
    Router::new()
        .route("/api/accounts", get(list_accounts).post(create_account))
        .route(
            "/api/accounts/{account_id}",
            get(get_account).put(update_account).delete(delete_account),
        )
        .route(
            "/api/destinations",
            get(list_destinations).post(create_destination),
        )
        .route(
            "/api/destinations/{id}",
            get(get_destination)
                .put(update_destination)
                .delete(delete_destination),
        )
        .route(
            "/api/destinations/account/{account_id}",
            get(destinations_by_account),
        )
        .with_state(directory)
}

/// `{"message": ...}` error response
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<DirectoryError> for ApiError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::NotFound { entity, .. } => Self {
                status: StatusCode::NOT_FOUND,
                message: format!("{entity} not found"),
            },
            DirectoryError::Conflict { message } | DirectoryError::Invalid { message } => {
                Self::bad_request(message)
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        warn!(error = %rejection.body_text(), "Rejected management request body");
        Self::bad_request("Invalid request body")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "message": self.message }))).into_response()
    }
}

type ApiResult = Result<Response, ApiError>;

fn ok(body: serde_json::Value) -> ApiResult {
    Ok((StatusCode::OK, Json(body)).into_response())
}

fn created(body: serde_json::Value) -> ApiResult {
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

// ===== Accounts =====

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountBody {
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    account_name: Option<String>,
    #[serde(default)]
    website: Option<String>,
}

async fn create_account(
    State(dir): State<Directory>,
    body: Result<Json<AccountBody>, JsonRejection>,
) -> ApiResult {
    let Json(body) = body?;
    let account = dir
        .create_account(NewAccount {
            email: body.email.unwrap_or_default(),
            account_name: body.account_name.unwrap_or_default(),
            website: body.website,
            ..Default::default()
        })
        .await?;
    created(json!({ "message": "Account created successfully", "account": account }))
}

async fn list_accounts(State(dir): State<Directory>) -> ApiResult {
    ok(json!({ "accounts": dir.accounts().await }))
}

async fn get_account(State(dir): State<Directory>, Path(account_id): Path<String>) -> ApiResult {
    ok(json!({ "account": dir.account(&account_id).await? }))
}

async fn update_account(
    State(dir): State<Directory>,
    Path(account_id): Path<String>,
    body: Result<Json<AccountBody>, JsonRejection>,
) -> ApiResult {
    let Json(body) = body?;
    let account = dir
        .update_account(
            &account_id,
            AccountPatch {
                email: body.email,
                account_name: body.account_name,
                website: body.website,
            },
        )
        .await?;
    ok(json!({ "message": "Account updated successfully", "account": account }))
}

async fn delete_account(
    State(dir): State<Directory>,
    Path(account_id): Path<String>,
) -> ApiResult {
    dir.delete_account(&account_id).await?;
    ok(json!({ "message": "Account deleted successfully" }))
}

// ===== Destinations =====

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DestinationBody {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    http_method: Option<String>,
    #[serde(default)]
    headers: Option<BTreeMap<String, String>>,
    #[serde(default)]
    account_id: Option<String>,
}

async fn create_destination(
    State(dir): State<Directory>,
    body: Result<Json<DestinationBody>, JsonRejection>,
) -> ApiResult {
    let Json(body) = body?;
    let (Some(url), Some(http_method), Some(headers), Some(account_id)) = (
        body.url.filter(|s| !s.is_empty()),
        body.http_method.filter(|s| !s.is_empty()),
        body.headers,
        body.account_id.filter(|s| !s.is_empty()),
    ) else {
        return Err(ApiError::bad_request(
            "URL, HTTP method, headers, and account ID are required",
        ));
    };

    let destination = dir
        .create_destination(NewDestination {
            id: None,
            account_id: AccountId::from(account_id),
            url,
            http_method,
            headers,
        })
        .await?;
    created(json!({ "message": "Destination created successfully", "destination": destination }))
}

async fn list_destinations(State(dir): State<Directory>) -> ApiResult {
    ok(json!({ "destinations": dir.destinations().await }))
}

async fn get_destination(State(dir): State<Directory>, Path(id): Path<u64>) -> ApiResult {
    ok(json!({ "destination": dir.destination(DestinationId(id)).await? }))
}

async fn destinations_by_account(
    State(dir): State<Directory>,
    Path(account_id): Path<String>,
) -> ApiResult {
    ok(json!({ "destinations": dir.destinations_of(&account_id).await? }))
}

async fn update_destination(
    State(dir): State<Directory>,
    Path(id): Path<u64>,
    body: Result<Json<DestinationBody>, JsonRejection>,
) -> ApiResult {
    let Json(body) = body?;
    let destination = dir
        .update_destination(
            DestinationId(id),
            DestinationPatch {
                url: body.url,
                http_method: body.http_method,
                headers: body.headers,
            },
        )
        .await?;
    ok(json!({ "message": "Destination updated successfully", "destination": destination }))
}

async fn delete_destination(State(dir): State<Directory>, Path(id): Path<u64>) -> ApiResult {
    dir.delete_destination(DestinationId(id)).await?;
    ok(json!({ "message": "Destination deleted successfully" }))
}
