//! API handlers for the HTTP REST API

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::alerting::AlertDispatcher;
use crate::db::Stores;
use crate::error::Error;
use crate::models::{
    AlertConfigInput, AlertConfigSummary, AlertRecordSummary, DispatchOutcome, DispatchRequest,
    RECORD_LIST_LIMIT,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<AlertDispatcher>,
    pub stores: Stores,
}

/// Response envelope: `{"code": .., "msg": .., "data": ..}`
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Successful response carrying `data`
    pub fn ok(data: T) -> Json<Self> {
        Json(Self {
            code: StatusCode::OK.as_u16(),
            msg: None,
            data: Some(data),
        })
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::ConfigNotFound { .. } => StatusCode::NOT_FOUND,
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let msg = Some(self.to_string());
        let data = match self {
            Error::PersistenceFailed { results, .. } => Some(SendAlertData { results }),
            _ => None,
        };

        let body = ApiResponse {
            code: status.as_u16(),
            msg,
            data,
        };
        (status, Json(body)).into_response()
    }
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Per-target send results
#[derive(Debug, Serialize, Deserialize)]
pub struct SendAlertData {
    pub results: BTreeMap<String, bool>,
}

/// Dispatch an alert to every channel of its config
pub async fn send_alert(
    State(state): State<AppState>,
    Json(req): Json<DispatchRequest>,
) -> Result<Json<ApiResponse<DispatchOutcome>>, Error> {
    let outcome = state.dispatcher.dispatch(req).await?;
    Ok(ApiResponse::ok(outcome))
}

/// Created config id
#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedConfig {
    pub id: i64,
}

/// Add an alert config
pub async fn add_alert_config(
    State(state): State<AppState>,
    Json(input): Json<AlertConfigInput>,
) -> Result<Json<ApiResponse<CreatedConfig>>, Error> {
    let input = input.normalize()?;
    let id = state.stores.configs.create_config(input).await?;
    Ok(ApiResponse::ok(CreatedConfig { id }))
}

/// List alert configs
pub async fn list_alert_configs(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<AlertConfigSummary>>>, Error> {
    let configs = state.stores.configs.list_configs().await?;
    Ok(ApiResponse::ok(configs))
}

/// Query parameters for listing alert records
#[derive(Debug, Deserialize)]
pub struct ListRecordsQuery {
    pub device_id: Option<String>,
}

/// List the most recent alert records
pub async fn list_alert_records(
    State(state): State<AppState>,
    Query(query): Query<ListRecordsQuery>,
) -> Result<Json<ApiResponse<Vec<AlertRecordSummary>>>, Error> {
    let device_id = query.device_id.as_deref().filter(|d| !d.is_empty());

    let records = state
        .stores
        .records
        .list_records(device_id, RECORD_LIST_LIMIT)
        .await?;

    Ok(ApiResponse::ok(records.iter().map(|r| r.summary()).collect()))
}
