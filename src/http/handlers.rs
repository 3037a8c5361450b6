//! Route handlers: health check and item CRUD.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::storage::{CreateItemRequest, Item};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub region: String,
    pub version: &'static str,
    /// Present only when the inactivity watchdog is enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inactivity: Option<InactivityStatus>,
}

#[derive(Debug, Serialize)]
pub struct InactivityStatus {
    pub state: &'static str,
    pub in_flight: usize,
    pub timeout_secs: u64,
}

const HEALTH_MESSAGE: &str = "Hello from scale-to-zero!";

fn wants_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .map(|accept| accept.contains("application/json"))
        .unwrap_or(false)
}

/// `GET /health`: JSON when asked for, a small HTML page otherwise.
pub async fn health(State(state): State<AppState>, headers: HeaderMap) -> Response {
    tracing::debug!("health check");

    let body = HealthResponse {
        status: "ok",
        message: HEALTH_MESSAGE,
        region: state.service.region.clone(),
        version: env!("CARGO_PKG_VERSION"),
        inactivity: state.watchdog.as_ref().map(|w| InactivityStatus {
            state: w.state().as_str(),
            in_flight: w.in_flight(),
            timeout_secs: w.timeout().as_secs(),
        }),
    };

    if wants_json(&headers) {
        return Json(body).into_response();
    }

    let region = if body.region.is_empty() {
        "unknown".to_string()
    } else {
        escape_html(&body.region)
    };
    Html(format!(
        "<!DOCTYPE html>\n<html>\n<head><title>Health</title></head>\n<body>\n\
         <h1>{}</h1>\n<p>Region: {}</p>\n</body>\n</html>\n",
        body.message, region
    ))
    .into_response()
}

/// `POST /items`
pub async fn create_item(
    State(state): State<AppState>,
    payload: Result<Json<CreateItemRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Item>), ApiError> {
    let Json(request) = payload?;
    let item = state.store.create(&request.name)?;
    tracing::info!(id = item.id, name = %item.name, "item created");
    Ok((StatusCode::CREATED, Json(item)))
}

/// `GET /items`
pub async fn list_items(State(state): State<AppState>) -> Json<Vec<Item>> {
    let items = state.store.list();
    tracing::info!(count = items.len(), "items retrieved");
    Json(items)
}

/// `GET /items/{id}`
pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<Item>, ApiError> {
    state.store.get(id).map(Json).ok_or(ApiError::NotFound(id))
}

/// `DELETE /items/{id}`
pub async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<StatusCode, ApiError> {
    if state.store.delete(id) {
        tracing::info!(id, "item deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(id))
    }
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
