//! Catalog API under `/api`.
//!
//! Every successful response is wrapped as `{success: true, data, timestamp}`;
//! failures as `{success: false, message, timestamp}`.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use tower_http::services::ServeDir;

use crate::{
    AppState,
    catalog::{CatalogKind, format_timestamp},
    routes::health,
    services::ModelFilter,
};

/// Success envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    pub timestamp: String,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data,
            timestamp: format_timestamp(Utc::now()),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct SearchResponse<T> {
    pub success: bool,
    pub data: T,
    pub query: String,
    pub count: usize,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: &'static str,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
    timestamp: String,
}

/// Error response for API requests.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    /// Create a new API error
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.status, self.message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            success: false,
            message: self.message,
            timestamp: format_timestamp(Utc::now()),
        };
        (self.status, Json(body)).into_response()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ModelsQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// List models, optionally restricted with `?type=openrouter|huggingface`.
#[tracing::instrument(name = "models.list", skip(state))]
pub async fn list_models(
    State(state): State<AppState>,
    Query(query): Query<ModelsQuery>,
) -> impl IntoResponse {
    let filter = ModelFilter::parse(query.kind.as_deref());
    ApiResponse::ok(state.models.models(filter))
}

#[tracing::instrument(name = "models.list_openrouter", skip(state))]
pub async fn list_openrouter_models(State(state): State<AppState>) -> impl IntoResponse {
    ApiResponse::ok(
        state
            .models
            .models(ModelFilter::Only(CatalogKind::OpenRouter)),
    )
}

#[tracing::instrument(name = "models.list_huggingface", skip(state))]
pub async fn list_huggingface_models(State(state): State<AppState>) -> impl IntoResponse {
    ApiResponse::ok(
        state
            .models
            .models(ModelFilter::Only(CatalogKind::HuggingFace)),
    )
}

#[tracing::instrument(name = "models.search", skip(state))]
pub async fn search_models(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let q = query
        .q
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Search query is required"))?;

    let filter = ModelFilter::parse(query.kind.as_deref());
    let results = state.models.search(&q, filter);

    Ok(Json(SearchResponse {
        success: true,
        count: results.len(),
        data: results,
        query: q,
        timestamp: format_timestamp(Utc::now()),
    }))
}

#[tracing::instrument(name = "models.stats", skip(state))]
pub async fn model_stats(State(state): State<AppState>) -> impl IntoResponse {
    ApiResponse::ok(state.models.stats())
}

#[tracing::instrument(name = "models.status", skip(state))]
pub async fn model_status(State(state): State<AppState>) -> impl IntoResponse {
    ApiResponse::ok(state.models.status())
}

/// Start a refresh pass in the background.
#[tracing::instrument(name = "models.refresh", skip(state))]
pub async fn refresh_models(State(state): State<AppState>) -> impl IntoResponse {
    state.models.refresher().trigger();
    Json(MessageResponse {
        success: true,
        message: "Models data refresh initiated",
        timestamp: format_timestamp(Utc::now()),
    })
}

/// `GET /api/models/huggingface/{org}/{name}/details`.
///
/// Model ids contain slashes, so the whole tail is captured and the
/// `/details` suffix is stripped by hand.
#[tracing::instrument(name = "models.details", skip(state))]
pub async fn huggingface_model_details(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let model_id = path
        .strip_suffix("/details")
        .ok_or_else(|| ApiError::not_found("Not found"))?;

    if model_id.trim_matches('/').is_empty() {
        return Err(ApiError::bad_request("Model ID is required"));
    }

    let details = state.models.details(model_id).await;
    Ok(ApiResponse::ok(details))
}

pub fn get_api_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/models", get(list_models))
        .route("/models/openrouter", get(list_openrouter_models))
        .route("/models/huggingface", get(list_huggingface_models))
        .route("/models/huggingface/{*path}", get(huggingface_model_details))
        .route("/models/search", get(search_models))
        .route("/models/stats", get(model_stats))
        .route("/models/status", get(model_status))
        .route("/models/refresh", post(refresh_models))
        .route("/health", get(health::health_check))
        .nest_service("/icons", ServeDir::new(&state.config.icons.dir))
}
