use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::error::ServeError;
use crate::models::{HealthResponse, RecommendationResponse};
use crate::AppState;

const INDEX_HTML: &str = include_str!("index.html");

#[derive(Debug, Deserialize)]
pub struct RecommendationQuery {
    pub top_k: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: String,
}

impl<T> ApiResponse<T> {
    fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: "Success".to_string(),
        }
    }
}

/// Errors returned to HTTP clients as `{"error": "..."}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("recommendation model not loaded")]
    NotReady,
}

impl From<ServeError> for ApiError {
    fn from(err: ServeError) -> Self {
        match err {
            ServeError::NotReady => ApiError::NotReady,
            ServeError::InvalidUserId(e) => ApiError::BadRequest(e.to_string()),
            ServeError::InvalidTopK(e) => ApiError::BadRequest(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotReady => StatusCode::SERVICE_UNAVAILABLE,
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health_check(State(state): State<AppState>) -> Json<ApiResponse<HealthResponse>> {
    let service = &state.recommendation_service;

    Json(ApiResponse::success(HealthResponse {
        status: "healthy".to_string(),
        service: "vidrec-recommendation".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        model_loaded: service.is_ready(),
        model: service.model_summary(),
    }))
}

async fn get_recommendations(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    query: Result<Query<RecommendationQuery>, QueryRejection>,
) -> Result<Json<RecommendationResponse>, ApiError> {
    let Query(params) = query.map_err(|_| {
        ApiError::BadRequest("top_k must be a non-negative integer".to_string())
    })?;

    state
        .recommendation_service
        .get_recommendations(&user_id, params.top_k)
        .map(Json)
        .map_err(|e| {
            warn!(user_id = %user_id, "Rejected recommendation request: {}", e);
            ApiError::from(e)
        })
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route("/recommend/:user_id", get(get_recommendations))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
