//! HTTP surface consumed by the predictive search front end.
//!
//! Two endpoints, both GET:
//!
//! - `/search/search?query=<string>&limit=<int>` – embed the query,
//!   run nearest-neighbor search, and return ranked hits (`title`,
//!   `doi`, optional `authors`/`summary`). Each served query also
//!   feeds the completion store.
//! - `/search/search/predict?partial_query=<string>&limit=<int>` –
//!   return completion strings for the partial input, most likely
//!   first.

use crate::embeddings::TextEmbedder;
use crate::error::{EmbedError, SearchError};
use crate::models::SearchHit;
use crate::predictor::QueryPredictor;
use crate::traits::VectorIndex;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

const DEFAULT_LIMIT: usize = 10;
const MAX_LIMIT: usize = 100;

/// Shared state behind the search routes.
pub struct SearchService {
    pub embedder: Arc<dyn TextEmbedder>,
    pub index: Arc<dyn VectorIndex>,
    pub predictor: Arc<QueryPredictor>,
}

pub fn create_router(service: Arc<SearchService>) -> Router {
    Router::new()
        .route("/search/search", get(search))
        .route("/search/search/predict", get(predict))
        .with_state(service)
}

/// Serve the search routes on an already-bound listener until the
/// process exits.
pub async fn serve(
    listener: tokio::net::TcpListener,
    service: Arc<SearchService>,
) -> std::io::Result<()> {
    axum::serve(listener, create_router(service)).await
}

#[derive(Deserialize)]
struct SearchParams {
    query: String,
    limit: Option<usize>,
}

async fn search(
    State(service): State<Arc<SearchService>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<SearchHit>>, ApiError> {
    let query = params.query.trim().to_string();
    if query.is_empty() {
        return Err(ApiError::BadRequest("query is empty"));
    }
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);

    let embedder = Arc::clone(&service.embedder);
    let query_vector =
        tokio::task::block_in_place(move || embedder.embed(&query))?;
    let hits = service.index.search_vector(&query_vector, limit).await?;

    service.predictor.record(params.query.trim());
    info!(query = params.query.trim(), hits = hits.len(), "search served");

    Ok(Json(hits.into_iter().map(|scored| scored.hit).collect()))
}

#[derive(Deserialize)]
struct PredictParams {
    partial_query: String,
    limit: Option<usize>,
}

async fn predict(
    State(service): State<Arc<SearchService>>,
    Query(params): Query<PredictParams>,
) -> Json<Vec<String>> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
    Json(service.predictor.predict(&params.partial_query, limit))
}

enum ApiError {
    BadRequest(&'static str),
    Upstream(SearchError),
}

impl From<SearchError> for ApiError {
    fn from(inner: SearchError) -> Self {
        Self::Upstream(inner)
    }
}

impl From<EmbedError> for ApiError {
    fn from(inner: EmbedError) -> Self {
        Self::Upstream(SearchError::Embedding(inner))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::BadRequest(details) => (StatusCode::BAD_REQUEST, details).into_response(),
            Self::Upstream(error) => {
                warn!(%error, "search request failed");
                (StatusCode::BAD_GATEWAY, "search backend unavailable").into_response()
            }
        }
    }
}
