use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::{ApiError, ApiState};
use crate::sources::MarketSearchHit;
use crate::types::{DiscoveryCandidate, TokenData};

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub query: String,
}

#[derive(Debug, Deserialize)]
pub struct TopParams {
    pub limit: Option<usize>,
}

/// Creator-coin matches from the discovery pool alongside market hits.
#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub creators: Vec<DiscoveryCandidate>,
    pub markets: Vec<MarketSearchHit>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub candidates: usize,
}

pub fn create_tokens_router() -> Router<ApiState> {
    Router::new()
        .route("/resolve/:identifier", get(resolve_token))
        .route("/search", get(search_tokens))
        .route("/top", get(top_tokens))
        .route("/discovery", get(discovery_pool))
        .route("/discovery/refresh", post(refresh_discovery))
}

/// GET /api/tokens/resolve/:identifier
#[instrument(skip(state))]
async fn resolve_token(
    State(state): State<ApiState>,
    Path(identifier): Path<String>,
) -> Result<Json<TokenData>, ApiError> {
    state
        .resolver
        .resolve(&identifier)
        .await
        .map(Json)
        .ok_or(ApiError::TokenNotFound)
}

/// GET /api/tokens/search?query=
#[instrument(skip(state))]
async fn search_tokens(State(state): State<ApiState>, Query(params): Query<SearchParams>) -> Json<SearchResponse> {
    let (creators, markets) = tokio::join!(
        state.discovery.search(&params.query),
        state.listings.search(&params.query)
    );
    info!("Search {:?}: {} creators, {} markets", params.query, creators.len(), markets.len());
    Json(SearchResponse { creators, markets })
}

/// GET /api/tokens/top?limit=
#[instrument(skip(state))]
async fn top_tokens(State(state): State<ApiState>, Query(params): Query<TopParams>) -> Json<Vec<TokenData>> {
    Json(state.listings.top(params.limit).await)
}

/// GET /api/tokens/discovery
#[instrument(skip(state))]
async fn discovery_pool(State(state): State<ApiState>) -> Json<Vec<DiscoveryCandidate>> {
    Json(state.discovery.refresh_pool().await)
}

/// POST /api/tokens/discovery/refresh
#[instrument(skip(state))]
async fn refresh_discovery(State(state): State<ApiState>) -> Json<RefreshResponse> {
    let pool = state.discovery.force_refresh().await;
    Json(RefreshResponse { candidates: pool.len() })
}
