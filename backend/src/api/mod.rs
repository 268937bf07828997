pub mod tokens_api;
pub mod valuation_api;
pub mod wallet_api;

pub use tokens_api::create_tokens_router;
pub use valuation_api::{create_valuation_router, ValuationRequest, ValuationResponse};
pub use wallet_api::create_wallet_router;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tower_http::cors::CorsLayer;

use crate::cache::CacheStats;
use crate::resolver::TokenResolver;
use crate::token_registry::{DiscoveryAggregator, MarketListings};
use crate::wallet::WalletHoldingsAggregator;

/// Shared handles for every route.
#[derive(Clone)]
pub struct ApiState {
    pub resolver: TokenResolver,
    pub discovery: Arc<DiscoveryAggregator>,
    pub listings: Arc<MarketListings>,
    pub wallet: WalletHoldingsAggregator,
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("token not found")]
    TokenNotFound,
    #[error("{0}")]
    BadRequest(String),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::TokenNotFound => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        };
        (status, Json(ErrorResponse { error: self.to_string() })).into_response()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub resolver: CacheStats,
    pub discovery: CacheStats,
    pub wallet: CacheStats,
}

pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/stats", get(stats))
        .nest("/api/tokens", create_tokens_router())
        .nest("/api/wallet", create_wallet_router())
        .nest("/api/valuation", create_valuation_router())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: Utc::now(),
    })
}

async fn stats(axum::extract::State(state): axum::extract::State<ApiState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        resolver: state.resolver.cache_stats(),
        discovery: state.discovery.cache_stats(),
        wallet: state.wallet.cache_stats(),
    })
}
