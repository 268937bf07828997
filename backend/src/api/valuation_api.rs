use axum::{extract::State, response::Json, routing::post, Router};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::{ApiError, ApiState};
use crate::types::TokenData;
use crate::valuation::{Valuation, ValuationEngine, ValuationSummary};

fn default_amount() -> f64 {
    1.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValuationRequest {
    pub token_a: String,
    /// May be omitted when `target_market_cap` is supplied.
    #[serde(default)]
    pub token_b: Option<String>,
    #[serde(default)]
    pub use_all_time_high: bool,
    #[serde(default = "default_amount")]
    pub amount: f64,
    #[serde(default)]
    pub target_market_cap: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ValuationResponse {
    pub token_a: TokenData,
    pub token_b: Option<TokenData>,
    pub valuation: Valuation,
    pub summary: ValuationSummary,
}

pub fn create_valuation_router() -> Router<ApiState> {
    Router::new().route("/", post(value_token))
}

/// POST /api/valuation
#[instrument(skip(state))]
async fn value_token(
    State(state): State<ApiState>,
    Json(request): Json<ValuationRequest>,
) -> Result<Json<ValuationResponse>, ApiError> {
    let custom_target = request.target_market_cap.filter(|t| t.is_finite() && *t > 0.0);
    if request.token_b.is_none() && custom_target.is_none() {
        return Err(ApiError::BadRequest(
            "token_b or a positive target_market_cap is required".to_string(),
        ));
    }

    let resolve_b = async {
        match &request.token_b {
            Some(identifier) => state.resolver.resolve(identifier).await.map(Some),
            None => Some(None),
        }
    };
    let (token_a, token_b) = tokio::join!(state.resolver.resolve(&request.token_a), resolve_b);
    let token_a = token_a.ok_or(ApiError::TokenNotFound)?;
    let token_b = token_b.ok_or(ApiError::TokenNotFound)?;

    let valuation = match &token_b {
        Some(token_b) => ValuationEngine::evaluate_with_target(
            &token_a,
            token_b,
            request.use_all_time_high,
            request.amount,
            custom_target,
        ),
        None => ValuationEngine::evaluate_target(&token_a, custom_target.unwrap_or(0.0), request.amount),
    };

    info!(
        "Valued {} at {:.4}x against {}",
        token_a.symbol,
        valuation.multiplier,
        token_b.as_ref().map(|t| t.symbol.as_str()).unwrap_or("custom market cap")
    );

    Ok(Json(ValuationResponse {
        summary: valuation.summary(),
        token_a,
        token_b,
        valuation,
    }))
}
