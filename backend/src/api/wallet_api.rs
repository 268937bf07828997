use axum::{
    extract::{Path, State},
    response::Json,
    routing::get,
    Router,
};
use tracing::instrument;

use super::ApiState;
use crate::types::WalletToken;

pub fn create_wallet_router() -> Router<ApiState> {
    Router::new().route("/:address/tokens", get(wallet_tokens))
}

/// GET /api/wallet/:address/tokens
///
/// Invalid addresses produce an empty list rather than an error.
#[instrument(skip(state))]
async fn wallet_tokens(State(state): State<ApiState>, Path(address): Path<String>) -> Json<Vec<WalletToken>> {
    Json(state.wallet.load_wallet_tokens(&address).await)
}
