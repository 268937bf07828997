mod common;

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{json, Value};
use std::sync::Arc;

use capcompare_backend::api::tokens_api::{RefreshResponse, SearchResponse};
use capcompare_backend::api::{create_router, ApiState, ErrorResponse, HealthResponse, ValuationResponse};
use capcompare_backend::cache::ManualClock;
use capcompare_backend::sources::{ExploreList, HoldingsSource};
use capcompare_backend::token_registry::{DiscoveryAggregator, DiscoveryConfig, ListingsConfig, MarketListings};
use capcompare_backend::types::{DiscoveryCandidate, TokenData, WalletToken};
use capcompare_backend::wallet::{WalletConfig, WalletHoldingsAggregator};
use common::*;

fn market() -> FakeMarket {
    let mut market = FakeMarket {
        top: vec![
            token("bitcoin", "btc", 95_000.0, 1.8e12),
            token("tether", "usdt", 1.0, 1.2e11),
        ],
        ..FakeMarket::default()
    };
    market
        .by_id
        .insert("bitcoin".to_string(), token("bitcoin", "btc", 95_000.0, 1.8e12));
    market
        .by_id
        .insert("smallcap".to_string(), token("smallcap", "small", 2.0, 1e9));
    market
        .by_id
        .insert("bigcap".to_string(), token("bigcap", "big", 1.0, 1e10));
    market
}

fn registry() -> FakeRegistry {
    let mut registry = FakeRegistry::default();
    for list in [ExploreList::MostValuable, ExploreList::New, ExploreList::TopVolume] {
        registry.lists.insert(
            list,
            vec![creator_node(CREATOR_COIN, "Scott Explores", "SCOTT", "CREATOR", 250_000.0)],
        );
    }
    registry
}

fn server(fakes: &Fakes) -> TestServer {
    let discovery = Arc::new(DiscoveryAggregator::new(DiscoveryConfig::default(), fakes.registry.clone()));
    let holdings = FakeHoldings::new("explorer", Some(vec![holding(None, "ETH", 18, 0)]));
    let sources: Vec<Arc<dyn HoldingsSource>> = vec![Arc::new(holdings) as Arc<dyn HoldingsSource>];

    let state = ApiState {
        resolver: fakes.resolver(&ManualClock::new()).with_discovery(Arc::clone(&discovery)),
        discovery,
        listings: Arc::new(MarketListings::new(ListingsConfig::default(), fakes.market.clone())),
        wallet: WalletHoldingsAggregator::new(
            WalletConfig::default(),
            fakes.onchain.clone(),
            sources,
            fakes.pairs.clone(),
        ),
    };
    TestServer::new(create_router(state)).unwrap()
}

fn fakes() -> Fakes {
    Fakes::new(market(), FakePairs::default(), FakeOnchain::default(), registry())
}

#[tokio::test]
async fn test_health_endpoint() {
    let fakes = fakes();
    let server = server(&fakes);

    let response = server.get("/health").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: HealthResponse = response.json();
    assert_eq!(body.status, "ok");
}

#[tokio::test]
async fn test_resolve_endpoint() {
    let fakes = fakes();
    let server = server(&fakes);

    let response = server.get("/api/tokens/resolve/bitcoin").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let token: TokenData = response.json();
    assert_eq!(token.symbol, "btc");
}

#[tokio::test]
async fn test_resolve_unknown_token_is_not_found() {
    let fakes = fakes();
    let server = server(&fakes);

    let response = server.get("/api/tokens/resolve/0xnotanaddress").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    let body: ErrorResponse = response.json();
    assert_eq!(body.error, "token not found");
}

#[tokio::test]
async fn test_search_endpoint_combines_creators_and_markets() {
    let fakes = fakes();
    let server = server(&fakes);

    let response = server.get("/api/tokens/search").add_query_param("query", "sco").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: SearchResponse = response.json();
    assert_eq!(body.creators.len(), 1);
    assert_eq!(body.creators[0].symbol, "SCOTT");
    assert!(body.markets.is_empty());
}

#[tokio::test]
async fn test_top_endpoint_hides_stablecoins() {
    let fakes = fakes();
    let server = server(&fakes);

    let response = server.get("/api/tokens/top").add_query_param("limit", 10).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let tokens: Vec<TokenData> = response.json();
    let symbols: Vec<_> = tokens.iter().map(|t| t.symbol.as_str()).collect();
    assert_eq!(symbols, vec!["btc"]);
}

#[tokio::test]
async fn test_discovery_endpoints() {
    let fakes = fakes();
    let server = server(&fakes);

    let pool: Vec<DiscoveryCandidate> = server.get("/api/tokens/discovery").await.json();
    assert_eq!(pool.len(), 1);
    assert_eq!(fakes.registry.explore_calls(), 3);

    let refreshed: RefreshResponse = server.post("/api/tokens/discovery/refresh").await.json();
    assert_eq!(refreshed.candidates, 1);
    assert_eq!(fakes.registry.explore_calls(), 6);
}

#[tokio::test]
async fn test_wallet_tokens_endpoint() {
    let fakes = Fakes::new(
        market(),
        FakePairs::default(),
        FakeOnchain {
            native: alloy::primitives::U256::from(5u64),
            ..FakeOnchain::default()
        },
        registry(),
    );
    let server = server(&fakes);

    let response = server.get(&format!("/api/wallet/{}/tokens", WALLET)).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let tokens: Vec<WalletToken> = response.json();
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].token.symbol, "ETH");

    // Malformed addresses get an empty list, not an error
    let response = server.get("/api/wallet/nope/tokens").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let tokens: Vec<WalletToken> = response.json();
    assert!(tokens.is_empty());
}

#[tokio::test]
async fn test_valuation_endpoint() {
    let fakes = fakes();
    let server = server(&fakes);

    let response = server
        .post("/api/valuation")
        .json(&json!({ "token_a": "smallcap", "token_b": "bigcap", "amount": 5 }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let body: ValuationResponse = response.json();
    assert_eq!(body.valuation.multiplier, 10.0);
    assert_eq!(body.summary.multiplier, "10.00x");
    assert_eq!(body.summary.projected_price, "$20.00");
    assert_eq!(body.summary.total_value, "$100.00");
    assert_eq!(body.summary.target_market_cap, "$10B");
    assert_eq!(body.summary.percent_change, "+900%");
}

#[tokio::test]
async fn test_valuation_against_custom_market_cap() {
    let fakes = fakes();
    let server = server(&fakes);

    let response = server
        .post("/api/valuation")
        .json(&json!({ "token_a": "smallcap", "target_market_cap": 5e8 }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let body: Value = response.json();
    assert!(body["token_b"].is_null());
    assert_eq!(body["valuation"]["multiplier"], json!(0.5));
    assert_eq!(body["valuation"]["is_upside"], json!(false));
    assert_eq!(body["summary"]["percent_change"], json!("-50%"));
}

#[tokio::test]
async fn test_valuation_errors() {
    let fakes = fakes();
    let server = server(&fakes);

    let missing_target = server
        .post("/api/valuation")
        .json(&json!({ "token_a": "smallcap" }))
        .await;
    assert_eq!(missing_target.status_code(), StatusCode::BAD_REQUEST);

    let unknown = server
        .post("/api/valuation")
        .json(&json!({ "token_a": "smallcap", "token_b": "no-such-coin" }))
        .await;
    assert_eq!(unknown.status_code(), StatusCode::NOT_FOUND);
    let body: ErrorResponse = unknown.json();
    assert_eq!(body.error, "token not found");
}
