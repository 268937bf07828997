mod common;

use alloy::primitives::U256;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use capcompare_backend::cache::ManualClock;
use capcompare_backend::resolver::SelectionGuard;
use capcompare_backend::sources::{
    CreatorProfile, CreatorTokenMetadata, ExploreList, MarketSearchHit, OnchainTokenMetadata,
};
use capcompare_backend::token_registry::{DiscoveryAggregator, DiscoveryConfig};
use common::*;

const SCOTT_ALIAS_TARGET: &str = "0xf5546bf64475b8ece6ac031e92e4f91a88d9dc5e";

fn market_with_ethereum() -> FakeMarket {
    let mut market = FakeMarket::default();
    market
        .by_id
        .insert("ethereum".to_string(), token("ethereum", "eth", 2600.0, 3.1e11));
    market
}

#[tokio::test]
async fn test_resolve_symbol_via_market_id() {
    let fakes = Fakes::new(market_with_ethereum(), FakePairs::default(), FakeOnchain::default(), FakeRegistry::default());
    let resolver = fakes.resolver(&ManualClock::new());

    let token = resolver.resolve("ethereum").await.expect("ethereum resolves");
    assert_eq!(token.symbol, "eth");
    assert!(token.market_cap > 0.0);
    // Default logo fills the missing image
    assert!(token.image.as_deref().unwrap_or_default().contains("ethereum.png"));
}

#[tokio::test]
async fn test_invalid_address_makes_no_network_calls() {
    let fakes = Fakes::new(market_with_ethereum(), FakePairs::default(), FakeOnchain::default(), FakeRegistry::default());
    let resolver = fakes.resolver(&ManualClock::new());

    assert!(resolver.resolve("0xInvalidLength").await.is_none());
    assert!(resolver.resolve("0xzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzz").await.is_none());
    assert_eq!(fakes.total_calls(), 0);
}

#[tokio::test]
async fn test_registry_coin_accepted_only_for_creator_coins() {
    let mut registry = FakeRegistry::default();
    registry.coins.insert(
        CREATOR_COIN.to_string(),
        creator_node(CREATOR_COIN, "Scott", "SCOTT", "CREATOR", 250_000.0),
    );
    registry.coins.insert(
        BASE_TOKEN.to_string(),
        creator_node(BASE_TOKEN, "A Post", "POST", "CONTENT", 10.0),
    );
    let mut market = FakeMarket::default();
    market
        .by_contract
        .insert(BASE_TOKEN.to_string(), token(BASE_TOKEN, "post", 0.5, 5e6));

    let fakes = Fakes::new(market, FakePairs::default(), FakeOnchain::default(), registry);
    let resolver = fakes.resolver(&ManualClock::new());

    let creator = resolver.resolve(CREATOR_COIN).await.unwrap();
    assert_eq!(creator.symbol, "SCOTT");
    assert_eq!(creator.market_cap, 250_000.0);
    assert_eq!(fakes.market.calls(), 0);

    // Content coins fall through; the on-chain read finds no symbol, so the
    // market lookup by contract answers.
    let content = resolver.resolve(BASE_TOKEN).await.unwrap();
    assert_eq!(content.symbol, "post");
    assert_eq!(fakes.onchain.calls(), 1);
    assert_eq!(fakes.pairs.calls(), 0);
}

const CREATOR_OWNER: &str = "0x2222222222222222222222222222222222222222";

fn creator_coin_fakes() -> Fakes {
    let mut onchain = FakeOnchain::default();
    onchain.metadata.insert(
        CREATOR_COIN.to_string(),
        OnchainTokenMetadata {
            name: Some("Scott Explores".to_string()),
            symbol: Some("SCOTT".to_string()),
            decimals: Some(18),
            total_supply: Some(U256::from(10u64).pow(U256::from(27u64))),
            owner: Some("0x0000000000000000000000000000000000000000".to_string()),
        },
    );

    let mut registry = FakeRegistry::default();
    registry.metadata.insert(
        CREATOR_COIN.to_string(),
        CreatorTokenMetadata {
            name: Some("Scott Explores".to_string()),
            image: Some("https://cdn.example/scott.png".to_string()),
            owner: Some(CREATOR_OWNER.to_string()),
        },
    );

    let pairs = FakePairs {
        pairs: vec![
            pair(CREATOR_COIN, "SCOTT", "0.001", 100.0, 0.0, None),
            pair(CREATOR_COIN, "SCOTT", "0.002", 5_000.0, 0.0, Some("https://dex.example/scott.png")),
        ],
        ..FakePairs::default()
    };

    Fakes::new(FakeMarket::default(), pairs, onchain, registry)
}

#[tokio::test]
async fn test_creator_coin_aggregation() {
    let fakes = creator_coin_fakes();
    let resolver = fakes.resolver(&ManualClock::new());

    let token = resolver.resolve(CREATOR_COIN).await.unwrap();
    assert_eq!(token.symbol, "SCOTT");
    assert_eq!(token.current_price, 0.002);
    // Half of one billion tokens circulate
    assert!((token.market_cap - 1_000_000.0).abs() < 1e-6);
    assert_eq!(token.image.as_deref(), Some("https://cdn.example/scott.png"));
    assert_eq!(token.creator_address.as_deref(), Some(CREATOR_OWNER));
    assert_eq!(fakes.market.calls(), 0);

    // No primary name anywhere: the owner is shown shortened
    let creator = token.creator.unwrap();
    assert_eq!(creator.name, "0x2222...2222");
    assert!(creator.ens.is_none());
    assert!(creator.avatar.is_none());
}

#[tokio::test]
async fn test_creator_coin_carries_owner_primary_name() {
    let fakes = creator_coin_fakes().with_names(
        FakeNames::new(".base.eth", &[]),
        FakeNames::new(".eth", &[]).with_primary(
            CREATOR_OWNER,
            "scottexplores.eth",
            Some("https://ipfs.io/ipfs/QmScott"),
        ),
    );
    let resolver = fakes.resolver(&ManualClock::new());

    let token = resolver.resolve(CREATOR_COIN).await.unwrap();
    let creator = token.creator.unwrap();
    assert_eq!(creator.name, "scottexplores.eth");
    assert_eq!(creator.ens.as_deref(), Some("scottexplores.eth"));
    assert_eq!(creator.avatar.as_deref(), Some("https://ipfs.io/ipfs/QmScott"));
    // Basenames is asked first and has no record, then ENS answers
    assert_eq!(fakes.basenames.calls(), 1);
    assert_eq!(fakes.ens.calls(), 1);
}

#[tokio::test]
async fn test_dex_pair_fallback_when_market_fails() {
    let market = FakeMarket {
        fail: true,
        ..FakeMarket::default()
    };
    let pairs = FakePairs {
        pairs: vec![pair(BASE_TOKEN, "BOB", "1.5", 20_000.0, 3e6, None)],
        ..FakePairs::default()
    };

    let fakes = Fakes::new(market, pairs, FakeOnchain::default(), FakeRegistry::default());
    let resolver = fakes.resolver(&ManualClock::new());

    let token = resolver.resolve(BASE_TOKEN).await.unwrap();
    assert_eq!(token.symbol, "BOB");
    assert_eq!(token.current_price, 1.5);
    assert_eq!(token.market_cap, 3e6);
    assert!(token.image.unwrap().contains("dd.dexscreener.com"));
}

#[tokio::test]
async fn test_unknown_name_is_terminal() {
    let fakes = Fakes::new(market_with_ethereum(), FakePairs::default(), FakeOnchain::default(), FakeRegistry::default());
    let resolver = fakes.resolver(&ManualClock::new());

    assert!(resolver.resolve("nobody.eth").await.is_none());
    assert_eq!(fakes.ens.calls(), 1);
    assert_eq!(fakes.basenames.calls(), 0);
    assert_eq!(fakes.market.calls(), 0);
}

#[tokio::test]
async fn test_basename_resolves_through_address_chain() {
    let mut market = FakeMarket::default();
    market
        .by_contract
        .insert(BASE_TOKEN.to_string(), token(BASE_TOKEN, "jesse", 0.01, 2e7));

    let fakes = Fakes::new(market, FakePairs::default(), FakeOnchain::default(), FakeRegistry::default()).with_names(
        FakeNames::new(".base.eth", &[("jesse.base.eth", BASE_TOKEN)]),
        FakeNames::new(".eth", &[]),
    );
    let resolver = fakes.resolver(&ManualClock::new());

    let token = resolver.resolve("Jesse.Base.eth").await.unwrap();
    assert_eq!(token.symbol, "jesse");
    assert_eq!(fakes.basenames.calls(), 1);
    assert_eq!(fakes.ens.calls(), 0);
}

#[tokio::test]
async fn test_alias_skips_name_registry() {
    let mut market = FakeMarket::default();
    market.by_contract.insert(
        SCOTT_ALIAS_TARGET.to_string(),
        token(SCOTT_ALIAS_TARGET, "scottexplores", 0.0004, 4e5),
    );

    let fakes = Fakes::new(market, FakePairs::default(), FakeOnchain::default(), FakeRegistry::default());
    let resolver = fakes.resolver(&ManualClock::new());

    let token = resolver.resolve("scottexplores.base.eth").await.unwrap();
    assert_eq!(token.symbol, "scottexplores");
    assert_eq!(fakes.basenames.calls(), 0);
}

#[tokio::test]
async fn test_capitalised_id_and_ticker_resolve_through_market() {
    let mut market = market_with_ethereum();
    market.hits = vec![MarketSearchHit {
        id: "ethereum".to_string(),
        symbol: "ETH".to_string(),
        name: "Ethereum".to_string(),
        image: None,
        market_cap_rank: 2,
    }];
    let fakes = Fakes::new(market, FakePairs::default(), FakeOnchain::default(), FakeRegistry::default());
    let resolver = fakes.resolver(&ManualClock::new());

    let by_id = resolver.resolve("Ethereum").await.unwrap();
    assert_eq!(by_id.symbol, "eth");
    assert_eq!(fakes.market.calls(), 1);

    // Id miss, symbol search, then the id the hit names
    let by_ticker = resolver.resolve("ETH").await.unwrap();
    assert_eq!(by_ticker.id, "ethereum");
    assert_eq!(fakes.market.calls(), 4);
    assert_eq!(fakes.registry.calls(), 0);
}

#[tokio::test]
async fn test_symbol_miss_falls_back_to_creator_profile() {
    let mut registry = FakeRegistry::default();
    let profile: CreatorProfile = serde_json::from_value(json!({
        "handle": "scott",
        "creatorCoin": { "address": CREATOR_COIN, "marketCap": "250000" }
    }))
    .unwrap();
    registry.profiles.insert("scott".to_string(), profile);
    registry.coins.insert(
        CREATOR_COIN.to_string(),
        creator_node(CREATOR_COIN, "Scott", "SCOTT", "CREATOR", 250_000.0),
    );

    let fakes = Fakes::new(market_with_ethereum(), FakePairs::default(), FakeOnchain::default(), registry);
    let resolver = fakes.resolver(&ManualClock::new());

    let token = resolver.resolve("Scott").await.unwrap();
    assert_eq!(token.address.as_deref(), Some(CREATOR_COIN));
    // Id lookup and ticker search both missed first
    assert_eq!(fakes.market.calls(), 2);
}

#[tokio::test]
async fn test_symbol_falls_through_to_discovery_pool() {
    let mut registry = FakeRegistry::default();
    registry.lists.insert(
        ExploreList::MostValuable,
        vec![creator_node(BASE_TOKEN, "Degen Club", "DEGEN", "CREATOR", 0.0)],
    );
    let mut market = FakeMarket::default();
    market
        .by_contract
        .insert(BASE_TOKEN.to_string(), token(BASE_TOKEN, "degen", 0.01, 1e8));

    let fakes = Fakes::new(market, FakePairs::default(), FakeOnchain::default(), registry);
    let discovery = Arc::new(DiscoveryAggregator::new(
        DiscoveryConfig {
            lists: vec![ExploreList::MostValuable],
            ..DiscoveryConfig::default()
        },
        fakes.registry.clone(),
    ));
    let resolver = fakes.resolver(&ManualClock::new()).with_discovery(discovery);

    let token = resolver.resolve("degen").await.unwrap();
    assert_eq!(token.symbol, "degen");
    assert_eq!(token.market_cap, 1e8);

    // Free text skips the id and ticker lookups entirely
    let calls_before = fakes.market.calls();
    let token = resolver.resolve("Degen Club").await.unwrap();
    assert_eq!(token.address.as_deref(), Some(BASE_TOKEN));
    assert_eq!(fakes.market.calls(), calls_before + 1);
}

#[tokio::test]
async fn test_successes_are_cached_and_coalesced() {
    let market = FakeMarket {
        delay: Duration::from_millis(20),
        ..market_with_ethereum()
    };
    let fakes = Fakes::new(market, FakePairs::default(), FakeOnchain::default(), FakeRegistry::default());
    let clock = ManualClock::new();
    let resolver = fakes.resolver(&clock);

    let (a, b) = tokio::join!(resolver.resolve("ethereum"), resolver.resolve("ethereum"));
    assert_eq!(a, b);
    assert_eq!(fakes.market.calls(), 1);

    resolver.resolve("ethereum").await.unwrap();
    assert_eq!(fakes.market.calls(), 1);

    clock.advance(Duration::from_secs(61));
    resolver.resolve("ethereum").await.unwrap();
    assert_eq!(fakes.market.calls(), 2);
}

#[tokio::test]
async fn test_misses_are_not_cached() {
    let fakes = Fakes::new(FakeMarket::default(), FakePairs::default(), FakeOnchain::default(), FakeRegistry::default());
    let resolver = fakes.resolver(&ManualClock::new());

    assert!(resolver.resolve("missing").await.is_none());
    assert!(resolver.resolve("missing").await.is_none());
    // Id lookup plus ticker search, twice
    assert_eq!(fakes.market.calls(), 4);
}

#[tokio::test]
async fn test_stale_selection_is_discarded() {
    let market = FakeMarket {
        delay: Duration::from_millis(50),
        ..market_with_ethereum()
    };
    let fakes = Fakes::new(market, FakePairs::default(), FakeOnchain::default(), FakeRegistry::default());
    let resolver = fakes.resolver(&ManualClock::new());
    let guard = SelectionGuard::new();

    let (stale, _) = tokio::join!(resolver.resolve_selection(&guard, "ethereum"), async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        guard.select("bitcoin");
    });
    assert!(stale.is_none());
    assert_eq!(guard.current().as_deref(), Some("bitcoin"));

    // The resolution itself was cached and is served to a current selection
    let current = resolver.resolve_selection(&guard, "ethereum").await;
    assert_eq!(current.map(|t| t.symbol), Some("eth".to_string()));
}
