pub mod api;
pub mod app;
pub mod cache;
pub mod config;
pub mod resolver;
pub mod sources;
pub mod token_registry;
pub mod types;
pub mod valuation;
pub mod wallet;
