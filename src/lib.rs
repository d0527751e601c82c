// src/lib.rs

use std::sync::Arc;

use secrecy::SecretString;

pub mod api;
pub mod chain;
pub mod config;
pub mod mcp;
pub mod utils;

// Re-export commonly used types
pub use chain::{Address, ChainError, ClientCache, H256, U256};

use chain::nonce::NonceManager;
use chain::services::bridge::{BridgeProvider, HttpBridgeProvider};
use chain::services::swap::SwapAggregator;

/// Application state shared across all request handlers
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: config::Config,
    /// Per-network read connection cache, constructed once per process
    pub clients: Arc<ClientCache>,
    /// Sequences nonces for concurrent submissions
    pub nonces: NonceManager,
    /// Bridging provider driving the bridge pipeline
    pub bridge: Arc<dyn BridgeProvider>,
    /// Swap aggregator client
    pub swap: Arc<SwapAggregator>,
}

impl AppState {
    pub fn new(config: config::Config) -> Self {
        let clients = Arc::new(ClientCache::new(config.rpc_url_overrides.clone()));
        let bridge = Arc::new(HttpBridgeProvider::new(config.bridge_api_url.clone()));
        let swap = Arc::new(SwapAggregator::new(
            config.swap_api_url.clone(),
            config.swap_api_key.clone(),
        ));
        Self {
            config,
            clients,
            nonces: NonceManager::new(),
            bridge,
            swap,
        }
    }

    /// The signing key for a write operation: per-call argument first,
    /// configured fallback second. Absence of both is a configuration
    /// failure surfaced before any network call.
    pub fn signing_key(&self, per_call: Option<String>) -> Result<SecretString, ChainError> {
        per_call
            .or_else(|| self.config.wallet_private_key.clone())
            .map(SecretString::new)
            .ok_or_else(|| {
                ChainError::Configuration(
                    "no signing key: pass 'private_key' or set WALLET_PRIVATE_KEY".to_string(),
                )
            })
    }
}
