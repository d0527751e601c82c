// src/chain/nonce.rs

use std::sync::Arc;

use dashmap::DashMap;
use ethers_core::types::{Address, U256};
use tokio::sync::Mutex;

use crate::chain::error::ChainError;

// Sequences nonces per (sender, chain) so concurrent submissions from the
// same key cannot collide. Each sender/chain pair gets its own lock; the
// DashMap allows unrelated senders to proceed concurrently.
#[derive(Debug, Clone, Default)]
pub struct NonceManager {
    nonces: DashMap<(Address, u64), Arc<Mutex<NonceState>>>,
}

#[derive(Debug, Default)]
struct NonceState {
    next: Option<U256>,
}

impl NonceManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out the next sequential nonce for a sender on one chain,
    /// fetching the pending transaction count on first use.
    pub async fn next_nonce(
        &self,
        address: Address,
        chain_id: u64,
        rpc_url: &str,
    ) -> Result<U256, ChainError> {
        let slot = self
            .nonces
            .entry((address, chain_id))
            .or_insert_with(|| Arc::new(Mutex::new(NonceState::default())))
            .clone();

        let mut state = slot.lock().await;

        let nonce = match state.next {
            Some(nonce) => nonce,
            None => fetch_pending_nonce(address, rpc_url).await?,
        };

        state.next = Some(nonce + U256::one());
        Ok(nonce)
    }
}

async fn fetch_pending_nonce(address: Address, rpc_url: &str) -> Result<U256, ChainError> {
    let client = reqwest::Client::new();
    let payload = serde_json::json!({
        "jsonrpc": "2.0",
        "method": "eth_getTransactionCount",
        "params": [format!("{:?}", address), "pending"],
        "id": 1
    });

    let resp: serde_json::Value = client
        .post(rpc_url)
        .json(&payload)
        .send()
        .await
        .map_err(|e| ChainError::Rpc(e.to_string()))?
        .json()
        .await
        .map_err(|e| ChainError::Rpc(e.to_string()))?;

    if let Some(err) = resp.get("error") {
        return Err(ChainError::Rpc(format!("eth_getTransactionCount: {}", err)));
    }
    let nonce_hex = resp["result"]
        .as_str()
        .ok_or_else(|| ChainError::Rpc("missing result in nonce response".to_string()))?;
    U256::from_str_radix(nonce_hex.trim_start_matches("0x"), 16)
        .map_err(|e| ChainError::Rpc(format!("bad nonce '{}': {}", nonce_hex, e)))
}
