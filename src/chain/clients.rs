// src/chain/clients.rs

//! Connection management for EVM networks.
//!
//! Read connections are memoized per network for the life of the process and
//! shared across requests. Write connections carry caller-supplied key
//! material, so they are built fresh for every call and never stored.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use ethers::providers::{Http, Provider};
use ethers::signers::{LocalWallet, Signer};
use ethers_core::types::Address;
use secrecy::{ExposeSecret, SecretString};
use zeroize::Zeroizing;

use crate::chain::error::ChainError;
use crate::chain::registry::NetworkDescriptor;

/// Lazily constructed, process-lifetime cache of read-only providers.
pub struct ClientCache {
    providers: DashMap<&'static str, Arc<Provider<Http>>>,
    rpc_overrides: HashMap<String, String>,
}

impl ClientCache {
    pub fn new(rpc_overrides: HashMap<String, String>) -> Self {
        Self {
            providers: DashMap::new(),
            rpc_overrides,
        }
    }

    /// The RPC endpoint for a network, honoring configuration overrides.
    pub fn rpc_url(&self, network: &NetworkDescriptor) -> String {
        self.rpc_overrides
            .get(network.name)
            .cloned()
            .unwrap_or_else(|| network.rpc_url.to_string())
    }

    /// Return the shared read provider for a network, constructing and
    /// memoizing it on first use.
    ///
    /// A failed construction leaves the cache untouched, so a later call with
    /// a corrected RPC override can still succeed. Under a concurrent first
    /// use the entry API keeps exactly one instance; the loser's provider is
    /// dropped.
    pub fn read_client(
        &self,
        network: &'static NetworkDescriptor,
    ) -> Result<Arc<Provider<Http>>, ChainError> {
        if let Some(existing) = self.providers.get(network.name) {
            return Ok(existing.clone());
        }

        let url = self.rpc_url(network);
        let provider = Provider::<Http>::try_from(url.as_str()).map_err(|e| {
            ChainError::NetworkInit {
                network: network.name.to_string(),
                reason: e.to_string(),
            }
        })?;

        let entry = self
            .providers
            .entry(network.name)
            .or_insert_with(|| Arc::new(provider));
        Ok(entry.clone())
    }

    /// Build a write connection from a caller-supplied private key.
    ///
    /// Always fresh: the signer is bound to the network's chain id and RPC
    /// endpoint, handed back to the caller, and nothing is retained here.
    pub fn write_connection(
        &self,
        private_key: &SecretString,
        network: &'static NetworkDescriptor,
    ) -> Result<WriteConnection, ChainError> {
        let key = Zeroizing::new(
            private_key
                .expose_secret()
                .trim()
                .trim_start_matches("0x")
                .to_string(),
        );
        let wallet: LocalWallet = key
            .parse()
            .map_err(|_| ChainError::Configuration("invalid private key".to_string()))?;

        Ok(WriteConnection {
            wallet: wallet.with_chain_id(network.chain_id),
            rpc_url: self.rpc_url(network),
            network,
        })
    }
}

/// A per-call signing binding to one network. Holds the derived wallet and
/// the endpoint to submit through; dropped at the end of the call.
#[derive(Debug)]
pub struct WriteConnection {
    pub wallet: LocalWallet,
    pub rpc_url: String,
    pub network: &'static NetworkDescriptor,
}

impl WriteConnection {
    pub fn address(&self) -> Address {
        self.wallet.address()
    }
}
