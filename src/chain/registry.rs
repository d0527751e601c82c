// src/chain/registry.rs

//! Static registry of supported networks.
//!
//! Resolution is a pure lookup: well-known name, alias, or numeric chain id
//! (number or numeric string) to a `NetworkDescriptor`. No I/O happens here;
//! unknown identifiers fail with `UnsupportedNetwork`.

use std::collections::HashMap;

use lazy_static::lazy_static;

use crate::chain::error::ChainError;

/// Immutable description of one EVM-compatible network.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct NetworkDescriptor {
    pub name: &'static str,
    pub chain_id: u64,
    /// Native currency symbol, e.g. "ETH".
    pub symbol: &'static str,
    /// Default public RPC endpoint; `Config` may override per network.
    pub rpc_url: &'static str,
    /// Whether the network carries an ENS deployment for name resolution.
    pub ens: bool,
}

struct NetworkEntry {
    descriptor: NetworkDescriptor,
    aliases: &'static [&'static str],
}

// Declaration order is the stable enumeration order surfaced to users.
static NETWORKS: &[NetworkEntry] = &[
    NetworkEntry {
        descriptor: NetworkDescriptor {
            name: "ethereum",
            chain_id: 1,
            symbol: "ETH",
            rpc_url: "https://eth.llamarpc.com",
            ens: true,
        },
        aliases: &["eth", "mainnet", "ethereum-mainnet"],
    },
    NetworkEntry {
        descriptor: NetworkDescriptor {
            name: "optimism",
            chain_id: 10,
            symbol: "ETH",
            rpc_url: "https://mainnet.optimism.io",
            ens: false,
        },
        aliases: &["op", "op-mainnet"],
    },
    NetworkEntry {
        descriptor: NetworkDescriptor {
            name: "bsc",
            chain_id: 56,
            symbol: "BNB",
            rpc_url: "https://bsc-dataseed.binance.org",
            ens: false,
        },
        aliases: &["binance", "bnb", "binance-smart-chain"],
    },
    NetworkEntry {
        descriptor: NetworkDescriptor {
            name: "polygon",
            chain_id: 137,
            symbol: "MATIC",
            rpc_url: "https://polygon-rpc.com",
            ens: false,
        },
        aliases: &["matic", "polygon-pos"],
    },
    NetworkEntry {
        descriptor: NetworkDescriptor {
            name: "base",
            chain_id: 8453,
            symbol: "ETH",
            rpc_url: "https://mainnet.base.org",
            ens: false,
        },
        aliases: &["base-mainnet"],
    },
    NetworkEntry {
        descriptor: NetworkDescriptor {
            name: "arbitrum",
            chain_id: 42161,
            symbol: "ETH",
            rpc_url: "https://arb1.arbitrum.io/rpc",
            ens: false,
        },
        aliases: &["arb", "arbitrum-one"],
    },
    NetworkEntry {
        descriptor: NetworkDescriptor {
            name: "avalanche",
            chain_id: 43114,
            symbol: "AVAX",
            rpc_url: "https://api.avax.network/ext/bc/C/rpc",
            ens: false,
        },
        aliases: &["avax", "avalanche-c"],
    },
    NetworkEntry {
        descriptor: NetworkDescriptor {
            name: "sepolia",
            chain_id: 11155111,
            symbol: "ETH",
            rpc_url: "https://rpc.sepolia.org",
            ens: true,
        },
        aliases: &["testnet", "eth-sepolia"],
    },
];

lazy_static! {
    static ref BY_NAME: HashMap<&'static str, &'static NetworkDescriptor> = {
        let mut map = HashMap::new();
        for entry in NETWORKS {
            map.insert(entry.descriptor.name, &entry.descriptor);
            for alias in entry.aliases {
                map.insert(*alias, &entry.descriptor);
            }
        }
        map
    };
    static ref BY_CHAIN_ID: HashMap<u64, &'static NetworkDescriptor> = NETWORKS
        .iter()
        .map(|entry| (entry.descriptor.chain_id, &entry.descriptor))
        .collect();
}

// Normalize user-supplied identifiers: case, surrounding space, separators.
fn normalize(input: &str) -> String {
    let mut s = input.trim().to_lowercase();
    s = s.replace([' ', '_'], "-");
    while s.contains("--") {
        s = s.replace("--", "-");
    }
    s
}

/// Resolve a network by name, alias, or numeric chain id.
pub fn resolve_network(identifier: &str) -> Result<&'static NetworkDescriptor, ChainError> {
    let normalized = normalize(identifier);
    if let Some(descriptor) = BY_NAME.get(normalized.as_str()) {
        return Ok(descriptor);
    }
    if let Ok(chain_id) = normalized.parse::<u64>() {
        if let Some(descriptor) = BY_CHAIN_ID.get(&chain_id) {
            return Ok(descriptor);
        }
    }
    Err(ChainError::UnsupportedNetwork(identifier.trim().to_string()))
}

/// Resolve a network by numeric chain id.
pub fn resolve_chain_id(chain_id: u64) -> Result<&'static NetworkDescriptor, ChainError> {
    BY_CHAIN_ID
        .get(&chain_id)
        .copied()
        .ok_or_else(|| ChainError::UnsupportedNetwork(chain_id.to_string()))
}

/// All supported networks, in stable declaration order.
pub fn list_networks() -> Vec<&'static NetworkDescriptor> {
    NETWORKS.iter().map(|entry| &entry.descriptor).collect()
}
