// src/chain/resolver.rs

//! Address and ENS-style name resolution.
//!
//! Canonical `0x` addresses pass through with a format check and no I/O.
//! Anything else must look like a dotted name before we go near the network.

use ethers::providers::Middleware;
use ethers_core::types::Address;
use ethers_core::utils::to_checksum;

use crate::chain::clients::ClientCache;
use crate::chain::error::ChainError;
use crate::chain::registry::NetworkDescriptor;

fn resolution_error(name: &str, reason: impl Into<String>) -> ChainError {
    ChainError::NameResolution {
        name: name.to_string(),
        reason: reason.into(),
    }
}

/// True if the input has the canonical address shape: `0x` + 40 hex digits.
pub fn is_canonical_address(input: &str) -> bool {
    let Some(hex_part) = input.strip_prefix("0x").or_else(|| input.strip_prefix("0X")) else {
        return false;
    };
    hex_part.len() == 40 && hex_part.chars().all(|c| c.is_ascii_hexdigit())
}

/// Resolve an address-or-name string to a canonical address.
///
/// Already-canonical addresses are returned unchanged (format-validated only,
/// never checked against the network). Names are normalized, then looked up
/// against the network's name service.
pub async fn resolve_address(
    input: &str,
    network: &'static NetworkDescriptor,
    cache: &ClientCache,
) -> Result<Address, ChainError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(resolution_error(input, "empty address or name"));
    }

    if trimmed.starts_with("0x") || trimmed.starts_with("0X") {
        if !is_canonical_address(trimmed) {
            return Err(resolution_error(trimmed, "malformed hex address"));
        }
        return trimmed
            .parse::<Address>()
            .map_err(|e| resolution_error(trimmed, e.to_string()));
    }

    // Treat as a name. A bare word with no separator is ambiguous, not a name.
    let name = trimmed.to_lowercase();
    if !name.contains('.') {
        return Err(resolution_error(
            trimmed,
            "not a canonical address and not a dotted name",
        ));
    }
    if !network.ens {
        return Err(resolution_error(
            trimmed,
            format!("network '{}' has no name service", network.name),
        ));
    }

    let provider = cache.read_client(network)?;
    provider
        .resolve_name(&name)
        .await
        .map_err(|e| resolution_error(&name, format!("no address bound: {}", e)))
}

/// Checksummed textual form for display.
pub fn display_address(address: &Address) -> String {
    to_checksum(address, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::registry;
    use std::collections::HashMap;

    #[tokio::test]
    async fn canonical_address_passes_through_without_lookup() {
        // no RPC endpoint is reachable in tests; passthrough must not care
        let cache = ClientCache::new(HashMap::new());
        let network = registry::resolve_network("ethereum").unwrap();
        let input = "0x6B175474E89094C44Da98b954EedeAC495271d0F";
        let resolved = resolve_address(input, network, &cache).await.unwrap();
        assert_eq!(display_address(&resolved), input);
    }

    #[tokio::test]
    async fn rejects_malformed_inputs_before_io() {
        let cache = ClientCache::new(HashMap::new());
        let network = registry::resolve_network("ethereum").unwrap();

        for input in ["", "0x123", "0xzzzz6B175474E89094C44Da98b954EedeAC49527", "vitalik"] {
            let err = resolve_address(input, network, &cache).await.unwrap_err();
            assert_eq!(err.kind(), "NameResolutionError", "input {:?}", input);
        }
    }

    #[tokio::test]
    async fn names_need_a_name_service() {
        let cache = ClientCache::new(HashMap::new());
        let network = registry::resolve_network("polygon").unwrap();
        let err = resolve_address("vitalik.eth", network, &cache)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "NameResolutionError");
        assert!(err.to_string().contains("no name service"));
    }

    #[test]
    fn canonical_shape_check() {
        assert!(is_canonical_address("0x6B175474E89094C44Da98b954EedeAC495271d0F"));
        assert!(!is_canonical_address("6B175474E89094C44Da98b954EedeAC495271d0F"));
        assert!(!is_canonical_address("0x6B17"));
        assert!(!is_canonical_address("vitalik.eth"));
    }
}
