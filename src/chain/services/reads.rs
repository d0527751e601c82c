// src/chain/services/reads.rs

//! Simple pass-through reads. No orchestration here; chain-state truths are
//! returned as the RPC provider reports them.

use ethers_core::types::{Address, U256};
use reqwest::Client;
use serde_json::{json, Value};

use crate::chain::amounts::to_human_units;
use crate::chain::error::ChainError;
use crate::chain::registry::NetworkDescriptor;
use crate::chain::resolver::display_address;

async fn rpc_call(client: &Client, rpc_url: &str, method: &str, params: Value) -> Result<Value, ChainError> {
    let payload = json!({
        "jsonrpc": "2.0",
        "method": method,
        "params": params,
        "id": 1
    });
    let resp: Value = client
        .post(rpc_url)
        .json(&payload)
        .send()
        .await
        .map_err(|e| ChainError::Rpc(format!("{}: {}", method, e)))?
        .json()
        .await
        .map_err(|e| ChainError::Rpc(format!("{}: {}", method, e)))?;
    if let Some(err) = resp.get("error") {
        return Err(ChainError::Rpc(format!("{}: {}", method, err)));
    }
    Ok(resp["result"].clone())
}

/// Native balance of an address, raw wei plus a formatted rendering.
pub async fn native_balance(
    client: &Client,
    rpc_url: &str,
    network: &NetworkDescriptor,
    address: &Address,
) -> Result<Value, ChainError> {
    let result = rpc_call(
        client,
        rpc_url,
        "eth_getBalance",
        json!([display_address(address), "latest"]),
    )
    .await?;
    let hex = result
        .as_str()
        .ok_or_else(|| ChainError::Rpc("missing balance in response".to_string()))?;
    let wei = U256::from_str_radix(hex.trim_start_matches("0x"), 16)
        .map_err(|e| ChainError::Rpc(format!("bad balance '{}': {}", hex, e)))?;

    Ok(json!({
        "network": network.name,
        "address": display_address(address),
        "wei": wei.to_string(),
        "formatted": format!("{} {}", to_human_units(wei, 18), network.symbol),
    }))
}

/// A block by number, hex quantity string, or the tag "latest".
pub async fn block(client: &Client, rpc_url: &str, block: &str) -> Result<Value, ChainError> {
    let tag = normalize_block_tag(block)?;
    let result = rpc_call(client, rpc_url, "eth_getBlockByNumber", json!([tag, false])).await?;
    if result.is_null() {
        return Err(ChainError::Rpc(format!("block '{}' not found", block)));
    }
    Ok(result)
}

fn normalize_block_tag(block: &str) -> Result<String, ChainError> {
    let trimmed = block.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("latest") {
        return Ok("latest".to_string());
    }
    if let Some(hex) = trimmed.strip_prefix("0x") {
        if !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Ok(trimmed.to_lowercase());
        }
        return Err(ChainError::Rpc(format!("bad block tag '{}'", block)));
    }
    trimmed
        .parse::<u64>()
        .map(|n| format!("0x{:x}", n))
        .map_err(|_| ChainError::Rpc(format!("bad block tag '{}'", block)))
}

/// A transaction by hash.
pub async fn transaction(client: &Client, rpc_url: &str, hash: &str) -> Result<Value, ChainError> {
    let result = rpc_call(client, rpc_url, "eth_getTransactionByHash", json!([hash])).await?;
    if result.is_null() {
        return Err(ChainError::Rpc(format!("transaction '{}' not found", hash)));
    }
    Ok(result)
}

/// A transaction receipt by hash. Null until the transaction is mined.
pub async fn transaction_receipt(
    client: &Client,
    rpc_url: &str,
    hash: &str,
) -> Result<Value, ChainError> {
    let result = rpc_call(client, rpc_url, "eth_getTransactionReceipt", json!([hash])).await?;
    if result.is_null() {
        return Err(ChainError::Rpc(format!(
            "no receipt for '{}' (not yet mined?)",
            hash
        )));
    }
    Ok(result)
}
