// src/chain/services/token.rs

//! ERC-20 interaction via ABI-encoded `eth_call` and transfer/approve
//! transaction builders.

use ethers_core::abi::{decode, encode, ParamType, Token};
use ethers_core::types::{Address, Bytes, TransactionRequest, U256};
use ethers_core::utils::keccak256;
use reqwest::Client;
use serde_json::{json, Value};

use crate::chain::error::ChainError;
use crate::chain::models::TokenMetadata;
use crate::chain::resolver::display_address;

fn selector(sig: &str) -> [u8; 4] {
    let mut sel = [0u8; 4];
    sel.copy_from_slice(&keccak256(sig.as_bytes())[0..4]);
    sel
}

fn encode_call(sig: &str, tokens: Vec<Token>) -> Bytes {
    let mut out = selector(sig).to_vec();
    let mut tail = encode(&tokens);
    out.append(&mut tail);
    Bytes::from(out)
}

fn hex_to_bytes(v: &Value) -> Result<Vec<u8>, ChainError> {
    let s = v
        .as_str()
        .ok_or_else(|| ChainError::Rpc("eth_call result not a string".to_string()))?;
    let s = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(s).map_err(|e| ChainError::Rpc(format!("bad eth_call hex: {}", e)))
}

fn decode_string(v: &Value) -> Option<String> {
    let bytes = hex_to_bytes(v).ok()?;
    if let Ok(tokens) = decode(&[ParamType::String], &bytes) {
        if let Some(Token::String(s)) = tokens.first() {
            return Some(s.clone());
        }
    }
    // some legacy tokens return bytes32 instead of string
    if let Ok(tokens) = decode(&[ParamType::FixedBytes(32)], &bytes) {
        if let Some(Token::FixedBytes(b)) = tokens.first() {
            let trimmed: Vec<u8> = b.iter().copied().take_while(|c| *c != 0).collect();
            return String::from_utf8(trimmed).ok();
        }
    }
    None
}

fn decode_u256(v: &Value) -> Option<U256> {
    let bytes = hex_to_bytes(v).ok()?;
    if let Ok(tokens) = decode(&[ParamType::Uint(256)], &bytes) {
        if let Some(Token::Uint(n)) = tokens.first() {
            return Some(*n);
        }
    }
    None
}

async fn eth_call(
    client: &Client,
    rpc_url: &str,
    to: &Address,
    data: Bytes,
) -> Result<Value, ChainError> {
    let payload = json!({
        "jsonrpc": "2.0",
        "method": "eth_call",
        "params": [{"to": display_address(to), "data": format!("0x{}", hex::encode(data))}, "latest"],
        "id": 1
    });
    let v: Value = client
        .post(rpc_url)
        .json(&payload)
        .send()
        .await
        .map_err(|e| ChainError::Rpc(e.to_string()))?
        .json()
        .await
        .map_err(|e| ChainError::Rpc(e.to_string()))?;
    if let Some(err) = v.get("error") {
        return Err(ChainError::Rpc(format!("eth_call: {}", err)));
    }
    Ok(v["result"].clone())
}

/// The token's decimal count. Required for amount conversion, so a token
/// that does not answer `decimals()` is an error, not a default.
pub async fn decimals(client: &Client, rpc_url: &str, token: &Address) -> Result<u32, ChainError> {
    let raw = eth_call(client, rpc_url, token, encode_call("decimals()", vec![])).await?;
    let value = decode_u256(&raw)
        .ok_or_else(|| ChainError::Rpc("token did not report decimals".to_string()))?;
    if value > U256::from(77u64) {
        return Err(ChainError::Rpc(format!("implausible decimals {}", value)));
    }
    Ok(value.as_u32())
}

/// Token symbol, if the contract reports one.
pub async fn symbol(client: &Client, rpc_url: &str, token: &Address) -> Result<Option<String>, ChainError> {
    let raw = eth_call(client, rpc_url, token, encode_call("symbol()", vec![])).await?;
    Ok(decode_string(&raw))
}

/// Name, symbol and decimals in one go; the three reads run concurrently.
pub async fn metadata(
    client: &Client,
    rpc_url: &str,
    token: &Address,
) -> Result<TokenMetadata, ChainError> {
    let name_fut = eth_call(client, rpc_url, token, encode_call("name()", vec![]));
    let symbol_fut = eth_call(client, rpc_url, token, encode_call("symbol()", vec![]));
    let decimals_fut = decimals(client, rpc_url, token);
    let (name_raw, symbol_raw, decimals) = futures::try_join!(name_fut, symbol_fut, decimals_fut)?;

    Ok(TokenMetadata {
        address: display_address(token),
        name: decode_string(&name_raw),
        symbol: decode_string(&symbol_raw),
        decimals,
    })
}

/// `balanceOf(owner)` as a raw base-unit amount.
pub async fn balance_of(
    client: &Client,
    rpc_url: &str,
    token: &Address,
    owner: &Address,
) -> Result<U256, ChainError> {
    let data = encode_call("balanceOf(address)", vec![Token::Address(*owner)]);
    let raw = eth_call(client, rpc_url, token, data).await?;
    decode_u256(&raw).ok_or_else(|| ChainError::Rpc("balanceOf returned no value".to_string()))
}

/// Build (not submit) an ERC-20 `transfer` transaction.
pub fn transfer_tx(token: &Address, to: &Address, amount: U256) -> TransactionRequest {
    let data = encode_call(
        "transfer(address,uint256)",
        vec![Token::Address(*to), Token::Uint(amount)],
    );
    TransactionRequest::new().to(*token).data(data)
}

/// Build (not submit) an ERC-20 `approve` transaction.
pub fn approve_tx(token: &Address, spender: &Address, amount: U256) -> TransactionRequest {
    let data = encode_call(
        "approve(address,uint256)",
        vec![Token::Address(*spender), Token::Uint(amount)],
    );
    TransactionRequest::new().to(*token).data(data)
}
