// src/chain/services/transfer.rs

//! Centralized transaction submission for all write paths (transfers,
//! approvals, swap and bridge deposits). Fills in nonce, gas and gas price,
//! signs locally, and broadcasts the raw transaction.

use chrono::Utc;
use ethers::signers::Signer;
use ethers_core::types::{Address, TransactionRequest, U256};
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

use crate::chain::amounts::TokenAmount;
use crate::chain::clients::WriteConnection;
use crate::chain::error::ChainError;
use crate::chain::models::TransferOutcome;
use crate::chain::nonce::NonceManager;
use crate::chain::services::token;

async fn rpc_call(client: &Client, rpc_url: &str, method: &str, params: Value) -> Result<Value, ChainError> {
    let payload = json!({
        "jsonrpc": "2.0",
        "method": method,
        "params": params,
        "id": 1,
    });
    let resp: Value = client
        .post(rpc_url)
        .json(&payload)
        .send()
        .await
        .map_err(|e| ChainError::Submission(format!("{}: {}", method, e)))?
        .json()
        .await
        .map_err(|e| ChainError::Submission(format!("{}: {}", method, e)))?;
    if let Some(err) = resp.get("error") {
        return Err(ChainError::Submission(format!("{}: {}", method, err)));
    }
    Ok(resp["result"].clone())
}

fn parse_quantity(v: &Value, what: &str) -> Result<U256, ChainError> {
    let s = v
        .as_str()
        .ok_or_else(|| ChainError::Submission(format!("missing {} in RPC response", what)))?;
    U256::from_str_radix(s.trim_start_matches("0x"), 16)
        .map_err(|e| ChainError::Submission(format!("bad {} '{}': {}", what, s, e)))
}

/// Sign and broadcast a transaction through a per-call write connection.
/// Returns the transaction hash; no receipt is awaited here.
pub async fn send_signed(
    conn: &WriteConnection,
    nonces: &NonceManager,
    tx_request: TransactionRequest,
) -> Result<String, ChainError> {
    let client = Client::new();
    let from = conn.address();

    let nonce = nonces
        .next_nonce(from, conn.network.chain_id, &conn.rpc_url)
        .await?;

    let mut tx = tx_request
        .from(from)
        .nonce(nonce)
        .chain_id(conn.network.chain_id);

    if tx.gas.is_none() {
        let call_obj = serde_json::to_value(&tx)
            .map_err(|e| ChainError::Submission(format!("encode call object: {}", e)))?;
        let result = rpc_call(&client, &conn.rpc_url, "eth_estimateGas", json!([call_obj])).await?;
        tx = tx.gas(parse_quantity(&result, "gas estimate")?);
    }

    if tx.gas_price.is_none() {
        let result = rpc_call(&client, &conn.rpc_url, "eth_gasPrice", json!([])).await?;
        tx = tx.gas_price(parse_quantity(&result, "gas price")?);
    }

    let signature = conn
        .wallet
        .sign_transaction(&tx.clone().into())
        .await
        .map_err(|e| ChainError::Submission(format!("signing failed: {}", e)))?;
    let raw_tx = tx.rlp_signed(&signature);

    debug!(chain = conn.network.name, nonce = %nonce, "broadcasting signed transaction");

    let result = rpc_call(
        &client,
        &conn.rpc_url,
        "eth_sendRawTransaction",
        json!([format!("0x{}", hex::encode(raw_tx))]),
    )
    .await?;

    result
        .as_str()
        .map(|s| s.to_string())
        .ok_or_else(|| ChainError::Submission("no transaction hash in response".to_string()))
}

/// Send native currency. `amount` has already been through the codec.
pub async fn send_native(
    conn: &WriteConnection,
    nonces: &NonceManager,
    to: Address,
    amount: TokenAmount,
) -> Result<TransferOutcome, ChainError> {
    let tx = TransactionRequest::new().to(to).value(amount.raw);
    let tx_hash = send_signed(conn, nonces, tx).await?;
    Ok(TransferOutcome {
        tx_hash,
        amount: amount.human,
        raw_amount: amount.raw.to_string(),
        symbol: conn.network.symbol.to_string(),
        decimals: amount.decimals,
        submitted_at: Utc::now(),
    })
}

/// Send an ERC-20 transfer. The token's symbol is read for display and may
/// be absent on nonconforming contracts.
pub async fn send_token(
    conn: &WriteConnection,
    nonces: &NonceManager,
    token_address: Address,
    to: Address,
    amount: TokenAmount,
) -> Result<TransferOutcome, ChainError> {
    let client = Client::new();
    let symbol = token::symbol(&client, &conn.rpc_url, &token_address)
        .await
        .ok()
        .flatten()
        .unwrap_or_else(|| "ERC20".to_string());

    let tx = token::transfer_tx(&token_address, &to, amount.raw);
    let tx_hash = send_signed(conn, nonces, tx).await?;
    Ok(TransferOutcome {
        tx_hash,
        amount: amount.human,
        raw_amount: amount.raw.to_string(),
        symbol,
        decimals: amount.decimals,
        submitted_at: Utc::now(),
    })
}

/// Submit an explicit ERC-20 approval. This is a user-invoked operation; the
/// swap pipeline never calls it on the caller's behalf.
pub async fn approve_token(
    conn: &WriteConnection,
    nonces: &NonceManager,
    token_address: Address,
    spender: Address,
    amount: TokenAmount,
) -> Result<TransferOutcome, ChainError> {
    let client = Client::new();
    let symbol = token::symbol(&client, &conn.rpc_url, &token_address)
        .await
        .ok()
        .flatten()
        .unwrap_or_else(|| "ERC20".to_string());

    let tx = token::approve_tx(&token_address, &spender, amount.raw);
    let tx_hash = send_signed(conn, nonces, tx).await?;
    Ok(TransferOutcome {
        tx_hash,
        amount: amount.human,
        raw_amount: amount.raw.to_string(),
        symbol,
        decimals: amount.decimals,
        submitted_at: Utc::now(),
    })
}
