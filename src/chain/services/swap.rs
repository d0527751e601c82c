// src/chain/services/swap.rs

//! Token swap pipeline against an HTTP swap aggregator:
//! spender lookup -> (allowance note) -> quote -> submit.
//!
//! Amounts enter this pipeline already in base units; no decimal conversion
//! happens here. For ERC-20 source tokens the pipeline does NOT submit an
//! approval transaction. It surfaces a note that sufficient allowance must
//! already exist. Automating the approval would change the gas cost and
//! transaction count of the call, so the limitation is kept explicit.

use std::str::FromStr;
use std::time::Duration;

use chrono::Utc;
use ethers_core::types::{Address, TransactionRequest, U256};
use reqwest::Client;
use secrecy::SecretString;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::chain::amounts::to_human_units;
use crate::chain::clients::ClientCache;
use crate::chain::error::{api_error_detail, ChainError};
use crate::chain::models::{SpenderResponse, SwapOutcome, SwapParams, SwapResponse};
use crate::chain::nonce::NonceManager;
use crate::chain::registry;
use crate::chain::resolver::display_address;
use crate::chain::services::transfer;

/// Sentinel address aggregators use for the chain's native asset.
pub const NATIVE_TOKEN: &str = "0xeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee";

/// Single bounded pause between the spender lookup and the swap quote, to
/// stay under the aggregator's request-per-second limit. The caller waits
/// this once per swap, never twice.
pub const QUOTE_RATE_LIMIT_DELAY: Duration = Duration::from_secs(1);

/// Thin client for the swap aggregator's REST API.
pub struct SwapAggregator {
    api_url: String,
    api_key: Option<String>,
    client: Client,
}

impl SwapAggregator {
    pub fn new(api_url: String, api_key: Option<String>) -> Self {
        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key,
            client: Client::new(),
        }
    }

    fn key(&self) -> Result<&str, ChainError> {
        self.api_key.as_deref().ok_or_else(|| {
            ChainError::Configuration("SWAP_API_KEY is not configured".to_string())
        })
    }

    /// The contract that must hold allowance for swaps on a chain.
    pub async fn spender(&self, chain_id: u64) -> Result<Address, ChainError> {
        let key = self.key()?;
        let url = format!("{}/{}/approve/spender", self.api_url, chain_id);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(key)
            .send()
            .await
            .map_err(|e| ChainError::SpenderLookup(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| ChainError::SpenderLookup(e.to_string()))?;
        if !status.is_success() {
            return Err(ChainError::SpenderLookup(api_error_detail(status, &body)));
        }

        let parsed: SpenderResponse = serde_json::from_str(&body)
            .map_err(|e| ChainError::SpenderLookup(format!("unparseable response: {}", e)))?;
        Address::from_str(&parsed.address)
            .map_err(|e| ChainError::SpenderLookup(format!("bad spender address: {}", e)))
    }

    /// Request executable swap transaction data from the aggregator.
    pub async fn swap_quote(
        &self,
        chain_id: u64,
        src: &Address,
        dst: &Address,
        amount: U256,
        from: &Address,
        slippage: f64,
    ) -> Result<SwapResponse, ChainError> {
        let key = self.key()?;
        let url = format!("{}/{}/swap", self.api_url, chain_id);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(key)
            .query(&[
                ("src", display_address(src)),
                ("dst", display_address(dst)),
                ("amount", amount.to_string()),
                ("from", display_address(from)),
                ("slippage", slippage.to_string()),
            ])
            .send()
            .await
            .map_err(|e| ChainError::SwapQuote(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| ChainError::SwapQuote(e.to_string()))?;
        if !status.is_success() {
            return Err(ChainError::SwapQuote(api_error_detail(status, &body)));
        }
        serde_json::from_str(&body)
            .map_err(|e| ChainError::SwapQuote(format!("unparseable response: {}", e)))
    }
}

fn token_address(input: &str, field: &str) -> Result<Address, ChainError> {
    Address::from_str(input.trim()).map_err(|_| ChainError::NameResolution {
        name: input.to_string(),
        reason: format!("{} is not a canonical token address", field),
    })
}

/// Execute a swap end to end. Returns the submitted transaction hash plus
/// the quoted destination figures (display only; not re-verified on chain).
pub async fn swap_tokens(
    cache: &ClientCache,
    nonces: &NonceManager,
    aggregator: &SwapAggregator,
    private_key: &SecretString,
    network_id: &str,
    params: SwapParams,
) -> Result<SwapOutcome, ChainError> {
    let operation_id = Uuid::new_v4();
    let network = registry::resolve_network(network_id)?;

    // all validation happens before the first network call
    params.validate().map_err(|e| ChainError::InvalidAmount {
        input: params.slippage.to_string(),
        reason: e.to_string(),
    })?;
    let src = token_address(&params.src_token, "src_token")?;
    let dst = token_address(&params.dst_token, "dst_token")?;
    let amount =
        U256::from_dec_str(params.amount.trim()).map_err(|_| ChainError::InvalidAmount {
            input: params.amount.clone(),
            reason: "amount must be a base-unit integer".to_string(),
        })?;
    if amount.is_zero() {
        return Err(ChainError::InvalidAmount {
            input: params.amount.clone(),
            reason: "amount must be greater than zero".to_string(),
        });
    }

    let conn = cache.write_connection(private_key, network)?;

    info!(
        %operation_id,
        network = network.name,
        src = %params.src_token,
        dst = %params.dst_token,
        "starting swap"
    );

    let spender = aggregator.spender(network.chain_id).await?;

    let allowance_note = if params.src_token.eq_ignore_ascii_case(NATIVE_TOKEN) {
        None
    } else {
        let note = format!(
            "source token {} must already have an allowance of at least {} for spender {}; \
             this operation does not submit an approval",
            params.src_token,
            amount,
            display_address(&spender)
        );
        warn!(%operation_id, "{}", note);
        Some(note)
    };

    tokio::time::sleep(QUOTE_RATE_LIMIT_DELAY).await;

    let quote = aggregator
        .swap_quote(
            network.chain_id,
            &src,
            &dst,
            amount,
            &conn.address(),
            params.slippage,
        )
        .await?;

    // boundary validation: a payload we cannot fully see is never signed
    let tx = quote
        .tx
        .ok_or_else(|| ChainError::MalformedQuote("response is missing tx".to_string()))?;
    let to = tx
        .to
        .ok_or_else(|| ChainError::MalformedQuote("response is missing tx.to".to_string()))?;
    let data = tx
        .data
        .ok_or_else(|| ChainError::MalformedQuote("response is missing tx.data".to_string()))?;
    let value = tx
        .value
        .ok_or_else(|| ChainError::MalformedQuote("response is missing tx.value".to_string()))?;
    let to_amount = quote
        .to_amount
        .as_deref()
        .and_then(|s| U256::from_dec_str(s).ok())
        .ok_or_else(|| ChainError::MalformedQuote("response is missing toAmount".to_string()))?;
    let to_token = quote
        .to_token
        .ok_or_else(|| ChainError::MalformedQuote("response is missing toToken".to_string()))?;

    let target = Address::from_str(&to)
        .map_err(|e| ChainError::MalformedQuote(format!("bad tx.to: {}", e)))?;
    let calldata = hex::decode(data.trim_start_matches("0x"))
        .map_err(|e| ChainError::MalformedQuote(format!("bad tx.data: {}", e)))?;
    let trimmed_value = value.trim();
    let call_value = match trimmed_value.strip_prefix("0x") {
        Some(hex_part) => U256::from_str_radix(hex_part, 16).ok(),
        None => U256::from_dec_str(trimmed_value).ok(),
    }
    .ok_or_else(|| ChainError::MalformedQuote(format!("bad tx.value '{}'", value)))?;

    let mut request = TransactionRequest::new()
        .to(target)
        .data(calldata)
        .value(call_value);
    if let Some(gas) = tx.gas {
        request = request.gas(U256::from(gas));
    }

    let tx_hash = transfer::send_signed(&conn, nonces, request).await?;

    info!(%operation_id, %tx_hash, "swap submitted");

    Ok(SwapOutcome {
        operation_id,
        tx_hash,
        spender: display_address(&spender),
        dst_amount: to_human_units(to_amount, to_token.decimals),
        dst_amount_raw: to_amount.to_string(),
        dst_symbol: to_token.symbol,
        dst_decimals: to_token.decimals,
        allowance_note,
        submitted_at: Utc::now(),
    })
}
