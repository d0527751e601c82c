//! Swap pipeline tests against a mocked aggregator (and, for the happy
//! path, a mocked RPC endpoint). Each test uses a different network so the
//! aggregator paths never collide on the shared mock server.

use std::collections::HashMap;

use mockito::{mock, server_url, Matcher};
use secrecy::SecretString;
use serde_json::json;

use crosschain_mcp_server::chain::clients::ClientCache;
use crosschain_mcp_server::chain::models::SwapParams;
use crosschain_mcp_server::chain::nonce::NonceManager;
use crosschain_mcp_server::chain::services::swap::{self, SwapAggregator, NATIVE_TOKEN};

const TEST_KEY: &str = "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";
const DAI: &str = "0x6b175474e89094c44da98b954eedeac495271d0f";
const USDC: &str = "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48";

fn aggregator() -> SwapAggregator {
    SwapAggregator::new(server_url(), Some("test-api-key".to_string()))
}

fn params(amount: &str, slippage: f64) -> SwapParams {
    SwapParams {
        src_token: NATIVE_TOKEN.to_string(),
        dst_token: DAI.to_string(),
        amount: amount.to_string(),
        slippage,
    }
}

#[tokio::test]
async fn zero_amount_is_rejected_before_any_http_call() {
    let spender_mock = mock("GET", Matcher::Regex("^/1/approve/spender".to_string()))
        .expect(0)
        .create();

    let cache = ClientCache::new(HashMap::new());
    let err = swap::swap_tokens(
        &cache,
        &NonceManager::new(),
        &aggregator(),
        &SecretString::new(TEST_KEY.to_string()),
        "ethereum",
        params("0", 1.0),
    )
    .await
    .unwrap_err();

    assert_eq!(err.kind(), "InvalidAmount");
    spender_mock.assert();
}

#[tokio::test]
async fn negative_slippage_is_rejected_before_any_http_call() {
    let spender_mock = mock("GET", Matcher::Regex("^/137/approve/spender".to_string()))
        .expect(0)
        .create();

    let cache = ClientCache::new(HashMap::new());
    let err = swap::swap_tokens(
        &cache,
        &NonceManager::new(),
        &aggregator(),
        &SecretString::new(TEST_KEY.to_string()),
        "polygon",
        params("1000000", -1.0),
    )
    .await
    .unwrap_err();

    assert_eq!(err.kind(), "InvalidAmount");
    assert!(err.to_string().contains("slippage"));
    spender_mock.assert();
}

#[tokio::test]
async fn missing_api_key_is_a_configuration_failure() {
    let cache = ClientCache::new(HashMap::new());
    let no_key = SwapAggregator::new(server_url(), None);
    let err = swap::swap_tokens(
        &cache,
        &NonceManager::new(),
        &no_key,
        &SecretString::new(TEST_KEY.to_string()),
        "avalanche",
        params("1000000", 1.0),
    )
    .await
    .unwrap_err();

    assert_eq!(err.kind(), "ConfigurationError");
}

#[tokio::test]
async fn spender_error_body_detail_is_surfaced() {
    let _spender_mock = mock("GET", Matcher::Regex("^/8453/approve/spender".to_string()))
        .with_status(500)
        .with_body(r#"{"error":"aggregator melted"}"#)
        .create();

    let cache = ClientCache::new(HashMap::new());
    let err = swap::swap_tokens(
        &cache,
        &NonceManager::new(),
        &aggregator(),
        &SecretString::new(TEST_KEY.to_string()),
        "base",
        params("1000000", 1.0),
    )
    .await
    .unwrap_err();

    assert_eq!(err.kind(), "SpenderLookupError");
    assert_eq!(err.stage(), "fetching_spender");
    assert!(err.to_string().contains("aggregator melted"));
}

#[tokio::test]
async fn quote_missing_tx_target_is_malformed_and_never_submitted() {
    let _spender_mock = mock("GET", Matcher::Regex("^/56/approve/spender".to_string()))
        .with_status(200)
        .with_body(json!({ "address": "0x111111125421ca6dc452d289314280a0f8842a65" }).to_string())
        .create();
    // tx.to is absent; everything else is present
    let _swap_mock = mock("GET", Matcher::Regex("^/56/swap.*".to_string()))
        .with_status(200)
        .with_body(
            json!({
                "tx": { "data": "0xdeadbeef", "value": "0", "gas": 250000 },
                "toAmount": "990000",
                "toToken": { "symbol": "DAI", "decimals": 18 }
            })
            .to_string(),
        )
        .create();

    let cache = ClientCache::new(HashMap::new());
    let err = swap::swap_tokens(
        &cache,
        &NonceManager::new(),
        &aggregator(),
        &SecretString::new(TEST_KEY.to_string()),
        "bsc",
        SwapParams {
            src_token: DAI.to_string(),
            dst_token: USDC.to_string(),
            amount: "1000000".to_string(),
            slippage: 0.5,
        },
    )
    .await
    .unwrap_err();

    assert_eq!(err.kind(), "MalformedQuoteError");
    assert_eq!(err.stage(), "quoting_swap");
    assert!(err.to_string().contains("tx.to"));
}

#[tokio::test]
async fn swap_quote_error_description_is_surfaced() {
    let _spender_mock = mock("GET", Matcher::Regex("^/10/approve/spender".to_string()))
        .with_status(200)
        .with_body(json!({ "address": "0x111111125421ca6dc452d289314280a0f8842a65" }).to_string())
        .create();
    let _swap_mock = mock("GET", Matcher::Regex("^/10/swap.*".to_string()))
        .with_status(400)
        .with_body(r#"{"statusCode":400,"description":"insufficient liquidity"}"#)
        .create();

    let cache = ClientCache::new(HashMap::new());
    let err = swap::swap_tokens(
        &cache,
        &NonceManager::new(),
        &aggregator(),
        &SecretString::new(TEST_KEY.to_string()),
        "optimism",
        params("1000000000000000000", 1.0),
    )
    .await
    .unwrap_err();

    assert_eq!(err.kind(), "SwapQuoteError");
    assert!(err.to_string().contains("insufficient liquidity"));
}

#[tokio::test]
async fn malformed_token_addresses_fail_before_any_http_call() {
    let spender_mock = mock("GET", Matcher::Regex("^/11155111/approve/spender".to_string()))
        .expect(0)
        .create();

    let cache = ClientCache::new(HashMap::new());
    let err = swap::swap_tokens(
        &cache,
        &NonceManager::new(),
        &aggregator(),
        &SecretString::new(TEST_KEY.to_string()),
        "sepolia",
        SwapParams {
            src_token: "dai".to_string(),
            dst_token: USDC.to_string(),
            amount: "1".to_string(),
            slippage: 1.0,
        },
    )
    .await
    .unwrap_err();

    assert_eq!(err.kind(), "NameResolutionError");
    spender_mock.assert();
}

// The two submitting scenarios share `POST /` RPC mocks on the global mock
// server, so they run sequentially inside one test to keep matching
// deterministic.
#[tokio::test]
async fn submitted_swaps_report_quote_figures_and_allowance_notes() {
    happy_path_submits_the_quoted_transaction().await;
    erc20_source_surfaces_an_allowance_note_without_approving().await;
}

async fn happy_path_submits_the_quoted_transaction() {
    // aggregator mocks for arbitrum (chain id 42161)
    let _spender_mock = mock("GET", Matcher::Regex("^/42161/approve/spender".to_string()))
        .with_status(200)
        .with_body(json!({ "address": "0x111111125421ca6dc452d289314280a0f8842a65" }).to_string())
        .create();
    let _swap_mock = mock("GET", Matcher::Regex("^/42161/swap.*".to_string()))
        .with_status(200)
        .with_body(
            json!({
                "tx": {
                    "to": "0x1111111254eeb25477b68fb85ed929f73a960582",
                    "data": "0x12aa3caf",
                    "value": "1000000000000000000",
                    "gas": 300000
                },
                "toAmount": "3141500000",
                "toToken": { "symbol": "USDC", "decimals": 6 }
            })
            .to_string(),
        )
        .create();

    // RPC mocks: the same server doubles as the arbitrum RPC endpoint
    let _nonce_mock = mock("POST", "/")
        .match_body(Matcher::PartialJsonString(
            r#"{"method":"eth_getTransactionCount"}"#.to_string(),
        ))
        .with_status(200)
        .with_body(r#"{"jsonrpc":"2.0","id":1,"result":"0x5"}"#)
        .create();
    let _send_mock = mock("POST", "/")
        .match_body(Matcher::PartialJsonString(
            r#"{"method":"eth_sendRawTransaction"}"#.to_string(),
        ))
        .with_status(200)
        .with_body(r#"{"jsonrpc":"2.0","id":1,"result":"0x5w4ph45h"}"#)
        .create();
    // gas and gas price come from the quote, so no estimate mock is needed;
    // eth_gasPrice is still consulted for the fee
    let _gas_price_mock = mock("POST", "/")
        .match_body(Matcher::PartialJsonString(
            r#"{"method":"eth_gasPrice"}"#.to_string(),
        ))
        .with_status(200)
        .with_body(r#"{"jsonrpc":"2.0","id":1,"result":"0x3b9aca00"}"#)
        .create();

    let mut overrides = HashMap::new();
    overrides.insert("arbitrum".to_string(), server_url());
    let cache = ClientCache::new(overrides);

    let outcome = swap::swap_tokens(
        &cache,
        &NonceManager::new(),
        &aggregator(),
        &SecretString::new(TEST_KEY.to_string()),
        "arbitrum",
        params("1000000000000000000", 1.0),
    )
    .await
    .unwrap();

    assert_eq!(outcome.tx_hash, "0x5w4ph45h");
    assert_eq!(outcome.dst_symbol, "USDC");
    assert_eq!(outcome.dst_amount_raw, "3141500000");
    assert_eq!(outcome.dst_amount, "3141.5");
    assert_eq!(outcome.dst_decimals, 6);
    // native source: no allowance note
    assert!(outcome.allowance_note.is_none());
}

async fn erc20_source_surfaces_an_allowance_note_without_approving() {
    // intentionally break the quote so the pipeline stops after the spender
    // lookup; the note is decided before the quote is requested
    let _spender_mock = mock("GET", Matcher::Regex("^/43114/approve/spender".to_string()))
        .with_status(200)
        .with_body(json!({ "address": "0x111111125421ca6dc452d289314280a0f8842a65" }).to_string())
        .create();
    let _swap_mock = mock("GET", Matcher::Regex("^/43114/swap.*".to_string()))
        .with_status(200)
        .with_body(
            json!({
                "tx": { "to": "0x1111111254eeb25477b68fb85ed929f73a960582", "data": "0x00", "value": "0" },
                "toAmount": "5",
                "toToken": { "symbol": "USDC", "decimals": 6 }
            })
            .to_string(),
        )
        .create();
    let _nonce_mock = mock("POST", "/")
        .match_body(Matcher::PartialJsonString(
            r#"{"method":"eth_getTransactionCount"}"#.to_string(),
        ))
        .with_status(200)
        .with_body(r#"{"jsonrpc":"2.0","id":1,"result":"0x0"}"#)
        .create();
    let _estimate_mock = mock("POST", "/")
        .match_body(Matcher::PartialJsonString(
            r#"{"method":"eth_estimateGas"}"#.to_string(),
        ))
        .with_status(200)
        .with_body(r#"{"jsonrpc":"2.0","id":1,"result":"0x30d40"}"#)
        .create();
    let _gas_price_mock = mock("POST", "/")
        .match_body(Matcher::PartialJsonString(
            r#"{"method":"eth_gasPrice"}"#.to_string(),
        ))
        .with_status(200)
        .with_body(r#"{"jsonrpc":"2.0","id":1,"result":"0x3b9aca00"}"#)
        .create();
    let _send_mock = mock("POST", "/")
        .match_body(Matcher::PartialJsonString(
            r#"{"method":"eth_sendRawTransaction"}"#.to_string(),
        ))
        .with_status(200)
        .with_body(r#"{"jsonrpc":"2.0","id":1,"result":"0xt0k3n5w4p"}"#)
        .create();

    let mut overrides = HashMap::new();
    overrides.insert("avalanche".to_string(), server_url());
    let cache = ClientCache::new(overrides);

    let outcome = swap::swap_tokens(
        &cache,
        &NonceManager::new(),
        &aggregator(),
        &SecretString::new(TEST_KEY.to_string()),
        "avalanche",
        SwapParams {
            src_token: DAI.to_string(),
            dst_token: USDC.to_string(),
            amount: "1000000".to_string(),
            slippage: 0.5,
        },
    )
    .await
    .unwrap();

    let note = outcome.allowance_note.expect("erc20 source must carry a note");
    assert!(note.contains("does not submit an approval"));
    assert!(note.to_lowercase().contains(DAI));
}
