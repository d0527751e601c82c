//! # MCP Handler Module
//!
//! Dispatches incoming MCP requests to the chain tools. Every tool resolves
//! to the uniform tagged result shape (`{"ok": true, ...}` or
//! `{"ok": false, "stage", "kind", "message"}`) rendered verbatim to the
//! client; JSON-RPC errors are reserved for protocol-level faults.
//!
//! ## Supported Tools
//!
//! ### Networks & Identity
//! - `list_networks` - Enumerate supported networks
//! - `resolve_name` - Resolve an ENS-style name to an address
//!
//! ### Reads
//! - `get_balance` - Native balance of an address or name
//! - `get_token_balance` - ERC-20 balance
//! - `get_token_info` - ERC-20 name/symbol/decimals
//! - `get_block` - Block by number or latest
//! - `get_transaction` / `get_transaction_receipt` - Transaction lookups
//!
//! ### Writes
//! - `transfer_native` - Send native currency
//! - `transfer_token` - Send ERC-20 tokens
//! - `approve_token` - Grant an ERC-20 allowance
//!
//! ### Orchestrated pipelines
//! - `bridge_tokens` - Cross-chain bridge (quote -> approve -> deposit -> fill)
//! - `swap_tokens` - Aggregator swap (spender -> quote -> submit)

use reqwest::Client;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::chain::models::SwapParams;
use crate::chain::services::{bridge, reads, swap, token, transfer};
use crate::chain::{amounts, error, registry, resolver, ChainError};
use crate::mcp::protocol::{Request, Response};
use crate::{utils, AppState};

const TOOL_NAMES: &[&str] = &[
    "list_networks",
    "resolve_name",
    "get_balance",
    "get_token_balance",
    "get_token_info",
    "get_block",
    "get_transaction",
    "get_transaction_receipt",
    "transfer_native",
    "transfer_token",
    "approve_token",
    "bridge_tokens",
    "swap_tokens",
];

/// This is the main dispatcher for all incoming MCP requests.
pub async fn handle_mcp_request(req: Request, state: AppState) -> Option<Response> {
    info!("Handling MCP request for method: {}", req.method);

    if req.is_notification() {
        return None;
    }

    let response = match req.method.as_str() {
        "initialize" => handle_initialize(&req),
        "tools/list" => handle_tools_list(&req),
        "tools/call" => handle_tool_call(req, state).await,
        // Convenience aliases so CLI clients can call tools as plain methods;
        // rewritten into tools/call to reuse the same logic.
        name if TOOL_NAMES.contains(&name) => {
            let wrapped = Request {
                jsonrpc: req.jsonrpc.clone(),
                id: req.id.clone(),
                method: "tools/call".to_string(),
                params: Some(json!({
                    "name": name,
                    "arguments": req.params.clone().unwrap_or_else(|| json!({}))
                })),
            };
            handle_tool_call(wrapped, state).await
        }
        other => Response::method_not_found(req.id, other),
    };

    Some(response)
}

/// Handles a 'tools/call' request by dispatching it to the correct tool logic.
async fn handle_tool_call(req: Request, state: AppState) -> Response {
    let params = match req.params.as_ref() {
        Some(p) => p,
        None => return Response::invalid_params(req.id, "Missing 'params' object"),
    };

    let tool_name = match params.get("name").and_then(|n| n.as_str()) {
        Some(name) => name.to_string(),
        None => return Response::invalid_params(req.id, "Missing 'name' field in params"),
    };

    let empty_args = json!({});
    let args = params.get("arguments").unwrap_or(&empty_args).clone();
    let req_id = req.id.clone();

    match dispatch_tool(&tool_name, &args, &req_id, &state).await {
        Err(protocol_error) => protocol_error,
        Ok(Ok(payload)) => Response::success(req_id, error::success(payload)),
        Ok(Err(chain_error)) => {
            error!(
                tool = %tool_name,
                kind = chain_error.kind(),
                stage = chain_error.stage(),
                "tool failed: {}",
                chain_error
            );
            Response::success(req_id, error::failure(&chain_error))
        }
    }
}

/// Outer Err is a protocol-level failure (missing/invalid arguments or an
/// unknown tool); the inner Result is the tool outcome.
async fn dispatch_tool(
    tool_name: &str,
    args: &Value,
    req_id: &Value,
    state: &AppState,
) -> Result<Result<Value, ChainError>, Response> {
    let outcome = match tool_name {
        "list_networks" => tool_list_networks(),
        "resolve_name" => {
            let network: String = utils::get_required_arg(args, "network", req_id)?;
            let name: String = utils::get_required_arg(args, "name", req_id)?;
            tool_resolve_name(state, &network, &name).await
        }
        "get_balance" => {
            let network: String = utils::get_required_arg(args, "network", req_id)?;
            let address: String = utils::get_required_arg(args, "address", req_id)?;
            tool_get_balance(state, &network, &address).await
        }
        "get_token_balance" => {
            let network: String = utils::get_required_arg(args, "network", req_id)?;
            let token_addr: String = utils::get_required_arg(args, "token", req_id)?;
            let owner: String = utils::get_required_arg(args, "owner", req_id)?;
            tool_get_token_balance(state, &network, &token_addr, &owner).await
        }
        "get_token_info" => {
            let network: String = utils::get_required_arg(args, "network", req_id)?;
            let token_addr: String = utils::get_required_arg(args, "token", req_id)?;
            tool_get_token_info(state, &network, &token_addr).await
        }
        "get_block" => {
            let network: String = utils::get_required_arg(args, "network", req_id)?;
            let block: String =
                utils::get_optional_arg(args, "block").unwrap_or_else(|| "latest".to_string());
            tool_get_block(state, &network, &block).await
        }
        "get_transaction" => {
            let network: String = utils::get_required_arg(args, "network", req_id)?;
            let hash: String = utils::get_required_arg(args, "hash", req_id)?;
            tool_get_transaction(state, &network, &hash, false).await
        }
        "get_transaction_receipt" => {
            let network: String = utils::get_required_arg(args, "network", req_id)?;
            let hash: String = utils::get_required_arg(args, "hash", req_id)?;
            tool_get_transaction(state, &network, &hash, true).await
        }
        "transfer_native" => {
            let network: String = utils::get_required_arg(args, "network", req_id)?;
            let to: String = utils::get_required_arg(args, "to", req_id)?;
            let amount: String = utils::get_required_arg(args, "amount", req_id)?;
            let key = utils::get_optional_arg(args, "private_key");
            tool_transfer_native(state, &network, &to, &amount, key).await
        }
        "transfer_token" => {
            let network: String = utils::get_required_arg(args, "network", req_id)?;
            let token_addr: String = utils::get_required_arg(args, "token", req_id)?;
            let to: String = utils::get_required_arg(args, "to", req_id)?;
            let amount: String = utils::get_required_arg(args, "amount", req_id)?;
            let key = utils::get_optional_arg(args, "private_key");
            tool_transfer_token(state, &network, &token_addr, &to, &amount, key).await
        }
        "approve_token" => {
            let network: String = utils::get_required_arg(args, "network", req_id)?;
            let token_addr: String = utils::get_required_arg(args, "token", req_id)?;
            let spender: String = utils::get_required_arg(args, "spender", req_id)?;
            let amount: String = utils::get_required_arg(args, "amount", req_id)?;
            let key = utils::get_optional_arg(args, "private_key");
            tool_approve_token(state, &network, &token_addr, &spender, &amount, key).await
        }
        "bridge_tokens" => {
            let origin: String = utils::get_required_arg(args, "origin", req_id)?;
            let destination: String = utils::get_required_arg(args, "destination", req_id)?;
            let amount: String = utils::get_required_arg(args, "amount", req_id)?;
            let key = utils::get_optional_arg(args, "private_key");
            tool_bridge_tokens(state, &origin, &destination, &amount, key).await
        }
        "swap_tokens" => {
            let network: String = utils::get_required_arg(args, "network", req_id)?;
            let src_token: String = utils::get_required_arg(args, "src_token", req_id)?;
            let dst_token: String = utils::get_required_arg(args, "dst_token", req_id)?;
            let amount: String = utils::get_required_arg(args, "amount", req_id)?;
            let slippage: f64 = utils::get_required_arg(args, "slippage", req_id)?;
            let key = utils::get_optional_arg(args, "private_key");
            let params = SwapParams {
                src_token,
                dst_token,
                amount,
                slippage,
            };
            tool_swap_tokens(state, &network, params, key).await
        }
        other => {
            return Err(Response::invalid_params(
                req_id.clone(),
                format!("Unknown tool: {}", other),
            ))
        }
    };
    Ok(outcome)
}

// --- Tool implementations ---

fn tool_list_networks() -> Result<Value, ChainError> {
    let networks: Vec<Value> = registry::list_networks()
        .into_iter()
        .map(|n| {
            json!({
                "name": n.name,
                "chain_id": n.chain_id,
                "symbol": n.symbol,
                "ens": n.ens,
            })
        })
        .collect();
    Ok(json!({ "networks": networks }))
}

async fn tool_resolve_name(
    state: &AppState,
    network_id: &str,
    name: &str,
) -> Result<Value, ChainError> {
    let network = registry::resolve_network(network_id)?;
    let address = resolver::resolve_address(name, network, &state.clients).await?;
    Ok(json!({
        "network": network.name,
        "input": name,
        "address": resolver::display_address(&address),
    }))
}

async fn tool_get_balance(
    state: &AppState,
    network_id: &str,
    who: &str,
) -> Result<Value, ChainError> {
    let network = registry::resolve_network(network_id)?;
    let address = resolver::resolve_address(who, network, &state.clients).await?;
    let client = Client::new();
    reads::native_balance(&client, &state.clients.rpc_url(network), network, &address).await
}

async fn tool_get_token_balance(
    state: &AppState,
    network_id: &str,
    token_addr: &str,
    owner: &str,
) -> Result<Value, ChainError> {
    let network = registry::resolve_network(network_id)?;
    let token_address = resolver::resolve_address(token_addr, network, &state.clients).await?;
    let owner_address = resolver::resolve_address(owner, network, &state.clients).await?;

    let client = Client::new();
    let rpc_url = state.clients.rpc_url(network);
    let raw = token::balance_of(&client, &rpc_url, &token_address, &owner_address).await?;
    let decimals = token::decimals(&client, &rpc_url, &token_address).await?;
    let symbol = token::symbol(&client, &rpc_url, &token_address)
        .await?
        .unwrap_or_else(|| "ERC20".to_string());

    Ok(json!({
        "network": network.name,
        "token": resolver::display_address(&token_address),
        "owner": resolver::display_address(&owner_address),
        "raw": raw.to_string(),
        "formatted": format!("{} {}", amounts::to_human_units(raw, decimals), symbol),
        "decimals": decimals,
    }))
}

async fn tool_get_token_info(
    state: &AppState,
    network_id: &str,
    token_addr: &str,
) -> Result<Value, ChainError> {
    let network = registry::resolve_network(network_id)?;
    let token_address = resolver::resolve_address(token_addr, network, &state.clients).await?;
    let client = Client::new();
    let metadata = token::metadata(&client, &state.clients.rpc_url(network), &token_address).await?;
    Ok(json!({ "network": network.name, "token": metadata }))
}

async fn tool_get_block(
    state: &AppState,
    network_id: &str,
    block: &str,
) -> Result<Value, ChainError> {
    let network = registry::resolve_network(network_id)?;
    let client = Client::new();
    let block = reads::block(&client, &state.clients.rpc_url(network), block).await?;
    Ok(json!({ "network": network.name, "block": block }))
}

async fn tool_get_transaction(
    state: &AppState,
    network_id: &str,
    hash: &str,
    receipt: bool,
) -> Result<Value, ChainError> {
    let network = registry::resolve_network(network_id)?;
    let client = Client::new();
    let rpc_url = state.clients.rpc_url(network);
    let value = if receipt {
        reads::transaction_receipt(&client, &rpc_url, hash).await?
    } else {
        reads::transaction(&client, &rpc_url, hash).await?
    };
    let field = if receipt { "receipt" } else { "transaction" };
    Ok(json!({ "network": network.name, field: value }))
}

async fn tool_transfer_native(
    state: &AppState,
    network_id: &str,
    to: &str,
    amount: &str,
    key: Option<String>,
) -> Result<Value, ChainError> {
    let network = registry::resolve_network(network_id)?;
    let recipient = resolver::resolve_address(to, network, &state.clients).await?;
    let parsed = amounts::TokenAmount::parse(amount, 18)?;
    let signing_key = state.signing_key(key)?;
    let conn = state.clients.write_connection(&signing_key, network)?;

    let outcome = transfer::send_native(&conn, &state.nonces, recipient, parsed).await?;
    Ok(json!({ "network": network.name, "transfer": outcome }))
}

async fn tool_transfer_token(
    state: &AppState,
    network_id: &str,
    token_addr: &str,
    to: &str,
    amount: &str,
    key: Option<String>,
) -> Result<Value, ChainError> {
    let network = registry::resolve_network(network_id)?;
    let token_address = resolver::resolve_address(token_addr, network, &state.clients).await?;
    let recipient = resolver::resolve_address(to, network, &state.clients).await?;

    // on-chain decimals drive the conversion; overprecise input fails here
    let client = Client::new();
    let decimals = token::decimals(&client, &state.clients.rpc_url(network), &token_address).await?;
    let parsed = amounts::TokenAmount::parse(amount, decimals)?;

    let signing_key = state.signing_key(key)?;
    let conn = state.clients.write_connection(&signing_key, network)?;
    let outcome =
        transfer::send_token(&conn, &state.nonces, token_address, recipient, parsed).await?;
    Ok(json!({ "network": network.name, "transfer": outcome }))
}

async fn tool_approve_token(
    state: &AppState,
    network_id: &str,
    token_addr: &str,
    spender: &str,
    amount: &str,
    key: Option<String>,
) -> Result<Value, ChainError> {
    let network = registry::resolve_network(network_id)?;
    let token_address = resolver::resolve_address(token_addr, network, &state.clients).await?;
    let spender_address = resolver::resolve_address(spender, network, &state.clients).await?;

    let client = Client::new();
    let decimals = token::decimals(&client, &state.clients.rpc_url(network), &token_address).await?;
    let parsed = amounts::TokenAmount::parse(amount, decimals)?;

    let signing_key = state.signing_key(key)?;
    let conn = state.clients.write_connection(&signing_key, network)?;
    let outcome =
        transfer::approve_token(&conn, &state.nonces, token_address, spender_address, parsed)
            .await?;
    Ok(json!({ "network": network.name, "approval": outcome }))
}

async fn tool_bridge_tokens(
    state: &AppState,
    origin: &str,
    destination: &str,
    amount: &str,
    key: Option<String>,
) -> Result<Value, ChainError> {
    let signing_key = state.signing_key(key)?;

    // Live progress is consumed here: every event is logged as it arrives
    // and the full trail is returned alongside the outcome.
    let (progress_tx, mut progress_rx) =
        mpsc::unbounded_channel::<crate::chain::models::BridgeProgressEvent>();
    let collector = tokio::spawn(async move {
        let mut events = Vec::new();
        while let Some(event) = progress_rx.recv().await {
            info!(
                stage = event.stage.as_str(),
                status = ?event.status,
                tx_hash = event.tx_hash.as_deref().unwrap_or(""),
                "bridge progress"
            );
            events.push(event);
        }
        events
    });

    let result = bridge::bridge_native(
        &state.clients,
        &state.nonces,
        state.bridge.clone(),
        &signing_key,
        origin,
        destination,
        amount,
        progress_tx,
    )
    .await;

    let events = collector.await.unwrap_or_default();

    let outcome = result?;
    Ok(json!({ "bridge": outcome, "events": events }))
}

async fn tool_swap_tokens(
    state: &AppState,
    network_id: &str,
    params: SwapParams,
    key: Option<String>,
) -> Result<Value, ChainError> {
    let signing_key = state.signing_key(key)?;
    let outcome = swap::swap_tokens(
        &state.clients,
        &state.nonces,
        &state.swap,
        &signing_key,
        network_id,
        params,
    )
    .await?;
    Ok(json!({ "swap": outcome }))
}

// --- Protocol handshake ---

fn handle_initialize(req: &Request) -> Response {
    let server_info = json!({
        "name": "crosschain_mcp",
        "version": env!("CARGO_PKG_VERSION")
    });
    let capabilities = json!({ "tools": { "listChanged": false } });
    let instructions = "Multi-network EVM MCP server: balances, blocks, transfers, \
                        cross-chain bridging and aggregator swaps.";

    Response::success(
        req.id.clone(),
        json!({
            "serverInfo": server_info,
            "protocolVersion": "2025-06-18",
            "capabilities": capabilities,
            "instructions": instructions
        }),
    )
}

fn handle_tools_list(req: &Request) -> Response {
    let network_prop = json!({
        "type": "string",
        "description": "Network name, alias, or chain id (e.g. 'ethereum', 'base', '137')."
    });
    let key_prop = json!({
        "type": "string",
        "description": "Hex private key used to sign. Falls back to WALLET_PRIVATE_KEY."
    });

    let tools = json!([
        {
            "name": "list_networks",
            "description": "List the supported networks with chain ids and native symbols.",
            "inputSchema": { "type": "object", "properties": {}, "additionalProperties": false }
        },
        {
            "name": "resolve_name",
            "description": "Resolve an ENS-style name (or validate a 0x address) to a canonical address.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "network": network_prop.clone(),
                    "name": {"type": "string", "description": "Dotted name (e.g. 'vitalik.eth') or 0x address."}
                },
                "required": ["network", "name"],
                "additionalProperties": false
            }
        },
        {
            "name": "get_balance",
            "description": "Get the native currency balance of an address or ENS name.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "network": network_prop.clone(),
                    "address": {"type": "string", "description": "0x address or ENS-style name."}
                },
                "required": ["network", "address"],
                "additionalProperties": false
            }
        },
        {
            "name": "get_token_balance",
            "description": "Get an ERC-20 token balance for an owner.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "network": network_prop.clone(),
                    "token": {"type": "string", "description": "ERC-20 contract address."},
                    "owner": {"type": "string", "description": "Owner 0x address or ENS-style name."}
                },
                "required": ["network", "token", "owner"],
                "additionalProperties": false
            }
        },
        {
            "name": "get_token_info",
            "description": "Read ERC-20 metadata: name, symbol, decimals.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "network": network_prop.clone(),
                    "token": {"type": "string", "description": "ERC-20 contract address."}
                },
                "required": ["network", "token"],
                "additionalProperties": false
            }
        },
        {
            "name": "get_block",
            "description": "Fetch a block by number, hex tag, or 'latest'.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "network": network_prop.clone(),
                    "block": {"type": "string", "description": "Block number, 0x tag, or 'latest' (default)."}
                },
                "required": ["network"],
                "additionalProperties": false
            }
        },
        {
            "name": "get_transaction",
            "description": "Fetch a transaction by hash.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "network": network_prop.clone(),
                    "hash": {"type": "string", "description": "Transaction hash (0x...)."}
                },
                "required": ["network", "hash"],
                "additionalProperties": false
            }
        },
        {
            "name": "get_transaction_receipt",
            "description": "Fetch a transaction receipt by hash (fails until mined).",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "network": network_prop.clone(),
                    "hash": {"type": "string", "description": "Transaction hash (0x...)."}
                },
                "required": ["network", "hash"],
                "additionalProperties": false
            }
        },
        {
            "name": "transfer_native",
            "description": "Send native currency to an address or ENS name.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "network": network_prop.clone(),
                    "to": {"type": "string", "description": "Recipient 0x address or ENS-style name."},
                    "amount": {"type": "string", "description": "Decimal amount in whole units (e.g. '0.5')."},
                    "private_key": key_prop.clone(),
                },
                "required": ["network", "to", "amount"],
                "additionalProperties": false
            }
        },
        {
            "name": "transfer_token",
            "description": "Send ERC-20 tokens. Amount is in whole token units; decimals are read from the contract.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "network": network_prop.clone(),
                    "token": {"type": "string", "description": "ERC-20 contract address."},
                    "to": {"type": "string", "description": "Recipient 0x address or ENS-style name."},
                    "amount": {"type": "string", "description": "Decimal token amount (e.g. '12.5')."},
                    "private_key": key_prop.clone(),
                },
                "required": ["network", "token", "to", "amount"],
                "additionalProperties": false
            }
        },
        {
            "name": "approve_token",
            "description": "Grant an ERC-20 allowance to a spender. Required before swapping ERC-20 source tokens.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "network": network_prop.clone(),
                    "token": {"type": "string", "description": "ERC-20 contract address."},
                    "spender": {"type": "string", "description": "Spender contract address."},
                    "amount": {"type": "string", "description": "Decimal token amount to approve."},
                    "private_key": key_prop.clone(),
                },
                "required": ["network", "token", "spender", "amount"],
                "additionalProperties": false
            }
        },
        {
            "name": "bridge_tokens",
            "description": "Bridge native currency between two networks. Resolves on deposit confirmation; destination fill is reported as progress.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "origin": {"type": "string", "description": "Origin network name, alias, or chain id."},
                    "destination": {"type": "string", "description": "Destination network name, alias, or chain id."},
                    "amount": {"type": "string", "description": "Decimal amount of native currency (e.g. '0.1')."},
                    "private_key": key_prop.clone(),
                },
                "required": ["origin", "destination", "amount"],
                "additionalProperties": false
            }
        },
        {
            "name": "swap_tokens",
            "description": "Swap tokens via the aggregator. Amount is in BASE UNITS of the source token; ERC-20 sources must already have allowance for the aggregator spender (use approve_token).",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "network": network_prop.clone(),
                    "src_token": {"type": "string", "description": "Source token contract address, or 0xeee...eee for the native asset."},
                    "dst_token": {"type": "string", "description": "Destination token contract address."},
                    "amount": {"type": "string", "description": "Base-unit amount of the source token (no decimal conversion is applied)."},
                    "slippage": {"type": "number", "description": "Slippage tolerance in percent, 0.01 to 50."},
                    "private_key": key_prop.clone(),
                },
                "required": ["network", "src_token", "dst_token", "amount", "slippage"],
                "additionalProperties": false
            }
        }
    ]);

    Response::success(req.id.clone(), json!({ "tools": tools }))
}
