//! Tool dispatch and result-contract tests exercised through the MCP handler.

use std::collections::HashMap;

use serde_json::{json, Value};

use crosschain_mcp_server::{
    config::Config,
    mcp::{
        handler::handle_mcp_request,
        protocol::{error_codes, Request},
    },
    AppState,
};

fn test_state() -> AppState {
    AppState::new(Config {
        port: 0,
        rpc_url_overrides: HashMap::new(),
        swap_api_url: "http://127.0.0.1:9".to_string(),
        swap_api_key: Some("test-key".to_string()),
        bridge_api_url: "http://127.0.0.1:9".to_string(),
        wallet_private_key: None,
    })
}

fn request(method: &str, params: Value) -> Request {
    serde_json::from_value(json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": method,
        "params": params
    }))
    .unwrap()
}

async fn call_tool(state: AppState, name: &str, arguments: Value) -> Value {
    let req = request("tools/call", json!({ "name": name, "arguments": arguments }));
    let resp = handle_mcp_request(req, state).await.unwrap();
    assert!(resp.error.is_none(), "expected a tool result, got {:?}", resp.error);
    resp.result.unwrap()
}

#[tokio::test]
async fn initialize_reports_server_info() {
    let resp = handle_mcp_request(request("initialize", json!({})), test_state())
        .await
        .unwrap();
    let result = resp.result.unwrap();
    assert_eq!(result["serverInfo"]["name"], "crosschain_mcp");
    assert!(result["capabilities"]["tools"].is_object());
}

#[tokio::test]
async fn tools_list_includes_the_orchestrated_pipelines() {
    let resp = handle_mcp_request(request("tools/list", json!({})), test_state())
        .await
        .unwrap();
    let tools = resp.result.unwrap()["tools"].clone();
    let names: Vec<&str> = tools
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    for expected in ["list_networks", "get_balance", "bridge_tokens", "swap_tokens"] {
        assert!(names.contains(&expected), "missing tool {}", expected);
    }
}

#[tokio::test]
async fn unknown_methods_are_protocol_errors() {
    let resp = handle_mcp_request(request("definitely/not/a/method", json!({})), test_state())
        .await
        .unwrap();
    assert_eq!(resp.error.unwrap().code, error_codes::METHOD_NOT_FOUND);
}

#[tokio::test]
async fn notifications_get_no_response() {
    let req: Request =
        serde_json::from_value(json!({ "method": "notifications/initialized" })).unwrap();
    assert!(handle_mcp_request(req, test_state()).await.is_none());
}

#[tokio::test]
async fn list_networks_returns_the_tagged_success_shape() {
    let result = call_tool(test_state(), "list_networks", json!({})).await;
    assert_eq!(result["ok"], true);
    let networks = result["networks"].as_array().unwrap();
    assert_eq!(networks[0]["name"], "ethereum");
    assert!(networks.iter().any(|n| n["chain_id"] == 8453));
}

#[tokio::test]
async fn unsupported_network_is_a_tagged_failure_not_a_protocol_error() {
    let result = call_tool(
        test_state(),
        "get_balance",
        json!({ "network": "not-a-chain", "address": "0x6B175474E89094C44Da98b954EedeAC495271d0F" }),
    )
    .await;
    assert_eq!(result["ok"], false);
    assert_eq!(result["kind"], "UnsupportedNetwork");
    assert_eq!(result["stage"], "resolve_network");
    assert!(result["message"].as_str().unwrap().contains("not-a-chain"));
}

#[tokio::test]
async fn missing_arguments_are_protocol_errors() {
    let req = request("tools/call", json!({ "name": "get_balance", "arguments": {} }));
    let resp = handle_mcp_request(req, test_state()).await.unwrap();
    let err = resp.error.unwrap();
    assert_eq!(err.code, error_codes::INVALID_PARAMS);
    assert!(err.message.contains("network"));
}

#[tokio::test]
async fn write_tools_without_a_key_fail_with_configuration_error() {
    let result = call_tool(
        test_state(),
        "bridge_tokens",
        json!({ "origin": "ethereum", "destination": "base", "amount": "0.5" }),
    )
    .await;
    assert_eq!(result["ok"], false);
    assert_eq!(result["kind"], "ConfigurationError");
}

#[tokio::test]
async fn direct_method_aliases_are_rewritten_to_tool_calls() {
    let resp = handle_mcp_request(request("list_networks", json!({})), test_state())
        .await
        .unwrap();
    let result = resp.result.unwrap();
    assert_eq!(result["ok"], true);
    assert!(result["networks"].as_array().is_some());
}

#[tokio::test]
async fn resolver_rejects_separatorless_names_without_io() {
    let result = call_tool(
        test_state(),
        "resolve_name",
        json!({ "network": "ethereum", "name": "vitalik" }),
    )
    .await;
    assert_eq!(result["ok"], false);
    assert_eq!(result["kind"], "NameResolutionError");
    assert_eq!(result["stage"], "resolve_address");
}

#[tokio::test]
async fn resolver_passes_canonical_addresses_through() {
    let result = call_tool(
        test_state(),
        "resolve_name",
        json!({ "network": "ethereum", "name": "0x6B175474E89094C44Da98b954EedeAC495271d0F" }),
    )
    .await;
    assert_eq!(result["ok"], true);
    assert_eq!(result["address"], "0x6B175474E89094C44Da98b954EedeAC495271d0F");
}
