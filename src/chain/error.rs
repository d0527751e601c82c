// src/chain/error.rs

//! Error taxonomy and the uniform result contract.
//!
//! Every chain-facing operation in this crate resolves to either
//! `{"ok": true, ...payload}` or `{"ok": false, "stage", "kind", "message"}`.
//! Tool and HTTP layers render these values verbatim; nothing above this
//! module re-interprets provider errors.

use serde_json::{json, Value};
use thiserror::Error;

use crate::chain::models::BridgeStage;

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("unsupported network '{0}'")]
    UnsupportedNetwork(String),

    #[error("failed to initialize RPC client for '{network}': {reason}")]
    NetworkInit { network: String, reason: String },

    #[error("could not resolve '{name}': {reason}")]
    NameResolution { name: String, reason: String },

    #[error("invalid amount '{input}': {reason}")]
    InvalidAmount { input: String, reason: String },

    #[error("bridge quote failed: {0}")]
    Quote(String),

    #[error("swap quote failed: {0}")]
    SwapQuote(String),

    #[error("spender lookup failed: {0}")]
    SpenderLookup(String),

    #[error("malformed quote: {0}")]
    MalformedQuote(String),

    #[error("bridge deposit failed: {reason}")]
    Deposit { stage: BridgeStage, reason: String },

    #[error("transaction submission failed: {0}")]
    Submission(String),

    #[error("missing configuration: {0}")]
    Configuration(String),

    #[error("rpc error: {0}")]
    Rpc(String),
}

impl ChainError {
    /// Stable tag for the error taxonomy. Consumed by LLM clients, so these
    /// strings are part of the wire contract and must not change casually.
    pub fn kind(&self) -> &'static str {
        match self {
            ChainError::UnsupportedNetwork(_) => "UnsupportedNetwork",
            ChainError::NetworkInit { .. } => "NetworkInitError",
            ChainError::NameResolution { .. } => "NameResolutionError",
            ChainError::InvalidAmount { .. } => "InvalidAmount",
            ChainError::Quote(_) => "QuoteError",
            ChainError::SwapQuote(_) => "SwapQuoteError",
            ChainError::SpenderLookup(_) => "SpenderLookupError",
            ChainError::MalformedQuote(_) => "MalformedQuoteError",
            ChainError::Deposit { .. } => "DepositError",
            ChainError::Submission(_) => "SubmissionError",
            ChainError::Configuration(_) => "ConfigurationError",
            ChainError::Rpc(_) => "RpcError",
        }
    }

    /// The pipeline stage the error is attributed to.
    pub fn stage(&self) -> &'static str {
        match self {
            ChainError::UnsupportedNetwork(_) => "resolve_network",
            ChainError::NetworkInit { .. } => "connect",
            ChainError::NameResolution { .. } => "resolve_address",
            ChainError::InvalidAmount { .. } => "validate",
            ChainError::Quote(_) => "quoting",
            ChainError::SwapQuote(_) => "quoting_swap",
            ChainError::SpenderLookup(_) => "fetching_spender",
            ChainError::MalformedQuote(_) => "quoting_swap",
            ChainError::Deposit { stage, .. } => stage.phase(),
            ChainError::Submission(_) => "submitting",
            ChainError::Configuration(_) => "configure",
            ChainError::Rpc(_) => "read",
        }
    }
}

/// Render a successful payload as the tagged result shape.
pub fn success(payload: Value) -> Value {
    match payload {
        Value::Object(mut map) => {
            map.insert("ok".into(), Value::Bool(true));
            Value::Object(map)
        }
        other => json!({ "ok": true, "data": other }),
    }
}

/// Render an error as the tagged result shape.
pub fn failure(err: &ChainError) -> Value {
    json!({
        "ok": false,
        "stage": err.stage(),
        "kind": err.kind(),
        "message": err.to_string(),
    })
}

/// Pull a human-usable message out of an aggregator/bridge HTTP error body.
/// Third-party APIs put their real reason in `description` or `error`;
/// fall back to the raw body, then to the status line.
pub fn api_error_detail(status: reqwest::StatusCode, body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<Value>(body) {
        for key in ["description", "error", "message"] {
            if let Some(detail) = parsed.get(key).and_then(|v| v.as_str()) {
                return format!("{} ({})", detail, status);
            }
        }
    }
    if body.trim().is_empty() {
        status.to_string()
    } else {
        format!("{} ({})", body.trim(), status)
    }
}
