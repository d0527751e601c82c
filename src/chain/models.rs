// src/chain/models.rs

use chrono::{DateTime, Utc};
use ethers_core::types::U256;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

// --- Bridge pipeline models ---

/// The four externally visible stages of a bridge operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BridgeStage {
    Quote,
    Approve,
    Deposit,
    Fill,
}

impl BridgeStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            BridgeStage::Quote => "quote",
            BridgeStage::Approve => "approve",
            BridgeStage::Deposit => "deposit",
            BridgeStage::Fill => "fill",
        }
    }

    /// Progressive-form name used in failure stage tags.
    pub fn phase(&self) -> &'static str {
        match self {
            BridgeStage::Quote => "quoting",
            BridgeStage::Approve => "approving",
            BridgeStage::Deposit => "depositing",
            BridgeStage::Fill => "filling",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Pending,
    Success,
    Error,
}

/// One entry in the live progress sequence of a bridge call.
///
/// Events are pushed over an mpsc channel as the provider reports them; the
/// caller observes them in arrival order. `tx_hash` is set once a stage has an
/// on-chain transaction, `detail` carries provider-supplied context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeProgressEvent {
    pub stage: BridgeStage,
    pub status: StageStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl BridgeProgressEvent {
    pub fn pending(stage: BridgeStage) -> Self {
        Self {
            stage,
            status: StageStatus::Pending,
            tx_hash: None,
            detail: None,
        }
    }

    pub fn success(stage: BridgeStage) -> Self {
        Self {
            stage,
            status: StageStatus::Success,
            tx_hash: None,
            detail: None,
        }
    }

    pub fn error(stage: BridgeStage, detail: impl Into<String>) -> Self {
        Self {
            stage,
            status: StageStatus::Error,
            tx_hash: None,
            detail: Some(detail.into()),
        }
    }

    pub fn with_tx_hash(mut self, tx_hash: impl Into<String>) -> Self {
        self.tx_hash = Some(tx_hash.into());
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// An executable transaction payload handed back by a quote API.
/// Untrusted: field presence is checked at the boundary before signing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxPayload {
    pub to: String,
    pub data: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas: Option<String>,
}

/// A priced bridge route, including the deposit transaction to submit on the
/// origin chain.
#[derive(Debug, Clone)]
pub struct BridgeQuote {
    pub origin_chain_id: u64,
    pub destination_chain_id: u64,
    pub input_amount: U256,
    pub output_amount: U256,
    pub relay_fee: U256,
    pub deposit_tx: TxPayload,
}

/// Final outcome of a bridge call. The call resolves on deposit confirmation;
/// destination-side fill is informational only.
#[derive(Debug, Clone, Serialize)]
pub struct BridgeOutcome {
    pub operation_id: Uuid,
    pub origin: String,
    pub destination: String,
    pub deposit_tx_hash: String,
    pub amount: String,
    pub raw_amount: String,
    pub symbol: String,
    pub submitted_at: DateTime<Utc>,
}

// --- Swap pipeline models ---

/// Parameters of a swap call. Amount is supplied in base units by the caller;
/// this pipeline performs no decimal conversion.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SwapParams {
    pub src_token: String,
    pub dst_token: String,
    /// Base-unit amount of the source token, as a decimal string.
    pub amount: String,
    #[validate(range(min = 0.01, max = 50.0, message = "slippage must be between 0.01 and 50 percent"))]
    pub slippage: f64,
}

/// Spender response from the aggregator's `/approve/spender` endpoint.
#[derive(Debug, Deserialize)]
pub struct SpenderResponse {
    pub address: String,
}

/// Raw swap response from the aggregator. All fields optional so that shape
/// validation happens here rather than as a deserialize failure.
#[derive(Debug, Deserialize)]
pub struct SwapResponse {
    pub tx: Option<RawSwapTx>,
    #[serde(rename = "toAmount")]
    pub to_amount: Option<String>,
    #[serde(rename = "toToken")]
    pub to_token: Option<TokenRef>,
}

#[derive(Debug, Deserialize)]
pub struct RawSwapTx {
    pub to: Option<String>,
    pub data: Option<String>,
    pub value: Option<String>,
    pub gas: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenRef {
    pub symbol: String,
    pub decimals: u32,
}

/// Final outcome of a swap call. Destination figures come from the quote and
/// are for display; they are not re-verified on chain after submission.
#[derive(Debug, Clone, Serialize)]
pub struct SwapOutcome {
    pub operation_id: Uuid,
    pub tx_hash: String,
    pub spender: String,
    pub dst_amount: String,
    pub dst_amount_raw: String,
    pub dst_symbol: String,
    pub dst_decimals: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowance_note: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

// --- Transfer models ---

/// Outcome of a native or ERC-20 transfer submission.
#[derive(Debug, Clone, Serialize)]
pub struct TransferOutcome {
    pub tx_hash: String,
    pub amount: String,
    pub raw_amount: String,
    pub symbol: String,
    pub decimals: u32,
    pub submitted_at: DateTime<Utc>,
}

/// ERC-20 metadata read from chain.
#[derive(Debug, Clone, Serialize)]
pub struct TokenMetadata {
    pub address: String,
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub decimals: u32,
}
