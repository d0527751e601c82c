// src/chain/services/bridge.rs

//! Cross-chain bridge pipeline: quote -> approve -> deposit -> fill.
//!
//! The orchestrator obtains a quote, then hands execution to the bridging
//! provider and observes the progress events the provider pushes back. The
//! call resolves successfully as soon as a deposit event carries a
//! transaction id; destination-side fill is informational and reported
//! best-effort. This deposit-resolves contract is deliberate (changing it
//! would change user-visible latency).

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use ethers_core::types::{Address, TransactionRequest, U256};
use secrecy::SecretString;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::chain::amounts::TokenAmount;
use crate::chain::clients::{ClientCache, WriteConnection};
use crate::chain::error::{api_error_detail, ChainError};
use crate::chain::models::{
    BridgeOutcome, BridgeProgressEvent, BridgeQuote, BridgeStage, StageStatus, TxPayload,
};
use crate::chain::nonce::NonceManager;
use crate::chain::registry::{self, NetworkDescriptor};
use crate::chain::services::transfer;

/// How the orchestrator talks to a bridging provider. `execute` pushes
/// progress over the channel and reports nothing else; resolution is driven
/// entirely by the observed events.
#[async_trait]
pub trait BridgeProvider: Send + Sync {
    async fn quote(
        &self,
        origin: &'static NetworkDescriptor,
        destination: &'static NetworkDescriptor,
        amount: U256,
    ) -> Result<BridgeQuote, ChainError>;

    async fn execute(
        &self,
        quote: BridgeQuote,
        conn: WriteConnection,
        nonces: NonceManager,
        events: mpsc::UnboundedSender<BridgeProgressEvent>,
    );
}

fn emit(progress: &mpsc::UnboundedSender<BridgeProgressEvent>, event: BridgeProgressEvent) {
    // a dropped receiver means the caller resolved already; late events no-op
    let _ = progress.send(event);
}

/// Bridge native currency between two networks.
///
/// Every stage transition is mirrored onto `progress`; the returned outcome
/// carries the deposit transaction id.
#[allow(clippy::too_many_arguments)]
pub async fn bridge_native(
    cache: &ClientCache,
    nonces: &NonceManager,
    provider: Arc<dyn BridgeProvider>,
    private_key: &SecretString,
    origin_id: &str,
    destination_id: &str,
    human_amount: &str,
    progress: mpsc::UnboundedSender<BridgeProgressEvent>,
) -> Result<BridgeOutcome, ChainError> {
    let operation_id = Uuid::new_v4();
    let origin = registry::resolve_network(origin_id)?;
    let destination = registry::resolve_network(destination_id)?;
    if origin.chain_id == destination.chain_id {
        return Err(ChainError::Quote(
            "origin and destination are the same network".to_string(),
        ));
    }

    let amount = TokenAmount::parse(human_amount, 18)?;
    if amount.raw.is_zero() {
        return Err(ChainError::InvalidAmount {
            input: human_amount.to_string(),
            reason: "amount must be greater than zero".to_string(),
        });
    }

    info!(
        %operation_id,
        origin = origin.name,
        destination = destination.name,
        amount = %amount.human,
        "starting bridge"
    );

    emit(&progress, BridgeProgressEvent::pending(BridgeStage::Quote));
    let quote = match provider.quote(origin, destination, amount.raw).await {
        Ok(quote) => quote,
        Err(err) => {
            emit(
                &progress,
                BridgeProgressEvent::error(BridgeStage::Quote, err.to_string()),
            );
            return Err(err);
        }
    };
    emit(
        &progress,
        BridgeProgressEvent::success(BridgeStage::Quote).with_detail(format!(
            "output {} after fees",
            TokenAmount::from_raw(quote.output_amount, 18).human
        )),
    );

    let conn = cache.write_connection(private_key, origin)?;

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    {
        let provider = provider.clone();
        let nonces = nonces.clone();
        tokio::spawn(async move {
            provider.execute(quote, conn, nonces, event_tx).await;
        });
    }

    // Consume provider-pushed events: forward everything, resolve on deposit
    // success, fail on the first error event. Stages arrive in the provider's
    // order, not ours; anything irrelevant to resolution is forwarded and
    // otherwise ignored.
    let mut deposit_tx_hash: Option<String> = None;
    while let Some(event) = event_rx.recv().await {
        let stage = event.stage;
        let status = event.status;
        let tx_hash = event.tx_hash.clone();
        let detail = event.detail.clone();
        emit(&progress, event);

        match status {
            StageStatus::Error => {
                return Err(ChainError::Deposit {
                    stage,
                    reason: detail.unwrap_or_else(|| "bridge provider reported failure".to_string()),
                });
            }
            StageStatus::Success if stage == BridgeStage::Deposit => {
                match tx_hash {
                    Some(hash) => {
                        deposit_tx_hash = Some(hash);
                        break;
                    }
                    None => {
                        return Err(ChainError::Deposit {
                            stage,
                            reason: "deposit confirmed without a transaction id".to_string(),
                        });
                    }
                }
            }
            _ => {}
        }
    }

    let deposit_tx_hash = deposit_tx_hash.ok_or_else(|| ChainError::Deposit {
        stage: BridgeStage::Deposit,
        reason: "provider finished without confirming the deposit".to_string(),
    })?;

    info!(%operation_id, tx_hash = %deposit_tx_hash, "bridge deposit confirmed");

    Ok(BridgeOutcome {
        operation_id,
        origin: origin.name.to_string(),
        destination: destination.name.to_string(),
        deposit_tx_hash,
        amount: amount.human,
        raw_amount: amount.raw.to_string(),
        symbol: origin.symbol.to_string(),
        submitted_at: Utc::now(),
    })
}

// --- HTTP bridging provider ---

const FILL_POLL_ATTEMPTS: u32 = 10;
const FILL_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Bridging provider backed by a REST quote API. The quote response carries
/// an executable deposit transaction for the origin chain; fill status is
/// polled from the same API after the deposit lands.
pub struct HttpBridgeProvider {
    api_url: String,
    client: reqwest::Client,
}

impl HttpBridgeProvider {
    pub fn new(api_url: String) -> Self {
        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn parse_quote(
        &self,
        body: Value,
        origin: &NetworkDescriptor,
        destination: &NetworkDescriptor,
        amount: U256,
    ) -> Result<BridgeQuote, ChainError> {
        let malformed = |what: &str| ChainError::Quote(format!("malformed quote response: {}", what));

        let deposit = body
            .get("depositTx")
            .ok_or_else(|| malformed("missing depositTx"))?;
        let tx = TxPayload {
            to: deposit
                .get("to")
                .and_then(|v| v.as_str())
                .ok_or_else(|| malformed("missing depositTx.to"))?
                .to_string(),
            data: deposit
                .get("data")
                .and_then(|v| v.as_str())
                .ok_or_else(|| malformed("missing depositTx.data"))?
                .to_string(),
            value: deposit
                .get("value")
                .and_then(|v| v.as_str())
                .ok_or_else(|| malformed("missing depositTx.value"))?
                .to_string(),
            gas: deposit
                .get("gas")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string()),
        };

        let output_amount = body
            .get("outputAmount")
            .and_then(|v| v.as_str())
            .and_then(|s| U256::from_dec_str(s).ok())
            .ok_or_else(|| malformed("missing outputAmount"))?;
        let relay_fee = body
            .get("relayFeeTotal")
            .and_then(|v| v.as_str())
            .and_then(|s| U256::from_dec_str(s).ok())
            .unwrap_or_else(U256::zero);

        Ok(BridgeQuote {
            origin_chain_id: origin.chain_id,
            destination_chain_id: destination.chain_id,
            input_amount: amount,
            output_amount,
            relay_fee,
            deposit_tx: tx,
        })
    }

    async fn poll_fill(
        &self,
        origin_chain_id: u64,
        deposit_tx_hash: &str,
        events: &mpsc::UnboundedSender<BridgeProgressEvent>,
    ) {
        let url = format!(
            "{}/deposit/status?originChainId={}&depositTxHash={}",
            self.api_url, origin_chain_id, deposit_tx_hash
        );
        for attempt in 0..FILL_POLL_ATTEMPTS {
            tokio::time::sleep(FILL_POLL_INTERVAL).await;
            let body: Option<Value> = match self.client.get(&url).send().await {
                Ok(resp) => resp.json().await.ok(),
                Err(err) => {
                    debug!(attempt, %err, "fill status poll failed");
                    None
                }
            };
            let Some(body) = body else { continue };
            match body.get("status").and_then(|v| v.as_str()) {
                Some("filled") => {
                    let fill_hash = body
                        .get("fillTx")
                        .and_then(|v| v.as_str())
                        .map(|s| s.to_string());
                    let mut event = BridgeProgressEvent::success(BridgeStage::Fill);
                    if let Some(hash) = fill_hash {
                        event = event.with_tx_hash(hash);
                    }
                    emit(events, event);
                    return;
                }
                Some("expired") => {
                    emit(
                        events,
                        BridgeProgressEvent::error(BridgeStage::Fill, "deposit expired unfilled"),
                    );
                    return;
                }
                _ => {}
            }
        }
        // informational only; the call resolved on deposit long ago
        warn!(deposit_tx_hash, "fill not observed before giving up polling");
    }
}

#[async_trait]
impl BridgeProvider for HttpBridgeProvider {
    async fn quote(
        &self,
        origin: &'static NetworkDescriptor,
        destination: &'static NetworkDescriptor,
        amount: U256,
    ) -> Result<BridgeQuote, ChainError> {
        let url = format!(
            "{}/quote?originChainId={}&destinationChainId={}&amount={}",
            self.api_url, origin.chain_id, destination.chain_id, amount
        );
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ChainError::Quote(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| ChainError::Quote(e.to_string()))?;
        if !status.is_success() {
            return Err(ChainError::Quote(api_error_detail(status, &body)));
        }
        let parsed: Value = serde_json::from_str(&body)
            .map_err(|e| ChainError::Quote(format!("unparseable quote response: {}", e)))?;
        self.parse_quote(parsed, origin, destination, amount)
    }

    async fn execute(
        &self,
        quote: BridgeQuote,
        conn: WriteConnection,
        nonces: NonceManager,
        events: mpsc::UnboundedSender<BridgeProgressEvent>,
    ) {
        // native asset: nothing to approve
        emit(
            &events,
            BridgeProgressEvent::success(BridgeStage::Approve)
                .with_detail("native asset, no allowance required"),
        );

        emit(&events, BridgeProgressEvent::pending(BridgeStage::Deposit));

        let tx = match deposit_request(&quote.deposit_tx) {
            Ok(tx) => tx,
            Err(err) => {
                emit(
                    &events,
                    BridgeProgressEvent::error(BridgeStage::Deposit, err.to_string()),
                );
                return;
            }
        };

        let tx_hash = match transfer::send_signed(&conn, &nonces, tx).await {
            Ok(hash) => hash,
            Err(err) => {
                emit(
                    &events,
                    BridgeProgressEvent::error(BridgeStage::Deposit, err.to_string()),
                );
                return;
            }
        };

        emit(
            &events,
            BridgeProgressEvent::success(BridgeStage::Deposit).with_tx_hash(tx_hash.clone()),
        );

        emit(&events, BridgeProgressEvent::pending(BridgeStage::Fill));
        self.poll_fill(quote.origin_chain_id, &tx_hash, &events).await;
    }
}

fn deposit_request(payload: &TxPayload) -> Result<TransactionRequest, ChainError> {
    let to = Address::from_str(&payload.to)
        .map_err(|e| ChainError::Submission(format!("bad deposit target: {}", e)))?;
    let data = hex::decode(payload.data.trim_start_matches("0x"))
        .map_err(|e| ChainError::Submission(format!("bad deposit calldata: {}", e)))?;
    let value = parse_amount_field(&payload.value)
        .ok_or_else(|| ChainError::Submission(format!("bad deposit value '{}'", payload.value)))?;

    let mut tx = TransactionRequest::new().to(to).data(data).value(value);
    if let Some(gas) = payload.gas.as_deref().and_then(parse_amount_field) {
        tx = tx.gas(gas);
    }
    Ok(tx)
}

// Quote APIs are inconsistent about hex vs decimal quantities.
fn parse_amount_field(s: &str) -> Option<U256> {
    let trimmed = s.trim();
    if let Some(hex) = trimmed.strip_prefix("0x") {
        U256::from_str_radix(hex, 16).ok()
    } else {
        U256::from_dec_str(trimmed).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn quote_parsing_requires_the_deposit_payload() {
        let provider = HttpBridgeProvider::new("http://localhost".to_string());
        let origin = registry::resolve_network("ethereum").unwrap();
        let destination = registry::resolve_network("base").unwrap();

        let complete = json!({
            "outputAmount": "990000000000000000",
            "relayFeeTotal": "10000000000000000",
            "depositTx": {
                "to": "0x5c7bcd6e7de5423a257d81b442095a1a6ced35c5",
                "data": "0xdeadbeef",
                "value": "1000000000000000000"
            }
        });
        let quote = provider
            .parse_quote(complete, origin, destination, U256::exp10(18))
            .unwrap();
        assert_eq!(quote.origin_chain_id, 1);
        assert_eq!(quote.destination_chain_id, 8453);
        assert_eq!(quote.output_amount, U256::from_dec_str("990000000000000000").unwrap());

        let missing_to = json!({
            "outputAmount": "1",
            "depositTx": { "data": "0x", "value": "0" }
        });
        let err = provider
            .parse_quote(missing_to, origin, destination, U256::one())
            .unwrap_err();
        assert_eq!(err.kind(), "QuoteError");
        assert!(err.to_string().contains("depositTx.to"));
    }

    #[test]
    fn deposit_request_accepts_hex_and_decimal_quantities() {
        let payload = TxPayload {
            to: "0x5c7bcd6e7de5423a257d81b442095a1a6ced35c5".to_string(),
            data: "0xdeadbeef".to_string(),
            value: "0xde0b6b3a7640000".to_string(),
            gas: Some("210000".to_string()),
        };
        let tx = deposit_request(&payload).unwrap();
        assert_eq!(tx.value.unwrap(), U256::exp10(18));
        assert_eq!(tx.gas.unwrap(), U256::from(210000u64));

        let bad = TxPayload {
            to: "spoke pool".to_string(),
            data: "0x".to_string(),
            value: "0".to_string(),
            gas: None,
        };
        assert!(deposit_request(&bad).is_err());
    }
}
