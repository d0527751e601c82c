use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use tracing::error;

use crate::chain::{error, registry, resolver, services::reads};
use crate::AppState;

// Defines the structure for the network and address extracted from the URL path.
#[derive(Debug, Deserialize)]
pub struct BalancePath {
    pub network: String,
    pub address: String,
}

// The handler function for the GET /balance/{network}/{address} endpoint.
pub async fn get_balance_handler(
    Path(path): Path<BalancePath>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let result = async {
        let network = registry::resolve_network(&path.network)?;
        let address = resolver::resolve_address(&path.address, network, &state.clients).await?;
        let client = reqwest::Client::new();
        reads::native_balance(&client, &state.clients.rpc_url(network), network, &address).await
    }
    .await;

    match result {
        Ok(payload) => (StatusCode::OK, Json(error::success(payload))).into_response(),
        Err(err) => {
            error!("Failed to get balance for {}: {}", path.address, err);
            (StatusCode::BAD_GATEWAY, Json(error::failure(&err))).into_response()
        }
    }
}
