use axum::Json;
use serde_json::{json, Value};

use crate::chain::registry;

// The handler function for the GET /networks endpoint.
pub async fn list_networks_handler() -> Json<Value> {
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
    Json(json!({ "networks": networks }))
}
