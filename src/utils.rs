//! Argument extraction helpers for the tool dispatcher.

use serde::de::DeserializeOwned;
use serde_json::{from_value, Value};

use crate::mcp::protocol::{error_codes, Response};

/// Extract a required argument from a JSON arguments object, or build the
/// invalid-params response to hand straight back.
pub fn get_required_arg<T: DeserializeOwned>(
    args: &Value,
    key: &str,
    req_id: &Value,
) -> Result<T, Response> {
    from_value(args.get(key).cloned().unwrap_or(Value::Null)).map_err(|_| {
        Response::error(
            req_id.clone(),
            error_codes::INVALID_PARAMS,
            format!("Missing or invalid required argument: '{}'", key),
        )
    })
}

/// Extract an optional argument; absent and null both map to `None`.
pub fn get_optional_arg<T: DeserializeOwned>(args: &Value, key: &str) -> Option<T> {
    match args.get(key) {
        None | Some(Value::Null) => None,
        Some(v) => from_value(v.clone()).ok(),
    }
}
