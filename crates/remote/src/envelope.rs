//! Response-envelope normalization.
//!
//! Some endpoints answer with the payload directly; others answer with a
//! proxy envelope `{"statusCode": 200, "body": "<json string>"}` whose
//! `body` is either a JSON-encoded string or an already-decoded object.
//! Everything above this module sees only the inner payload.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::RemoteError;

/// Unwrap a proxy envelope if present, returning the inner payload.
///
/// An envelope whose `statusCode` is not 2xx becomes
/// [`RemoteError::ApiError`] even though the HTTP call itself succeeded.
pub fn normalize(value: Value) -> Result<Value, RemoteError> {
    let Value::Object(mut obj) = value else {
        return Ok(value);
    };

    let Some(body) = obj.remove("body") else {
        return Ok(Value::Object(obj));
    };

    if let Some(status) = obj.get("statusCode").and_then(Value::as_u64) {
        if !(200..300).contains(&status) {
            let body = match body {
                Value::String(s) => s,
                other => other.to_string(),
            };
            return Err(RemoteError::ApiError {
                status: u16::try_from(status).unwrap_or(u16::MAX),
                body,
            });
        }
    }

    match body {
        Value::String(raw) => serde_json::from_str(&raw)
            .map_err(|e| RemoteError::Decode(format!("envelope body is not JSON: {e}"))),
        other => Ok(other),
    }
}

/// Normalize and deserialize a response payload into `T`.
pub fn decode<T: DeserializeOwned>(value: Value) -> Result<T, RemoteError> {
    let payload = normalize(value)?;
    serde_json::from_value(payload).map_err(|e| RemoteError::Decode(e.to_string()))
}
