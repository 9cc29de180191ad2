//! Field-by-field edit application (spec §9 design note).
//!
//! The source's dynamic-dispatch "apply a setter if a JSON key is present"
//! helper becomes, in a statically typed rewrite, one generic function:
//! given a JSON object, a key, a decoder, and an async setter, apply the
//! edit if and only if the key is present. Handlers call this once per
//! editable field — a declarative table of (key, decode, setter) triples,
//! just expressed as sequential calls instead of a literal array, since
//! each field's decoded type and setter signature differ.

use std::future::Future;

use serde_json::{Map as JsonMap, Value as JsonValue};

use super::errors::ApiError;

/// Applies one field of a partial-update request: if `key` is present in
/// `edits`, decodes its value with `decode` and awaits `setter` with the
/// decoded value. Absent keys are a no-op — the spec's partial-update
/// contract, not a default value.
pub async fn apply_edit<T, D, S, Fut, E>(
    edits: &JsonMap<String, JsonValue>,
    key: &str,
    decode: D,
    setter: S,
) -> Result<(), ApiError>
where
    D: FnOnce(&JsonValue) -> Result<T, ApiError>,
    S: FnOnce(T) -> Fut,
    Fut: Future<Output = Result<(), E>>,
    ApiError: From<E>,
{
    if let Some(value) = edits.get(key) {
        let decoded = decode(value)?;
        setter(decoded).await?;
    }
    Ok(())
}

pub fn decode_json<T>(value: &JsonValue) -> Result<T, ApiError>
where
    T: serde::de::DeserializeOwned,
{
    serde_json::from_value(value.clone()).map_err(|e| ApiError::bad_request(e.to_string()))
}

pub fn decode_opt_json<T>(value: &JsonValue) -> Result<Option<T>, ApiError>
where
    T: serde::de::DeserializeOwned,
{
    if value.is_null() {
        return Ok(None);
    }
    serde_json::from_value(value.clone())
        .map(Some)
        .map_err(|e| ApiError::bad_request(e.to_string()))
}
