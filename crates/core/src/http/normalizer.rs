//! Response normalization
//!
//! Backends answer in slightly different dialects: storage-layer `_id`
//! instead of `id`, MongoDB extended JSON (`{"$oid": "..."}`), bare payloads
//! without an envelope. Everything is canonicalized on the loose
//! `serde_json::Value` tree before it is bound to a typed envelope.

use geoquest_domain::{ErrorCode, ResponseEnvelope};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

const OID_KEY: &str = "$oid";
const STORAGE_ID_KEY: &str = "_id";
const ID_KEY: &str = "id";
const ENVELOPE_KEYS: [&str; 3] = ["success", "error", "message"];

pub struct ResponseNormalizer;

impl ResponseNormalizer {
    /// Canonicalize a JSON tree in place, at every depth.
    ///
    /// - `{"$oid": "<hex>"}` becomes `"<hex>"`
    /// - an object with `_id` (string or integer) but no `id` gains
    ///   `id = "<_id>"`; `_id` is kept
    ///
    /// Running it twice yields the same tree as running it once.
    pub fn normalize(value: &mut Value) {
        if let Some(oid) = extended_oid(value) {
            *value = Value::String(oid);
            return;
        }

        match value {
            Value::Object(map) => {
                for child in map.values_mut() {
                    Self::normalize(child);
                }
                alias_storage_id(map);
            }
            Value::Array(items) => {
                for item in items {
                    Self::normalize(item);
                }
            }
            _ => {}
        }
    }

    /// Turn a 2xx body into a typed envelope.
    ///
    /// Empty bodies yield `EMPTY_RESPONSE`, undecodable ones `PARSE_ERROR`.
    /// A body that is not itself an envelope is wrapped as its `data`.
    pub fn success_body<T: DeserializeOwned>(body: &str) -> ResponseEnvelope<T> {
        if body.trim().is_empty() {
            return ResponseEnvelope::failure(ErrorCode::EmptyResponse);
        }

        let mut tree: Value = match serde_json::from_str(body) {
            Ok(tree) => tree,
            Err(err) => return parse_error(&err),
        };
        Self::normalize(&mut tree);

        let is_envelope = tree.as_object().is_some_and(|map| map.contains_key("success"));
        if !is_envelope {
            let mut wrapped = Map::new();
            wrapped.insert("success".to_string(), Value::Bool(true));
            wrapped.insert("data".to_string(), tree);
            tree = Value::Object(wrapped);
        }

        match serde_json::from_value::<ResponseEnvelope<T>>(tree) {
            Ok(envelope) => envelope,
            Err(err) => parse_error(&err),
        }
    }

    /// Salvage a structured error from a failed response's body.
    ///
    /// Returns `None` unless the body is a JSON object carrying at least one
    /// of `success`, `error` or `message`. The result is always a failure and
    /// never carries `data`; a missing `error` becomes `NETWORK_ERROR`.
    pub fn failure_body<T>(body: &str) -> Option<ResponseEnvelope<T>> {
        if body.trim().is_empty() {
            return None;
        }

        let mut tree: Value = serde_json::from_str(body).ok()?;
        let looks_structured = tree
            .as_object()
            .is_some_and(|map| ENVELOPE_KEYS.iter().any(|key| map.contains_key(*key)));
        if !looks_structured {
            return None;
        }
        Self::normalize(&mut tree);

        let envelope: ResponseEnvelope<Value> = serde_json::from_value(tree).ok()?;
        let mut failure = envelope.into_failure::<T>();
        if failure.error.as_deref().map_or(true, str::is_empty) {
            failure.error = Some(ErrorCode::NetworkError.as_str().to_string());
        }
        Some(failure)
    }
}

fn parse_error<T>(err: &serde_json::Error) -> ResponseEnvelope<T> {
    ResponseEnvelope::failure(ErrorCode::ParseError).with_message(err.to_string())
}

fn extended_oid(value: &Value) -> Option<String> {
    let map = value.as_object()?;
    if map.len() != 1 {
        return None;
    }
    map.get(OID_KEY)?.as_str().map(str::to_string)
}

fn alias_storage_id(map: &mut Map<String, Value>) {
    if map.contains_key(ID_KEY) {
        return;
    }
    let alias = match map.get(STORAGE_ID_KEY) {
        Some(Value::String(id)) => id.clone(),
        Some(Value::Number(id)) if id.is_i64() || id.is_u64() => id.to_string(),
        _ => return,
    };
    map.insert(ID_KEY.to_string(), Value::String(alias));
}
