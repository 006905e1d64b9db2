//! JSON-RPC 2.0 message types.
//!
//! Uses `Box<RawValue>` for params to avoid early parsing; each method
//! handler deserializes its own param type.

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use serde_json::Value;

/// The protocol tag every envelope must carry.
pub const JSONRPC_VERSION: &str = "2.0";

/// JSON-RPC request or notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RpcId>,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Box<RawValue>>,
}

/// JSON-RPC message identifier (number or string).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RpcId {
    Num(i64),
    Str(String),
}

/// JSON-RPC response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    pub jsonrpc: String,
    pub id: Option<RpcId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Box<RawValue>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

/// JSON-RPC error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Rejected envelope: the body was valid JSON but not a valid request
/// object. Maps to `INVALID_REQUEST` at the transport boundary, distinct
/// from `PARSE_ERROR` for bodies that are not JSON at all.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EnvelopeError {
    #[error("Request must be a JSON object")]
    NotAnObject,
    #[error("Missing or invalid protocol tag; expected \"jsonrpc\": \"2.0\"")]
    BadProtocolTag,
    #[error("Missing or invalid method")]
    BadMethod,
    #[error("Invalid id; expected a string, a number, or null")]
    BadId,
}

impl RpcRequest {
    /// Returns true if this is a notification (no id).
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }

    /// Build a request from an already-parsed JSON value, checking the
    /// envelope invariants (protocol tag, method, id kind).
    pub fn from_value(value: &Value) -> Result<Self, EnvelopeError> {
        let obj = value.as_object().ok_or(EnvelopeError::NotAnObject)?;

        if obj.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
            return Err(EnvelopeError::BadProtocolTag);
        }
        let method = obj
            .get("method")
            .and_then(Value::as_str)
            .ok_or(EnvelopeError::BadMethod)?
            .to_string();
        let id = match obj.get("id") {
            None | Some(Value::Null) => None,
            Some(Value::Number(n)) if n.is_i64() => Some(RpcId::Num(n.as_i64().unwrap_or(0))),
            Some(Value::String(s)) => Some(RpcId::Str(s.clone())),
            Some(_) => return Err(EnvelopeError::BadId),
        };
        let params = match obj.get("params") {
            None | Some(Value::Null) => None,
            Some(p) => serde_json::value::to_raw_value(p).ok(),
        };

        Ok(Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            method,
            params,
        })
    }
}

/// Salvage the id from a request value that failed envelope checks, so the
/// error response can still echo it.
pub fn extract_id(value: &Value) -> Option<RpcId> {
    match value.get("id") {
        Some(Value::Number(n)) => n.as_i64().map(RpcId::Num),
        Some(Value::String(s)) => Some(RpcId::Str(s.clone())),
        _ => None,
    }
}

impl RpcResponse {
    /// Construct a success response with the given result.
    pub fn success(id: Option<RpcId>, result: impl Serialize) -> Self {
        // Serialize the result to a RawValue. If serialization fails,
        // fall back to a JSON null.
        let raw = serde_json::value::to_raw_value(&result).unwrap_or_else(|_| {
            serde_json::value::to_raw_value(&Value::Null)
                .unwrap_or_else(|_| RawValue::from_string("null".to_string()).unwrap_or_default())
        });
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(raw),
            error: None,
        }
    }

    /// Construct an error response.
    pub fn error(id: Option<RpcId>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }

    /// Construct an error response with additional data.
    pub fn error_with_data(
        id: Option<RpcId>,
        code: i32,
        message: impl Into<String>,
        data: Value,
    ) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
                data: Some(data),
            }),
        }
    }
}
