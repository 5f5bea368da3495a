//! Transport seam for the ledger RPC endpoint.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value as JsonValue, json};
use thiserror::Error;

/// Ledger transport failure.
#[derive(Debug, Error)]
pub enum LedgerRpcError {
    /// Network/connection level failure.
    #[error("ledger transport error: {0}")]
    Transport(String),

    /// The ledger endpoint answered with an application error.
    #[error("ledger rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// Response could not be decoded.
    #[error("ledger response decode error: {0}")]
    Decode(String),
}

impl LedgerRpcError {
    /// The idempotent-registration case: the ledger reporting an existing
    /// registration is success for our purposes.
    pub fn is_already_registered(&self) -> bool {
        matches!(self, LedgerRpcError::Rpc { message, .. }
            if message.to_lowercase().contains("already registered"))
    }
}

/// JSON-RPC style transport to the ledger endpoint.
///
/// Kept as a trait so the client logic is testable against an in-process
/// fake; production uses [`HttpLedgerRpc`].
#[async_trait]
pub trait LedgerRpc: Send + Sync {
    async fn call(&self, method: &str, params: JsonValue) -> Result<JsonValue, LedgerRpcError>;
}

#[derive(Debug, Deserialize)]
struct RpcEnvelope {
    result: Option<JsonValue>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// JSON-RPC 2.0 over HTTP.
#[derive(Debug, Clone)]
pub struct HttpLedgerRpc {
    http: reqwest::Client,
    url: String,
}

impl HttpLedgerRpc {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl LedgerRpc for HttpLedgerRpc {
    async fn call(&self, method: &str, params: JsonValue) -> Result<JsonValue, LedgerRpcError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let response = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| LedgerRpcError::Transport(e.to_string()))?;

        let envelope: RpcEnvelope = response
            .json()
            .await
            .map_err(|e| LedgerRpcError::Decode(e.to_string()))?;

        if let Some(err) = envelope.error {
            return Err(LedgerRpcError::Rpc {
                code: err.code,
                message: err.message,
            });
        }

        envelope
            .result
            .ok_or_else(|| LedgerRpcError::Decode("missing result field".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn already_registered_detection_is_case_insensitive() {
        let err = LedgerRpcError::Rpc {
            code: 3,
            message: "execution reverted: Tenant Already Registered".to_string(),
        };
        assert!(err.is_already_registered());

        let other = LedgerRpcError::Rpc {
            code: 3,
            message: "execution reverted: out of gas".to_string(),
        };
        assert!(!other.is_already_registered());

        let transport = LedgerRpcError::Transport("connection refused".to_string());
        assert!(!transport.is_already_registered());
    }
}
