//! The ledger client handle.
//!
//! Constructed once at process startup from validated configuration and
//! passed by reference to whatever needs it. The disabled state is a
//! first-class variant, not a null check at every call site.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use crewforge_core::{TaskId, TenantId};

use crate::config::LedgerConfig;
use crate::encode::encode_task_id;
use crate::rpc::{HttpLedgerRpc, LedgerRpc};

/// Reference to a submitted ledger write (transaction hash or equivalent).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxRef(pub String);

impl core::fmt::Display for TxRef {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kind of event materialized on the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerEventKind {
    TaskCompleted,
    TenantRegistered,
}

impl LedgerEventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            LedgerEventKind::TaskCompleted => "task_completed",
            LedgerEventKind::TenantRegistered => "tenant_registered",
        }
    }
}

/// Outcome of a tenant registration attempt.
///
/// Only `Failed` is a failure; `AlreadyRegistered` and `Disabled` are
/// successful no-ops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    Submitted(TxRef),
    AlreadyRegistered,
    Disabled,
    Failed,
}

impl Registration {
    pub fn succeeded(&self) -> bool {
        !matches!(self, Registration::Failed)
    }
}

/// A configured, usable ledger connection.
pub struct ActiveLedger {
    rpc: Arc<dyn LedgerRpc>,
    signing_key: String,
    contract_addr: String,
    confirm_attempts: u32,
    confirm_interval: Duration,
}

/// Handle to the external append-only ledger.
pub enum LedgerClient {
    /// Configuration was incomplete; every operation is a no-op returning an
    /// absent result for the process lifetime.
    Disabled,
    Active(ActiveLedger),
}

impl LedgerClient {
    /// Build from the process environment. Missing settings disable the
    /// client rather than erroring.
    pub fn from_env() -> Self {
        Self::from_config(LedgerConfig::from_env())
    }

    pub fn from_config(config: Option<LedgerConfig>) -> Self {
        match config {
            None => {
                debug!("ledger settings incomplete; ledger client disabled");
                LedgerClient::Disabled
            }
            Some(cfg) => {
                let rpc = Arc::new(HttpLedgerRpc::new(cfg.rpc_url.clone()));
                Self::with_transport(cfg, rpc)
            }
        }
    }

    /// Build with an explicit transport (test seam).
    pub fn with_transport(config: LedgerConfig, rpc: Arc<dyn LedgerRpc>) -> Self {
        LedgerClient::Active(ActiveLedger {
            rpc,
            signing_key: config.signing_key,
            contract_addr: config.contract_addr,
            confirm_attempts: 5,
            confirm_interval: Duration::from_millis(200),
        })
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, LedgerClient::Active(_))
    }

    /// Shorten the confirmation poll for tests.
    pub fn with_confirmation(self, attempts: u32, interval: Duration) -> Self {
        match self {
            LedgerClient::Disabled => LedgerClient::Disabled,
            LedgerClient::Active(mut inner) => {
                inner.confirm_attempts = attempts;
                inner.confirm_interval = interval;
                LedgerClient::Active(inner)
            }
        }
    }

    /// Submit the task's completion record and wait for minimal confirmation.
    ///
    /// Never raises: any failure (transport, rpc, unconfirmed) yields `None`.
    /// The caller is a background job whose only recourse is a retry.
    pub async fn record_completion(&self, task_id: TaskId) -> Option<TxRef> {
        let LedgerClient::Active(ledger) = self else {
            return None;
        };
        ledger.record_completion(task_id).await
    }

    /// One-time tenant registration. "Already registered" is success.
    pub async fn register_tenant(&self, tenant_id: TenantId) -> Registration {
        let LedgerClient::Active(ledger) = self else {
            return Registration::Disabled;
        };
        ledger.register_tenant(tenant_id).await
    }

    /// Advisory read: registration status. Transport errors read as `false`.
    pub async fn is_registered(&self, tenant_id: TenantId) -> bool {
        let LedgerClient::Active(ledger) = self else {
            return false;
        };
        ledger.is_registered(tenant_id).await
    }

    /// Advisory read: total completion records logged. Errors read as absent.
    pub async fn total_logged(&self) -> Option<u64> {
        let LedgerClient::Active(ledger) = self else {
            return None;
        };
        ledger.total_logged().await
    }
}

impl ActiveLedger {
    async fn record_completion(&self, task_id: TaskId) -> Option<TxRef> {
        let entry_id = encode_task_id(task_id);
        let params = json!({
            "contract": self.contract_addr,
            "key": self.signing_key,
            // u128 as a decimal string; JSON numbers cannot carry 128 bits.
            "entry": entry_id.to_string(),
            "kind": LedgerEventKind::TaskCompleted.as_str(),
        });

        let result = match self.rpc.call("ledger_recordCompletion", params).await {
            Ok(result) => result,
            Err(err) => {
                warn!(%task_id, error = %err, "ledger completion write failed");
                return None;
            }
        };

        let tx = match result.get("tx").and_then(|v| v.as_str()) {
            Some(tx) => TxRef(tx.to_string()),
            None => {
                warn!(%task_id, "ledger response carried no tx reference");
                return None;
            }
        };

        if self.await_confirmation(&tx).await {
            debug!(%task_id, %tx, "ledger completion confirmed");
            Some(tx)
        } else {
            warn!(%task_id, %tx, "ledger completion not confirmed in time");
            None
        }
    }

    async fn register_tenant(&self, tenant_id: TenantId) -> Registration {
        let params = json!({
            "contract": self.contract_addr,
            "key": self.signing_key,
            "tenant": tenant_id.as_uuid().as_u128().to_string(),
            "kind": LedgerEventKind::TenantRegistered.as_str(),
        });

        match self.rpc.call("ledger_registerTenant", params).await {
            Ok(result) => match result.get("tx").and_then(|v| v.as_str()) {
                Some(tx) => Registration::Submitted(TxRef(tx.to_string())),
                None => Registration::Failed,
            },
            Err(err) if err.is_already_registered() => Registration::AlreadyRegistered,
            Err(err) => {
                warn!(%tenant_id, error = %err, "tenant registration failed");
                Registration::Failed
            }
        }
    }

    async fn is_registered(&self, tenant_id: TenantId) -> bool {
        let params = json!({
            "contract": self.contract_addr,
            "tenant": tenant_id.as_uuid().as_u128().to_string(),
        });

        match self.rpc.call("ledger_isRegistered", params).await {
            Ok(result) => result.get("registered").and_then(|v| v.as_bool()) == Some(true),
            Err(err) => {
                debug!(%tenant_id, error = %err, "is_registered query failed; reporting false");
                false
            }
        }
    }

    async fn total_logged(&self) -> Option<u64> {
        let params = json!({ "contract": self.contract_addr });

        match self.rpc.call("ledger_totalLogged", params).await {
            Ok(result) => result.get("total").and_then(|v| v.as_u64()),
            Err(err) => {
                debug!(error = %err, "total_logged query failed; reporting absent");
                None
            }
        }
    }

    /// Poll the receipt until confirmed or the attempt budget runs out.
    async fn await_confirmation(&self, tx: &TxRef) -> bool {
        for attempt in 0..self.confirm_attempts {
            if attempt > 0 {
                tokio::time::sleep(self.confirm_interval).await;
            }

            let params = json!({ "tx": tx.0 });
            match self.rpc.call("ledger_getReceipt", params).await {
                Ok(result) => {
                    if result.get("confirmed").and_then(|v| v.as_bool()) == Some(true) {
                        return true;
                    }
                }
                Err(err) => {
                    debug!(%tx, error = %err, "receipt poll failed");
                }
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::LedgerRpcError;
    use async_trait::async_trait;
    use serde_json::Value as JsonValue;
    use std::sync::Mutex;

    fn test_config() -> LedgerConfig {
        LedgerConfig {
            rpc_url: "http://ledger.invalid".to_string(),
            signing_key: "k".to_string(),
            contract_addr: "0xabc".to_string(),
        }
    }

    /// Scripted transport: pops one canned response per call, records calls.
    struct ScriptedRpc {
        responses: Mutex<Vec<Result<JsonValue, LedgerRpcError>>>,
        calls: Mutex<Vec<(String, JsonValue)>>,
    }

    impl ScriptedRpc {
        fn new(mut responses: Vec<Result<JsonValue, LedgerRpcError>>) -> Arc<Self> {
            responses.reverse();
            Arc::new(Self {
                responses: Mutex::new(responses),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<(String, JsonValue)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LedgerRpc for ScriptedRpc {
        async fn call(
            &self,
            method: &str,
            params: JsonValue,
        ) -> Result<JsonValue, LedgerRpcError> {
            self.calls
                .lock()
                .unwrap()
                .push((method.to_string(), params));
            self.responses
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(LedgerRpcError::Transport("script exhausted".into())))
        }
    }

    fn fast(client: LedgerClient) -> LedgerClient {
        client.with_confirmation(2, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn disabled_client_is_a_silent_no_op_everywhere() {
        let client = LedgerClient::from_config(None);
        assert!(!client.is_enabled());

        assert_eq!(client.record_completion(TaskId::new()).await, None);
        assert_eq!(
            client.register_tenant(TenantId::new()).await,
            Registration::Disabled
        );
        assert!(client.register_tenant(TenantId::new()).await.succeeded());
        assert!(!client.is_registered(TenantId::new()).await);
        assert_eq!(client.total_logged().await, None);
    }

    #[tokio::test]
    async fn record_completion_submits_encoded_id_and_confirms() {
        let rpc = ScriptedRpc::new(vec![
            Ok(json!({ "tx": "0xdeadbeef" })),
            Ok(json!({ "confirmed": true })),
        ]);
        let client = fast(LedgerClient::with_transport(test_config(), rpc.clone()));

        let task_id = TaskId::new();
        let tx = client.record_completion(task_id).await;
        assert_eq!(tx, Some(TxRef("0xdeadbeef".to_string())));

        let calls = rpc.calls();
        assert_eq!(calls[0].0, "ledger_recordCompletion");
        assert_eq!(
            calls[0].1.get("entry").and_then(|v| v.as_str()),
            Some(encode_task_id(task_id).to_string().as_str())
        );
        assert_eq!(calls[1].0, "ledger_getReceipt");
    }

    #[tokio::test]
    async fn record_completion_soft_fails_on_transport_error() {
        let rpc = ScriptedRpc::new(vec![Err(LedgerRpcError::Transport(
            "connection refused".into(),
        ))]);
        let client = fast(LedgerClient::with_transport(test_config(), rpc));

        assert_eq!(client.record_completion(TaskId::new()).await, None);
    }

    #[tokio::test]
    async fn record_completion_soft_fails_when_never_confirmed() {
        let rpc = ScriptedRpc::new(vec![
            Ok(json!({ "tx": "0x1" })),
            Ok(json!({ "confirmed": false })),
            Ok(json!({ "confirmed": false })),
        ]);
        let client = fast(LedgerClient::with_transport(test_config(), rpc));

        assert_eq!(client.record_completion(TaskId::new()).await, None);
    }

    #[tokio::test]
    async fn already_registered_is_success() {
        let rpc = ScriptedRpc::new(vec![Err(LedgerRpcError::Rpc {
            code: 3,
            message: "tenant already registered".into(),
        })]);
        let client = fast(LedgerClient::with_transport(test_config(), rpc));

        let outcome = client.register_tenant(TenantId::new()).await;
        assert_eq!(outcome, Registration::AlreadyRegistered);
        assert!(outcome.succeeded());
    }

    #[tokio::test]
    async fn reads_fall_back_to_safe_defaults() {
        let rpc = ScriptedRpc::new(vec![
            Err(LedgerRpcError::Transport("down".into())),
            Err(LedgerRpcError::Transport("down".into())),
        ]);
        let client = fast(LedgerClient::with_transport(test_config(), rpc));

        assert!(!client.is_registered(TenantId::new()).await);
        assert_eq!(client.total_logged().await, None);
    }

    #[tokio::test]
    async fn total_logged_reads_the_counter() {
        let rpc = ScriptedRpc::new(vec![Ok(json!({ "total": 42 }))]);
        let client = fast(LedgerClient::with_transport(test_config(), rpc));

        assert_eq!(client.total_logged().await, Some(42));
    }
}
