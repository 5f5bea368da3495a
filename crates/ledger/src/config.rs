//! Ledger connection settings.

/// The three required external settings for the ledger path.
///
/// All three must be present; a partially configured ledger is treated as
/// absent so that a typo can never half-enable the feature.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// RPC/transport endpoint.
    pub rpc_url: String,
    /// Signing credential for write submissions.
    pub signing_key: String,
    /// Address of the ledger contract.
    pub contract_addr: String,
}

impl LedgerConfig {
    pub const ENV_RPC_URL: &'static str = "LEDGER_RPC_URL";
    pub const ENV_SIGNING_KEY: &'static str = "LEDGER_SIGNING_KEY";
    pub const ENV_CONTRACT_ADDR: &'static str = "LEDGER_CONTRACT_ADDR";

    /// Read the configuration from the environment.
    ///
    /// Returns `None` when any variable is unset or empty, which disables the
    /// ledger for the process lifetime without affecting anything else.
    pub fn from_env() -> Option<Self> {
        let rpc_url = non_empty_var(Self::ENV_RPC_URL)?;
        let signing_key = non_empty_var(Self::ENV_SIGNING_KEY)?;
        let contract_addr = non_empty_var(Self::ENV_CONTRACT_ADDR)?;

        Some(Self {
            rpc_url,
            signing_key,
            contract_addr,
        })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Some(value),
        _ => None,
    }
}
