//! `crewforge-ledger` — client for the external append-only completion ledger.
//!
//! The ledger durably timestamps task completions outside the primary data
//! store. It is an optional feature: when any of its three settings is
//! missing, the client is a first-class [`client::LedgerClient::Disabled`]
//! variant and every operation is a no-op with an absent result. Callers
//! never treat "disabled" as an error.

pub mod client;
pub mod config;
pub mod encode;
pub mod rpc;

pub use client::{LedgerClient, LedgerEventKind, Registration, TxRef};
pub use config::LedgerConfig;
pub use encode::encode_task_id;
pub use rpc::{HttpLedgerRpc, LedgerRpc, LedgerRpcError};
