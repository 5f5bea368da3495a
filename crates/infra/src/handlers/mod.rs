//! Job handlers: the execution side of the queue.

pub mod ledger;
pub mod scoring;

pub use ledger::LedgerRecordHandler;
pub use scoring::ScoringHandler;
