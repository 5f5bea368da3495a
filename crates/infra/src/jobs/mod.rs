//! Durable background job queue.
//!
//! ## Design
//!
//! - One logical unit of work = one row, keyed by a unique dedup key
//! - Producers insert-if-absent and return immediately (never wait for
//!   execution)
//! - Workers poll, claim exclusively, execute, then delete on success or
//!   reschedule with exponential backoff on failure
//! - At-least-once delivery; handlers must be idempotent
//! - A job that exhausts its attempts stays in the table as `failed` for
//!   operational visibility and is never claimed again
//!
//! ## Components
//!
//! - `types`: the job row, status, payloads, backoff policy
//! - `store`: the `JobStore` trait plus the in-memory implementation
//! - `postgres`: the production store (`ON CONFLICT` dedup, `FOR UPDATE
//!   SKIP LOCKED` claim)
//! - `worker`: the claim→execute→resolve poll loop
//! - `dispatcher`: turns a dispatch-eligible task transition into job rows

pub mod dispatcher;
pub mod postgres;
pub mod store;
pub mod types;
pub mod worker;
