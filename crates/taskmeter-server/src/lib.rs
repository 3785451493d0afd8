//! taskmeter server library entry.
//!
//! Wires the core registry into an axum service: request-tracking
//! middleware, the audit side channel, the active-user sweeper and the ops
//! endpoints. Consumed by the binary (`main.rs`) and by integration tests.

pub mod app_state;
pub mod audit;
pub mod config;
pub mod error;
pub mod obs;
pub mod ops;
pub mod router;
