//! Trellis Test Harness - Shared doubles and end-to-end scenarios
//!
//! This crate provides:
//! - In-memory node container with call recording and failure injection
//! - Event log and disposable probes for teardown ordering
//! - Logging setup for tests
//! - A counter application exercising every crate together

pub mod harness;
pub mod integration;
pub mod telemetry;

pub use harness::*;
pub use integration::*;
pub use telemetry::*;
