//! Trellis Reactive - Observable state cells
//!
//! This crate implements the reactive cell used by components:
//! - Single-writer mutation serialized by an async mutex
//! - Ordered, sequential delivery of `(new, previous)` to observers
//! - Per-observer failure isolation
//! - Idempotent unsubscribe tokens

pub mod observer;
pub mod reactive;

pub use observer::*;
pub use reactive::*;
