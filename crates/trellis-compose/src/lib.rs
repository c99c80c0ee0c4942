//! Trellis Compose - Components, services and activation
//!
//! This crate implements the ownership graph of a trellis application:
//! - Scoped service container with parent delegation
//! - Activation seam for component construction
//! - Component lifecycle with cascading teardown
//!   (watches, then children, then dependencies, each last-first)
//! - Slots for render-time child factories

pub mod activator;
pub mod component;
pub mod services;
pub mod slot;

pub use activator::*;
pub use component::*;
pub use services::*;
pub use slot::*;
