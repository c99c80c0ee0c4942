//! Trellis Core - Fundamental types and contracts
//!
//! This crate defines the types shared by every other trellis crate:
//! - Opaque node handles and the node-container capability
//! - The asynchronous disposal contract
//! - Error taxonomy

pub mod dispose;
pub mod error;
pub mod node;

pub use dispose::*;
pub use error::*;
pub use node::*;
