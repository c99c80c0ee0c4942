//! Error types for trellis

use std::error::Error as StdError;

use thiserror::Error;

/// Error raised by a user observer.
///
/// Observers may fail with any error type; it is boxed so the cell does not
/// need to know about it.
pub type ObserverError = Box<dyn StdError + 'static>;

/// Failures reported by a node-container capability
#[derive(Error, Debug)]
pub enum ContainerError {
    /// `remove_child` was asked to remove a node it does not contain
    #[error("The specified child is not present in this container")]
    NotFound,

    /// The operation breaks the container's own structural contract
    #[error("Structural violation: {0}")]
    Structure(String),

    #[error("Container backend error: {0}")]
    Backend(#[source] Box<dyn StdError + 'static>),
}

impl ContainerError {
    pub fn structure(msg: impl Into<String>) -> Self {
        ContainerError::Structure(msg.into())
    }

    /// Whether this is the "child not present" condition
    #[inline]
    pub fn is_not_found(&self) -> bool {
        matches!(self, ContainerError::NotFound)
    }
}

/// Core trellis errors
#[derive(Error, Debug)]
pub enum TrellisError {
    // Resolution errors
    #[error("Don't know how to resolve {service}")]
    UnresolvedService { service: &'static str },

    #[error("Circular dependency while constructing {service}")]
    CircularService { service: &'static str },

    // Reactive errors
    #[error("Observer failed: {0}")]
    ObserverFailed(#[source] ObserverError),

    // Container capability errors
    #[error(transparent)]
    Container(#[from] ContainerError),

    // Component errors
    #[error("Failed to activate {component}: {reason}")]
    Activation {
        component: &'static str,
        reason: String,
    },

    #[error("Don't know how to render {component}. Did you forget to define a render function?")]
    RenderUndefined { component: &'static str },
}

impl TrellisError {
    pub fn activation(component: &'static str, reason: impl Into<String>) -> Self {
        TrellisError::Activation {
            component,
            reason: reason.into(),
        }
    }
}

/// Result type for trellis operations
pub type TrellisResult<T> = Result<T, TrellisError>;
