//! Crate-level error type.
//!
//! Three kinds, matching how failures actually surface during a refinement run:
//! a bad configuration (caught once, before any work starts), an invariant violated
//! by a specific block partway through the main loop, and I/O on the optional debug
//! file (logged and swallowed by callers, never propagated past `diagnostics`).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("invariant violated in block {block}: {message}")]
    InvariantViolation { block: u64, message: String },

    #[error("no species event named {0}")]
    MissingSpeciesEvent(i64),

    #[error(transparent)]
    SpeciesTree(#[from] phylotree::tree::TreeError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn invariant(block: u64, message: impl Into<String>) -> Self {
        Error::InvariantViolation { block, message: message.into() }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration(message.into())
    }
}
