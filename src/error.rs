//! Unified error type.

use std::fmt;

/// The error type returned by sepal's fallible operations.
///
/// A mod chain never translates errors: whatever a mod or a terminal handler
/// returns is exactly what the caller of the composed handler sees.
/// Filtering (a mod replying without running the rest of the chain) is not an
/// error and never shows up here.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A participant broke a rule of the payload or chain contract.
    #[error("contract violation: {0}")]
    ContractViolation(#[from] Violation),

    /// The message type is not `category` or `category.action`.
    #[error("invalid message type `{0}`")]
    InvalidMessageType(String),

    /// No handler is registered for this message type.
    #[error("no handler registered for message type `{0}`")]
    UnknownMessageType(String),

    /// Malformed `key=value` configuration input.
    #[error("invalid config: {0}")]
    Config(String),

    /// A failure raised by application code (a handler or a mod).
    #[error(transparent)]
    App(Box<dyn std::error::Error + Send + Sync + 'static>),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("codec: {0}")]
    Codec(#[from] serde_json::Error),
}

impl Error {
    /// Wraps an application failure so it can travel through a chain.
    pub fn app<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    {
        Self::App(err.into())
    }
}

/// Specific ways a participant can break the contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// `try_insert` found an entry with the same name already present.
    DuplicateRecord { section: &'static str, name: String },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateRecord { section, name } => {
                write!(f, "duplicate entry `{name}` in {section}")
            }
        }
    }
}

impl std::error::Error for Violation {}

/// Shorthand used across the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
