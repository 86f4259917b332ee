//! Error types for the core library.

use thiserror::Error;

/// Main error type for the core library.
#[derive(Error, Debug)]
pub enum Error {
    /// Channel transport error (open/connect/send failure)
    #[error("channel error: {0}")]
    Channel(String),

    /// Signer call failed or was rejected
    #[error("signer error: {0}")]
    Signer(String),

    /// Identity claim or derivation path error
    #[error("identity error: {0}")]
    Identity(String),

    /// Malformed session identifier
    #[error("rendezvous error: {0}")]
    Rendezvous(String),

    /// Session protocol error
    #[error("session error: {0}")]
    Session(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for the core library.
pub type Result<T> = std::result::Result<T, Error>;

/// Stable error categories surfaced to the embedding UI layer.
///
/// These ride on session error events as fixed strings so the UI can route
/// them (transient banner vs. blocking warning) without matching on message
/// text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Transport open/connect/send failure.
    Channel,
    /// Signer call failed; verification is inconclusive, not failed.
    Signer,
    /// Signature did not verify against the claimed address.
    VerificationMismatch,
    /// Signing device vanished before verification finished.
    PresenceInterrupted,
}

impl ErrorKind {
    /// Get the stable string for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Channel => "channel",
            ErrorKind::Signer => "signer",
            ErrorKind::VerificationMismatch => "verification-mismatch",
            ErrorKind::PresenceInterrupted => "presence-interrupted",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
