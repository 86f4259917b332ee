//! Sigchat Core Library
//!
//! This crate provides the core functionality for sigchat, including:
//! - Identity claims proving address ownership via a signed challenge
//! - The connection-and-identification protocol between two peers
//! - Guest verification state machine backed by a signing device
//! - Typing indicator debouncing
//! - Session identifier (rendezvous token) handling
//! - Configuration management
//!
//! It is used by the daemon crate and by any UI embedding a chat session.

pub mod account;
pub mod channel;
pub mod config;
pub mod error;
pub mod identity;
pub mod network;
pub mod rendezvous;
pub mod session;
pub mod signer;
pub mod typing;
pub mod verify;

// Re-export commonly used types
pub use channel::{Action, Channel, ChannelEvent, Connection, Frame};
pub use config::{BrokerConfig, Config, ManifestConfig};
pub use error::{Error, ErrorKind, Result};
pub use identity::{identify_host, identify_joiner, IdentityClaim, CHALLENGE_PHRASE};
pub use network::Network;
pub use rendezvous::SessionId;
pub use session::{
    Author, ChatMessage, ChatSession, Command, ConnectionStatus, SessionEvent,
};
pub use signer::{DeviceEvent, DeviceInfo, SignerCapability, SignerPresence, SoftSigner};
pub use verify::{VerificationStateMachine, VerificationStatus};
