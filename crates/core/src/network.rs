//! Target network selection.

use serde::{Deserialize, Serialize};

/// The network an address and its signature belong to.
///
/// The tag doubles as the leading segment of a session identifier, so both
/// parties derive the same coin parameter for signer calls from the shared
/// identifier alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Network {
    /// Bitcoin mainnet (`BTC`).
    #[serde(rename = "BTC")]
    Mainnet,
    /// Bitcoin testnet (`TEST`).
    #[default]
    #[serde(rename = "TEST")]
    Testnet,
}

impl Network {
    /// Get the wire/identifier tag for this network.
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Mainnet => "BTC",
            Network::Testnet => "TEST",
        }
    }

    /// Resolve a network from an identifier tag.
    ///
    /// Anything that is not exactly `BTC` resolves to testnet, so a mangled
    /// tag can never silently select mainnet.
    pub fn from_tag(tag: &str) -> Self {
        if tag == "BTC" {
            Network::Mainnet
        } else {
            Network::Testnet
        }
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
