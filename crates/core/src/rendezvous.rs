//! Session identifiers used to locate the peer.
//!
//! An identifier has the shape `<network-tag>-<word>-<word>`. It is both the
//! rendezvous token handed to the transport and the carrier of the network
//! tag, so a joiner can recover the target network from the shared string
//! alone.

use crate::error::{Error, Result};
use crate::network::Network;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Word table for the first identifier segment.
const WORDS: &[&str] = &[
    "amber", "basalt", "breezy", "bright", "cedar", "clever", "cobalt", "coral", "crisp",
    "dapper", "dusty", "ember", "fabled", "fuzzy", "gentle", "gifted", "hazel", "indigo",
    "jolly", "keen", "lively", "lunar", "mellow", "misty", "nimble", "olive", "opal",
    "plucky", "quiet", "rustic", "sable", "silent", "sleepy", "snappy", "sturdy", "sunny",
    "tidal", "umber", "velvet", "wistful",
];

/// Word table for the trailing identifier segment.
const SUFFIXES: &[&str] = &[
    "app", "biz", "dev", "info", "name", "net", "org", "zone",
];

/// A shareable session identifier: `<network-tag>-<word>-<word>`.
///
/// The identifier is immutable and always reproduces the exact string it was
/// generated from or parsed out of.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId {
    network: Network,
    id: String,
}

impl SessionId {
    /// Generate a fresh identifier for a new session on the given network.
    pub fn generate(network: Network) -> Self {
        let mut rng = rand::thread_rng();
        let word = WORDS[rng.gen_range(0..WORDS.len())];
        let suffix = SUFFIXES[rng.gen_range(0..SUFFIXES.len())];

        Self {
            network,
            id: format!("{}-{}-{}", network.as_str(), word, suffix),
        }
    }

    /// Parse an externally supplied identifier (the join-link parameter).
    ///
    /// The network is resolved from the leading segment; the identifier
    /// string itself is kept verbatim so it stays a valid rendezvous token.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let (tag, rest) = raw
            .split_once('-')
            .ok_or_else(|| Error::Rendezvous(format!("malformed session identifier: {raw:?}")))?;

        if tag.is_empty() || rest.is_empty() {
            return Err(Error::Rendezvous(format!(
                "malformed session identifier: {raw:?}"
            )));
        }

        Ok(Self {
            network: Network::from_tag(tag),
            id: raw.to_string(),
        })
    }

    /// The network encoded in the leading tag.
    pub fn network(&self) -> Network {
        self.network
    }

    /// The full identifier string.
    pub fn as_str(&self) -> &str {
        &self.id
    }

    /// Build a shareable join link by appending the identifier as the `c`
    /// query parameter.
    pub fn join_url(&self, base: &str) -> String {
        let separator = if base.contains('?') { '&' } else { '?' };
        format!("{}{}c={}", base, separator, self.id)
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl TryFrom<String> for SessionId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<SessionId> for String {
    fn from(value: SessionId) -> Self {
        value.id
    }
}
