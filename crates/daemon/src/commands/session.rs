//! Session command - identifier utilities.

use anyhow::Result;
use sigchat_core::{Config, Network, SessionId};

/// Generate a fresh session identifier and its join link.
pub async fn execute_new(config: &Config, network: Option<String>) -> Result<()> {
    let network = network
        .map(|tag| Network::from_tag(&tag))
        .unwrap_or(config.network);

    let id = SessionId::generate(network);
    println!("{id}");
    println!("Join link: {}", id.join_url(&config.manifest.app_url));

    Ok(())
}

/// Parse an externally supplied identifier and describe it.
pub async fn execute_parse(raw: &str) -> Result<()> {
    let id = SessionId::parse(raw)?;
    println!("Identifier: {id}");
    println!("Network:    {}", id.network());

    Ok(())
}
