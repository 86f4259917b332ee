//! Config command - shows the effective configuration.

use anyhow::Result;
use sigchat_core::Config;

pub async fn execute(config: &Config) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}
