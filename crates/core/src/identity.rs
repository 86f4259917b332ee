//! Identity claims: self-asserted, independently verifiable address ownership.

use crate::account::next_receive_path;
use crate::error::Result;
use crate::network::Network;
use crate::rendezvous::SessionId;
use crate::signer::{DeviceInfo, SignerCapability};
use serde::{Deserialize, Serialize};

/// The fixed plaintext both parties sign and verify to prove key control.
pub const CHALLENGE_PHRASE: &str = "I wanna chat!";

/// A party's assertion that it controls an address.
///
/// The signature covers [`CHALLENGE_PHRASE`] and was produced by the signer
/// for the address's key. Claims are immutable once built and live for the
/// session. The `device` handle is local bookkeeping only and never crosses
/// the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityClaim {
    /// This party's own session identifier (its peer address).
    #[serde(rename = "id")]
    pub session_id: SessionId,

    /// The claimed account address.
    pub address: String,

    /// Signature over the challenge phrase, produced for `address`.
    pub signature: String,

    /// True when this party joins an existing session rather than hosting.
    #[serde(rename = "connecting")]
    pub is_initiator: bool,

    /// The signing device that produced the claim. Local-only.
    #[serde(skip)]
    pub device: Option<DeviceInfo>,
}

impl IdentityClaim {
    /// The network this claim belongs to, recovered from its identifier.
    pub fn network(&self) -> Network {
        self.session_id.network()
    }
}

/// Build the local identity claim for the host role.
///
/// Resolves the signer's account, derives a fresh receive address, signs the
/// challenge phrase with it and synthesizes a new session identifier.
pub async fn identify_host<S: SignerCapability>(
    signer: &S,
    network: Network,
    device: Option<DeviceInfo>,
) -> Result<IdentityClaim> {
    identify(signer, network, device, false).await
}

/// Build the local identity claim for the joiner role.
///
/// The network comes from the join identifier; the claim still carries a
/// freshly generated identifier of its own, which is this party's address on
/// the transport.
pub async fn identify_joiner<S: SignerCapability>(
    signer: &S,
    join: &SessionId,
    device: Option<DeviceInfo>,
) -> Result<IdentityClaim> {
    identify(signer, join.network(), device, true).await
}

async fn identify<S: SignerCapability>(
    signer: &S,
    network: Network,
    device: Option<DeviceInfo>,
    is_initiator: bool,
) -> Result<IdentityClaim> {
    let account = signer.account_info(network).await?;
    let last_used = account.used.last().map(|entry| entry.path.as_str());
    let fresh_path = next_receive_path(&account.path, last_used)?;
    let entry = signer.receive_address(network, &fresh_path).await?;
    let signed = signer
        .sign_message(network, &entry.path, CHALLENGE_PHRASE)
        .await?;

    Ok(IdentityClaim {
        session_id: SessionId::generate(network),
        address: signed.address,
        signature: signed.signature,
        is_initiator,
        device,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signer::SoftSigner;

    fn attached_signer() -> SoftSigner {
        let signer = SoftSigner::new("test device");
        signer.attach();
        signer
    }

    #[tokio::test]
    async fn test_host_claim_signs_challenge() {
        let signer = attached_signer();
        let device = signer.device();

        let claim = identify_host(&signer, Network::Mainnet, Some(device.clone()))
            .await
            .unwrap();

        assert!(!claim.is_initiator);
        assert_eq!(claim.network(), Network::Mainnet);
        assert_eq!(claim.device.as_ref().unwrap().id, device.id);

        let outcome = signer
            .verify_message(
                Network::Mainnet,
                &claim.address,
                CHALLENGE_PHRASE,
                &claim.signature,
            )
            .await
            .unwrap();
        assert!(outcome.success);
    }

    #[tokio::test]
    async fn test_joiner_claim_gets_own_identifier() {
        let signer = attached_signer();
        let join = SessionId::parse("BTC-misty-net").unwrap();

        let claim = identify_joiner(&signer, &join, None).await.unwrap();

        assert!(claim.is_initiator);
        assert_eq!(claim.network(), Network::Mainnet);
        assert_ne!(claim.session_id, join);
    }

    #[tokio::test]
    async fn test_consecutive_claims_use_fresh_paths() {
        let signer = attached_signer();

        let first = identify_host(&signer, Network::Testnet, None).await.unwrap();
        let second = identify_host(&signer, Network::Testnet, None).await.unwrap();

        assert_ne!(first.address, second.address);
    }

    #[tokio::test]
    async fn test_detached_signer_fails_identification() {
        let signer = SoftSigner::new("test device");
        assert!(identify_host(&signer, Network::Testnet, None).await.is_err());
    }

    #[tokio::test]
    async fn test_device_handle_stays_off_the_wire() {
        let signer = attached_signer();
        let claim = identify_host(&signer, Network::Testnet, Some(signer.device()))
            .await
            .unwrap();

        let json = serde_json::to_string(&claim).unwrap();
        assert!(json.contains("\"id\""));
        assert!(json.contains("\"connecting\":false"));
        assert!(!json.contains("device"));

        let parsed: IdentityClaim = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.address, claim.address);
        assert!(parsed.device.is_none());
    }
}
