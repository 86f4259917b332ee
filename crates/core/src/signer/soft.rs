//! Software signer device.
//!
//! An in-process stand-in for a hardware signer: one device, one master
//! seed, deterministic per-path ed25519 keys. Addresses are the hex-encoded
//! public keys, so any signer instance can verify any other's signatures
//! from the address alone. `attach`/`detach` script the device-presence
//! events a hardware connector would emit.

use crate::error::{Error, Result};
use crate::network::Network;
use crate::signer::{
    AccountInfo, AddressEntry, DeviceEvent, DeviceInfo, SignedMessage, SignerCapability,
    VerifyOutcome,
};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::Rng;
use sha2::{Digest, Sha256};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::warn;

/// Default account path for new soft devices.
pub const DEFAULT_ACCOUNT_PATH: &str = "m/84'/0'/0'";

/// Capacity of each device-event subscription.
const EVENT_BUFFER: usize = 16;

struct State {
    attached: bool,
    used: Vec<AddressEntry>,
    subscribers: Vec<mpsc::Sender<DeviceEvent>>,
}

struct Inner {
    device: DeviceInfo,
    seed: [u8; 32],
    account_path: String,
    state: Mutex<State>,
}

/// An in-process signing device.
///
/// Cheap to clone; clones share the same device and seed.
#[derive(Clone)]
pub struct SoftSigner {
    inner: Arc<Inner>,
}

impl SoftSigner {
    /// Create a detached device with the default account path.
    pub fn new(label: impl Into<String>) -> Self {
        Self::with_account_path(label, DEFAULT_ACCOUNT_PATH)
    }

    /// Create a detached device with a specific account path.
    pub fn with_account_path(label: impl Into<String>, account_path: impl Into<String>) -> Self {
        let seed: [u8; 32] = rand::thread_rng().gen();
        let id = format!("soft-{}", hex::encode(&seed[..4]));

        Self {
            inner: Arc::new(Inner {
                device: DeviceInfo {
                    path: format!("memory/{id}"),
                    id,
                    label: label.into(),
                    name: "Soft Signer".to_string(),
                },
                seed,
                account_path: account_path.into(),
                state: Mutex::new(State {
                    attached: false,
                    used: Vec::new(),
                    subscribers: Vec::new(),
                }),
            }),
        }
    }

    /// The device this signer exposes.
    pub fn device(&self) -> DeviceInfo {
        self.inner.device.clone()
    }

    /// Attach the device, notifying subscribers.
    pub fn attach(&self) {
        self.set_attached(true);
    }

    /// Detach the device, notifying subscribers.
    pub fn detach(&self) {
        self.set_attached(false);
    }

    fn set_attached(&self, attached: bool) {
        let event = if attached {
            DeviceEvent::Connected(self.inner.device.clone())
        } else {
            DeviceEvent::Disconnected(self.inner.device.clone())
        };

        let mut state = self.lock_state();
        if state.attached == attached {
            return;
        }
        state.attached = attached;

        state.subscribers.retain(|tx| match tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Closed(_)) => false,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(device = %self.inner.device.id, "device event subscriber is lagging");
                true
            }
        });
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, State> {
        self.inner.state.lock().expect("soft signer state poisoned")
    }

    fn ensure_attached(&self) -> Result<()> {
        if self.lock_state().attached {
            Ok(())
        } else {
            Err(Error::Signer(format!(
                "device {} is not connected",
                self.inner.device.id
            )))
        }
    }

    /// Deterministic per-path key: the seed, network tag and path digested
    /// together select the ed25519 signing key.
    fn key_for(&self, network: Network, path: &str) -> SigningKey {
        let mut hasher = Sha256::new();
        hasher.update(self.inner.seed);
        hasher.update(network.as_str().as_bytes());
        hasher.update(path.as_bytes());
        let digest: [u8; 32] = hasher.finalize().into();
        SigningKey::from_bytes(&digest)
    }

    fn address_for(&self, network: Network, path: &str) -> String {
        hex::encode(self.key_for(network, path).verifying_key().as_bytes())
    }
}

impl SignerCapability for SoftSigner {
    async fn account_info(&self, _network: Network) -> Result<AccountInfo> {
        self.ensure_attached()?;
        let state = self.lock_state();
        Ok(AccountInfo {
            path: self.inner.account_path.clone(),
            used: state.used.clone(),
        })
    }

    async fn receive_address(&self, network: Network, path: &str) -> Result<AddressEntry> {
        self.ensure_attached()?;
        Ok(AddressEntry {
            address: self.address_for(network, path),
            path: path.to_string(),
        })
    }

    async fn sign_message(
        &self,
        network: Network,
        path: &str,
        message: &str,
    ) -> Result<SignedMessage> {
        self.ensure_attached()?;

        let key = self.key_for(network, path);
        let address = hex::encode(key.verifying_key().as_bytes());
        let signature = hex::encode(key.sign(message.as_bytes()).to_bytes());

        let mut state = self.lock_state();
        if !state.used.iter().any(|entry| entry.address == address) {
            state.used.push(AddressEntry {
                address: address.clone(),
                path: path.to_string(),
            });
        }

        Ok(SignedMessage { address, signature })
    }

    async fn verify_message(
        &self,
        _network: Network,
        address: &str,
        message: &str,
        signature: &str,
    ) -> Result<VerifyOutcome> {
        self.ensure_attached()?;

        let key_bytes: [u8; 32] = match hex::decode(address).ok().and_then(|b| b.try_into().ok()) {
            Some(bytes) => bytes,
            None => return Ok(VerifyOutcome::mismatch("malformed address")),
        };
        let key = match VerifyingKey::from_bytes(&key_bytes) {
            Ok(key) => key,
            Err(_) => return Ok(VerifyOutcome::mismatch("address is not a valid key")),
        };

        let sig_bytes: [u8; 64] = match hex::decode(signature).ok().and_then(|b| b.try_into().ok())
        {
            Some(bytes) => bytes,
            None => return Ok(VerifyOutcome::mismatch("malformed signature")),
        };

        match key.verify(message.as_bytes(), &Signature::from_bytes(&sig_bytes)) {
            Ok(()) => Ok(VerifyOutcome::valid()),
            Err(_) => Ok(VerifyOutcome::mismatch("signature does not match address")),
        }
    }

    fn subscribe(&self) -> mpsc::Receiver<DeviceEvent> {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        self.lock_state().subscribers.push(tx);
        rx
    }
}
