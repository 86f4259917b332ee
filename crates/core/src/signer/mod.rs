//! Signer capability consumed by the session layer.
//!
//! The signer is an external, hardware-backed facility: it derives addresses,
//! signs the challenge phrase, verifies counterparty signatures, and reports
//! device attach/detach events. The session core only ever talks to the
//! [`SignerCapability`] trait; [`soft::SoftSigner`] is the in-process
//! implementation used by tests and the loopback demo.

pub mod soft;

use crate::error::Result;
use crate::network::Network;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

pub use soft::SoftSigner;

/// A signing device as reported by the signer connector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Stable device identifier.
    pub id: String,
    /// Owner-assigned label.
    pub label: String,
    /// Product name.
    pub name: String,
    /// Transport path the device is currently reachable on.
    pub path: String,
}

/// Device lifecycle events emitted by the signer connector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    /// A device was attached.
    Connected(DeviceInfo),
    /// A device was detached.
    Disconnected(DeviceInfo),
}

impl DeviceEvent {
    /// The device this event is about.
    pub fn device(&self) -> &DeviceInfo {
        match self {
            DeviceEvent::Connected(device) | DeviceEvent::Disconnected(device) => device,
        }
    }
}

/// Whether a signing device is currently reachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignerPresence {
    Present,
    Absent,
}

/// Account information returned by the signer for a network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountInfo {
    /// Account-level derivation path, e.g. `m/84'/0'/0'`.
    pub path: String,
    /// Addresses under the account that have already been used.
    pub used: Vec<AddressEntry>,
}

/// An address together with the path it was derived from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressEntry {
    pub address: String,
    pub path: String,
}

/// Result of signing a message: the signature and the address it binds to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedMessage {
    pub address: String,
    pub signature: String,
}

/// Outcome of a completed verify call.
///
/// `success: false` means the signature does not belong to the address — a
/// cryptographic mismatch. A verify call that could not complete at all is an
/// `Err` from [`SignerCapability::verify_message`] instead, and leaves
/// verification inconclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyOutcome {
    pub success: bool,
    pub error: Option<String>,
}

impl VerifyOutcome {
    /// A successful match.
    pub fn valid() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    /// A mismatch, with the connector's reason.
    pub fn mismatch(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(reason.into()),
        }
    }
}

/// The signer facility the session layer depends on.
///
/// Calls are routed to whichever device the implementation currently selects;
/// device identity only surfaces through the event stream.
#[allow(async_fn_in_trait)]
pub trait SignerCapability {
    /// Resolve the active account for a network, including used addresses.
    async fn account_info(&self, network: Network) -> Result<AccountInfo>;

    /// Derive the address at a concrete receive path.
    async fn receive_address(&self, network: Network, path: &str) -> Result<AddressEntry>;

    /// Sign a message with the key at `path`, returning the signing address.
    async fn sign_message(
        &self,
        network: Network,
        path: &str,
        message: &str,
    ) -> Result<SignedMessage>;

    /// Verify a signature against an address and message.
    ///
    /// Returns `Err` only when the call itself could not complete (device
    /// unreachable, connector failure); a bad signature is a successful call
    /// with `success: false`.
    async fn verify_message(
        &self,
        network: Network,
        address: &str,
        message: &str,
        signature: &str,
    ) -> Result<VerifyOutcome>;

    /// Subscribe to device attach/detach events.
    ///
    /// Dropping the receiver ends the subscription.
    fn subscribe(&self) -> mpsc::Receiver<DeviceEvent>;
}

/// Tracks which devices are currently attached, in attach order.
///
/// Fed from a [`SignerCapability::subscribe`] stream; the first attached
/// device doubles as the default selection for new identifications.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: Vec<DeviceInfo>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a device event. Returns true if the registry changed.
    pub fn apply(&mut self, event: &DeviceEvent) -> bool {
        match event {
            DeviceEvent::Connected(device) => {
                if self.devices.iter().any(|d| d.id == device.id) {
                    return false;
                }
                self.devices.push(device.clone());
                true
            }
            DeviceEvent::Disconnected(device) => {
                let before = self.devices.len();
                self.devices.retain(|d| d.id != device.id);
                self.devices.len() != before
            }
        }
    }

    /// Presence of a specific device.
    pub fn presence(&self, device_id: &str) -> SignerPresence {
        if self.devices.iter().any(|d| d.id == device_id) {
            SignerPresence::Present
        } else {
            SignerPresence::Absent
        }
    }

    /// The default device: the earliest one still attached.
    pub fn default_device(&self) -> Option<&DeviceInfo> {
        self.devices.first()
    }

    /// All attached devices, in attach order.
    pub fn devices(&self) -> &[DeviceInfo] {
        &self.devices
    }
}
