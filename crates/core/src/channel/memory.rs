//! In-memory transport.
//!
//! A [`MemoryHub`] plays the role of the rendezvous broker inside one
//! process: endpoints register under their session identifier and joiners
//! dial by identifier. Used by tests and the loopback demo; a networked
//! transport would replace the hub, not the connections it hands out.

use crate::channel::{Channel, Connection};
use crate::config::BrokerConfig;
use crate::error::{Error, Result};
use crate::identity::IdentityClaim;
use crate::rendezvous::SessionId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::debug;

/// Frames buffered per connection direction.
const FRAME_BUFFER: usize = 64;

/// Pending inbound connections buffered per endpoint.
const ACCEPT_BUFFER: usize = 4;

type Registry = Arc<Mutex<HashMap<String, mpsc::Sender<Connection>>>>;

/// An in-process rendezvous registry connecting endpoints by identifier.
#[derive(Clone, Default)]
pub struct MemoryHub {
    registry: Registry,
}

impl MemoryHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an endpoint under its own identifier.
    ///
    /// Fails if the identifier is already taken. The broker address in the
    /// config is accepted for interface parity and ignored; the hub itself
    /// is the broker.
    pub fn open(&self, self_id: &SessionId, broker: &BrokerConfig) -> Result<MemoryChannel> {
        debug!(
            id = %self_id,
            broker = %broker.host,
            "opening in-memory endpoint"
        );

        let (tx, rx) = mpsc::channel(ACCEPT_BUFFER);

        let mut registry = self.lock_registry();
        if registry.contains_key(self_id.as_str()) {
            return Err(Error::Channel(format!(
                "unavailable-id: {} is already taken",
                self_id
            )));
        }
        registry.insert(self_id.as_str().to_string(), tx);

        Ok(MemoryChannel {
            id: self_id.clone(),
            incoming: rx,
            hub: self.clone(),
        })
    }

    fn lock_registry(&self) -> std::sync::MutexGuard<'_, HashMap<String, mpsc::Sender<Connection>>> {
        self.registry.lock().expect("hub registry poisoned")
    }
}

/// An endpoint registered on a [`MemoryHub`].
///
/// Deregisters itself from the hub on drop.
pub struct MemoryChannel {
    id: SessionId,
    incoming: mpsc::Receiver<Connection>,
    hub: MemoryHub,
}

impl MemoryChannel {
    /// The identifier this endpoint is registered under.
    pub fn id(&self) -> &SessionId {
        &self.id
    }
}

impl Channel for MemoryChannel {
    async fn connect(&mut self, remote: &SessionId, metadata: IdentityClaim) -> Result<Connection> {
        let target = self
            .hub
            .lock_registry()
            .get(remote.as_str())
            .cloned()
            .ok_or_else(|| {
                Error::Channel(format!("peer-unavailable: no endpoint for {remote}"))
            })?;

        let (to_host, from_joiner) = mpsc::channel(FRAME_BUFFER);
        let (to_joiner, from_host) = mpsc::channel(FRAME_BUFFER);

        let host_side = Connection::new(Some(metadata), to_joiner, from_joiner);
        target.send(host_side).await.map_err(|_| {
            Error::Channel(format!("peer-unavailable: {remote} stopped accepting"))
        })?;

        Ok(Connection::new(None, to_host, from_host))
    }

    async fn accept(&mut self) -> Result<Connection> {
        self.incoming
            .recv()
            .await
            .ok_or_else(|| Error::Channel("endpoint closed".to_string()))
    }
}

impl Drop for MemoryChannel {
    fn drop(&mut self) {
        self.hub.lock_registry().remove(self.id.as_str());
    }
}
