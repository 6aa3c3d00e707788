use crossbeam_channel::{unbounded, Receiver, Sender};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use crate::hal::{ClientId, Transport, TransportEvent};

#[derive(Default)]
struct Clients {
    connected: BTreeMap<ClientId, Vec<Vec<u8>>>,
    broadcasts: Vec<Vec<u8>>,
}

/// Transport that records every message per client.
#[derive(Clone)]
pub struct MemoryTransport {
    clients: Arc<Mutex<Clients>>,
    events: Sender<TransportEvent>,
}

impl MemoryTransport {
    pub fn new() -> (Self, Receiver<TransportEvent>) {
        let (events, rx) = unbounded();
        (
            Self {
                clients: Arc::new(Mutex::new(Clients::default())),
                events,
            },
            rx,
        )
    }

    pub fn connect(&self, client: ClientId) {
        self.lock().connected.insert(client, Vec::new());
        let _ = self.events.send(TransportEvent::Connected(client));
    }

    pub fn disconnect(&self, client: ClientId) {
        self.lock().connected.remove(&client);
        let _ = self.events.send(TransportEvent::Disconnected(client));
    }

    /// Messages delivered to `client`, oldest first
    pub fn received(&self, client: ClientId) -> Vec<Vec<u8>> {
        self.lock()
            .connected
            .get(&client)
            .cloned()
            .unwrap_or_default()
    }

    /// Every `send_to_all` payload, including those with no listener
    pub fn broadcasts(&self) -> Vec<Vec<u8>> {
        self.lock().broadcasts.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Clients> {
        self.clients
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Transport for MemoryTransport {
    fn send_to_all(&self, bytes: &[u8]) -> usize {
        let mut clients = self.lock();
        clients.broadcasts.push(bytes.to_vec());
        for inbox in clients.connected.values_mut() {
            inbox.push(bytes.to_vec());
        }
        clients.connected.len()
    }

    fn send_to(&self, client: ClientId, bytes: &[u8]) -> bool {
        match self.lock().connected.get_mut(&client) {
            Some(inbox) => {
                inbox.push(bytes.to_vec());
                true
            }
            None => false,
        }
    }

    fn connected_clients(&self) -> usize {
        self.lock().connected.len()
    }
}
