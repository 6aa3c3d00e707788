use anyhow::{Context, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use super::traits::{ClientId, Transport, TransportEvent};

/// Messages buffered per client before new ones are dropped
pub const CLIENT_QUEUE_DEPTH: usize = 64;

type ClientMap = Arc<Mutex<HashMap<ClientId, mpsc::Sender<Arc<[u8]>>>>>;

/// Binary stream transport over TCP.
///
/// Each accepted connection gets its own writer with a bounded queue,
/// so one slow client never stalls the others or the caller.
pub struct TcpTransport {
    clients: ClientMap,
    local_addr: SocketAddr,
}

impl TcpTransport {
    /// Binds `addr` and starts accepting on the current tokio runtime.
    pub async fn bind(addr: &str) -> Result<(Arc<Self>, Receiver<TransportEvent>)> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind stream listener on {}", addr))?;
        let local_addr = listener.local_addr()?;
        let (events_tx, events_rx) = unbounded();

        let transport = Arc::new(Self {
            clients: Arc::new(Mutex::new(HashMap::new())),
            local_addr,
        });

        let clients = transport.clients.clone();
        tokio::spawn(accept_loop(listener, clients, events_tx));
        info!("Stream server listening on {}", local_addr);

        Ok((transport, events_rx))
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<ClientId, mpsc::Sender<Arc<[u8]>>>> {
        self.clients
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Transport for TcpTransport {
    fn send_to_all(&self, bytes: &[u8]) -> usize {
        let message: Arc<[u8]> = Arc::from(bytes);
        self.lock()
            .values()
            .filter(|client| client.try_send(message.clone()).is_ok())
            .count()
    }

    fn send_to(&self, client: ClientId, bytes: &[u8]) -> bool {
        self.lock()
            .get(&client)
            .map_or(false, |tx| tx.try_send(Arc::from(bytes)).is_ok())
    }

    fn connected_clients(&self) -> usize {
        self.lock().len()
    }
}

async fn accept_loop(listener: TcpListener, clients: ClientMap, events: Sender<TransportEvent>) {
    let next_id = AtomicU32::new(1);
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!("Stream accept failed: {}", e);
                continue;
            }
        };
        let _ = stream.set_nodelay(true);

        let id = next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(CLIENT_QUEUE_DEPTH);
        clients
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(id, tx);
        info!("Stream client {} connected from {}", id, peer);
        let _ = events.send(TransportEvent::Connected(id));

        tokio::spawn(serve_client(id, stream, rx, clients.clone(), events.clone()));
    }
}

async fn serve_client(
    id: ClientId,
    stream: TcpStream,
    mut outgoing: mpsc::Receiver<Arc<[u8]>>,
    clients: ClientMap,
    events: Sender<TransportEvent>,
) {
    let (mut reader, mut writer) = stream.into_split();
    let mut scratch = [0u8; 256];

    loop {
        tokio::select! {
            message = outgoing.recv() => match message {
                Some(bytes) => {
                    if let Err(e) = writer.write_all(&bytes).await {
                        debug!("Stream client {} write failed: {}", id, e);
                        break;
                    }
                }
                None => break,
            },
            read = reader.read(&mut scratch) => match read {
                // Clients send nothing on this channel; EOF means they left
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            },
        }
    }

    clients
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .remove(&id);
    info!("Stream client {} disconnected", id);
    let _ = events.send(TransportEvent::Disconnected(id));
}
