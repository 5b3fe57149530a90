//! Shared registry of active client connections.

use std::collections::HashMap;
use std::net::SocketAddr;

use tokio::sync::Mutex;

use crate::mailbox::{Delivery, MailboxSender, RelayMessage};

/// Registry record for one live connection.
pub struct ClientHandle {
    /// Connection identity: the peer socket address.
    pub addr: SocketAddr,
    /// Printable peer address for logs and relayed-line prefixes.
    pub name: String,
    /// Sending end of the connection's mailbox.
    pub mailbox: MailboxSender,
    /// Unix timestamp (milliseconds) when the connection was accepted.
    pub connected_at: i64,
}

impl ClientHandle {
    pub fn new(addr: SocketAddr, mailbox: MailboxSender, connected_at: i64) -> Self {
        Self {
            addr,
            name: addr.to_string(),
            mailbox,
            connected_at,
        }
    }
}

/// The one registry instance of a server process, shared as `Arc<Registry>`
/// by the listener and every connection handler.
///
/// One lock guards the whole map, and every traversal holds it for the full
/// pass, so membership changes never interleave with a broadcast. The flip
/// side is a known scalability ceiling: while a broadcast waits on a full
/// mailbox, every other registry operation waits too.
#[derive(Default)]
pub struct Registry {
    clients: Mutex<HashMap<SocketAddr, ClientHandle>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a client record. Safe under concurrent calls; a record with the
    /// same identity is replaced (cannot happen while the previous
    /// connection's handler is alive).
    pub async fn insert(&self, client: ClientHandle) {
        let mut clients = self.clients.lock().await;
        clients.insert(client.addr, client);
    }

    /// Remove a client by identity, returning its record. Idempotent:
    /// removing an absent client is a no-op, so concurrent duplicate
    /// removals are harmless.
    pub async fn remove(&self, addr: SocketAddr) -> Option<ClientHandle> {
        let mut clients = self.clients.lock().await;
        clients.remove(&addr)
    }

    /// Number of currently registered clients.
    pub async fn len(&self) -> usize {
        self.clients.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.clients.lock().await.is_empty()
    }

    /// Visit every registered client under the registry lock. The whole
    /// pass observes one consistent snapshot: no client is visited twice
    /// and no membership change interleaves.
    pub async fn for_each<F>(&self, mut visit: F)
    where
        F: FnMut(&ClientHandle),
    {
        let clients = self.clients.lock().await;
        for client in clients.values() {
            visit(client);
        }
    }

    /// Deliver a chat message into every mailbox except the sender's own.
    ///
    /// Holds the registry lock across all deliveries; `send` waits when a
    /// mailbox is full, which is the backpressure the mailbox layer
    /// provides. Delivery failures (a mailbox whose connection is tearing
    /// down) are logged and skipped. Returns the number of deliveries.
    pub async fn broadcast(&self, message: &RelayMessage) -> usize {
        let clients = self.clients.lock().await;
        let mut delivered = 0;
        for client in clients.values() {
            if client.addr == message.sender {
                continue;
            }
            match client.mailbox.send(Delivery::Chat(message.clone())).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::warn!("failed to deliver to client {}: {}", client.name, e);
                }
            }
        }
        delivered
    }

    /// Deliver the quit sentinel to every registered client, none excluded.
    ///
    /// Best-effort: uses non-blocking sends so a full mailbox cannot stall
    /// shutdown; failures are logged and skipped. Returns the number of
    /// clients notified.
    pub async fn broadcast_quit(&self) -> usize {
        let clients = self.clients.lock().await;
        let mut notified = 0;
        for client in clients.values() {
            match client.mailbox.try_send(Delivery::Quit) {
                Ok(()) => notified += 1,
                Err(e) => {
                    tracing::warn!("failed to notify client {} of shutdown: {}", client.name, e);
                }
            }
        }
        notified
    }
}
