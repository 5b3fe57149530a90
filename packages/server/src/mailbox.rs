//! Per-connection mailboxes: bounded point-to-point delivery channels.
//!
//! Every connection owns exactly one [`Mailbox`]; the matching
//! [`MailboxSender`] lives in the registry and is the shared write target
//! other connections broadcast into. The mailbox is what decouples message
//! production (broadcast by the sender's handler) from delivery (socket
//! write by the owning handler).

use std::net::SocketAddr;

use thiserror::Error;
use tokio::sync::mpsc;

/// Default capacity of a connection's mailbox. A full mailbox makes
/// broadcasting senders wait; this is the system's only backpressure.
pub const DEFAULT_MAILBOX_CAPACITY: usize = 32;

/// A chat line in flight from one connection to the others.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayMessage {
    /// Identity of the originating connection.
    pub sender: SocketAddr,
    /// Printable peer address, used as the display prefix on relayed lines.
    pub sender_name: String,
    /// The chat line, without line terminator.
    pub payload: String,
}

impl RelayMessage {
    pub fn new(sender: SocketAddr, payload: String) -> Self {
        Self {
            sender,
            sender_name: sender.to_string(),
            payload,
        }
    }
}

/// What travels through a mailbox: an ordinary chat message or the quit
/// sentinel. The sentinel shares the chat messages' channel but is a
/// distinct variant, so no chat line can ever be mistaken for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Chat(RelayMessage),
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MailboxError {
    /// The owning connection dropped its receiving end.
    #[error("mailbox is closed")]
    Closed,
    /// The mailbox is at capacity (non-blocking sends only).
    #[error("mailbox is full")]
    Full,
}

/// The sending end of a connection's mailbox. Cloneable; held in the
/// registry and used by every other connection during broadcast.
#[derive(Debug, Clone)]
pub struct MailboxSender {
    tx: mpsc::Sender<Delivery>,
}

impl MailboxSender {
    /// Enqueue a delivery, waiting for capacity if the mailbox is full.
    pub async fn send(&self, delivery: Delivery) -> Result<(), MailboxError> {
        self.tx.send(delivery).await.map_err(|_| MailboxError::Closed)
    }

    /// Enqueue a delivery without waiting. Used on the shutdown path, where
    /// notification is best-effort and must never block.
    pub fn try_send(&self, delivery: Delivery) -> Result<(), MailboxError> {
        self.tx.try_send(delivery).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => MailboxError::Full,
            mpsc::error::TrySendError::Closed(_) => MailboxError::Closed,
        })
    }
}

/// The receiving end, exclusively owned by the connection's handler.
#[derive(Debug)]
pub struct Mailbox {
    rx: mpsc::Receiver<Delivery>,
}

impl Mailbox {
    /// Dequeue the next delivery. Returns `None` once the registry entry
    /// (and every other sender clone) is gone.
    pub async fn recv(&mut self) -> Option<Delivery> {
        self.rx.recv().await
    }
}

/// Create a new bounded mailbox channel pair.
pub fn mailbox(capacity: usize) -> (MailboxSender, Mailbox) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (MailboxSender { tx }, Mailbox { rx })
}
