//! Protocol state machine for a single connection.
//!
//! This module contains the pure transition logic, free of sockets and
//! channels: given the current state and an event (a line from the socket
//! or a delivery from the mailbox), it decides the next state and the
//! action the event loop must perform. I/O failures are not events here;
//! the event loop moves the connection to [`ClientState::Error`] directly.

use rouka_shared::protocol::{JOIN_COMMAND, QUIT_COMMAND, relay_line, terminated, trim_line};

use crate::mailbox::Delivery;

/// Lifecycle of a connection. `Quit` and `Error` are terminal; reaching
/// either makes the handler tear the connection down exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    /// Connection accepted, not yet part of the conversation.
    Accepted,
    /// Participating in chat fan-out.
    Joined,
    /// Left via the QUIT handshake.
    Quit,
    /// Torn down after an I/O failure.
    Error,
}

impl ClientState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ClientState::Quit | ClientState::Error)
    }
}

/// What the event loop must do with a line read from the socket.
#[derive(Debug, PartialEq, Eq)]
pub enum LineAction {
    /// Write `ACK` back to this client.
    ReplyAck,
    /// Fan the payload out to every other client.
    Broadcast(String),
    /// Unrecognized command; log and stay put.
    IgnoreUnknown,
}

/// What the event loop must do with a delivery drained from the mailbox.
#[derive(Debug, PartialEq, Eq)]
pub enum DeliveryAction {
    /// Write a fully formatted, terminated relay line to this client.
    WriteLine(String),
    /// Drop the delivery (chat received outside the Joined state, or the
    /// quit sentinel, which carries no output of its own).
    Discard,
}

/// Apply a line received from this connection's socket.
pub fn on_socket_line(state: ClientState, raw_line: &str) -> (ClientState, LineAction) {
    let line = trim_line(raw_line);
    match state {
        ClientState::Accepted => match line {
            JOIN_COMMAND => (ClientState::Joined, LineAction::ReplyAck),
            QUIT_COMMAND => (ClientState::Quit, LineAction::ReplyAck),
            _ => (ClientState::Accepted, LineAction::IgnoreUnknown),
        },
        ClientState::Joined => match line {
            QUIT_COMMAND => (ClientState::Quit, LineAction::ReplyAck),
            _ => (ClientState::Joined, LineAction::Broadcast(line.to_string())),
        },
        // Terminal states see no further socket events; keep them inert.
        state => (state, LineAction::IgnoreUnknown),
    }
}

/// Apply a delivery drained from this connection's mailbox.
///
/// The quit sentinel forces the Quit transition from any state. Chat
/// deliveries become socket writes only while Joined; a connection that has
/// not joined yet receives broadcasts in its mailbox but discards them.
pub fn on_delivery(state: ClientState, delivery: Delivery) -> (ClientState, DeliveryAction) {
    match delivery {
        Delivery::Quit => (ClientState::Quit, DeliveryAction::Discard),
        Delivery::Chat(message) => match state {
            ClientState::Joined => (
                ClientState::Joined,
                DeliveryAction::WriteLine(terminated(&relay_line(
                    &message.sender_name,
                    &message.payload,
                ))),
            ),
            state => (state, DeliveryAction::Discard),
        },
    }
}
