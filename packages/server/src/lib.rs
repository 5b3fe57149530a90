//! Concurrent chat relay engine.
//!
//! Clients connect over TCP, join the shared conversation with a `JOIN`
//! handshake, and every line a joined client sends is broadcast to all
//! other joined clients. One spawned task per connection runs the protocol
//! state machine; per-connection bounded mailboxes decouple broadcasting
//! from socket writes; a single lock-guarded registry tracks membership.

pub mod domain;
pub mod error;
pub mod handler;
pub mod mailbox;
pub mod runner;
pub mod signal;
pub mod state;

pub use error::ServerError;
pub use runner::run_server;
