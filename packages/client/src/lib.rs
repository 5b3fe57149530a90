//! Terminal chat client for the rouka relay server.

mod error;
mod formatter;
mod session;
mod ui;

pub use error::ClientError;
pub use session::run_client_session;
