//! Shared library for the rouka chat relay.
//!
//! Holds the pieces both the server and the client depend on: the wire
//! protocol contract, logging setup, and time utilities.

pub mod logger;
pub mod protocol;
pub mod time;
