//! Chat relay server over a plain TCP line protocol.
//!
//! Broadcasts every line a joined client sends to all other joined clients.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin rouka-server
//! cargo run --bin rouka-server -- --host 0.0.0.0 --port 9900
//! ```

use clap::Parser;

use rouka_shared::logger::setup_logger;
use rouka_shared::protocol::DEFAULT_PORT;

#[derive(Parser, Debug)]
#[command(name = "server")]
#[command(about = "Chat relay server with broadcast support", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "0.0.0.0")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value_t = DEFAULT_PORT)]
    port: u16,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "debug");

    let args = Args::parse();

    if let Err(e) = rouka_server::run_server(args.host, args.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
