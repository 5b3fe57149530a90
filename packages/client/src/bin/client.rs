//! Terminal chat client for the rouka relay server.
//!
//! Connects to the server, joins the conversation, and relays between the
//! terminal and the socket. Leaves gracefully (`QUIT`/`ACK`) on Ctrl+C or
//! Ctrl+D.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin rouka-client -- 127.0.0.1
//! cargo run --bin rouka-client -- chat.example.org --port 9900
//! ```

use clap::Parser;

use rouka_shared::logger::setup_logger;
use rouka_shared::protocol::DEFAULT_PORT;

#[derive(Parser, Debug)]
#[command(name = "client")]
#[command(about = "Terminal chat client for the rouka relay server", long_about = None)]
struct Args {
    /// Server host or address to connect to
    host: String,

    /// Server port
    #[arg(short = 'p', long, default_value_t = DEFAULT_PORT)]
    port: u16,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();

    if let Err(e) = rouka_client::run_client_session(&args.host, args.port).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}
