//! Server execution logic: accept loop, dispatch, and shutdown.

use std::sync::Arc;

use tokio::net::TcpListener;

use rouka_shared::time::now_unix_millis;

use crate::error::ServerError;
use crate::handler::handle_client;
use crate::mailbox::{DEFAULT_MAILBOX_CAPACITY, mailbox};
use crate::signal::shutdown_signal;
use crate::state::{ClientHandle, Registry};

/// Run the chat relay server.
///
/// Accepts connections until a termination signal arrives. Every accepted
/// connection gets its own mailbox, a registry entry, and a spawned handler
/// task that is never joined; accept failures cost one connection and are
/// looped past. On shutdown the quit sentinel is broadcast to every
/// registered mailbox best-effort and the listening socket is released —
/// handler teardown is not waited for.
///
/// # Arguments
///
/// * `host` - The host address to bind to (e.g., "0.0.0.0")
/// * `port` - The port number to bind to (e.g., 9900)
pub async fn run_server(host: String, port: u16) -> Result<(), ServerError> {
    let bind_addr = format!("{}:{}", host, port);
    let listener = TcpListener::bind(&bind_addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: bind_addr,
            source,
        })?;
    let registry = Arc::new(Registry::new());

    tracing::info!("chat relay listening on {}", listener.local_addr()?);
    tracing::info!("Press Ctrl+C to shutdown gracefully");

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, addr)) => {
                        let (sender, mb) = mailbox(DEFAULT_MAILBOX_CAPACITY);
                        registry
                            .insert(ClientHandle::new(addr, sender, now_unix_millis()))
                            .await;
                        tracing::info!(
                            "accepted client {} ({} clients connected)",
                            addr,
                            registry.len().await
                        );
                        let registry = Arc::clone(&registry);
                        tokio::spawn(async move {
                            handle_client(stream, addr, registry, mb).await;
                        });
                    }
                    Err(e) => {
                        // Bad luck for that client; keep serving the rest.
                        tracing::warn!("failed to accept connection: {}", e);
                    }
                }
            }
            _ = &mut shutdown => {
                tracing::info!("termination signal received, shutting down");
                break;
            }
        }
    }

    let notified = registry.broadcast_quit().await;
    tracing::info!("shutdown: quit notice sent to {} clients", notified);
    drop(listener);

    Ok(())
}
