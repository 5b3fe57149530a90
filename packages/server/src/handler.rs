//! Per-connection event loop driving the protocol state machine.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

use rouka_shared::protocol::{ACK_REPLY, LINE_BUFFER_SIZE, terminated};
use rouka_shared::time::timestamp_to_rfc3339;

use crate::domain::{ClientState, DeliveryAction, LineAction, on_delivery, on_socket_line};
use crate::mailbox::{Mailbox, RelayMessage};
use crate::state::Registry;

/// Serve one accepted connection until its state machine reaches a terminal
/// state, then tear it down exactly once.
///
/// The loop waits on two readiness sources at the same time: the buffered
/// line reader over the socket (input from this client) and the mailbox
/// (fan-out from other clients). Whichever becomes ready is processed; the
/// other stays ready and is served on the next loop iteration, so neither
/// source can starve the other.
///
/// The caller (the listener) has already inserted this client into the
/// registry; the matching removal happens here, on the single exit path,
/// regardless of whether the connection ends in Quit or Error.
///
/// Generic over the stream so tests can drive the state machine through
/// in-memory duplex pipes.
pub async fn handle_client<S>(
    stream: S,
    addr: SocketAddr,
    registry: Arc<Registry>,
    mut mailbox: Mailbox,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (reader, mut writer) = tokio::io::split(stream);
    let mut lines = BufReader::with_capacity(LINE_BUFFER_SIZE, reader).lines();
    let mut state = ClientState::Accepted;

    while !state.is_terminal() {
        tokio::select! {
            maybe_line = lines.next_line() => {
                match maybe_line {
                    Ok(Some(line)) => {
                        let (next, action) = on_socket_line(state, &line);
                        state = next;
                        match action {
                            LineAction::ReplyAck => {
                                if let Err(e) = writer.write_all(terminated(ACK_REPLY).as_bytes()).await {
                                    tracing::warn!("failed to write ACK to {}: {}", addr, e);
                                    state = ClientState::Error;
                                } else if state == ClientState::Joined {
                                    tracing::info!("client {} joined the conversation", addr);
                                } else {
                                    tracing::info!("client {} left the conversation", addr);
                                }
                            }
                            LineAction::Broadcast(payload) => {
                                let message = RelayMessage::new(addr, payload);
                                let delivered = registry.broadcast(&message).await;
                                tracing::debug!(
                                    "relayed line from {} to {} clients",
                                    addr,
                                    delivered
                                );
                            }
                            LineAction::IgnoreUnknown => {
                                tracing::warn!(
                                    "client {} sent unknown command {:?}",
                                    addr,
                                    line.trim_end()
                                );
                            }
                        }
                    }
                    Ok(None) => {
                        tracing::info!("client {} closed the connection", addr);
                        state = ClientState::Error;
                    }
                    Err(e) => {
                        tracing::warn!("failed to read from client {}: {}", addr, e);
                        state = ClientState::Error;
                    }
                }
            }
            maybe_delivery = mailbox.recv() => {
                match maybe_delivery {
                    Some(delivery) => {
                        let (next, action) = on_delivery(state, delivery);
                        state = next;
                        match action {
                            DeliveryAction::WriteLine(text) => {
                                if let Err(e) = writer.write_all(text.as_bytes()).await {
                                    tracing::warn!("failed to write to client {}: {}", addr, e);
                                    state = ClientState::Error;
                                }
                            }
                            DeliveryAction::Discard => {
                                tracing::debug!("dropped delivery for client {} in {:?}", addr, state);
                            }
                        }
                    }
                    // Registry entry already gone; nothing left to deliver.
                    None => state = ClientState::Quit,
                }
            }
        }
    }

    if let Some(record) = registry.remove(addr).await {
        tracing::info!(
            "connection for {} closed in {:?} (connected since {}, {} clients remain)",
            addr,
            state,
            timestamp_to_rfc3339(record.connected_at),
            registry.len().await
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use tokio::io::DuplexStream;
    use tokio::time::timeout;

    use crate::mailbox::{DEFAULT_MAILBOX_CAPACITY, Delivery, MailboxSender, mailbox};
    use crate::state::ClientHandle;

    const WAIT: Duration = Duration::from_secs(5);

    struct TestConn {
        peer: tokio::io::Lines<BufReader<tokio::io::ReadHalf<DuplexStream>>>,
        peer_writer: tokio::io::WriteHalf<DuplexStream>,
        sender: MailboxSender,
        task: tokio::task::JoinHandle<()>,
    }

    /// Register a client and spawn its handler over an in-memory stream,
    /// the way the listener wires a real connection.
    async fn spawn_conn(registry: &Arc<Registry>, port: u16) -> TestConn {
        let addr: SocketAddr = format!("127.0.0.1:{}", port).parse().unwrap();
        let (server_side, peer_side) = tokio::io::duplex(LINE_BUFFER_SIZE);
        let (sender, mb) = mailbox(DEFAULT_MAILBOX_CAPACITY);
        registry.insert(ClientHandle::new(addr, sender.clone(), 0)).await;
        let task = tokio::spawn(handle_client(server_side, addr, Arc::clone(registry), mb));
        let (peer_reader, peer_writer) = tokio::io::split(peer_side);
        TestConn {
            peer: BufReader::new(peer_reader).lines(),
            peer_writer,
            sender,
            task,
        }
    }

    impl TestConn {
        async fn send_line(&mut self, line: &str) {
            self.peer_writer
                .write_all(terminated(line).as_bytes())
                .await
                .unwrap();
        }

        async fn read_line(&mut self) -> String {
            timeout(WAIT, self.peer.next_line())
                .await
                .expect("timed out waiting for a line")
                .unwrap()
                .expect("stream closed")
        }
    }

    #[tokio::test]
    async fn test_join_is_acknowledged() {
        // テスト項目: JOIN に対して ACK が返される
        // given (前提条件):
        let registry = Arc::new(Registry::new());
        let mut conn = spawn_conn(&registry, 50001).await;

        // when (操作):
        conn.send_line("JOIN").await;

        // then (期待する結果):
        assert_eq!(conn.read_line().await, "ACK\r");
    }

    #[tokio::test]
    async fn test_quit_from_accepted_acks_and_deregisters() {
        // テスト項目: 未参加のまま QUIT しても ACK が返り登録が解除される
        // given (前提条件):
        let registry = Arc::new(Registry::new());
        let mut conn = spawn_conn(&registry, 50001).await;
        assert_eq!(registry.len().await, 1);

        // when (操作):
        conn.send_line("QUIT").await;

        // then (期待する結果):
        assert_eq!(conn.read_line().await, "ACK\r");
        timeout(WAIT, conn.task).await.unwrap().unwrap();
        assert_eq!(registry.len().await, 0);
    }

    #[tokio::test]
    async fn test_quit_from_joined_acks_exactly_once() {
        // テスト項目: Joined 状態からの QUIT で ACK がちょうど一度返り接続が閉じる
        // given (前提条件):
        let registry = Arc::new(Registry::new());
        let mut conn = spawn_conn(&registry, 50001).await;
        conn.send_line("JOIN").await;
        assert_eq!(conn.read_line().await, "ACK\r");

        // when (操作):
        conn.send_line("QUIT").await;

        // then (期待する結果):
        assert_eq!(conn.read_line().await, "ACK\r");
        // 接続が閉じ、それ以上の行は届かない
        let eof = timeout(WAIT, conn.peer.next_line()).await.unwrap().unwrap();
        assert_eq!(eof, None);
        assert_eq!(registry.len().await, 0);
    }

    #[tokio::test]
    async fn test_unknown_command_keeps_connection_open() {
        // テスト項目: 未知のコマンドは無視され、その後の JOIN は受理される
        // given (前提条件):
        let registry = Arc::new(Registry::new());
        let mut conn = spawn_conn(&registry, 50001).await;

        // when (操作):
        conn.send_line("HELLO").await;
        conn.send_line("JOIN").await;

        // then (期待する結果):
        assert_eq!(conn.read_line().await, "ACK\r");
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_quit_sentinel_tears_down_connection() {
        // テスト項目: 終了シグナルの配送で接続が終了し登録が解除される
        // given (前提条件):
        let registry = Arc::new(Registry::new());
        let mut conn = spawn_conn(&registry, 50001).await;
        conn.send_line("JOIN").await;
        assert_eq!(conn.read_line().await, "ACK\r");

        // when (操作):
        conn.sender.send(Delivery::Quit).await.unwrap();

        // then (期待する結果):
        timeout(WAIT, conn.task).await.unwrap().unwrap();
        assert_eq!(registry.len().await, 0);
    }

    #[tokio::test]
    async fn test_peer_disconnect_deregisters() {
        // テスト項目: ピアが QUIT なしに切断すると登録だけが解除される
        // given (前提条件):
        let registry = Arc::new(Registry::new());
        let mut conn = spawn_conn(&registry, 50001).await;
        conn.send_line("JOIN").await;
        assert_eq!(conn.read_line().await, "ACK\r");

        // when (操作):
        drop(conn.peer_writer);
        drop(conn.peer);

        // then (期待する結果):
        timeout(WAIT, conn.task).await.unwrap().unwrap();
        assert_eq!(registry.len().await, 0);
    }

    #[tokio::test]
    async fn test_chat_before_join_is_not_relayed() {
        // テスト項目: 未参加の接続はチャット配送を受け取っても書き出さない
        // given (前提条件):
        let registry = Arc::new(Registry::new());
        let mut accepted = spawn_conn(&registry, 50001).await;
        let message = RelayMessage::new("127.0.0.1:50002".parse().unwrap(), "hi".to_string());

        // when (操作): 未参加のまま配送を受け、その後 JOIN する
        accepted.sender.send(Delivery::Chat(message)).await.unwrap();
        // 配送が処理されてから JOIN を送る
        tokio::time::sleep(Duration::from_millis(100)).await;
        accepted.send_line("JOIN").await;

        // then (期待する結果): 最初に届く行は破棄されたチャットではなく ACK
        assert_eq!(accepted.read_line().await, "ACK\r");
    }
}
