//! Client session: join handshake, dual-wait relay loop, quit handshake.

use std::time::Duration;

use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;
use tokio::time::timeout;

use rouka_shared::protocol::{
    JOIN_COMMAND, LINE_BUFFER_SIZE, QUIT_COMMAND, is_ack, terminated, trim_line,
};
use rouka_shared::time::now_unix_millis;

use crate::error::ClientError;
use crate::formatter::MessageFormatter;
use crate::ui::redisplay_prompt;

const QUIT_ACK_TIMEOUT_SECS: u64 = 5;

/// Run one client session against the relay server.
///
/// Connects, joins the conversation with the `JOIN`/`ACK` handshake, then
/// relays between the terminal and the socket until the user leaves
/// (Ctrl+C or Ctrl+D), which triggers the graceful `QUIT`/`ACK` handshake.
pub async fn run_client_session(host: &str, port: u16) -> Result<(), ClientError> {
    let addr = format!("{}:{}", host, port);
    tracing::info!("Connecting to server {} ...", addr);
    let stream = TcpStream::connect(&addr)
        .await
        .map_err(|source| ClientError::Connect {
            addr: addr.clone(),
            source,
        })?;
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::with_capacity(LINE_BUFFER_SIZE, reader).lines();

    // Join handshake: nothing else may happen before the server's ACK.
    writer.write_all(terminated(JOIN_COMMAND).as_bytes()).await?;
    match lines.next_line().await? {
        Some(line) if is_ack(&line) => {}
        Some(line) => return Err(ClientError::JoinRejected(trim_line(&line).to_string())),
        None => return Err(ClientError::ConnectionClosed),
    }

    tracing::info!("Joined the conversation on {}", addr);
    print!(
        "{}",
        MessageFormatter::format_notice(
            "Connected. Type messages and press Enter to send. Ctrl+C or Ctrl+D to leave."
        )
    );

    // rustyline is synchronous; run it on its own thread and bridge the
    // input over a channel. The thread ending (Ctrl+C, Ctrl+D, stdin EOF)
    // closes the channel, which is the signal to leave.
    let (input_tx, mut input_rx) = mpsc::unbounded_channel::<String>();
    let _readline_handle = std::thread::spawn(move || {
        let mut rl = match DefaultEditor::new() {
            Ok(rl) => rl,
            Err(e) => {
                eprintln!("Failed to initialize readline: {}", e);
                return;
            }
        };

        loop {
            match rl.readline("> ") {
                Ok(line) => {
                    let line = line.trim();
                    if !line.is_empty() {
                        rl.add_history_entry(line).ok();
                        if input_tx.send(line.to_string()).is_err() {
                            // Channel closed, exit thread
                            break;
                        }
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    // Ctrl+C
                    tracing::info!("Interrupted");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    // Ctrl+D
                    tracing::info!("EOF");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {}", err);
                    break;
                }
            }
        }
    });

    loop {
        tokio::select! {
            maybe_line = lines.next_line() => {
                match maybe_line {
                    Ok(Some(line)) => {
                        let formatted =
                            MessageFormatter::format_incoming(trim_line(&line), now_unix_millis());
                        print!("{}", formatted);
                        redisplay_prompt();
                    }
                    Ok(None) => return Err(ClientError::ConnectionClosed),
                    Err(e) => return Err(ClientError::Io(e)),
                }
            }
            maybe_input = input_rx.recv() => {
                match maybe_input {
                    Some(line) => {
                        writer.write_all(terminated(&line).as_bytes()).await?;
                    }
                    None => {
                        // Input ended; leave gracefully.
                        quit_handshake(&mut lines, &mut writer).await?;
                        break;
                    }
                }
            }
        }
    }

    tracing::info!("Left the conversation");
    Ok(())
}

/// Send `QUIT` and wait for the server's `ACK`, discarding relayed lines
/// that were already in flight ahead of it.
async fn quit_handshake(
    lines: &mut Lines<BufReader<OwnedReadHalf>>,
    writer: &mut OwnedWriteHalf,
) -> Result<(), ClientError> {
    writer.write_all(terminated(QUIT_COMMAND).as_bytes()).await?;

    let wait_for_ack = async {
        loop {
            match lines.next_line().await? {
                Some(line) if is_ack(&line) => return Ok(()),
                Some(_) => continue,
                None => return Err(ClientError::ConnectionClosed),
            }
        }
    };

    timeout(Duration::from_secs(QUIT_ACK_TIMEOUT_SECS), wait_for_ack)
        .await
        .map_err(|_| ClientError::AckTimeout)?
}
