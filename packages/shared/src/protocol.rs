//! Wire protocol contract shared by the server and the client.
//!
//! The protocol is line-oriented ASCII over TCP: every command, reply and
//! relayed message is a single `\r\n`-terminated line.

/// Request to join the conversation.
pub const JOIN_COMMAND: &str = "JOIN";

/// Request to leave the conversation.
pub const QUIT_COMMAND: &str = "QUIT";

/// Positive reply to `JOIN` and `QUIT`.
pub const ACK_REPLY: &str = "ACK";

/// Terminator appended to every protocol line.
pub const LINE_TERMINATOR: &str = "\r\n";

/// Size of the read buffer each connection pulls socket data through.
/// Lines longer than this are reassembled across reads.
pub const LINE_BUFFER_SIZE: usize = 512;

/// Port the server listens on unless configured otherwise.
pub const DEFAULT_PORT: u16 = 9900;

/// Append the protocol line terminator to a command or payload.
pub fn terminated(line: &str) -> String {
    format!("{}{}", line, LINE_TERMINATOR)
}

/// Strip any trailing `\r` / `\n` from a received line.
///
/// The line reader already removes the `\n`; the `\r` of the `\r\n`
/// terminator is still attached and must not reach command matching or
/// broadcast payloads.
pub fn trim_line(line: &str) -> &str {
    line.trim_end_matches(['\r', '\n'])
}

/// Whether a received line is the server's positive acknowledgement.
pub fn is_ack(line: &str) -> bool {
    trim_line(line) == ACK_REPLY
}

/// Format a relayed chat line as it appears on the wire: `<sender>: <payload>`.
pub fn relay_line(sender: &str, payload: &str) -> String {
    format!("{}: {}", sender, payload)
}
