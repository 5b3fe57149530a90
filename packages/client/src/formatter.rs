//! Message formatting utilities for client display.

use rouka_shared::time::timestamp_to_rfc3339;

/// Message formatter for client display
pub struct MessageFormatter;

impl MessageFormatter {
    /// Format a relayed chat line for display.
    ///
    /// # Arguments
    ///
    /// * `line` - The relayed line as received, `<sender>: <payload>`
    /// * `received_at` - Unix timestamp when the line arrived (milliseconds)
    ///
    /// # Returns
    ///
    /// A formatted string with a local receive-time prefix
    pub fn format_incoming(line: &str, received_at: i64) -> String {
        format!("\n[{}] {}\n", timestamp_to_rfc3339(received_at), line)
    }

    /// Format a session notice (connection status lines).
    pub fn format_notice(text: &str) -> String {
        format!("\n* {}\n", text)
    }
}
