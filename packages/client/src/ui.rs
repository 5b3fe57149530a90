//! Terminal prompt helpers.

use std::io::{self, Write};

/// Redraw the input prompt after printing an incoming message over it.
pub fn redisplay_prompt() {
    print!("> ");
    let _ = io::stdout().flush();
}
