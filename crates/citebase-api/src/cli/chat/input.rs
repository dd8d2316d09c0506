//! Async readline input handling for the chat loop.
//!
//! Wraps `rustyline_async::Readline` so background tasks can print through
//! the returned `SharedWriter` without clobbering the prompt.

use rustyline_async::{Readline, ReadlineError, ReadlineEvent, SharedWriter};

/// Events produced by the input handler.
#[derive(Debug)]
pub enum InputEvent {
    /// User submitted a line (trimmed, possibly empty).
    Message(String),
    /// End of file (Ctrl+D).
    Eof,
    /// Interrupt signal (Ctrl+C).
    Interrupted,
}

pub struct ChatInput {
    rl: Readline,
}

impl ChatInput {
    /// Create a new chat input handler with the given initial prompt.
    pub fn new(prompt: String) -> Result<(Self, SharedWriter), ReadlineError> {
        let (rl, stdout) = Readline::new(prompt)?;
        Ok((Self { rl }, stdout))
    }

    pub fn update_prompt(&mut self, prompt: &str) {
        let _ = self.rl.update_prompt(prompt);
    }

    /// Read a line of input. Read errors end the session like Ctrl+D.
    pub async fn read_line(&mut self) -> InputEvent {
        match self.rl.readline().await {
            Ok(ReadlineEvent::Line(line)) => InputEvent::Message(line.trim().to_string()),
            Ok(ReadlineEvent::Eof) => InputEvent::Eof,
            Ok(ReadlineEvent::Interrupted) => InputEvent::Interrupted,
            Err(_) => InputEvent::Eof,
        }
    }

    /// Flush pending output and restore the terminal.
    pub fn close(mut self) {
        let _ = self.rl.flush();
    }
}
