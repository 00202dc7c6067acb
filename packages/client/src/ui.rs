//! Terminal utilities for the client.

use std::{
    io::Write,
    sync::{Arc, Mutex},
};

use rustyline::{DefaultEditor, error::ReadlineError};
use tokio::sync::mpsc;

/// Redisplay the prompt after printing a frame
pub fn redisplay_prompt(username: &str) {
    print!("{}> ", username);
    std::io::stdout().flush().ok();
}

/// Ring the terminal bell
pub fn ring_bell() {
    print!("\x07");
    std::io::stdout().flush().ok();
}

/// Lines typed at the terminal
///
/// rustyline blocks, so it runs on its own thread and forwards every line
/// through a channel. The prompt is shared so the session can switch between
/// the credential prompts and the chat prompt.
pub struct LineInput {
    rx: mpsc::UnboundedReceiver<String>,
    prompt: Arc<Mutex<String>>,
}

impl LineInput {
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let prompt = Arc::new(Mutex::new(String::from("> ")));
        let thread_prompt = prompt.clone();

        std::thread::spawn(move || {
            let mut rl = match DefaultEditor::new() {
                Ok(rl) => rl,
                Err(e) => {
                    eprintln!("Failed to initialize readline: {}", e);
                    return;
                }
            };

            loop {
                let prompt = match thread_prompt.lock() {
                    Ok(prompt) => prompt.clone(),
                    Err(_) => break,
                };
                match rl.readline(&prompt) {
                    Ok(line) => {
                        let line = line.trim().to_string();
                        if line.is_empty() {
                            continue;
                        }
                        rl.add_history_entry(line.as_str()).ok();
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(ReadlineError::Interrupted) => {
                        tracing::info!("Interrupted");
                        break;
                    }
                    Err(ReadlineError::Eof) => {
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

        Self { rx, prompt }
    }

    pub fn set_prompt(&self, prompt: impl Into<String>) {
        if let Ok(mut current) = self.prompt.lock() {
            *current = prompt.into();
        }
    }

    /// Next non-empty line, or `None` after Ctrl+C / Ctrl+D
    pub async fn next_line(&mut self) -> Option<String> {
        self.rx.recv().await
    }
}
