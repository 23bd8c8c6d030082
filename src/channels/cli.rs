//! CLI channel — stdin/stdout REPL for local testing.
//!
//! Commands stand in for the richer transport payloads: `/start`,
//! `/back <tag>`, `/phone <number>`, `/loc <lat> <lon>`; any other line is a
//! plain text reply.

use async_trait::async_trait;
use futures::stream;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::channels::{Channel, EventStream, IncomingEvent};
use crate::error::ChannelError;
use crate::flow::{ConversationId, Effect, Event, StateTag};

/// A simple CLI channel that reads from stdin and writes to stdout.
pub struct CliChannel;

impl CliChannel {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CliChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// Map one input line to an event. `None` means the line was not
/// understood (e.g. a malformed command).
fn parse_line(line: &str) -> Option<Event> {
    if line == "/start" {
        return Some(Event::StartRequested);
    }
    if let Some(tag) = line.strip_prefix("/back ") {
        let target = StateTag::from_nav_tag(tag.trim())?;
        return Some(Event::BackRequested { target });
    }
    if let Some(phone) = line.strip_prefix("/phone ") {
        return Some(Event::contact(phone.trim()));
    }
    if let Some(coords) = line.strip_prefix("/loc ") {
        let mut parts = coords.split_whitespace();
        let lat = parts.next()?.parse().ok()?;
        let lon = parts.next()?.parse().ok()?;
        return Some(Event::LocationShared { lat, lon });
    }
    Some(Event::text(line))
}

#[async_trait]
impl Channel for CliChannel {
    fn name(&self) -> &str {
        "cli"
    }

    async fn start(&self) -> Result<EventStream, ChannelError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();

        tokio::spawn(async move {
            let stdin = tokio::io::stdin();
            let reader = BufReader::new(stdin);
            let mut lines = reader.lines();

            eprint!("> ");

            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let line = line.trim().to_string();
                        if line.is_empty() {
                            eprint!("> ");
                            continue;
                        }
                        let Some(event) = parse_line(&line) else {
                            eprintln!("Unrecognized command: {line}");
                            eprint!("> ");
                            continue;
                        };
                        let incoming =
                            IncomingEvent::new("cli", ConversationId::new("local"), event);
                        if tx.send(incoming).is_err() {
                            break;
                        }
                    }
                    Ok(None) => break, // EOF
                    Err(e) => {
                        tracing::error!("Error reading stdin: {}", e);
                        break;
                    }
                }
            }
        });

        let stream = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|msg| (msg, rx))
        });

        Ok(Box::pin(stream))
    }

    async fn deliver(
        &self,
        _incoming: &IncomingEvent,
        effect: &Effect,
    ) -> Result<(), ChannelError> {
        match effect {
            Effect::Prompt { text, back } => {
                println!("\n{text}");
                if let Some(target) = back {
                    println!("[back: /back {}]", target.nav_tag());
                }
                println!();
            }
            Effect::Summary { text } => println!("\n{text}\n"),
        }
        eprint!("> ");
        Ok(())
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), ChannelError> {
        Ok(())
    }
}
