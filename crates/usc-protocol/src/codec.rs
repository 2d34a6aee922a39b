//! Push-style codec on top of [`Command`].
//!
//! Bytes arrive in arbitrary chunks from a serial port or socket. The codec
//! feeds them through one decoder and queues every completed frame (or
//! failure) as an owned value, so results can be handled away from the
//! read loop.

use std::collections::VecDeque;

use log::trace;

use crate::{Command, CommandConfig, Message, ParseError, Status};

/// A decoded frame or the reason one was dropped.
pub type Decoded = Result<Message, ParseError>;

/// A codec for reading USC frames from a byte stream.
#[derive(Debug)]
pub struct MessageCodec {
    command: Command,
    /// Results not yet taken by the caller.
    decoded: VecDeque<Decoded>,
    /// Bytes fed since construction.
    received: u64,
}

impl Default for MessageCodec {
    fn default() -> Self {
        Self::new(CommandConfig::default())
    }
}

impl MessageCodec {
    /// Create a codec with its own decoder.
    pub fn new(config: CommandConfig) -> Self {
        MessageCodec {
            command: Command::new(config),
            decoded: VecDeque::new(),
            received: 0,
        }
    }

    /// Add received data.
    pub fn push(&mut self, data: &[u8]) {
        for &byte in data {
            self.received += 1;
            match self.command.process(byte) {
                Ok(Status::Next) => {}
                Ok(Status::Complete) => {
                    if let Some(message) = Message::from_command(&self.command) {
                        self.decoded.push_back(Ok(message));
                    }
                }
                Err(err) => {
                    trace!("dropped frame at byte {}: {}", self.received, err);
                    self.decoded.push_back(Err(err));
                }
            }
        }
    }

    /// Take the oldest decoded frame or error.
    ///
    /// Returns `None` if more data is needed.
    pub fn decode(&mut self) -> Option<Decoded> {
        self.decoded.pop_front()
    }

    /// Number of results waiting to be taken.
    pub fn pending(&self) -> usize {
        self.decoded.len()
    }

    /// Bytes fed since construction.
    pub fn received(&self) -> u64 {
        self.received
    }

    /// The underlying decoder, e.g. to inspect a partial frame.
    pub fn command(&self) -> &Command {
        &self.command
    }

    /// Drop pending results and any partial frame.
    pub fn clear(&mut self) {
        self.decoded.clear();
        self.command.clear();
    }
}
