//! Owned copies of decoded frames.
//!
//! [`Command`] hands out views that die with the next frame. A [`Message`]
//! outlives the decoder, so it can be queued or sent to another thread.

use crate::Command;

/// One parameter of a decoded command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    /// Parameter key.
    pub key: String,
    /// Unescaped value, `None` for flag-style parameters.
    pub value: Option<Vec<u8>>,
}

impl Param {
    /// Value as text, if present and valid UTF-8.
    pub fn value_str(&self) -> Option<&str> {
        self.value.as_deref().and_then(|v| std::str::from_utf8(v).ok())
    }
}

/// A decoded command frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFrame {
    /// Packed device address.
    pub device: u32,
    /// Component id, `0` when absent.
    pub component: u16,
    /// Action path.
    pub action: Option<String>,
    /// Parameters in wire order.
    pub params: Vec<Param>,
    /// Checksum carried by the frame, if any.
    pub checksum: Option<u8>,
    /// Whether the frame was addressed to the decoding endpoint.
    pub addressed: bool,
}

impl CommandFrame {
    /// Whether the frame is addressed to every endpoint.
    pub fn is_broadcast(&self) -> bool {
        self.device == crate::BROADCAST
    }

    /// First parameter with the given key.
    pub fn param(&self, key: &str) -> Option<&Param> {
        self.params.iter().find(|p| p.key == key)
    }
}

/// A decoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// `!...$` frame.
    Command(CommandFrame),
    /// `@...$` frame with its unescaped body.
    Response(Vec<u8>),
}

impl Message {
    /// Copy the frame just completed by `command`.
    ///
    /// Returns `None` unless the decoder holds a completed frame.
    pub fn from_command(command: &Command) -> Option<Message> {
        if command.is_response() {
            return command.body().map(|body| Message::Response(body.to_vec()));
        }
        if !command.is_complete() {
            return None;
        }
        let params = command
            .params()
            .map(|kv| Param {
                key: kv.key().to_string(),
                value: kv.value().map(<[u8]>::to_vec),
            })
            .collect();
        Some(Message::Command(CommandFrame {
            device: command.device(),
            component: command.component(),
            action: command.action().map(str::to_string),
            params,
            checksum: command.has_checksum().then(|| command.checksum()),
            addressed: command.is_addressed(),
        }))
    }
}
