//! Decoder states and per-byte status.

/// Position of the decoder within a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum State {
    /// Idle, waiting for `!` or `@`.
    #[default]
    Begin,
    /// Inside a response body, waiting for an unescaped `$`.
    End,
    /// Reading device address octets.
    Device,
    /// Reading the component id.
    Component,
    /// Reading the action path.
    Action,
    /// Reading a parameter key.
    ParamKey,
    /// Reading a parameter value.
    ParamValue,
    /// Reading the transmitted checksum.
    Checksum,
    /// The last frame was rejected. The next byte clears the decoder
    /// and is then handled as in [`State::Begin`].
    Error,
}

impl State {
    /// Whether the decoder is between frames.
    pub fn is_idle(self) -> bool {
        matches!(self, State::Begin | State::Error)
    }
}

/// Outcome of feeding one byte that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// More bytes are needed.
    Next,
    /// A frame was completed and validated.
    Complete,
}

impl Status {
    /// Whether a frame was completed.
    pub fn is_complete(self) -> bool {
        self == Status::Complete
    }
}
