//! Error types for the USC protocol.

use thiserror::Error;

use crate::State;

/// Wire-level failure classes reported for a rejected frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorKind {
    /// Checksum mismatch or bad escape sequence.
    Invalid,
    /// Byte not allowed in the current state.
    Unexpected,
    /// Buffer capacity or numeric field range exceeded.
    Overflow,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Invalid => write!(f, "invalid"),
            ErrorKind::Unexpected => write!(f, "unexpected"),
            ErrorKind::Overflow => write!(f, "overflow"),
        }
    }
}

/// Numeric fields of a command frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// One octet of the device address.
    Octet,
    /// The packed device address.
    Device,
    /// The component id.
    Component,
    /// The transmitted checksum.
    Checksum,
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Field::Octet => write!(f, "device octet"),
            Field::Device => write!(f, "device address"),
            Field::Component => write!(f, "component id"),
            Field::Checksum => write!(f, "checksum"),
        }
    }
}

/// Errors that abort the frame currently being decoded.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// The transmitted checksum does not match the accumulated one.
    #[error("checksum mismatch: computed {expected}, received {actual}")]
    ChecksumMismatch {
        /// Checksum accumulated over the received bytes.
        expected: u8,
        /// Checksum carried by the frame.
        actual: u8,
    },

    /// A backslash was followed by a byte outside the escape table.
    #[error("invalid escape sequence: 0x{0:02X}")]
    InvalidEscape(u8),

    /// Byte not allowed in the current state.
    #[error("unexpected byte 0x{byte:02X} in {state:?} state")]
    Unexpected {
        /// State the decoder was in.
        state: State,
        /// Offending byte.
        byte: u8,
    },

    /// The frame does not fit in the working buffer.
    #[error("buffer overflow: max {capacity} bytes")]
    BufferOverflow {
        /// Buffer capacity in bytes.
        capacity: usize,
    },

    /// A numeric field is outside its allowed range.
    #[error("{0} out of range")]
    OutOfRange(Field),
}

impl ParseError {
    /// Wire-level class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ParseError::ChecksumMismatch { .. } | ParseError::InvalidEscape(_) => ErrorKind::Invalid,
            ParseError::Unexpected { .. } => ErrorKind::Unexpected,
            ParseError::BufferOverflow { .. } | ParseError::OutOfRange(_) => ErrorKind::Overflow,
        }
    }

    pub(crate) fn unexpected(state: State, byte: u8) -> Self {
        ParseError::Unexpected { state, byte }
    }
}

/// Errors raised while building outgoing frames.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// Device addresses have one to four octets.
    #[error("device address must have 1 to 4 octets, got {0}")]
    OctetCount(usize),

    /// `255.255.255.255` packs to the reserved invalid device id.
    #[error("device address 255.255.255.255 is reserved")]
    ReservedDevice,

    /// Component id collides with the reserved invalid id.
    #[error("component id {0} is reserved")]
    ReservedComponent(u16),

    /// Action text contains a byte outside the action alphabet.
    #[error("invalid action: {0:?}")]
    InvalidAction(String),

    /// Parameters need an action to follow; `?` cannot come straight after
    /// the device or component.
    #[error("parameters require an action")]
    ParamsWithoutAction,

    /// Parameter key is empty or contains a byte outside the key alphabet.
    #[error("invalid parameter key: {0:?}")]
    InvalidKey(String),

    /// Parameter value contains a byte reserved for the decoder's sentinels.
    #[error("value of parameter {0:?} contains a reserved control byte")]
    InvalidValue(String),
}

/// Result type alias for decoding.
pub type ParseResult<T> = Result<T, ParseError>;
