//! Decoder configuration.

use crate::{BROADCAST, INVALID_DEVICE};

/// Default working buffer size in bytes.
pub const DEFAULT_CAPACITY: usize = 128;

/// Default address a decoder answers to.
pub const DEFAULT_ADDRESS: u32 = 1;

/// Configuration for one [`Command`](crate::Command) decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CommandConfig {
    /// Packed device address this endpoint answers to, besides broadcast.
    pub address: u32,
    /// Working buffer capacity. A frame longer than this is rejected.
    pub capacity: usize,
}

impl Default for CommandConfig {
    fn default() -> Self {
        CommandConfig {
            address: DEFAULT_ADDRESS,
            capacity: DEFAULT_CAPACITY,
        }
    }
}

impl CommandConfig {
    /// Create a config for the given address with the default capacity.
    pub fn with_address(address: u32) -> Self {
        CommandConfig {
            address,
            ..Default::default()
        }
    }

    /// Set the working buffer capacity.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Whether a frame for `device` is meant for this endpoint.
    pub fn accepts(&self, device: u32) -> bool {
        device != INVALID_DEVICE && (device == BROADCAST || device == self.address)
    }
}
