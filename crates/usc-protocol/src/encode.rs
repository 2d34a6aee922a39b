//! Building outgoing frames.
//!
//! ```rust,ignore
//! use usc_protocol::{CommandBuilder, ResponseBuilder};
//!
//! let frame = CommandBuilder::new(&[1])
//!     .component(10)
//!     .action("b")
//!     .param("t", "10")
//!     .with_checksum()
//!     .encode()?;
//!
//! let mut response = ResponseBuilder::new();
//! response.push_str("temp=21.5");
//! let reply = response.finish();
//! ```

use bytes::{BufMut, Bytes, BytesMut};

use crate::ascii::{
    self, ACTION_MARK, CHECKSUM_MARK, COMMAND_START, COMPONENT_MARK, ESCAPE, FRAME_END,
    PAIR_MARK, PARAMS_MARK, RESPONSE_START, VALUE_MARK,
};
use crate::{EncodeError, INVALID_COMPONENT};

/// XOR of all bytes, as carried in the checksum field.
pub fn checksum(data: &[u8]) -> u8 {
    data.iter().fold(0, |acc, &b| acc ^ b)
}

/// Append `data`, escaping bytes that have a backslash form.
fn put_escaped(buf: &mut BytesMut, data: &[u8]) {
    for &byte in data {
        match ascii::escape(byte) {
            Some(letter) => {
                buf.put_u8(ESCAPE);
                buf.put_u8(letter);
            }
            None => buf.put_u8(byte),
        }
    }
}

/// Builds a response frame: `@`, content, `$`.
#[derive(Debug, Clone)]
pub struct ResponseBuilder {
    buf: BytesMut,
}

impl Default for ResponseBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseBuilder {
    /// Start a response. The `@` marker is written immediately.
    pub fn new() -> Self {
        let mut buf = BytesMut::with_capacity(crate::DEFAULT_CAPACITY);
        buf.put_u8(RESPONSE_START);
        ResponseBuilder { buf }
    }

    /// Append text, escaping the frame terminator and other special bytes.
    pub fn push_str(&mut self, text: &str) -> &mut Self {
        self.push_bytes(text.as_bytes())
    }

    /// Append bytes, escaping the frame terminator and other special bytes.
    pub fn push_bytes(&mut self, data: &[u8]) -> &mut Self {
        put_escaped(&mut self.buf, data);
        self
    }

    /// Append bytes verbatim. The caller is responsible for escaping.
    pub fn push_raw(&mut self, data: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(data);
        self
    }

    /// XOR checksum of everything written so far, `@` included.
    pub fn checksum(&self) -> u8 {
        checksum(&self.buf)
    }

    /// Bytes written so far.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Terminate the frame with `$`.
    pub fn finish(mut self) -> Bytes {
        self.buf.put_u8(FRAME_END);
        self.buf.freeze()
    }
}

/// Builds a command frame.
#[derive(Debug, Clone, Default)]
pub struct CommandBuilder {
    octets: Vec<u8>,
    component: Option<u16>,
    action: Option<String>,
    params: Vec<(String, Option<Vec<u8>>)>,
    checksum: bool,
}

impl CommandBuilder {
    /// Start a command for the device with the given address octets.
    pub fn new(octets: &[u8]) -> Self {
        CommandBuilder {
            octets: octets.to_vec(),
            ..Default::default()
        }
    }

    /// Address a component of the device.
    pub fn component(mut self, component: u16) -> Self {
        self.component = Some(component);
        self
    }

    /// Set the action path, e.g. `"w"` or `"led/on"`.
    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    /// Add a `key=value` parameter. The value is escaped as needed.
    pub fn param(mut self, key: impl Into<String>, value: impl AsRef<[u8]>) -> Self {
        self.params.push((key.into(), Some(value.as_ref().to_vec())));
        self
    }

    /// Add a flag parameter without a value.
    pub fn flag(mut self, key: impl Into<String>) -> Self {
        self.params.push((key.into(), None));
        self
    }

    /// Append a checksum field.
    pub fn with_checksum(mut self) -> Self {
        self.checksum = true;
        self
    }

    /// Produce the wire bytes.
    pub fn encode(&self) -> Result<Bytes, EncodeError> {
        self.validate()?;

        let mut buf = BytesMut::with_capacity(crate::DEFAULT_CAPACITY);
        buf.put_u8(COMMAND_START);
        for (i, octet) in self.octets.iter().enumerate() {
            if i > 0 {
                buf.put_u8(b'.');
            }
            buf.extend_from_slice(octet.to_string().as_bytes());
        }
        if let Some(component) = self.component {
            buf.put_u8(COMPONENT_MARK);
            buf.extend_from_slice(component.to_string().as_bytes());
        }
        if let Some(action) = &self.action {
            buf.put_u8(ACTION_MARK);
            buf.extend_from_slice(action.as_bytes());
        }
        for (i, (key, value)) in self.params.iter().enumerate() {
            buf.put_u8(if i == 0 { PARAMS_MARK } else { PAIR_MARK });
            buf.extend_from_slice(key.as_bytes());
            if let Some(value) = value {
                buf.put_u8(VALUE_MARK);
                put_escaped(&mut buf, value);
            }
        }
        if self.checksum {
            let sum = checksum(&buf);
            buf.put_u8(CHECKSUM_MARK);
            buf.extend_from_slice(sum.to_string().as_bytes());
        }
        buf.put_u8(FRAME_END);
        Ok(buf.freeze())
    }

    fn validate(&self) -> Result<(), EncodeError> {
        if self.octets.is_empty() || self.octets.len() > 4 {
            return Err(EncodeError::OctetCount(self.octets.len()));
        }
        if self.octets == [0xFF; 4] {
            return Err(EncodeError::ReservedDevice);
        }
        if self.component == Some(INVALID_COMPONENT) {
            return Err(EncodeError::ReservedComponent(INVALID_COMPONENT));
        }
        if let Some(action) = &self.action {
            let bytes = action.as_bytes();
            let valid = bytes.first().is_some_and(|&b| b != ACTION_MARK)
                && !action.contains("//")
                && bytes.iter().all(|&b| ascii::is_key_byte(b) || b == ACTION_MARK);
            if !valid {
                return Err(EncodeError::InvalidAction(action.clone()));
            }
        }
        if !self.params.is_empty() && self.action.is_none() {
            return Err(EncodeError::ParamsWithoutAction);
        }
        for (key, value) in &self.params {
            if key.is_empty() || !key.bytes().all(ascii::is_key_byte) {
                return Err(EncodeError::InvalidKey(key.clone()));
            }
            if value.as_ref().is_some_and(|v| v.iter().any(|&b| ascii::is_sentinel(b))) {
                return Err(EncodeError::InvalidValue(key.clone()));
            }
        }
        Ok(())
    }
}
