//! Per-link frame decoder.
//!
//! A [`Command`] consumes one byte at a time and never looks back. Every
//! captured byte is stored in a fixed-capacity buffer; the buffer is also
//! where decoded fields live, so accessors hand out borrowed slices.
//!
//! ```text
//! !1.2:10/set?mode=fast&verbose|123$
//! ^ ^    ^   ^                ^   ^
//! | |    |   |                |   terminator
//! | |    |   |                checksum (XOR of `!` .. `e`)
//! | |    |   parameters
//! | |    action
//! | component
//! device octets
//! ```

use std::fmt;

use bytes::{BufMut, BytesMut};
use log::{debug, trace};

use crate::ascii::{
    self, ACTION_MARK, CHECKSUM_MARK, COMMAND_START, COMPONENT_MARK, ESCAPE, FRAME_END,
    PAIR_MARK, PARAMS_MARK, RESPONSE_START, SENTINEL_END, SENTINEL_PAIR, SENTINEL_VALUE,
    VALUE_MARK,
};
use crate::{CommandConfig, CommandHandler, Field, ParseError, ParseResult, Params, State, Status};

/// Device id addressed by every endpoint.
pub const BROADCAST: u32 = 0;
/// Device id reported while no address has been decoded.
pub const INVALID_DEVICE: u32 = u32::MAX;
/// Reserved component id, never produced by decoding.
pub const INVALID_COMPONENT: u16 = u16::MAX;

const MAX_OCTETS: u8 = 4;
const MAX_OCTET_DIGITS: usize = 3;
const MAX_COMPONENT_DIGITS: usize = 5;
const MAX_CHECKSUM_DIGITS: usize = 3;

/// Next state and status produced by one transition.
type Transition = (State, Status);

/// Byte-at-a-time decoder for one link.
pub struct Command {
    config: CommandConfig,
    state: State,
    device: u32,
    component: u16,
    checksum: u8,
    has_checksum: bool,
    buffer: BytesMut,
    /// Whether bytes are being recorded into `buffer`.
    capture: bool,
    /// Start of the numeric field or parameter key being read.
    field_start: usize,
    octets: u8,
    prev: u8,
    escape_pending: bool,
    action: Option<(usize, usize)>,
    params_start: Option<usize>,
    params_end: Option<usize>,
    param_count: usize,
    body_end: Option<usize>,
    /// Set by the byte that completed the frame.
    complete: bool,
    handler: Option<Box<dyn CommandHandler + Send>>,
}

impl Default for Command {
    fn default() -> Self {
        Self::new(CommandConfig::default())
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("state", &self.state)
            .field("device", &self.device)
            .field("component", &self.component)
            .field("action", &self.action())
            .field("params", &self.param_count)
            .field("checksum", &self.checksum)
            .field("has_checksum", &self.has_checksum)
            .field("buffer", &String::from_utf8_lossy(&self.buffer))
            .field("has_handler", &self.handler.is_some())
            .finish()
    }
}

impl Command {
    /// Create a decoder. The working buffer is allocated once, here.
    pub fn new(config: CommandConfig) -> Self {
        Command {
            buffer: BytesMut::with_capacity(config.capacity),
            config,
            state: State::Begin,
            device: INVALID_DEVICE,
            component: 0,
            checksum: 0,
            has_checksum: false,
            capture: false,
            field_start: 0,
            octets: 0,
            prev: 0,
            escape_pending: false,
            action: None,
            params_start: None,
            params_end: None,
            param_count: 0,
            body_end: None,
            complete: false,
            handler: None,
        }
    }

    /// Create a decoder that reports to `handler`.
    pub fn with_handler(config: CommandConfig, handler: impl CommandHandler + Send + 'static) -> Self {
        let mut command = Self::new(config);
        command.set_handler(handler);
        command
    }

    /// Register the callbacks, replacing any previous handler.
    pub fn set_handler(&mut self, handler: impl CommandHandler + Send + 'static) {
        self.handler = Some(Box::new(handler));
    }

    /// Remove the registered handler.
    pub fn clear_handler(&mut self) {
        self.handler = None;
    }

    /// Reset to the idle state, discarding any partial frame.
    ///
    /// Configuration and handler are kept.
    pub fn clear(&mut self) {
        self.state = State::Begin;
        self.device = INVALID_DEVICE;
        self.component = 0;
        self.checksum = 0;
        self.has_checksum = false;
        self.buffer.clear();
        self.capture = false;
        self.field_start = 0;
        self.octets = 0;
        self.prev = 0;
        self.escape_pending = false;
        self.action = None;
        self.params_start = None;
        self.params_end = None;
        self.param_count = 0;
        self.body_end = None;
        self.complete = false;
    }

    /// Feed one byte.
    ///
    /// Returns [`Status::Complete`] on the byte that finishes a valid frame.
    /// After an error the decoder sits in [`State::Error`]; the next call
    /// clears it before looking at its byte.
    pub fn process(&mut self, byte: u8) -> ParseResult<Status> {
        if self.state == State::Error {
            debug!("clearing rejected frame before byte 0x{:02X}", byte);
            self.clear();
        }

        match self.step(byte) {
            Ok(Status::Complete) => {
                self.capture = false;
                self.complete = true;
                self.on_complete();
                Ok(Status::Complete)
            }
            Ok(Status::Next) => Ok(Status::Next),
            Err(err) => {
                debug!("frame rejected ({}): {}", err.kind(), err);
                self.state = State::Error;
                self.capture = false;
                self.escape_pending = false;
                self.on_failure(&err);
                Err(err)
            }
        }
    }

    /// Feed a slice, stopping at the first completed frame or error.
    ///
    /// Returns the number of bytes consumed together with the status of
    /// the last byte.
    pub fn process_slice(&mut self, data: &[u8]) -> (usize, ParseResult<Status>) {
        let mut last = Ok(Status::Next);
        for (i, &byte) in data.iter().enumerate() {
            last = self.process(byte);
            if !matches!(last, Ok(Status::Next)) {
                return (i + 1, last);
            }
        }
        (data.len(), last)
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Decoder configuration.
    pub fn config(&self) -> &CommandConfig {
        &self.config
    }

    /// Current state.
    pub fn state(&self) -> State {
        self.state
    }

    /// Packed device address, or [`INVALID_DEVICE`] before one is decoded.
    pub fn device(&self) -> u32 {
        self.device
    }

    /// Component id, `0` when the frame has none.
    pub fn component(&self) -> u16 {
        self.component
    }

    /// Whether the current frame was completed and validated.
    ///
    /// Stays set until the next frame starts.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Whether the frame is addressed to every endpoint.
    pub fn is_broadcast(&self) -> bool {
        self.device == BROADCAST
    }

    /// Whether the frame is a response (`@...$`).
    pub fn is_response(&self) -> bool {
        self.buffer.first() == Some(&RESPONSE_START)
    }

    /// Whether the frame is a command addressed to this endpoint or broadcast.
    pub fn is_addressed(&self) -> bool {
        !self.is_response() && self.config.accepts(self.device)
    }

    /// Running XOR checksum of the captured bytes.
    pub fn checksum(&self) -> u8 {
        self.checksum
    }

    /// Whether the frame carried a checksum field.
    pub fn has_checksum(&self) -> bool {
        self.has_checksum
    }

    /// The action path, once its field is closed.
    pub fn action(&self) -> Option<&str> {
        let (start, end) = self.action.filter(|(start, end)| end > start)?;
        std::str::from_utf8(&self.buffer[start..end]).ok()
    }

    /// Whether the frame carries a non-empty action.
    pub fn has_action(&self) -> bool {
        self.action().is_some()
    }

    /// Iterator over the parameters, once the parameter region is closed.
    pub fn params(&self) -> Params<'_> {
        match (self.params_start, self.params_end) {
            (Some(start), Some(end)) => Params::new(&self.buffer[start..end], self.param_count),
            _ => Params::empty(),
        }
    }

    /// Whether the frame carries at least one parameter.
    pub fn has_params(&self) -> bool {
        self.params_end.is_some() && self.param_count > 0
    }

    /// Decoded body of a completed response, escapes resolved.
    pub fn body(&self) -> Option<&[u8]> {
        self.body_end.map(|end| &self.buffer[1..end])
    }

    /// Raw captured bytes. Inside the parameter region, delimiters have
    /// been replaced by sentinel bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    // ------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------

    fn on_complete(&mut self) {
        if self.is_response() {
            trace!("response complete ({} bytes)", self.buffer.len());
            return;
        }
        if !self.is_addressed() {
            trace!(
                "command for device 0x{:08X} ignored by 0x{:08X}",
                self.device,
                self.config.address
            );
            return;
        }
        trace!(
            "command complete: device=0x{:08X} component={} action={:?} params={}",
            self.device,
            self.component,
            self.action(),
            self.param_count
        );
        if let Some(mut handler) = self.handler.take() {
            handler.on_command(self.is_broadcast(), self.component, self.action(), self.params());
            self.handler = Some(handler);
        }
    }

    fn on_failure(&mut self, err: &ParseError) {
        if let Some(mut handler) = self.handler.take() {
            handler.on_error(err, self);
            self.handler = Some(handler);
        }
    }

    // ------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------

    fn step(&mut self, byte: u8) -> ParseResult<Status> {
        if self.capture && self.capture_byte(byte)? {
            return Ok(Status::Next);
        }

        let (next, status) = match self.state {
            State::Begin | State::Error => self.on_begin(byte)?,
            State::End => self.on_body(byte)?,
            State::Device => self.on_device(byte)?,
            State::Component => self.on_component(byte)?,
            State::Action => self.on_action(byte)?,
            State::ParamKey => self.on_param_key(byte)?,
            State::ParamValue => self.on_param_value(byte)?,
            State::Checksum => self.on_checksum(byte)?,
        };
        self.state = next;
        self.prev = byte;
        Ok(status)
    }

    /// Record `byte`. Returns `true` when it completed an escape sequence
    /// and needs no further handling.
    fn capture_byte(&mut self, byte: u8) -> ParseResult<bool> {
        if !matches!(self.state, State::Checksum | State::End) {
            self.checksum ^= byte;
        }

        if self.escape_pending {
            self.escape_pending = false;
            let decoded = match (self.state, ascii::unescape(byte)) {
                (State::ParamValue | State::End, Some(decoded)) => decoded,
                (State::End, None) => return Err(ParseError::unexpected(State::End, byte)),
                _ => return Err(ParseError::InvalidEscape(byte)),
            };
            // The backslash slot takes the decoded byte.
            let last = self.buffer.len() - 1;
            self.buffer[last] = decoded;
            self.prev = byte;
            return Ok(true);
        }

        self.push(byte)?;
        Ok(false)
    }

    fn push(&mut self, byte: u8) -> ParseResult<()> {
        if self.buffer.len() >= self.config.capacity {
            return Err(ParseError::BufferOverflow {
                capacity: self.config.capacity,
            });
        }
        self.buffer.put_u8(byte);
        Ok(())
    }

    /// Offset of the byte just captured.
    fn last(&self) -> usize {
        self.buffer.len() - 1
    }

    /// Digits captured since `field_start`, excluding the byte just captured.
    fn field(&self) -> &[u8] {
        &self.buffer[self.field_start..self.last()]
    }

    fn field_len(&self) -> usize {
        self.buffer.len() - self.field_start
    }

    fn on_begin(&mut self, byte: u8) -> ParseResult<Transition> {
        match byte {
            COMMAND_START => {
                self.clear();
                self.capture = true;
                self.push(byte)?;
                self.checksum = byte;
                self.field_start = self.buffer.len();
                Ok((State::Device, Status::Next))
            }
            RESPONSE_START => {
                self.clear();
                self.capture = true;
                self.push(byte)?;
                Ok((State::End, Status::Next))
            }
            b if ascii::is_whitespace(b) => Ok((State::Begin, Status::Next)),
            _ => Err(ParseError::unexpected(State::Begin, byte)),
        }
    }

    fn on_body(&mut self, byte: u8) -> ParseResult<Transition> {
        match byte {
            ESCAPE => {
                self.escape_pending = true;
                Ok((State::End, Status::Next))
            }
            FRAME_END => {
                self.body_end = Some(self.last());
                Ok((State::Begin, Status::Complete))
            }
            _ => Ok((State::End, Status::Next)),
        }
    }

    fn on_device(&mut self, byte: u8) -> ParseResult<Transition> {
        if byte.is_ascii_digit() {
            if self.field_len() > MAX_OCTET_DIGITS {
                return Err(ParseError::unexpected(State::Device, byte));
            }
            return Ok((State::Device, Status::Next));
        }

        match byte {
            b if ascii::is_octet_separator(b) => {
                self.finish_octet(byte)?;
                self.field_start = self.buffer.len();
                Ok((State::Device, Status::Next))
            }
            COMPONENT_MARK => {
                self.finish_octet(byte)?;
                self.component = 0;
                self.field_start = self.buffer.len();
                Ok((State::Component, Status::Next))
            }
            ACTION_MARK | CHECKSUM_MARK | FRAME_END => {
                self.finish_octet(byte)?;
                Ok(self.leave_address(byte))
            }
            _ => Err(ParseError::unexpected(State::Device, byte)),
        }
    }

    fn finish_octet(&mut self, byte: u8) -> ParseResult<()> {
        self.octets += 1;
        if self.octets > MAX_OCTETS {
            return Err(ParseError::unexpected(State::Device, byte));
        }
        let value = ascii::parse_decimal(self.field())
            .ok_or(ParseError::unexpected(State::Device, byte))?;
        if value > 0xFF {
            return Err(ParseError::OutOfRange(Field::Octet));
        }
        let device = if self.octets == 1 { 0 } else { self.device };
        self.device = (device << 8) | value;
        if self.device == INVALID_DEVICE {
            return Err(ParseError::OutOfRange(Field::Device));
        }
        Ok(())
    }

    fn on_component(&mut self, byte: u8) -> ParseResult<Transition> {
        if byte.is_ascii_digit() {
            if self.field_len() > MAX_COMPONENT_DIGITS {
                return Err(ParseError::unexpected(State::Component, byte));
            }
            return Ok((State::Component, Status::Next));
        }
        if !matches!(byte, ACTION_MARK | CHECKSUM_MARK | FRAME_END) {
            return Err(ParseError::unexpected(State::Component, byte));
        }

        let value = ascii::parse_decimal(self.field())
            .ok_or(ParseError::unexpected(State::Component, byte))?;
        if value >= u32::from(INVALID_COMPONENT) {
            return Err(ParseError::OutOfRange(Field::Component));
        }
        self.component = value as u16;
        Ok(self.leave_address(byte))
    }

    /// Shared exits of the device and component fields: `/`, `|` or `$`.
    fn leave_address(&mut self, byte: u8) -> Transition {
        match byte {
            ACTION_MARK => {
                let start = self.buffer.len();
                self.action = Some((start, start));
                (State::Action, Status::Next)
            }
            CHECKSUM_MARK => {
                self.enter_checksum();
                (State::Checksum, Status::Next)
            }
            _ => (State::Begin, Status::Complete),
        }
    }

    fn on_action(&mut self, byte: u8) -> ParseResult<Transition> {
        if ascii::is_key_byte(byte) || (byte == ACTION_MARK && self.prev != ACTION_MARK) {
            return Ok((State::Action, Status::Next));
        }

        let transition = match byte {
            PARAMS_MARK => (State::ParamKey, Status::Next),
            CHECKSUM_MARK => (State::Checksum, Status::Next),
            FRAME_END => (State::Begin, Status::Complete),
            _ => return Err(ParseError::unexpected(State::Action, byte)),
        };

        let start = self.action.map_or(self.last(), |(start, _)| start);
        if start == self.last() {
            return Err(ParseError::unexpected(State::Action, byte));
        }
        self.action = Some((start, self.last()));

        match byte {
            PARAMS_MARK => {
                self.params_start = Some(self.buffer.len());
                self.field_start = self.buffer.len();
            }
            CHECKSUM_MARK => self.enter_checksum(),
            _ => {}
        }
        Ok(transition)
    }

    fn on_param_key(&mut self, byte: u8) -> ParseResult<Transition> {
        if ascii::is_key_byte(byte) {
            return Ok((State::ParamKey, Status::Next));
        }
        if !matches!(byte, VALUE_MARK | PAIR_MARK | CHECKSUM_MARK | FRAME_END) {
            return Err(ParseError::unexpected(State::ParamKey, byte));
        }
        if self.field_len() == 1 {
            // Empty key.
            return Err(ParseError::unexpected(State::ParamKey, byte));
        }

        self.param_count += 1;
        match byte {
            VALUE_MARK => {
                self.mark(SENTINEL_VALUE);
                Ok((State::ParamValue, Status::Next))
            }
            PAIR_MARK => {
                self.mark(SENTINEL_PAIR);
                self.field_start = self.buffer.len();
                Ok((State::ParamKey, Status::Next))
            }
            _ => Ok(self.close_params(byte)),
        }
    }

    fn on_param_value(&mut self, byte: u8) -> ParseResult<Transition> {
        match byte {
            ESCAPE => {
                self.escape_pending = true;
                Ok((State::ParamValue, Status::Next))
            }
            PAIR_MARK => {
                self.mark(SENTINEL_PAIR);
                self.field_start = self.buffer.len();
                Ok((State::ParamKey, Status::Next))
            }
            CHECKSUM_MARK | FRAME_END => Ok(self.close_params(byte)),
            b if ascii::is_sentinel(b) => Err(ParseError::unexpected(State::ParamValue, byte)),
            _ => Ok((State::ParamValue, Status::Next)),
        }
    }

    /// End the parameter region on `|` or `$`.
    fn close_params(&mut self, byte: u8) -> Transition {
        self.mark(SENTINEL_END);
        self.params_end = Some(self.last());
        if byte == CHECKSUM_MARK {
            self.enter_checksum();
            (State::Checksum, Status::Next)
        } else {
            (State::Begin, Status::Complete)
        }
    }

    /// Overwrite the delimiter just captured with a sentinel.
    fn mark(&mut self, sentinel: u8) {
        let last = self.last();
        self.buffer[last] = sentinel;
    }

    /// The checksum covers everything before the `|` mark.
    fn enter_checksum(&mut self) {
        self.checksum ^= CHECKSUM_MARK;
        self.field_start = self.buffer.len();
    }

    fn on_checksum(&mut self, byte: u8) -> ParseResult<Transition> {
        if byte.is_ascii_digit() {
            if self.field_len() > MAX_CHECKSUM_DIGITS {
                return Err(ParseError::unexpected(State::Checksum, byte));
            }
            return Ok((State::Checksum, Status::Next));
        }
        if byte != FRAME_END {
            return Err(ParseError::unexpected(State::Checksum, byte));
        }

        let received = ascii::parse_decimal(self.field())
            .ok_or(ParseError::unexpected(State::Checksum, byte))?;
        if received > 0xFF {
            return Err(ParseError::OutOfRange(Field::Checksum));
        }
        self.has_checksum = true;
        if received as u8 != self.checksum {
            return Err(ParseError::ChecksumMismatch {
                expected: self.checksum,
                actual: received as u8,
            });
        }
        Ok((State::Begin, Status::Complete))
    }
}
