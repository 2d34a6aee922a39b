//! Byte classification and escape handling shared by the decoder and encoders.

/// Start of a command frame.
pub const COMMAND_START: u8 = b'!';
/// Start of a response frame.
pub const RESPONSE_START: u8 = b'@';
/// Frame terminator.
pub const FRAME_END: u8 = b'$';
/// Introduces the component field.
pub const COMPONENT_MARK: u8 = b':';
/// Introduces (and separates segments of) the action field.
pub const ACTION_MARK: u8 = b'/';
/// Introduces the parameter region.
pub const PARAMS_MARK: u8 = b'?';
/// Separates a parameter key from its value.
pub const VALUE_MARK: u8 = b'=';
/// Separates parameter pairs.
pub const PAIR_MARK: u8 = b'&';
/// Introduces the checksum field.
pub const CHECKSUM_MARK: u8 = b'|';
/// Escape introducer inside values and response bodies.
pub const ESCAPE: u8 = b'\\';

/// Written over `=` inside the parameter region.
pub(crate) const SENTINEL_VALUE: u8 = 0x02;
/// Written over `&` inside the parameter region.
pub(crate) const SENTINEL_PAIR: u8 = 0x01;
/// Written over the byte that closes the parameter region.
pub(crate) const SENTINEL_END: u8 = 0x00;

/// Bytes the line may carry between frames.
pub fn is_whitespace(byte: u8) -> bool {
    matches!(byte, b' ' | b'\r' | b'\n' | b'\t')
}

/// Octet separators inside a device address.
pub fn is_octet_separator(byte: u8) -> bool {
    matches!(byte, b'.' | b'-' | b'_')
}

/// Bytes allowed in parameter keys and action segments.
pub fn is_key_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.')
}

/// Bytes reserved for parameter region structure.
pub(crate) fn is_sentinel(byte: u8) -> bool {
    matches!(byte, SENTINEL_END | SENTINEL_PAIR | SENTINEL_VALUE)
}

/// Resolve the byte following a backslash.
///
/// Returns `None` for sequences outside the escape table.
pub fn unescape(byte: u8) -> Option<u8> {
    match byte {
        b'r' => Some(b'\r'),
        b'n' => Some(b'\n'),
        b't' => Some(b'\t'),
        b'b' => Some(0x08),
        b'\\' | b'&' | b'$' | b'=' | b'|' => Some(byte),
        _ => None,
    }
}

/// Inverse of [`unescape`]: the letter that encodes `byte`, if it needs one.
pub fn escape(byte: u8) -> Option<u8> {
    match byte {
        b'\r' => Some(b'r'),
        b'\n' => Some(b'n'),
        b'\t' => Some(b't'),
        0x08 => Some(b'b'),
        b'\\' | b'&' | b'$' | b'=' | b'|' => Some(byte),
        _ => None,
    }
}

/// Parse an ASCII decimal field, rejecting empty input.
///
/// Returns `None` on empty input, non-digits or `u32` overflow.
pub(crate) fn parse_decimal(digits: &[u8]) -> Option<u32> {
    if digits.is_empty() {
        return None;
    }
    digits.iter().try_fold(0u32, |acc, &d| {
        if !d.is_ascii_digit() {
            return None;
        }
        acc.checked_mul(10)?.checked_add(u32::from(d - b'0'))
    })
}
