//! Borrowed view of one decoded parameter.

/// A decoded `key[=value]` pair.
///
/// Both halves borrow from the [`Command`](crate::Command) that decoded
/// them. The value is `None` for flag-style parameters written without `=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyVal<'a> {
    key: &'a [u8],
    value: Option<&'a [u8]>,
}

impl<'a> KeyVal<'a> {
    pub(crate) fn new(key: &'a [u8], value: Option<&'a [u8]>) -> Self {
        KeyVal { key, value }
    }

    /// The parameter key.
    ///
    /// Keys are restricted to ASCII alphanumerics and `-`, `_`, `.`.
    pub fn key(&self) -> &'a str {
        std::str::from_utf8(self.key).unwrap_or_default()
    }

    /// The parameter key as raw bytes.
    pub fn key_bytes(&self) -> &'a [u8] {
        self.key
    }

    /// First byte of the key, handy for single-letter keys.
    pub fn key_char(&self) -> Option<u8> {
        self.key.first().copied()
    }

    /// The unescaped value bytes, if the parameter has a value.
    pub fn value(&self) -> Option<&'a [u8]> {
        self.value
    }

    /// The value as text, if present and valid UTF-8.
    pub fn value_str(&self) -> Option<&'a str> {
        self.value.and_then(|v| std::str::from_utf8(v).ok())
    }

    /// Whether the parameter carries a value.
    pub fn has_value(&self) -> bool {
        self.value.is_some()
    }

    /// Value parsed as a decimal `i32`, or `default`.
    pub fn value_int(&self, default: i32) -> i32 {
        self.value_int_radix(default, 10)
    }

    /// Value parsed as an `i32` in `radix`, or `default`.
    ///
    /// A `0x`, `0o` or `0b` prefix matching the radix is accepted.
    pub fn value_int_radix(&self, default: i32, radix: u32) -> i32 {
        self.parse_integer(radix)
            .and_then(|v| i32::try_from(v).ok())
            .unwrap_or(default)
    }

    /// Like [`value_int_radix`](Self::value_int_radix), with a parsed value
    /// clamped into `[min, max]`.
    ///
    /// # Panics
    ///
    /// Panics if `min > max`.
    pub fn value_int_bounded(&self, default: i32, min: i32, max: i32, radix: u32) -> i32 {
        match self.parse_integer(radix) {
            Some(v) => v.clamp(i128::from(min), i128::from(max)) as i32,
            None => default,
        }
    }

    /// Value parsed as a decimal `i64`, or `default`.
    pub fn value_long(&self, default: i64) -> i64 {
        self.value_long_radix(default, 10)
    }

    /// Value parsed as an `i64` in `radix`, or `default`.
    pub fn value_long_radix(&self, default: i64, radix: u32) -> i64 {
        self.parse_integer(radix)
            .and_then(|v| i64::try_from(v).ok())
            .unwrap_or(default)
    }

    /// Like [`value_long_radix`](Self::value_long_radix), with a parsed value
    /// clamped into `[min, max]`.
    ///
    /// # Panics
    ///
    /// Panics if `min > max`.
    pub fn value_long_bounded(&self, default: i64, min: i64, max: i64, radix: u32) -> i64 {
        match self.parse_integer(radix) {
            Some(v) => v.clamp(i128::from(min), i128::from(max)) as i64,
            None => default,
        }
    }

    /// Value parsed as an `f32`, or `default`.
    pub fn value_float(&self, default: f32) -> f32 {
        self.parse_float().unwrap_or(default)
    }

    /// Value parsed as an `f32` and clamped into `[min, max]`, or `default`.
    ///
    /// # Panics
    ///
    /// Panics if `min > max`, or if either bound is NaN.
    pub fn value_float_bounded(&self, default: f32, min: f32, max: f32) -> f32 {
        self.parse_float()
            .map(|v| v.clamp(min, max))
            .unwrap_or(default)
    }

    fn parse_float(&self) -> Option<f32> {
        self.value_str()?.trim().parse::<f32>().ok().filter(|v| !v.is_nan())
    }

    fn parse_integer(&self, radix: u32) -> Option<i128> {
        if !(2..=36).contains(&radix) {
            return None;
        }
        let text = self.value_str()?.trim();
        let (negative, text) = match text.as_bytes().first() {
            Some(b'-') => (true, &text[1..]),
            Some(b'+') => (false, &text[1..]),
            _ => (false, text),
        };
        let prefix = match radix {
            16 => Some(["0x", "0X"]),
            8 => Some(["0o", "0O"]),
            2 => Some(["0b", "0B"]),
            _ => None,
        };
        let digits = prefix
            .and_then(|p| p.iter().find_map(|p| text.strip_prefix(*p)))
            .unwrap_or(text);
        // from_str_radix accepts its own sign, which would allow "--1".
        if digits.starts_with(['-', '+']) {
            return None;
        }
        let magnitude = i128::from_str_radix(digits, radix).ok()?;
        Some(if negative { -magnitude } else { magnitude })
    }
}
