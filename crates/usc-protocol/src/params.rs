//! Restartable iterator over the parameter region of a decoded command.
//!
//! While a command is decoded, the delimiters of its parameter region are
//! overwritten in place with sentinel bytes:
//!
//! ```text
//! wire:    ?  t  =  1  0  &  f  $
//! buffer: [t 0x02 1 0 0x01 f 0x00]
//!          ^ region start     ^ region end
//! ```
//!
//! Escaped delimiters inside values are stored as plain bytes, so the
//! sentinels alone describe the structure and no extra storage is needed.
//! Iteration only reads the buffer, so any number of passes can be made.

use crate::ascii::{SENTINEL_PAIR, SENTINEL_VALUE};
use crate::KeyVal;

/// Iterator over the `key[=value]` pairs of a command.
#[derive(Debug, Clone)]
pub struct Params<'a> {
    /// Region bytes, without the closing sentinel.
    region: &'a [u8],
    /// Start of the next pair within `region`.
    cursor: usize,
    /// Pairs counted while decoding.
    count: usize,
    current: Option<KeyVal<'a>>,
}

impl<'a> Params<'a> {
    pub(crate) fn new(region: &'a [u8], count: usize) -> Self {
        Params {
            region,
            cursor: 0,
            count,
            current: None,
        }
    }

    /// An iterator with no parameters.
    pub fn empty() -> Self {
        Params::new(&[], 0)
    }

    /// Restart iteration from the first pair.
    pub fn rewind(&mut self) {
        self.cursor = 0;
        self.current = None;
    }

    /// The pair returned by the last call to `next`.
    pub fn current(&self) -> Option<KeyVal<'a>> {
        self.current
    }

    /// Number of pairs found while decoding, regardless of iteration.
    pub fn len(&self) -> usize {
        self.count
    }

    /// Whether the command carried no parameters.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Find the first pair whose key equals `key`, scanning from the start.
    ///
    /// Does not disturb the iteration cursor.
    pub fn get(&self, key: &str) -> Option<KeyVal<'a>> {
        let mut scan = self.clone();
        scan.rewind();
        scan.find_map(|kv| (kv.key() == key).then_some(kv))
    }
}

impl<'a> Iterator for Params<'a> {
    type Item = KeyVal<'a>;

    fn next(&mut self) -> Option<KeyVal<'a>> {
        if self.cursor >= self.region.len() {
            self.current = None;
            return None;
        }

        let rest = &self.region[self.cursor..];
        let pair_len = rest
            .iter()
            .position(|&b| b == SENTINEL_PAIR)
            .unwrap_or(rest.len());
        let pair = &rest[..pair_len];
        self.cursor += pair_len + 1;

        let kv = match pair.iter().position(|&b| b == SENTINEL_VALUE) {
            Some(split) => KeyVal::new(&pair[..split], Some(&pair[split + 1..])),
            None => KeyVal::new(pair, None),
        };
        self.current = Some(kv);
        Some(kv)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(params: &mut Params<'_>) -> Vec<(String, Option<String>)> {
        params
            .map(|kv| (kv.key().to_string(), kv.value_str().map(str::to_string)))
            .collect()
    }

    #[test]
    fn test_empty_region() {
        let mut params = Params::empty();
        assert!(params.is_empty());
        assert_eq!(params.len(), 0);
        assert!(params.next().is_none());
        assert!(params.current().is_none());
    }

    #[test]
    fn test_pairs_and_flags() {
        let region = b"t\x0210\x01f\x01name\x02a=b";
        let mut params = Params::new(region, 3);
        assert_eq!(
            collect(&mut params),
            vec![
                ("t".to_string(), Some("10".to_string())),
                ("f".to_string(), None),
                ("name".to_string(), Some("a=b".to_string())),
            ]
        );
        assert!(params.next().is_none());
    }

    #[test]
    fn test_empty_value() {
        let mut params = Params::new(b"k\x02", 1);
        let kv = params.next().expect("one pair");
        assert_eq!(kv.key(), "k");
        assert_eq!(kv.value(), Some(&b""[..]));
    }

    #[test]
    fn test_rewind_is_repeatable() {
        let region = b"0\x021\x011\x022";
        let mut params = Params::new(region, 2);
        let first = collect(&mut params);
        params.rewind();
        let second = collect(&mut params);
        assert_eq!(first, second);
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_current_and_get() {
        let mut params = Params::new(b"a\x021\x01b\x022", 2);
        params.next();
        assert_eq!(params.current().map(|kv| kv.key()), Some("a"));
        assert_eq!(params.get("b").and_then(|kv| kv.value_str()), Some("2"));
        assert_eq!(params.current().map(|kv| kv.key()), Some("a"));
        assert!(params.get("c").is_none());
    }
}
