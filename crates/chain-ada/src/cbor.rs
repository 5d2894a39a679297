//! Minimal CBOR (RFC 8949) codec for transaction payloads.
//!
//! Only the subset that transaction payloads use is supported: unsigned
//! integers, byte strings, text strings, definite-length arrays and maps,
//! tags and the simple values `true`, `false` and `null`. Indefinite-length
//! items are rejected.
//!
//! ```text
//! initial byte:  major type (3 bits) | additional info (5 bits)
//!   info 0..=23  value is the additional info itself
//!   info 24      value in the next 1 byte
//!   info 25      value in the next 2 bytes (big-endian)
//!   info 26      value in the next 4 bytes
//!   info 27      value in the next 8 bytes
//! ```

use crate::error::AdaError;

const MAJOR_UINT: u8 = 0;
const MAJOR_NEGINT: u8 = 1;
const MAJOR_BYTES: u8 = 2;
const MAJOR_TEXT: u8 = 3;
const MAJOR_ARRAY: u8 = 4;
const MAJOR_MAP: u8 = 5;
const MAJOR_TAG: u8 = 6;
const MAJOR_SIMPLE: u8 = 7;

const SIMPLE_FALSE: u64 = 20;
const SIMPLE_TRUE: u64 = 21;
const SIMPLE_NULL: u64 = 22;

/// Nesting limit when skipping untrusted items.
const MAX_DEPTH: usize = 32;

// ---------------------------------------------------------------------------
// Encoder
// ---------------------------------------------------------------------------

/// Append-only CBOR writer.
#[derive(Debug, Default, Clone)]
pub struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    fn head(&mut self, major: u8, value: u64) -> &mut Self {
        let m = major << 5;
        match value {
            0..=23 => self.buf.push(m | value as u8),
            24..=0xff => {
                self.buf.push(m | 24);
                self.buf.push(value as u8);
            }
            0x100..=0xffff => {
                self.buf.push(m | 25);
                self.buf.extend_from_slice(&(value as u16).to_be_bytes());
            }
            0x1_0000..=0xffff_ffff => {
                self.buf.push(m | 26);
                self.buf.extend_from_slice(&(value as u32).to_be_bytes());
            }
            _ => {
                self.buf.push(m | 27);
                self.buf.extend_from_slice(&value.to_be_bytes());
            }
        }
        self
    }

    pub fn uint(&mut self, value: u64) -> &mut Self {
        self.head(MAJOR_UINT, value)
    }

    pub fn bytes(&mut self, data: &[u8]) -> &mut Self {
        self.head(MAJOR_BYTES, data.len() as u64);
        self.buf.extend_from_slice(data);
        self
    }

    pub fn text(&mut self, s: &str) -> &mut Self {
        self.head(MAJOR_TEXT, s.len() as u64);
        self.buf.extend_from_slice(s.as_bytes());
        self
    }

    pub fn array(&mut self, len: usize) -> &mut Self {
        self.head(MAJOR_ARRAY, len as u64)
    }

    pub fn map(&mut self, len: usize) -> &mut Self {
        self.head(MAJOR_MAP, len as u64)
    }

    pub fn bool(&mut self, value: bool) -> &mut Self {
        self.head(MAJOR_SIMPLE, if value { SIMPLE_TRUE } else { SIMPLE_FALSE })
    }

    pub fn null(&mut self) -> &mut Self {
        self.head(MAJOR_SIMPLE, SIMPLE_NULL)
    }

    /// Append an already-encoded item verbatim.
    pub fn raw(&mut self, item: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(item);
        self
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// Zero-copy CBOR reader over a byte slice.
#[derive(Debug, Clone)]
pub struct Decoder<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn is_at_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], AdaError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| {
                AdaError::Cbor(format!(
                    "unexpected end of input at offset {} (wanted {n} bytes)",
                    self.pos
                ))
            })?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn head(&mut self) -> Result<(u8, u64), AdaError> {
        let initial = self.take(1)?[0];
        let major = initial >> 5;
        let info = initial & 0x1f;

        let value = match info {
            0..=23 => info as u64,
            24 => self.take(1)?[0] as u64,
            25 => u16::from_be_bytes([self.take(1)?[0], self.take(1)?[0]]) as u64,
            26 => {
                let mut b = [0u8; 4];
                b.copy_from_slice(self.take(4)?);
                u32::from_be_bytes(b) as u64
            }
            27 => {
                let mut b = [0u8; 8];
                b.copy_from_slice(self.take(8)?);
                u64::from_be_bytes(b)
            }
            31 => {
                return Err(AdaError::Cbor(format!(
                    "indefinite-length item at offset {} is not supported",
                    self.pos - 1
                )))
            }
            _ => {
                return Err(AdaError::Cbor(format!(
                    "reserved additional info {info} at offset {}",
                    self.pos - 1
                )))
            }
        };

        Ok((major, value))
    }

    fn expect(&mut self, major: u8, what: &str) -> Result<u64, AdaError> {
        let start = self.pos;
        let (found, value) = self.head()?;
        if found != major {
            return Err(AdaError::Cbor(format!(
                "expected {what} at offset {start}, found major type {found}"
            )));
        }
        Ok(value)
    }

    fn length(&self, value: u64) -> Result<usize, AdaError> {
        usize::try_from(value).map_err(|_| AdaError::Cbor(format!("length {value} out of range")))
    }

    pub fn uint(&mut self) -> Result<u64, AdaError> {
        self.expect(MAJOR_UINT, "unsigned integer")
    }

    pub fn bytes(&mut self) -> Result<&'a [u8], AdaError> {
        let len = self.expect(MAJOR_BYTES, "byte string")?;
        let len = self.length(len)?;
        self.take(len)
    }

    pub fn array(&mut self) -> Result<usize, AdaError> {
        let len = self.expect(MAJOR_ARRAY, "array")?;
        self.length(len)
    }

    pub fn map(&mut self) -> Result<usize, AdaError> {
        let len = self.expect(MAJOR_MAP, "map")?;
        self.length(len)
    }

    pub fn bool(&mut self) -> Result<bool, AdaError> {
        match self.expect(MAJOR_SIMPLE, "boolean")? {
            SIMPLE_TRUE => Ok(true),
            SIMPLE_FALSE => Ok(false),
            other => Err(AdaError::Cbor(format!("expected boolean, found simple value {other}"))),
        }
    }

    /// Consume one item if it is `null`. Returns whether it was.
    pub fn null(&mut self) -> Result<bool, AdaError> {
        if self.data.get(self.pos) == Some(&((MAJOR_SIMPLE << 5) | SIMPLE_NULL as u8)) {
            self.pos += 1;
            return Ok(true);
        }
        Ok(false)
    }

    /// Skip one complete item, including everything nested inside it.
    pub fn skip(&mut self) -> Result<(), AdaError> {
        self.skip_nested(0)
    }

    fn skip_nested(&mut self, depth: usize) -> Result<(), AdaError> {
        if depth > MAX_DEPTH {
            return Err(AdaError::Cbor(format!("nesting deeper than {MAX_DEPTH}")));
        }

        let (major, value) = self.head()?;
        match major {
            MAJOR_UINT | MAJOR_NEGINT | MAJOR_SIMPLE => Ok(()),
            MAJOR_BYTES | MAJOR_TEXT => {
                let len = self.length(value)?;
                self.take(len).map(|_| ())
            }
            MAJOR_ARRAY => {
                for _ in 0..value {
                    self.skip_nested(depth + 1)?;
                }
                Ok(())
            }
            MAJOR_MAP => {
                for _ in 0..value {
                    self.skip_nested(depth + 1)?;
                    self.skip_nested(depth + 1)?;
                }
                Ok(())
            }
            MAJOR_TAG => self.skip_nested(depth + 1),
            _ => unreachable!("major type is three bits"),
        }
    }

    /// Skip one item and return its raw encoded bytes.
    pub fn item_bytes(&mut self) -> Result<&'a [u8], AdaError> {
        let start = self.pos;
        self.skip()?;
        Ok(&self.data[start..self.pos])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_uint(value: u64) -> Vec<u8> {
        let mut enc = Encoder::new();
        enc.uint(value);
        enc.into_bytes()
    }

    #[test]
    fn uint_head_widths() {
        assert_eq!(encode_uint(0), vec![0x00]);
        assert_eq!(encode_uint(23), vec![0x17]);
        assert_eq!(encode_uint(24), vec![0x18, 0x18]);
        assert_eq!(encode_uint(500), vec![0x19, 0x01, 0xf4]);
        assert_eq!(encode_uint(10_000_000), vec![0x1a, 0x00, 0x98, 0x96, 0x80]);
        assert_eq!(encode_uint(u64::MAX).len(), 9);
    }

    #[test]
    fn simple_values() {
        let mut enc = Encoder::new();
        enc.bool(true).bool(false).null();
        assert_eq!(enc.into_bytes(), vec![0xf5, 0xf4, 0xf6]);
    }

    #[test]
    fn decode_nested_structure() {
        let mut enc = Encoder::new();
        enc.array(3).uint(7).bytes(&[1, 2, 3]).map(1).uint(0).bool(true);
        let data = enc.into_bytes();

        let mut dec = Decoder::new(&data);
        assert_eq!(dec.array().unwrap(), 3);
        assert_eq!(dec.uint().unwrap(), 7);
        assert_eq!(dec.bytes().unwrap(), &[1, 2, 3]);
        assert_eq!(dec.map().unwrap(), 1);
        assert_eq!(dec.uint().unwrap(), 0);
        assert!(dec.bool().unwrap());
        assert!(dec.is_at_end());
    }

    #[test]
    fn item_bytes_returns_exact_span() {
        let mut inner = Encoder::new();
        inner.map(2).uint(0).text("a").uint(1).array(2).uint(1).uint(2);
        let inner = inner.into_bytes();

        let mut outer = Encoder::new();
        outer.array(2).raw(&inner).null();
        let data = outer.into_bytes();

        let mut dec = Decoder::new(&data);
        dec.array().unwrap();
        assert_eq!(dec.item_bytes().unwrap(), inner.as_slice());
        assert!(dec.null().unwrap());
    }

    #[test]
    fn null_does_not_consume_other_items() {
        let data = [0x01];
        let mut dec = Decoder::new(&data);
        assert!(!dec.null().unwrap());
        assert_eq!(dec.uint().unwrap(), 1);
    }

    #[test]
    fn truncated_input_is_an_error() {
        // Byte string claiming 4 bytes with only 2 present.
        let data = [0x44, 0x01, 0x02];
        let mut dec = Decoder::new(&data);
        assert!(dec.bytes().is_err());
    }

    #[test]
    fn wrong_major_type_is_an_error() {
        let data = encode_uint(5);
        let mut dec = Decoder::new(&data);
        let err = dec.array().unwrap_err();
        assert!(err.to_string().contains("expected array"));
    }

    #[test]
    fn indefinite_length_rejected() {
        let data = [0x9f, 0x01, 0xff];
        let mut dec = Decoder::new(&data);
        assert!(dec.skip().is_err());
    }

    #[test]
    fn excessive_nesting_rejected() {
        let data = vec![0x81; MAX_DEPTH + 2];
        let mut dec = Decoder::new(&data);
        assert!(dec.skip().is_err());
    }

    #[test]
    fn huge_declared_length_does_not_panic() {
        let data = [0x5b, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff];
        let mut dec = Decoder::new(&data);
        assert!(dec.bytes().is_err());
    }
}
