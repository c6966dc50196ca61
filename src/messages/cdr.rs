//! Minimal CDR (XCDR1) reader and writer for ROS 2 message payloads.
//!
//! Payloads start with a 4-byte encapsulation header; primitives are aligned to
//! their own size relative to the first byte after that header.

use thiserror::Error;

const ENCAPSULATION_LEN: usize = 4;
const CDR_BE: [u8; 2] = [0x00, 0x00];
const CDR_LE: [u8; 2] = [0x00, 0x01];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CdrError {
    #[error("payload shorter than the encapsulation header ({0} bytes)")]
    MissingEncapsulation(usize),
    #[error("unsupported encapsulation {0:#04x}{1:02x}")]
    UnsupportedEncapsulation(u8, u8),
    #[error("unexpected end of payload: need {needed} bytes at offset {offset}, have {len}")]
    UnexpectedEof { needed: usize, offset: usize, len: usize },
    #[error("string at offset {0} is not valid UTF-8")]
    InvalidUtf8(usize),
}

pub struct CdrReader<'a> {
    body: &'a [u8],
    pos: usize,
    little_endian: bool,
}

impl<'a> CdrReader<'a> {
    pub fn new(payload: &'a [u8]) -> Result<Self, CdrError> {
        if payload.len() < ENCAPSULATION_LEN {
            return Err(CdrError::MissingEncapsulation(payload.len()));
        }
        let little_endian = match [payload[0], payload[1]] {
            CDR_LE => true,
            CDR_BE => false,
            [a, b] => return Err(CdrError::UnsupportedEncapsulation(a, b)),
        };
        Ok(Self {
            body: &payload[ENCAPSULATION_LEN..],
            pos: 0,
            little_endian,
        })
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.body.len().saturating_sub(self.pos)
    }

    fn align(&mut self, n: usize) {
        let rem = self.pos % n;
        if rem != 0 {
            self.pos += n - rem;
        }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], CdrError> {
        if self.pos + n > self.body.len() {
            return Err(CdrError::UnexpectedEof {
                needed: n,
                offset: self.pos,
                len: self.body.len(),
            });
        }
        let bytes = &self.body[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], CdrError> {
        self.align(N);
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, CdrError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_bool(&mut self) -> Result<bool, CdrError> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_u32(&mut self) -> Result<u32, CdrError> {
        let b = self.take_array::<4>()?;
        Ok(if self.little_endian { u32::from_le_bytes(b) } else { u32::from_be_bytes(b) })
    }

    pub fn read_i32(&mut self) -> Result<i32, CdrError> {
        let b = self.take_array::<4>()?;
        Ok(if self.little_endian { i32::from_le_bytes(b) } else { i32::from_be_bytes(b) })
    }

    pub fn read_u64(&mut self) -> Result<u64, CdrError> {
        let b = self.take_array::<8>()?;
        Ok(if self.little_endian { u64::from_le_bytes(b) } else { u64::from_be_bytes(b) })
    }

    pub fn read_f64(&mut self) -> Result<f64, CdrError> {
        let b = self.take_array::<8>()?;
        Ok(if self.little_endian { f64::from_le_bytes(b) } else { f64::from_be_bytes(b) })
    }

    /// Length-prefixed string; the length includes the trailing NUL.
    pub fn read_string(&mut self) -> Result<String, CdrError> {
        let len = self.read_u32()? as usize;
        let offset = self.pos;
        let bytes = self.take(len)?;
        let bytes = bytes.strip_suffix(&[0]).unwrap_or(bytes);
        std::str::from_utf8(bytes)
            .map(str::to_string)
            .map_err(|_| CdrError::InvalidUtf8(offset))
    }

    /// `uint8[]` sequence.
    pub fn read_byte_seq(&mut self) -> Result<Vec<u8>, CdrError> {
        let len = self.read_u32()? as usize;
        Ok(self.take(len)?.to_vec())
    }

    pub fn skip_f64s(&mut self, count: usize) -> Result<(), CdrError> {
        self.align(8);
        self.take(count * 8).map(|_| ())
    }
}

/// Little-endian CDR writer, the encoding rosbag2 records by default.
pub struct CdrWriter {
    buf: Vec<u8>,
}

impl Default for CdrWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl CdrWriter {
    pub fn new() -> Self {
        let mut buf = Vec::with_capacity(64);
        buf.extend_from_slice(&CDR_LE);
        buf.extend_from_slice(&[0, 0]);
        Self { buf }
    }

    fn align(&mut self, n: usize) {
        while (self.buf.len() - ENCAPSULATION_LEN) % n != 0 {
            self.buf.push(0);
        }
    }

    pub fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn write_bool(&mut self, v: bool) {
        self.buf.push(v as u8);
    }

    pub fn write_u32(&mut self, v: u32) {
        self.align(4);
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_i32(&mut self, v: i32) {
        self.align(4);
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_u64(&mut self, v: u64) {
        self.align(8);
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_f64(&mut self, v: f64) {
        self.align(8);
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_string(&mut self, s: &str) {
        self.write_u32(s.len() as u32 + 1);
        self.buf.extend_from_slice(s.as_bytes());
        self.buf.push(0);
    }

    pub fn write_byte_seq(&mut self, bytes: &[u8]) {
        self.write_u32(bytes.len() as u32);
        self.buf.extend_from_slice(bytes);
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alignment_is_relative_to_body() {
        let mut w = CdrWriter::new();
        w.write_u8(7);
        w.write_f64(1.5);
        let bytes = w.finish();
        // 4 header + 1 byte + 7 padding + 8
        assert_eq!(bytes.len(), 20);

        let mut r = CdrReader::new(&bytes).unwrap();
        assert_eq!(r.read_u8().unwrap(), 7);
        assert_eq!(r.read_f64().unwrap(), 1.5);
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn test_big_endian_body() {
        let mut bytes = vec![0x00, 0x00, 0x00, 0x00];
        bytes.extend_from_slice(&42u32.to_be_bytes());
        let mut r = CdrReader::new(&bytes).unwrap();
        assert_eq!(r.read_u32().unwrap(), 42);
    }

    #[test]
    fn test_truncated_payload() {
        let mut w = CdrWriter::new();
        w.write_string("frame");
        let mut bytes = w.finish();
        bytes.truncate(bytes.len() - 2);

        let mut r = CdrReader::new(&bytes).unwrap();
        assert!(matches!(r.read_string(), Err(CdrError::UnexpectedEof { .. })));
    }

    #[test]
    fn test_rejects_unknown_encapsulation() {
        assert_eq!(
            CdrReader::new(&[0x00, 0x03, 0, 0]).err(),
            Some(CdrError::UnsupportedEncapsulation(0x00, 0x03))
        );
        assert_eq!(CdrReader::new(&[0x00]).err(), Some(CdrError::MissingEncapsulation(1)));
    }
}
