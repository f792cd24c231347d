//! Buffered reader that mirrors [`BinaryWriter`](crate::BinaryWriter).
//!
//! The internal buffer is refilled from the transport, looping over short
//! receives, until a requested field is complete. End-of-stream before that
//! point is [`Error::ConnectionClosed`]; partial fields are never returned.

use std::io::{self, Read};

use crate::writer::DEFAULT_CAPACITY;
use crate::{Error, Result};

/// Default upper bound for a single length prefix or element count (16 MiB).
pub const DEFAULT_MAX_LEN: usize = 16 * 1024 * 1024;

/// Default limit on object arrays nested inside one another.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Buffered little-endian reader over a byte-stream transport.
#[derive(Debug)]
pub struct BinaryReader<R: Read> {
    /// The transport bytes are received from.
    inner: R,
    /// Receive buffer; grows when a single field exceeds it.
    buf: Vec<u8>,
    /// Size `buf` returns to once an oversized field is consumed.
    capacity: usize,
    /// Start of unconsumed bytes in `buf`.
    pos: usize,
    /// End of received bytes in `buf`.
    end: usize,
    /// Largest length prefix or count accepted.
    max_len: usize,
    /// Object arrays currently being decoded.
    depth: usize,
    /// Deepest object-array nesting accepted.
    max_depth: usize,
}

impl<R: Read> BinaryReader<R> {
    /// Creates a reader with [`DEFAULT_CAPACITY`], [`DEFAULT_MAX_LEN`] and
    /// [`DEFAULT_MAX_DEPTH`].
    pub fn new(inner: R) -> Self {
        Self::with_capacity(inner, DEFAULT_CAPACITY)
    }

    /// Creates a reader with a receive buffer of `capacity` bytes.
    pub fn with_capacity(inner: R, capacity: usize) -> Self {
        let capacity = capacity.max(8);
        Self {
            inner,
            buf: vec![0; capacity],
            capacity,
            pos: 0,
            end: 0,
            max_len: DEFAULT_MAX_LEN,
            depth: 0,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Sets the largest length prefix or count this reader will accept.
    #[must_use]
    pub fn max_len(mut self, max_len: usize) -> Self {
        self.max_len = max_len;
        self
    }

    /// Sets how deeply object arrays may nest before decoding fails.
    #[must_use]
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Enters one more level of object-array nesting.
    pub(crate) fn descend(&mut self) -> Result<()> {
        let depth = self.depth + 1;
        if depth > self.max_depth {
            tracing::warn!(depth, max = self.max_depth, "object arrays nested too deep");
            return Err(Error::NestingLimit {
                depth,
                max: self.max_depth,
            });
        }
        self.depth = depth;
        Ok(())
    }

    /// Leaves the level entered by the matching [`descend`](Self::descend).
    pub(crate) const fn ascend(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Number of received bytes not yet consumed.
    pub const fn buffered(&self) -> usize {
        self.end - self.pos
    }

    /// Borrows the underlying transport.
    pub const fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Returns `true` if the peer closed the stream with nothing left to read.
    ///
    /// Blocks until at least one byte arrives or the stream ends.
    pub fn at_end(&mut self) -> Result<bool> {
        match self.fill(1) {
            Ok(()) => Ok(false),
            Err(Error::ConnectionClosed { available: 0, .. }) => Ok(true),
            Err(e) => Err(e),
        }
    }

    /// Ensures at least `n` unconsumed bytes are buffered.
    fn fill(&mut self, n: usize) -> Result<()> {
        if self.buffered() >= n {
            return Ok(());
        }
        if self.pos > 0 {
            self.buf.copy_within(self.pos..self.end, 0);
            self.end -= self.pos;
            self.pos = 0;
        }
        if self.buf.len() < n {
            self.buf.resize(n, 0);
        } else if self.buf.len() > self.capacity
            && n <= self.capacity
            && self.end <= self.capacity
        {
            self.buf.truncate(self.capacity);
            self.buf.shrink_to_fit();
            tracing::trace!(capacity = self.capacity, "receive buffer shrunk");
        }
        while self.end < n {
            match self.inner.read(&mut self.buf[self.end..]) {
                Ok(0) => {
                    return Err(Error::ConnectionClosed {
                        needed: n,
                        available: self.end,
                    });
                }
                Ok(got) => {
                    tracing::trace!(bytes = got, "refill");
                    self.end += got;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// Consumes `n` bytes, refilling as needed.
    fn take(&mut self, n: usize) -> Result<&[u8]> {
        self.fill(n)?;
        let start = self.pos;
        self.pos += n;
        Ok(&self.buf[start..self.pos])
    }

    /// Consumes a fixed-width field.
    fn get<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    /// Reads a single unsigned byte.
    pub fn read_u8(&mut self) -> Result<u8> {
        let [b] = self.get::<1>()?;
        Ok(b)
    }

    /// Reads a one-byte boolean; any non-zero value is `true`.
    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    /// Reads a 2-byte signed integer.
    pub fn read_i16(&mut self) -> Result<i16> {
        self.get().map(i16::from_le_bytes)
    }

    /// Reads a 2-byte unsigned integer.
    pub fn read_u16(&mut self) -> Result<u16> {
        self.get().map(u16::from_le_bytes)
    }

    /// Reads a 4-byte signed integer.
    pub fn read_i32(&mut self) -> Result<i32> {
        self.get().map(i32::from_le_bytes)
    }

    /// Reads an 8-byte signed integer.
    pub fn read_i64(&mut self) -> Result<i64> {
        self.get().map(i64::from_le_bytes)
    }

    /// Reads an 8-byte IEEE-754 double, preserving its bit pattern.
    pub fn read_f64(&mut self) -> Result<f64> {
        self.get().map(|b| f64::from_bits(u64::from_le_bytes(b)))
    }

    /// Reads a 4-byte length prefix or count and validates it.
    pub fn read_len(&mut self) -> Result<usize> {
        let raw = self.read_i32()?;
        let len = usize::try_from(raw).map_err(|_| Error::InvalidLength(i64::from(raw)))?;
        if len > self.max_len {
            return Err(Error::LengthLimit {
                len,
                max: self.max_len,
            });
        }
        Ok(len)
    }

    /// Uses `len` if given, otherwise reads a length prefix from the wire.
    fn len_or_prefix(&mut self, len: Option<usize>) -> Result<usize> {
        len.map_or_else(|| self.read_len(), Ok)
    }

    /// Reads `[i32 byte length][UTF-8 bytes]`.
    pub fn read_string(&mut self) -> Result<String> {
        let len = self.read_len()?;
        let bytes = self.take(len)?.to_vec();
        Ok(String::from_utf8(bytes)?)
    }

    /// Reads raw bytes. With `None`, a 4-byte length prefix is read first.
    pub fn read_bytes(&mut self, len: Option<usize>) -> Result<Vec<u8>> {
        let len = self.len_or_prefix(len)?;
        Ok(self.take(len)?.to_vec())
    }

    /// Reads 4-byte integers. With `None`, a 4-byte count is read first.
    pub fn read_i32_array(&mut self, count: Option<usize>) -> Result<Vec<i32>> {
        let count = self.len_or_prefix(count)?;
        (0..count).map(|_| self.read_i32()).collect()
    }

    /// Reads 8-byte integers. With `None`, a 4-byte count is read first.
    pub fn read_i64_array(&mut self, count: Option<usize>) -> Result<Vec<i64>> {
        let count = self.len_or_prefix(count)?;
        (0..count).map(|_| self.read_i64()).collect()
    }

    /// Reads doubles. With `None`, a 4-byte count is read first.
    pub fn read_f64_array(&mut self, count: Option<usize>) -> Result<Vec<f64>> {
        let count = self.len_or_prefix(count)?;
        (0..count).map(|_| self.read_f64()).collect()
    }

    /// Reads strings. With `None`, a 4-byte count is read first.
    pub fn read_string_array(&mut self, count: Option<usize>) -> Result<Vec<String>> {
        let count = self.len_or_prefix(count)?;
        (0..count).map(|_| self.read_string()).collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::BinaryWriter;

    /// Hands out at most `step` bytes per receive.
    struct Chunked<'a> {
        data: &'a [u8],
        step: usize,
        interrupt: bool,
    }

    impl Read for Chunked<'_> {
        fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
            if self.interrupt {
                self.interrupt = false;
                return Err(io::Error::from(io::ErrorKind::Interrupted));
            }
            self.interrupt = true;
            let n = self.step.min(out.len()).min(self.data.len());
            out[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    fn encoded(f: impl FnOnce(&mut BinaryWriter<Vec<u8>>)) -> Vec<u8> {
        let mut w = BinaryWriter::new(Vec::new());
        f(&mut w);
        w.flush().unwrap();
        w.get_ref().clone()
    }

    #[test]
    fn scalars_mirror_writer() {
        let bytes = encoded(|w| {
            w.write_u8(0xFE).unwrap();
            w.write_bool(true).unwrap();
            w.write_i16(-300).unwrap();
            w.write_u16(65_000).unwrap();
            w.write_i32(i32::MIN).unwrap();
            w.write_i64(i64::MAX).unwrap();
            w.write_f64(-0.0).unwrap();
        });

        let mut r = BinaryReader::new(Cursor::new(bytes));
        assert_eq!(r.read_u8().unwrap(), 0xFE);
        assert!(r.read_bool().unwrap());
        assert_eq!(r.read_i16().unwrap(), -300);
        assert_eq!(r.read_u16().unwrap(), 65_000);
        assert_eq!(r.read_i32().unwrap(), i32::MIN);
        assert_eq!(r.read_i64().unwrap(), i64::MAX);
        assert_eq!(r.read_f64().unwrap().to_bits(), (-0.0f64).to_bits());
        assert!(r.at_end().unwrap());
    }

    #[test]
    fn string_reads_exact_payload() {
        let bytes = encoded(|w| w.write_str("hi").unwrap());
        assert_eq!(&bytes[..4], &2i32.to_le_bytes());
        assert_eq!(bytes.len(), 6);

        let mut r = BinaryReader::new(Cursor::new(bytes));
        assert_eq!(r.read_string().unwrap(), "hi");
    }

    #[test]
    fn assembles_fields_from_short_reads() {
        let bytes = encoded(|w| {
            w.write_i64(0x0102_0304_0506_0708).unwrap();
            w.write_str("spread over many receives").unwrap();
            w.write_f64_array(&[1.0, 2.5], true).unwrap();
        });

        let src = Chunked {
            data: &bytes,
            step: 3,
            interrupt: true,
        };
        let mut r = BinaryReader::with_capacity(src, 8);
        assert_eq!(r.read_i64().unwrap(), 0x0102_0304_0506_0708);
        assert_eq!(r.read_string().unwrap(), "spread over many receives");
        assert_eq!(r.read_f64_array(None).unwrap(), vec![1.0, 2.5]);
    }

    #[test]
    fn optional_length_prefix() {
        let bytes = encoded(|w| {
            w.write_bytes(b"abc", false).unwrap();
            w.write_bytes(b"de", true).unwrap();
            w.write_i64_array(&[7, 8], false).unwrap();
            w.write_str_array(&["x", "yz"], true).unwrap();
            w.write_i32_array(&[], true).unwrap();
        });

        let mut r = BinaryReader::new(Cursor::new(bytes));
        assert_eq!(r.read_bytes(Some(3)).unwrap(), b"abc");
        assert_eq!(r.read_bytes(None).unwrap(), b"de");
        assert_eq!(r.read_i64_array(Some(2)).unwrap(), vec![7, 8]);
        assert_eq!(r.read_string_array(None).unwrap(), vec!["x", "yz"]);
        assert!(r.read_i32_array(None).unwrap().is_empty());
    }

    #[test]
    fn buffer_shrinks_after_oversized_field() {
        let text = "y".repeat(100);
        let bytes = encoded(|w| {
            w.write_str(&text).unwrap();
            w.write_i32(7).unwrap();
            w.write_i32(9).unwrap();
        });

        let mut r = BinaryReader::with_capacity(Cursor::new(bytes), 8);
        assert_eq!(r.read_string().unwrap(), text);
        assert!(r.buf.len() >= 100);
        assert_eq!(r.read_i32().unwrap(), 7);
        assert_eq!(r.buf.len(), 8);
        assert_eq!(r.read_i32().unwrap(), 9);
        assert!(r.at_end().unwrap());
    }

    #[test]
    fn truncated_stream_is_connection_closed() {
        let mut r = BinaryReader::new(Cursor::new(vec![1u8, 2, 3]));
        let err = r.read_i64().unwrap_err();
        assert!(matches!(
            err,
            Error::ConnectionClosed {
                needed: 8,
                available: 3
            }
        ));
    }

    #[test]
    fn rejects_negative_length() {
        let bytes = (-1i32).to_le_bytes().to_vec();
        let mut r = BinaryReader::new(Cursor::new(bytes));
        assert!(matches!(r.read_string(), Err(Error::InvalidLength(-1))));
    }

    #[test]
    fn rejects_oversized_length() {
        let bytes = 1_000i32.to_le_bytes().to_vec();
        let mut r = BinaryReader::new(Cursor::new(bytes)).max_len(100);
        assert!(matches!(
            r.read_bytes(None),
            Err(Error::LengthLimit { len: 1000, max: 100 })
        ));
    }

    #[test]
    fn invalid_utf8_is_decode_error() {
        let bytes = encoded(|w| w.write_bytes(&[0xFF, 0xFE], true).unwrap());
        let mut r = BinaryReader::new(Cursor::new(bytes));
        assert!(matches!(r.read_string(), Err(Error::Utf8(_))));
    }
}
