//! Buffered writer that batches encoded fields and sends them in bulk.
//!
//! Fixed-width fields are appended only after checking that they fit; a field
//! that would push the cursor past capacity triggers a flush first. Strings
//! and byte arrays are appended whole after their length prefix, so a single
//! large payload may grow the buffer past capacity instead of being chunked.
//! Nothing reaches the transport except through [`BinaryWriter::flush`].

use std::io::{self, Write};
use std::net::{Shutdown, TcpStream};

use crate::{Error, Result};

/// Default buffer capacity in bytes.
pub const DEFAULT_CAPACITY: usize = 1024;

/// A transport that can be closed once all data has been sent.
pub trait Close {
    /// Closes the transport. Further writes to it are expected to fail.
    fn close(&mut self) -> io::Result<()>;
}

impl Close for TcpStream {
    fn close(&mut self) -> io::Result<()> {
        self.shutdown(Shutdown::Both)
    }
}

#[cfg(unix)]
impl Close for std::os::unix::net::UnixStream {
    fn close(&mut self) -> io::Result<()> {
        self.shutdown(Shutdown::Both)
    }
}

impl Close for Vec<u8> {
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<T: Close + ?Sized> Close for &mut T {
    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}

/// Converts an in-memory length to its 4-byte wire prefix.
pub(crate) fn wire_len(len: usize) -> Result<i32> {
    i32::try_from(len).map_err(|_| Error::InvalidLength(i64::try_from(len).unwrap_or(i64::MAX)))
}

/// Buffered little-endian writer over a byte-stream transport.
#[derive(Debug)]
pub struct BinaryWriter<W: Write> {
    /// The transport that receives flushed bytes.
    inner: W,
    /// Pending bytes; its length is the write cursor.
    buf: Vec<u8>,
    /// Flush threshold for fixed-width fields.
    capacity: usize,
}

impl<W: Write> BinaryWriter<W> {
    /// Creates a writer with [`DEFAULT_CAPACITY`].
    pub fn new(inner: W) -> Self {
        Self::with_capacity(inner, DEFAULT_CAPACITY)
    }

    /// Creates a writer that flushes once `capacity` bytes are pending.
    pub fn with_capacity(inner: W, capacity: usize) -> Self {
        Self {
            inner,
            buf: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Number of bytes pending in the buffer.
    pub fn position(&self) -> usize {
        self.buf.len()
    }

    /// Configured flush threshold.
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes written but not yet flushed.
    pub fn pending(&self) -> &[u8] {
        &self.buf
    }

    /// Borrows the underlying transport.
    pub const fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Mutably borrows the underlying transport.
    ///
    /// Writing to it directly bypasses the buffer and will interleave with
    /// pending bytes.
    pub const fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }

    /// Flushes first if `width` more bytes would exceed capacity.
    fn reserve(&mut self, width: usize) -> Result<()> {
        if self.buf.len() + width > self.capacity {
            self.flush()?;
        }
        Ok(())
    }

    /// Appends a fixed-width field.
    fn put<const N: usize>(&mut self, bytes: [u8; N]) -> Result<()> {
        self.reserve(N)?;
        self.buf.extend_from_slice(&bytes);
        Ok(())
    }

    /// Writes a single unsigned byte.
    pub fn write_u8(&mut self, v: u8) -> Result<()> {
        self.put([v])
    }

    /// Writes a boolean as one byte (`1` or `0`).
    pub fn write_bool(&mut self, v: bool) -> Result<()> {
        self.put([u8::from(v)])
    }

    /// Writes a 2-byte signed integer.
    pub fn write_i16(&mut self, v: i16) -> Result<()> {
        self.put(v.to_le_bytes())
    }

    /// Writes a 2-byte unsigned integer.
    pub fn write_u16(&mut self, v: u16) -> Result<()> {
        self.put(v.to_le_bytes())
    }

    /// Writes a 4-byte signed integer.
    pub fn write_i32(&mut self, v: i32) -> Result<()> {
        self.put(v.to_le_bytes())
    }

    /// Writes an 8-byte signed integer.
    pub fn write_i64(&mut self, v: i64) -> Result<()> {
        self.put(v.to_le_bytes())
    }

    /// Writes an 8-byte IEEE-754 double, preserving its bit pattern.
    pub fn write_f64(&mut self, v: f64) -> Result<()> {
        self.put(v.to_bits().to_le_bytes())
    }

    /// Writes a 4-byte length prefix.
    fn write_len(&mut self, len: usize) -> Result<()> {
        let len = wire_len(len)?;
        self.write_i32(len)
    }

    /// Writes `[i32 byte length][UTF-8 bytes]`.
    pub fn write_str(&mut self, v: &str) -> Result<()> {
        self.write_len(v.len())?;
        self.buf.extend_from_slice(v.as_bytes());
        Ok(())
    }

    /// Writes raw bytes, optionally preceded by a 4-byte length.
    pub fn write_bytes(&mut self, v: &[u8], include_len: bool) -> Result<()> {
        if include_len {
            self.write_len(v.len())?;
        }
        self.buf.extend_from_slice(v);
        Ok(())
    }

    /// Writes 4-byte integers, optionally preceded by a 4-byte count.
    pub fn write_i32_array(&mut self, v: &[i32], include_len: bool) -> Result<()> {
        if include_len {
            self.write_len(v.len())?;
        }
        v.iter().try_for_each(|&x| self.write_i32(x))
    }

    /// Writes 8-byte integers, optionally preceded by a 4-byte count.
    pub fn write_i64_array(&mut self, v: &[i64], include_len: bool) -> Result<()> {
        if include_len {
            self.write_len(v.len())?;
        }
        v.iter().try_for_each(|&x| self.write_i64(x))
    }

    /// Writes doubles, optionally preceded by a 4-byte count.
    pub fn write_f64_array(&mut self, v: &[f64], include_len: bool) -> Result<()> {
        if include_len {
            self.write_len(v.len())?;
        }
        v.iter().try_for_each(|&x| self.write_f64(x))
    }

    /// Writes strings, optionally preceded by a 4-byte count.
    pub fn write_str_array<S: AsRef<str>>(&mut self, v: &[S], include_len: bool) -> Result<()> {
        if include_len {
            self.write_len(v.len())?;
        }
        v.iter().try_for_each(|s| self.write_str(s.as_ref()))
    }

    /// Sends every pending byte to the transport and resets the cursor.
    ///
    /// An empty buffer results in no transport write, only a transport flush.
    pub fn flush(&mut self) -> Result<()> {
        if !self.buf.is_empty() {
            tracing::trace!(bytes = self.buf.len(), "flush");
            self.inner.write_all(&self.buf)?;
            self.buf.clear();
        }
        self.inner.flush()?;
        Ok(())
    }
}

impl<W: Write + Close> BinaryWriter<W> {
    /// Flushes pending bytes, then closes the transport.
    ///
    /// The cursor is reset even when the flush or the close fails; the
    /// failure is still returned.
    pub fn close(&mut self) -> Result<()> {
        let result = self
            .flush()
            .and_then(|()| self.inner.close().map_err(Error::from));
        self.buf.clear();
        result
    }
}
