//! One duplex connection: a [`BinaryReader`] and a [`BinaryWriter`] over the
//! two halves of a single socket.
//!
//! A connection is created once the socket is established and lives until
//! [`Connection::close`]. It is not internally synchronized; callers that
//! share one across threads must serialize sends and receives themselves.

use std::any::Any;
use std::io::{self, Read, Write};
use std::net::TcpStream;

use xbridge_wire::{BinaryReader, BinaryWriter, Close, Message, Registry, Result, Value};

/// A reader/writer pair bound to one peer.
#[derive(Debug)]
pub struct Connection<R: Read, W: Write> {
    /// Decodes incoming messages.
    reader: BinaryReader<R>,
    /// Buffers outgoing messages.
    writer: BinaryWriter<W>,
    /// Shape and tag tables shared by the whole process.
    registry: &'static Registry,
}

impl<R: Read, W: Write> Connection<R, W> {
    /// Wraps already-open read and write halves.
    pub fn new(read: R, write: W) -> Self {
        Self::with_capacity(read, write, xbridge_wire::DEFAULT_CAPACITY)
    }

    /// Wraps read and write halves with `capacity`-byte buffers.
    pub fn with_capacity(read: R, write: W, capacity: usize) -> Self {
        Self {
            reader: BinaryReader::with_capacity(read, capacity),
            writer: BinaryWriter::with_capacity(write, capacity),
            registry: Registry::global(),
        }
    }

    /// Encodes `value`, writes it, and flushes.
    pub fn send<T: Any>(&mut self, value: &T) -> Result<()> {
        let msg = self.registry.encode(value)?;
        self.send_message(&msg)
    }

    /// Writes an already-built message and flushes.
    pub fn send_message(&mut self, msg: &Message) -> Result<()> {
        msg.write(&mut self.writer)?;
        self.writer.flush()
    }

    /// Blocks for the next message and returns its value.
    pub fn recv(&mut self) -> Result<Value> {
        self.registry.read_value(&mut self.reader)
    }

    /// Blocks for the next message.
    pub fn recv_message(&mut self) -> Result<Message> {
        self.registry.read_message(&mut self.reader)
    }

    /// Blocks for the next message, or `None` if the peer disconnected
    /// cleanly between messages.
    pub fn next_message(&mut self) -> Result<Option<Message>> {
        if self.reader.at_end()? {
            return Ok(None);
        }
        self.recv_message().map(Some)
    }

    /// Sends `value` and waits for the peer's reply.
    pub fn call<T: Any>(&mut self, value: &T) -> Result<Value> {
        self.send(value)?;
        self.recv()
    }

    /// The incoming half, for reading raw fields.
    pub const fn reader(&mut self) -> &mut BinaryReader<R> {
        &mut self.reader
    }

    /// The outgoing half, for writing raw fields.
    pub const fn writer(&mut self) -> &mut BinaryWriter<W> {
        &mut self.writer
    }
}

impl<R: Read, W: Write + Close> Connection<R, W> {
    /// Flushes anything pending and closes the socket.
    pub fn close(mut self) -> Result<()> {
        tracing::debug!(pending = self.writer.position(), "closing connection");
        self.writer.close()
    }
}

impl Connection<TcpStream, TcpStream> {
    /// Splits a connected TCP stream into a connection.
    pub fn tcp(stream: TcpStream) -> io::Result<Self> {
        stream.set_nodelay(true)?;
        let read = stream.try_clone()?;
        Ok(Self::new(read, stream))
    }
}

#[cfg(unix)]
impl Connection<std::os::unix::net::UnixStream, std::os::unix::net::UnixStream> {
    /// Splits a connected Unix stream into a connection.
    pub fn unix(stream: std::os::unix::net::UnixStream) -> io::Result<Self> {
        let read = stream.try_clone()?;
        Ok(Self::new(read, stream))
    }
}
