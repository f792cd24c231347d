//! Error types for the xbridge wire layer.

use std::string::FromUtf8Error;

/// Alias for `Result<T, xbridge_wire::Error>`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while encoding, decoding, or transporting messages.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The magic marker before a tag did not match; the stream is out of sync.
    #[error("framing error: expected magic {expected:#010x}, found {found:#010x}")]
    Framing {
        /// The marker this end expects.
        expected: i32,
        /// The marker actually read from the stream.
        found: i32,
    },

    /// A tag was read that has no registered decoder.
    #[error("unknown type tag {0}")]
    UnknownTag(i32),

    /// A native value has no registered encoder.
    #[error("no encoder registered for type `{0}`")]
    UnsupportedType(String),

    /// The peer closed the connection before a pending read completed.
    #[error("connection closed: needed {needed} bytes, {available} available")]
    ConnectionClosed {
        /// Bytes the pending read required.
        needed: usize,
        /// Bytes that had arrived before end-of-stream.
        available: usize,
    },

    /// A length prefix or count was negative or does not fit in an `i32`.
    #[error("invalid length {0}")]
    InvalidLength(i64),

    /// A length prefix or count exceeded the reader's configured maximum.
    #[error("length {len} exceeds limit of {max}")]
    LengthLimit {
        /// The length read from the wire.
        len: usize,
        /// The reader's configured maximum.
        max: usize,
    },

    /// Object arrays were nested deeper than the reader allows.
    #[error("object arrays nested {depth} deep, limit is {max}")]
    NestingLimit {
        /// Depth reached by the array being decoded.
        depth: usize,
        /// The reader's configured maximum.
        max: usize,
    },

    /// A string payload was not valid UTF-8.
    #[error("malformed string payload: {0}")]
    Utf8(#[from] FromUtf8Error),

    /// An I/O error from the underlying transport.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
