//! Wire type tags and the framing marker.
//!
//! Every message starts with `[i32 MAGIC][i32 tag]`, little-endian. The tag
//! set is closed: both ends of a bridge know all of it, and there is no
//! version negotiation.

use std::fmt;

use crate::Error;

/// Sentinel written before every tag, used to detect stream desynchronization.
pub const MAGIC: i32 = 0x5842_5247;

/// Identifies the payload shape that follows a message header.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum TypeTag {
    /// No payload.
    Null = 0,
    /// One byte, zero or non-zero.
    Bool = 1,
    /// One unsigned byte.
    Byte = 2,
    /// 2-byte signed integer.
    Int16 = 3,
    /// 4-byte signed integer.
    Int32 = 4,
    /// 8-byte signed integer.
    Int64 = 5,
    /// 8-byte IEEE-754 double.
    Float64 = 6,
    /// Length-prefixed UTF-8 text.
    String = 7,
    /// Length-prefixed raw bytes.
    Bytes = 8,
    /// Count-prefixed 4-byte integers.
    Int32Array = 9,
    /// Count-prefixed 8-byte integers.
    Int64Array = 10,
    /// Count-prefixed doubles.
    Float64Array = 11,
    /// Count-prefixed strings.
    StringArray = 12,
    /// Count-prefixed sequence of complete, self-describing messages.
    ObjectArray = 13,
}

impl TypeTag {
    /// All tags, in wire order.
    pub const ALL: [Self; 14] = [
        Self::Null,
        Self::Bool,
        Self::Byte,
        Self::Int16,
        Self::Int32,
        Self::Int64,
        Self::Float64,
        Self::String,
        Self::Bytes,
        Self::Int32Array,
        Self::Int64Array,
        Self::Float64Array,
        Self::StringArray,
        Self::ObjectArray,
    ];

    /// The tag's wire representation.
    pub const fn code(self) -> i32 {
        self as i32
    }

    /// Short lowercase name, used in logs and dumps.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool => "bool",
            Self::Byte => "byte",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Float64 => "float64",
            Self::String => "string",
            Self::Bytes => "bytes",
            Self::Int32Array => "int32[]",
            Self::Int64Array => "int64[]",
            Self::Float64Array => "float64[]",
            Self::StringArray => "string[]",
            Self::ObjectArray => "object[]",
        }
    }
}

impl TryFrom<i32> for TypeTag {
    type Error = Error;

    fn try_from(code: i32) -> Result<Self, Error> {
        usize::try_from(code)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
            .ok_or(Error::UnknownTag(code))
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
