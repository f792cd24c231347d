//! Tagged messages: the unit of transport.
//!
//! A message on the wire is `[i32 MAGIC][i32 tag][payload]`. The header is
//! written by [`Message::write`] and parsed once by
//! [`Registry::read_message`](crate::Registry::read_message); payload code
//! here never touches it. Object arrays nest complete messages, each with
//! its own header, so elements of any shape can be mixed without a schema.

use std::io::{Read, Write};

use crate::writer::wire_len;
use crate::{BinaryReader, BinaryWriter, MAGIC, Registry, Result, TypeTag, Value};

/// A decoded or ready-to-send message.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Message {
    /// No payload.
    Null,
    /// One-byte boolean.
    Bool(bool),
    /// One unsigned byte.
    Byte(u8),
    /// 2-byte signed integer.
    Int16(i16),
    /// 4-byte signed integer.
    Int32(i32),
    /// 8-byte signed integer.
    Int64(i64),
    /// 8-byte double.
    Float64(f64),
    /// Length-prefixed UTF-8 text.
    String(String),
    /// Length-prefixed raw bytes.
    Bytes(Vec<u8>),
    /// Count-prefixed 4-byte integers.
    Int32Array(Vec<i32>),
    /// Count-prefixed 8-byte integers.
    Int64Array(Vec<i64>),
    /// Count-prefixed doubles.
    Float64Array(Vec<f64>),
    /// Count-prefixed strings.
    StringArray(Vec<String>),
    /// Count-prefixed sequence of complete sub-messages.
    ObjectArray(Vec<Self>),
}

impl Message {
    /// The tag written in this message's header.
    pub const fn tag(&self) -> TypeTag {
        match self {
            Self::Null => TypeTag::Null,
            Self::Bool(_) => TypeTag::Bool,
            Self::Byte(_) => TypeTag::Byte,
            Self::Int16(_) => TypeTag::Int16,
            Self::Int32(_) => TypeTag::Int32,
            Self::Int64(_) => TypeTag::Int64,
            Self::Float64(_) => TypeTag::Float64,
            Self::String(_) => TypeTag::String,
            Self::Bytes(_) => TypeTag::Bytes,
            Self::Int32Array(_) => TypeTag::Int32Array,
            Self::Int64Array(_) => TypeTag::Int64Array,
            Self::Float64Array(_) => TypeTag::Float64Array,
            Self::StringArray(_) => TypeTag::StringArray,
            Self::ObjectArray(_) => TypeTag::ObjectArray,
        }
    }

    /// Builds the message that carries `value`.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(v) => Self::Bool(*v),
            Value::Byte(v) => Self::Byte(*v),
            Value::Int16(v) => Self::Int16(*v),
            Value::Int32(v) => Self::Int32(*v),
            Value::Int64(v) => Self::Int64(*v),
            Value::Float64(v) => Self::Float64(*v),
            Value::String(v) => Self::String(v.clone()),
            Value::Bytes(v) => Self::Bytes(v.clone()),
            Value::Int32Array(v) => Self::Int32Array(v.clone()),
            Value::Int64Array(v) => Self::Int64Array(v.clone()),
            Value::Float64Array(v) => Self::Float64Array(v.clone()),
            Value::StringArray(v) => Self::StringArray(v.clone()),
            Value::Objects(v) => Self::ObjectArray(v.iter().map(Self::from_value).collect()),
        }
    }

    /// Converts the payload into the value the caller works with.
    pub fn to_value(&self) -> Value {
        self.clone().into_value()
    }

    /// Like [`Message::to_value`], reusing the payload's allocations.
    pub fn into_value(self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(v) => Value::Bool(v),
            Self::Byte(v) => Value::Byte(v),
            Self::Int16(v) => Value::Int16(v),
            Self::Int32(v) => Value::Int32(v),
            Self::Int64(v) => Value::Int64(v),
            Self::Float64(v) => Value::Float64(v),
            Self::String(v) => Value::String(v),
            Self::Bytes(v) => Value::Bytes(v),
            Self::Int32Array(v) => Value::Int32Array(v),
            Self::Int64Array(v) => Value::Int64Array(v),
            Self::Float64Array(v) => Value::Float64Array(v),
            Self::StringArray(v) => Value::StringArray(v),
            Self::ObjectArray(v) => Value::Objects(v.into_iter().map(Self::into_value).collect()),
        }
    }

    /// Writes header then payload. Does not flush.
    pub fn write<W: Write>(&self, w: &mut BinaryWriter<W>) -> Result<()> {
        tracing::debug!(tag = %self.tag(), "write message");
        w.write_i32(MAGIC)?;
        w.write_i32(self.tag().code())?;
        self.write_payload(w)
    }

    /// Writes the payload only.
    fn write_payload<W: Write>(&self, w: &mut BinaryWriter<W>) -> Result<()> {
        match self {
            Self::Null => Ok(()),
            Self::Bool(v) => w.write_bool(*v),
            Self::Byte(v) => w.write_u8(*v),
            Self::Int16(v) => w.write_i16(*v),
            Self::Int32(v) => w.write_i32(*v),
            Self::Int64(v) => w.write_i64(*v),
            Self::Float64(v) => w.write_f64(*v),
            Self::String(v) => w.write_str(v),
            Self::Bytes(v) => w.write_bytes(v, true),
            Self::Int32Array(v) => w.write_i32_array(v, true),
            Self::Int64Array(v) => w.write_i64_array(v, true),
            Self::Float64Array(v) => w.write_f64_array(v, true),
            Self::StringArray(v) => w.write_str_array(v, true),
            Self::ObjectArray(items) => {
                w.write_i32(wire_len(items.len())?)?;
                items.iter().try_for_each(|m| m.write(w))
            }
        }
    }

    /// Reads the payload for `tag`; the header has already been consumed.
    pub(crate) fn read_payload<R: Read>(
        tag: TypeTag,
        registry: &Registry,
        r: &mut BinaryReader<R>,
    ) -> Result<Self> {
        Ok(match tag {
            TypeTag::Null => Self::Null,
            TypeTag::Bool => Self::Bool(r.read_bool()?),
            TypeTag::Byte => Self::Byte(r.read_u8()?),
            TypeTag::Int16 => Self::Int16(r.read_i16()?),
            TypeTag::Int32 => Self::Int32(r.read_i32()?),
            TypeTag::Int64 => Self::Int64(r.read_i64()?),
            TypeTag::Float64 => Self::Float64(r.read_f64()?),
            TypeTag::String => Self::String(r.read_string()?),
            TypeTag::Bytes => Self::Bytes(r.read_bytes(None)?),
            TypeTag::Int32Array => Self::Int32Array(r.read_i32_array(None)?),
            TypeTag::Int64Array => Self::Int64Array(r.read_i64_array(None)?),
            TypeTag::Float64Array => Self::Float64Array(r.read_f64_array(None)?),
            TypeTag::StringArray => Self::StringArray(r.read_string_array(None)?),
            TypeTag::ObjectArray => {
                r.descend()?;
                let items = r.read_len().and_then(|count| {
                    (0..count)
                        .map(|_| registry.read_message(r))
                        .collect::<Result<Vec<_>>>()
                });
                r.ascend();
                Self::ObjectArray(items?)
            }
        })
    }
}

impl From<Value> for Message {
    fn from(value: Value) -> Self {
        Self::from_value(&value)
    }
}

impl From<Message> for Value {
    fn from(msg: Message) -> Self {
        msg.into_value()
    }
}
