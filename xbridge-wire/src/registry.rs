//! Process-wide table from native value shapes to wire variants.
//!
//! Encoding looks a value's [`TypeId`] up in the encoder table; decoding
//! resolves a header tag through the closed [`TypeTag`] set. The table is
//! built once, on first use, and is read-only after that.

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::io::{Read, Write};
use std::sync::OnceLock;

use crate::{BinaryReader, BinaryWriter, Error, MAGIC, Message, Result, TypeTag, Value};

/// A heterogeneous native array; each element is encoded by its own shape.
pub type AnyVec = Vec<Box<dyn Any + Send + Sync>>;

/// Converts a type-erased value of one registered shape into a message.
type EncodeFn = fn(&Registry, &dyn Any) -> Result<Message>;

/// One registered native shape.
#[derive(Debug, Clone, Copy)]
struct Encoder {
    /// Rust type name, for diagnostics.
    name: &'static str,
    /// Conversion routine.
    encode: EncodeFn,
}

/// Maps native value shapes to encoders and header tags to decoders.
#[derive(Debug)]
pub struct Registry {
    /// Encoders keyed by the native type they accept.
    encoders: HashMap<TypeId, Encoder>,
}

static GLOBAL: OnceLock<Registry> = OnceLock::new();

/// Encodes any shape with a `Clone` conversion into [`Value`].
fn via_value<T>(_: &Registry, v: &dyn Any) -> Result<Message>
where
    T: Any + Clone,
    Value: From<T>,
{
    v.downcast_ref::<T>()
        .map(|t| Message::from_value(&Value::from(t.clone())))
        .ok_or_else(|| Error::UnsupportedType(type_name::<T>().to_owned()))
}

/// Encodes a [`Value`] by its own variant.
fn by_variant(_: &Registry, v: &dyn Any) -> Result<Message> {
    v.downcast_ref::<Value>()
        .map(Message::from_value)
        .ok_or_else(|| Error::UnsupportedType(type_name::<Value>().to_owned()))
}

/// Encodes a `&'static str` as a string message.
fn static_str(_: &Registry, v: &dyn Any) -> Result<Message> {
    v.downcast_ref::<&'static str>()
        .map(|s| Message::String((*s).to_owned()))
        .ok_or_else(|| Error::UnsupportedType(type_name::<&str>().to_owned()))
}

/// Encodes each element of a heterogeneous array through the registry.
fn any_vec(registry: &Registry, v: &dyn Any) -> Result<Message> {
    let items = v
        .downcast_ref::<AnyVec>()
        .ok_or_else(|| Error::UnsupportedType(type_name::<AnyVec>().to_owned()))?;
    items
        .iter()
        .map(|item| {
            let item: &dyn Any = item.as_ref();
            registry.encode_dyn(item)
        })
        .collect::<Result<Vec<_>>>()
        .map(Message::ObjectArray)
}

impl Registry {
    /// The process-wide registry.
    pub fn global() -> &'static Self {
        GLOBAL.get_or_init(Self::new)
    }

    /// Builds the table of every supported native shape.
    fn new() -> Self {
        let mut reg = Self {
            encoders: HashMap::new(),
        };
        reg.register::<()>(via_value::<()>);
        reg.register::<bool>(via_value::<bool>);
        reg.register::<u8>(via_value::<u8>);
        reg.register::<i16>(via_value::<i16>);
        reg.register::<i32>(via_value::<i32>);
        reg.register::<i64>(via_value::<i64>);
        reg.register::<f64>(via_value::<f64>);
        reg.register::<String>(via_value::<String>);
        reg.register::<&'static str>(static_str);
        reg.register::<Vec<u8>>(via_value::<Vec<u8>>);
        reg.register::<Vec<i32>>(via_value::<Vec<i32>>);
        reg.register::<Vec<i64>>(via_value::<Vec<i64>>);
        reg.register::<Vec<f64>>(via_value::<Vec<f64>>);
        reg.register::<Vec<String>>(via_value::<Vec<String>>);
        reg.register::<Vec<Value>>(via_value::<Vec<Value>>);
        reg.register::<Value>(by_variant);
        reg.register::<AnyVec>(any_vec);
        tracing::debug!(shapes = reg.encoders.len(), "registry built");
        reg
    }

    /// Adds the encoder for native type `T`.
    fn register<T: Any>(&mut self, encode: EncodeFn) {
        self.encoders.insert(
            TypeId::of::<T>(),
            Encoder {
                name: type_name::<T>(),
                encode,
            },
        );
    }

    /// Returns `true` if values of type `T` can be encoded.
    pub fn supports<T: Any>(&self) -> bool {
        self.encoders.contains_key(&TypeId::of::<T>())
    }

    /// Selects the variant for `value`'s type and builds its message.
    pub fn encode<T: Any>(&self, value: &T) -> Result<Message> {
        if !self.supports::<T>() {
            return Err(Error::UnsupportedType(type_name::<T>().to_owned()));
        }
        self.encode_dyn(value)
    }

    /// Like [`Registry::encode`], for values whose type is only known at runtime.
    pub fn encode_dyn(&self, value: &dyn Any) -> Result<Message> {
        let id = value.type_id();
        let enc = self
            .encoders
            .get(&id)
            .ok_or_else(|| Error::UnsupportedType(format!("{id:?}")))?;
        tracing::trace!(shape = enc.name, "encode");
        (enc.encode)(self, value)
    }

    /// Reads one complete message: magic, tag, then the tag's payload.
    ///
    /// On [`Error::UnknownTag`] only the header has been consumed.
    pub fn read_message<R: Read>(&self, r: &mut BinaryReader<R>) -> Result<Message> {
        let magic = r.read_i32()?;
        if magic != MAGIC {
            tracing::warn!(found = magic, "magic mismatch, stream out of sync");
            return Err(Error::Framing {
                expected: MAGIC,
                found: magic,
            });
        }
        let code = r.read_i32()?;
        let tag = TypeTag::try_from(code).inspect_err(|_| {
            tracing::warn!(tag = code, "no decoder for tag");
        })?;
        tracing::debug!(%tag, "read message");
        Message::read_payload(tag, self, r)
    }

    /// Encodes `value` and writes it as a complete message. Does not flush.
    pub fn write_value<W: Write>(&self, w: &mut BinaryWriter<W>, value: &dyn Any) -> Result<()> {
        self.encode_dyn(value)?.write(w)
    }

    /// Reads a complete message and converts it to its value.
    pub fn read_value<R: Read>(&self, r: &mut BinaryReader<R>) -> Result<Value> {
        self.read_message(r).map(Message::into_value)
    }
}

/// Encodes `value` with the global registry and writes it. Does not flush.
pub fn encode<W: Write, T: Any>(w: &mut BinaryWriter<W>, value: &T) -> Result<()> {
    Registry::global().encode(value)?.write(w)
}

/// Reads one message with the global registry and returns its value.
pub fn decode<R: Read>(r: &mut BinaryReader<R>) -> Result<Value> {
    Registry::global().read_value(r)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn round_trip<T: Any>(v: &T) -> Value {
        let mut w = BinaryWriter::new(Vec::new());
        encode(&mut w, v).unwrap();
        w.flush().unwrap();
        let mut r = BinaryReader::new(Cursor::new(w.get_ref().clone()));
        let out = decode(&mut r).unwrap();
        assert!(r.at_end().unwrap());
        out
    }

    #[test]
    fn scalars_round_trip() {
        assert_eq!(round_trip(&()), Value::Null);
        assert_eq!(round_trip(&true), Value::Bool(true));
        assert_eq!(round_trip(&0xABu8), Value::Byte(0xAB));
        assert_eq!(round_trip(&i16::MIN), Value::Int16(i16::MIN));
        assert_eq!(round_trip(&-42i32), Value::Int32(-42));
        assert_eq!(round_trip(&i64::MIN), Value::Int64(i64::MIN));
        assert_eq!(round_trip(&f64::NAN), Value::Float64(f64::NAN));
        assert_eq!(round_trip(&-0.0f64), Value::Float64(-0.0));
    }

    #[test]
    fn sequences_round_trip() {
        assert_eq!(round_trip(&"hi"), Value::String("hi".into()));
        assert_eq!(round_trip(&String::from("ünï")), Value::String("ünï".into()));
        assert_eq!(round_trip(&vec![0u8, 255]), Value::Bytes(vec![0, 255]));
        assert_eq!(round_trip(&vec![1i32, -1]), Value::Int32Array(vec![1, -1]));
        assert_eq!(round_trip(&vec![i64::MAX]), Value::Int64Array(vec![i64::MAX]));
        assert_eq!(
            round_trip(&vec![1.5f64, f64::NEG_INFINITY]),
            Value::Float64Array(vec![1.5, f64::NEG_INFINITY])
        );
        assert_eq!(
            round_trip(&vec![String::new(), "b".to_owned()]),
            Value::StringArray(vec![String::new(), "b".into()])
        );
    }

    #[test]
    fn empty_arrays_round_trip() {
        assert_eq!(round_trip(&Vec::<i32>::new()), Value::Int32Array(vec![]));
        assert_eq!(round_trip(&Vec::<Value>::new()), Value::Objects(vec![]));
        assert_eq!(round_trip(&AnyVec::new()), Value::Objects(vec![]));
    }

    #[test]
    fn heterogeneous_nested_array_keeps_order_and_types() {
        let mut inner = AnyVec::new();
        inner.push(Box::new("deep"));
        inner.push(Box::new(vec![1.0f64, 2.0]));

        let mut outer = AnyVec::new();
        outer.push(Box::new(1i32));
        outer.push(Box::new(2i64));
        outer.push(Box::new(String::from("two")));
        outer.push(Box::new(inner));
        outer.push(Box::new(3.25f64));

        assert_eq!(
            round_trip(&outer),
            Value::Objects(vec![
                Value::Int32(1),
                Value::Int64(2),
                Value::String("two".into()),
                Value::Objects(vec![
                    Value::String("deep".into()),
                    Value::Float64Array(vec![1.0, 2.0]),
                ]),
                Value::Float64(3.25),
            ])
        );
    }

    #[test]
    fn value_encodes_by_variant() {
        let v = Value::Objects(vec![Value::Int16(3), Value::Objects(vec![Value::Null])]);
        assert_eq!(round_trip(&v), v);
    }

    #[test]
    fn unsupported_shapes_are_rejected() {
        let reg = Registry::global();
        assert!(!reg.supports::<u32>());
        assert!(matches!(reg.encode(&7u32), Err(Error::UnsupportedType(n)) if n == "u32"));
        assert!(matches!(reg.encode(&1.0f32), Err(Error::UnsupportedType(_))));

        let mut mixed = AnyVec::new();
        mixed.push(Box::new(1i32));
        mixed.push(Box::new(2u64));
        assert!(matches!(reg.encode(&mixed), Err(Error::UnsupportedType(_))));
    }

    #[test]
    fn unknown_tag_leaves_reader_usable() {
        let mut w = BinaryWriter::new(Vec::new());
        w.write_i32(MAGIC).unwrap();
        w.write_i32(999).unwrap();
        encode(&mut w, &5i32).unwrap();
        w.flush().unwrap();

        let mut r = BinaryReader::new(Cursor::new(w.get_ref().clone()));
        assert!(matches!(decode(&mut r), Err(Error::UnknownTag(999))));
        assert_eq!(decode(&mut r).unwrap(), Value::Int32(5));
    }

    #[test]
    fn bad_magic_is_framing_error() {
        let mut w = BinaryWriter::new(Vec::new());
        w.write_i32(0x1234).unwrap();
        w.write_i32(TypeTag::Int32.code()).unwrap();
        w.flush().unwrap();

        let mut r = BinaryReader::new(Cursor::new(w.get_ref().clone()));
        assert!(matches!(
            decode(&mut r),
            Err(Error::Framing {
                expected: MAGIC,
                found: 0x1234
            })
        ));
    }

    #[test]
    fn truncated_message_is_connection_closed() {
        let mut w = BinaryWriter::new(Vec::new());
        encode(&mut w, &vec![1i64, 2, 3]).unwrap();
        w.flush().unwrap();
        let mut bytes = w.get_ref().clone();
        bytes.truncate(bytes.len() - 5);

        let mut r = BinaryReader::new(Cursor::new(bytes));
        assert!(matches!(decode(&mut r), Err(Error::ConnectionClosed { .. })));
    }

    /// `levels` object-array headers, each holding the next one.
    fn nested_headers(levels: usize) -> Vec<u8> {
        let mut w = BinaryWriter::new(Vec::new());
        for _ in 0..levels {
            w.write_i32(MAGIC).unwrap();
            w.write_i32(TypeTag::ObjectArray.code()).unwrap();
            w.write_i32(1).unwrap();
        }
        w.flush().unwrap();
        w.get_ref().clone()
    }

    #[test]
    fn hostile_nesting_is_rejected() {
        let mut r = BinaryReader::new(Cursor::new(nested_headers(200_000)));
        assert!(matches!(
            decode(&mut r),
            Err(Error::NestingLimit {
                depth: 129,
                max: 128
            })
        ));
    }

    #[test]
    fn nesting_limit_is_configurable() {
        let v = Value::Objects(vec![Value::Objects(vec![Value::Int32(1)])]);
        let mut w = BinaryWriter::new(Vec::new());
        encode(&mut w, &v).unwrap();
        w.flush().unwrap();
        let bytes = w.get_ref().clone();

        let mut r = BinaryReader::new(Cursor::new(bytes.clone())).max_depth(2);
        assert_eq!(decode(&mut r).unwrap(), v);

        let mut r = BinaryReader::new(Cursor::new(bytes)).max_depth(1);
        assert!(matches!(
            decode(&mut r),
            Err(Error::NestingLimit { depth: 2, max: 1 })
        ));
    }

    #[test]
    fn nesting_depth_unwinds_after_error() {
        let mut bytes = nested_headers(3);
        let mut w = BinaryWriter::new(Vec::new());
        encode(&mut w, &Value::Objects(vec![Value::Objects(vec![])])).unwrap();
        w.flush().unwrap();
        bytes.extend_from_slice(w.get_ref());

        let mut r = BinaryReader::new(Cursor::new(bytes)).max_depth(2);
        assert!(matches!(decode(&mut r), Err(Error::NestingLimit { .. })));
        // count of the rejected array is still on the wire
        assert_eq!(r.read_i32().unwrap(), 1);
        assert_eq!(
            decode(&mut r).unwrap(),
            Value::Objects(vec![Value::Objects(vec![])])
        );
    }

    #[test]
    fn write_value_embeds_messages() {
        let reg = Registry::global();
        let mut w = BinaryWriter::new(Vec::new());
        w.write_str("target").unwrap();
        w.write_u16(2).unwrap();
        reg.write_value(&mut w, &10i32).unwrap();
        reg.write_value(&mut w, &"arg").unwrap();
        w.flush().unwrap();

        let mut r = BinaryReader::new(Cursor::new(w.get_ref().clone()));
        assert_eq!(r.read_string().unwrap(), "target");
        let n = r.read_u16().unwrap();
        let args: Vec<Value> = (0..n).map(|_| reg.read_value(&mut r).unwrap()).collect();
        assert_eq!(args, vec![Value::Int32(10), Value::String("arg".into())]);
    }
}
