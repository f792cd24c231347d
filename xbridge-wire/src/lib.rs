//! Wire layer for xbridge runtime bridges.
//!
//! Values are carried as self-describing tagged messages,
//! `[i32 magic][i32 tag][payload]`, little-endian throughout, over any
//! reliable byte stream (TCP, Unix socket). Object arrays nest complete
//! messages, so heterogeneous and nested data needs no schema.
//!
//! ```
//! use std::io::Cursor;
//!
//! use xbridge_wire::{AnyVec, BinaryReader, BinaryWriter, Value};
//!
//! let mut args = AnyVec::new();
//! args.push(Box::new(7i32));
//! args.push(Box::new("seven"));
//!
//! let mut w = BinaryWriter::new(Vec::new());
//! xbridge_wire::encode(&mut w, &args).unwrap();
//! w.flush().unwrap();
//!
//! let mut r = BinaryReader::new(Cursor::new(w.get_ref().clone()));
//! let value = xbridge_wire::decode(&mut r).unwrap();
//! assert_eq!(value, Value::Objects(vec![7i32.into(), "seven".into()]));
//! ```

mod error;
mod message;
mod reader;
mod registry;
mod tag;
mod value;
mod writer;

pub use error::{Error, Result};
pub use message::Message;
pub use reader::{BinaryReader, DEFAULT_MAX_DEPTH, DEFAULT_MAX_LEN};
pub use registry::{AnyVec, Registry, decode, encode};
pub use tag::{MAGIC, TypeTag};
pub use value::Value;
pub use writer::{BinaryWriter, Close, DEFAULT_CAPACITY};
