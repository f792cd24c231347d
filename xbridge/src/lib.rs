//! Duplex connections for exchanging values between runtimes.
//!
//! `xbridge` pairs a buffered reader and writer from [`xbridge_wire`] over
//! each half of an established socket. Establishing the socket (addressing,
//! authentication) is up to the caller.
//!
//! # Quick start
//!
//! ```no_run
//! use std::net::TcpStream;
//!
//! use xbridge::{AnyVec, Connection, Value};
//!
//! let mut conn = Connection::tcp(TcpStream::connect("127.0.0.1:7070")?)?;
//!
//! let mut args = AnyVec::new();
//! args.push(Box::new(42i32));
//! args.push(Box::new(vec![1.0f64, 2.0]));
//!
//! let reply = conn.call(&args)?;
//! assert!(matches!(reply, Value::Objects(_)));
//! conn.close()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod conn;
mod echo;

pub use conn::Connection;
pub use echo::{echo, serve};
pub use xbridge_wire::{
    AnyVec, BinaryReader, BinaryWriter, Close, DEFAULT_CAPACITY, Error, MAGIC, Message, Registry,
    Result, TypeTag, Value,
};
