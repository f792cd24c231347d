//! Peer commands: serve, send.

use std::net::{TcpListener, TcpStream};

use anyhow::{Context, Result};
use xbridge::Connection;

use crate::{OutputFormat, parse_value, render};

/// Arguments for `xbridge serve`.
#[derive(clap::Args)]
pub struct ServeArgs {
    /// Address to listen on.
    #[arg(short, long, default_value = "127.0.0.1:7070")]
    pub listen: String,
}

/// Arguments for `xbridge send`.
#[derive(clap::Args)]
pub struct SendArgs {
    /// Peer address.
    #[arg(short, long, default_value = "127.0.0.1:7070")]
    pub connect: String,

    /// Writer/reader buffer capacity in bytes.
    #[arg(long, default_value_t = xbridge::DEFAULT_CAPACITY)]
    pub capacity: usize,

    /// Output format.
    #[arg(long, default_value = "table")]
    pub format: OutputFormat,

    /// Values to send, as JSON.
    #[arg(required = true)]
    pub values: Vec<String>,
}

pub fn serve(args: &ServeArgs) -> Result<()> {
    let listener =
        TcpListener::bind(&args.listen).with_context(|| format!("bind {}", args.listen))?;
    eprintln!("listening on {}", listener.local_addr()?);
    xbridge::serve(&listener)?;
    Ok(())
}

pub fn send(args: &SendArgs) -> Result<()> {
    let values = args
        .values
        .iter()
        .map(|v| parse_value(v))
        .collect::<Result<Vec<_>>>()?;

    let stream =
        TcpStream::connect(&args.connect).with_context(|| format!("connect {}", args.connect))?;
    let read = stream.try_clone()?;
    let mut conn = Connection::with_capacity(read, stream, args.capacity);
    tracing::debug!(peer = %args.connect, capacity = args.capacity, "connected");

    for value in &values {
        let reply = conn.call(value).context("exchange with peer")?;
        println!("{}", render(&reply, args.format)?);
    }
    conn.close()?;
    tracing::debug!(messages = values.len(), "exchange complete");
    Ok(())
}
