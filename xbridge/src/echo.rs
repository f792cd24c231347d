//! Echo peer: reads every message a client sends and writes it back
//! unchanged. Used to check that an independent implementation reproduces
//! values bit-exact.

use std::io::{self, Read, Write};
use std::net::TcpListener;
use std::thread;

use xbridge_wire::{Close, Result};

use crate::Connection;

/// Accepts connections forever, echoing each on its own thread.
///
/// A client that fails during setup is logged and skipped; only a listener
/// failure ends the loop.
pub fn serve(listener: &TcpListener) -> io::Result<()> {
    tracing::info!(addr = %listener.local_addr()?, "echo peer listening");

    loop {
        let (stream, peer) = match listener.accept() {
            Ok(accepted) => accepted,
            Err(e) if is_per_connection(&e) => {
                tracing::warn!(error = %e, "accept failed");
                continue;
            }
            Err(e) => return Err(e),
        };
        let conn = match Connection::tcp(stream) {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!(%peer, error = %e, "connection setup failed");
                continue;
            }
        };
        tracing::debug!(%peer, "accepted");
        thread::spawn(move || match echo(conn) {
            Ok(n) => tracing::debug!(%peer, messages = n, "session finished"),
            Err(e) => tracing::error!(%peer, error = %e, "session failed"),
        });
    }
}

/// Accept errors caused by one client rather than the listener.
fn is_per_connection(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::Interrupted
    )
}

/// Echoes messages until the peer disconnects between messages, then
/// closes. Returns the number of messages echoed.
pub fn echo<R: Read, W: Write + Close>(mut conn: Connection<R, W>) -> Result<usize> {
    let mut count = 0;
    while let Some(msg) = conn.next_message()? {
        conn.send_message(&msg)?;
        count += 1;
    }
    // peer already hung up
    if let Err(e) = conn.close() {
        tracing::debug!(error = %e, "close after disconnect");
    }
    Ok(count)
}
