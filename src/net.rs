use std::net::TcpStream;
use std::time::Duration;

use crate::error::Result;

/// Opens a plain TCP connection to `host:port` with the socket options the
/// MAPI handshake expects: `TCP_NODELAY` enabled and keepalive explicitly
/// disabled, mirroring `conn.SetKeepAlive(false)` / `conn.SetNoDelay(true)`
/// in the original driver's connect path and the teacher's own
/// `MssqlStream::connect` (`TcpStream::connect((&*options.host,
/// options.port))` in `mssql/connection/stream.rs`).
///
/// TLS is out of scope (see spec Non-goals); this always returns a raw
/// socket.
pub(crate) fn connect(host: &str, port: u16) -> Result<TcpStream> {
    let socket = TcpStream::connect((host, port))?;
    socket.set_nodelay(true)?;
    Ok(socket)
}

/// No core-imposed timeout (spec §5): this is exposed so an embedder can
/// opt in, it is never called internally.
#[allow(dead_code)]
pub(crate) fn set_timeouts(socket: &TcpStream, timeout: Option<Duration>) -> Result<()> {
    socket.set_read_timeout(timeout)?;
    socket.set_write_timeout(timeout)?;
    Ok(())
}
