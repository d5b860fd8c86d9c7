use std::io::{Read, Write};
use std::net::TcpStream;

use crate::error::Result;

/// A buffered wrapper around a blocking [`TcpStream`], in the shape of the
/// teacher driver's `BufStream` (see `mssql/connection/stream.rs`, which
/// reads fixed-size headers with `self.inner.read(8)` and accumulates
/// payload bytes with `read_raw_into`, writing through a `wbuf` staging
/// buffer that is flushed explicitly). MAPI has no TLS upgrade and no
/// packet splitting beyond the block framer itself, so this is
/// considerably thinner than the teacher's version: one socket, one read
/// buffer, one write buffer.
pub(crate) struct BufStream {
    socket: TcpStream,
    rbuf: Vec<u8>,
    wbuf: Vec<u8>,
}

impl BufStream {
    pub(crate) fn new(socket: TcpStream) -> Self {
        Self {
            socket,
            rbuf: Vec::with_capacity(8192),
            wbuf: Vec::new(),
        }
    }

    /// Reads exactly `n` bytes, looping over short reads.
    pub(crate) fn read_exact(&mut self, n: usize) -> Result<Vec<u8>> {
        self.rbuf.clear();
        self.rbuf.resize(n, 0);
        self.socket.read_exact(&mut self.rbuf)?;
        Ok(std::mem::take(&mut self.rbuf))
    }

    /// Stages bytes for the next [`flush`](Self::flush) without writing to
    /// the socket yet, so a caller can assemble a whole logical block (one
    /// or more frames) before performing the syscall.
    pub(crate) fn stage(&mut self, bytes: &[u8]) {
        self.wbuf.extend_from_slice(bytes);
    }

    /// Writes the staged bytes to the socket and clears the write buffer.
    pub(crate) fn flush(&mut self) -> Result<()> {
        self.socket.write_all(&self.wbuf)?;
        self.socket.flush()?;
        self.wbuf.clear();
        Ok(())
    }

    pub(crate) fn into_socket(self) -> TcpStream {
        self.socket
    }
}
