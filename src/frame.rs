//! The MAPI block framer (component C1).
//!
//! A logical message on the wire is one or more *frames*. Each frame
//! begins with a 16-bit little-endian header encoding `(length << 1) |
//! last`, followed by exactly `length` payload bytes. A receiver reads
//! frames until it sees one with `last == 1`; a sender emits `last = 1` on
//! exactly the frame whose payload is strictly shorter than
//! [`MAX_PACKAGE_LENGTH`] (emitting an empty trailing frame when the
//! logical payload is an exact multiple of that size).

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::net::TcpStream;

use crate::error::{err_protocol, Result};
use crate::io::BufStream;

/// Maximum payload size of a single frame: `(1024 * 8) - 2`, matching both
/// the distilled spec and the original Go driver's `mapi_MAX_PACKAGE_LENGTH`.
pub const MAX_PACKAGE_LENGTH: usize = 8190;

/// Reads and writes length-prefixed MAPI blocks over a single TCP socket.
pub(crate) struct Framer {
    stream: BufStream,
}

impl Framer {
    pub(crate) fn new(socket: TcpStream) -> Self {
        Self {
            stream: BufStream::new(socket),
        }
    }

    /// Writes `payload` as one or more frames and flushes them to the
    /// socket as a single write so that no other caller can interleave a
    /// frame of its own between this message's header and payload bytes.
    pub(crate) fn put_block(&mut self, payload: &[u8]) -> Result<()> {
        let mut pos = 0;
        loop {
            let end = std::cmp::min(pos + MAX_PACKAGE_LENGTH, payload.len());
            let chunk = &payload[pos..end];
            let last = chunk.len() < MAX_PACKAGE_LENGTH;

            let header = ((chunk.len() as u16) << 1) | (last as u16);
            let mut header_bytes = [0u8; 2];
            (&mut header_bytes[..]).write_u16::<LittleEndian>(header)?;

            self.stream.stage(&header_bytes);
            self.stream.stage(chunk);

            pos = end;
            if last {
                break;
            }
        }
        self.stream.flush()
    }

    /// Reads frames until `last == 1` and returns the concatenated payload.
    pub(crate) fn get_block(&mut self) -> Result<Vec<u8>> {
        let mut payload = Vec::new();
        loop {
            let header_bytes = self.stream.read_exact(2)?;
            let header = (&header_bytes[..]).read_u16::<LittleEndian>()?;
            let length = (header >> 1) as usize;
            let last = header & 1 == 1;

            if length > MAX_PACKAGE_LENGTH {
                return Err(err_protocol!(
                    "frame length {length} exceeds MAX_PACKAGE_LENGTH ({MAX_PACKAGE_LENGTH})"
                ));
            }

            if length > 0 {
                payload.extend_from_slice(&self.stream.read_exact(length)?);
            }

            if last {
                break;
            }
        }
        Ok(payload)
    }

    /// Unwraps the framer back into the raw socket, e.g. to hand the
    /// now-authenticated connection off to the higher-level session.
    pub(crate) fn into_socket(self) -> Result<TcpStream> {
        Ok(self.stream.into_socket())
    }
}
