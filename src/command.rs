//! The command channel (component C3): sends one MAPI request and
//! classifies the reply, per SPEC_FULL.md §4.3.

use crate::error::{err_protocol, Error, Result};
use crate::frame::Framer;

/// The three-byte sentinel the server sends instead of a real reply when it
/// wants more input on the current command (e.g. a multi-statement script
/// split across blocks). Compared for whole-body equality, not as a prefix.
const MORE: &[u8] = &[0x01, 0x02, 0x0A];

/// Sends `op` and returns the text the caller should act on: empty for a
/// bare prompt/ack, the trailing text of an `=OK`, or the raw result body
/// for C4 to parse. Bounded to at most one MORE-driven recursion.
pub(crate) fn cmd(framer: &mut Framer, op: &str) -> Result<String> {
    cmd_inner(framer, op, true)
}

fn cmd_inner(framer: &mut Framer, op: &str, allow_more: bool) -> Result<String> {
    framer.put_block(op.as_bytes())?;
    let resp = framer.get_block()?;

    if resp.is_empty() {
        return Ok(String::new());
    }
    if resp == MORE {
        if !allow_more {
            return Err(err_protocol!("server requested MORE more than once for a single command"));
        }
        return cmd_inner(framer, "", false);
    }

    let text = String::from_utf8_lossy(&resp);
    if let Some(rest) = text.strip_prefix("=OK") {
        return Ok(rest.trim().to_string());
    }
    if text.starts_with('&') || text.starts_with('%') || text.starts_with('[') {
        return Ok(text.into_owned());
    }
    if let Some(rest) = text.strip_prefix('!') {
        return Err(Error::Server(rest.trim().to_string()));
    }

    Err(err_protocol!("unknown command reply state: {text:?}"))
}

/// Sends a SQL statement: `"s" + sql + ";"`.
pub(crate) fn execute(framer: &mut Framer, sql: &str) -> Result<String> {
    cmd(framer, &format!("s{sql};"))
}

/// Sends a MAPI control command (e.g. `"Xexport <qid> <offset> <count>"`)
/// verbatim.
pub(crate) fn x(framer: &mut Framer, command: &str) -> Result<String> {
    cmd(framer, command)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::thread;

    fn loopback_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client = thread::spawn(move || TcpStream::connect(addr).unwrap());
        let (server, _) = listener.accept().unwrap();
        (client.join().unwrap(), server)
    }

    fn write_block(socket: &mut TcpStream, payload: &[u8]) {
        let header = ((payload.len() as u16) << 1) | 1;
        socket.write_all(&header.to_le_bytes()).unwrap();
        socket.write_all(payload).unwrap();
    }

    fn read_block(socket: &mut TcpStream) -> Vec<u8> {
        let mut header = [0u8; 2];
        socket.read_exact(&mut header).unwrap();
        let header = u16::from_le_bytes(header);
        let length = (header >> 1) as usize;
        let mut payload = vec![0u8; length];
        socket.read_exact(&mut payload).unwrap();
        payload
    }

    #[test]
    fn empty_reply_yields_empty_string() {
        let (client, mut server) = loopback_pair();
        let server_thread = thread::spawn(move || {
            let _req = read_block(&mut server);
            write_block(&mut server, b"");
        });

        let mut framer = Framer::new(client);
        assert_eq!(cmd(&mut framer, "sSELECT 1;").unwrap(), "");
        server_thread.join().unwrap();
    }

    #[test]
    fn ok_reply_returns_trailing_text() {
        let (client, mut server) = loopback_pair();
        let server_thread = thread::spawn(move || {
            let _req = read_block(&mut server);
            write_block(&mut server, b"=OK some detail");
        });

        let mut framer = Framer::new(client);
        assert_eq!(cmd(&mut framer, "sSELECT 1;").unwrap(), "some detail");
        server_thread.join().unwrap();
    }

    #[test]
    fn result_body_is_returned_verbatim() {
        let (client, mut server) = loopback_pair();
        let body = b"&1 17 2 1\n% name # name\n% int # type\n[ 7 ]\n[ 8 ]\n";
        let server_thread = thread::spawn(move || {
            let _req = read_block(&mut server);
            write_block(&mut server, body);
        });

        let mut framer = Framer::new(client);
        let got = cmd(&mut framer, "sSELECT name FROM t;").unwrap();
        assert_eq!(got.as_bytes(), body);
        server_thread.join().unwrap();
    }

    #[test]
    fn server_error_surfaces_as_server_error() {
        let (client, mut server) = loopback_pair();
        let server_thread = thread::spawn(move || {
            let _req = read_block(&mut server);
            write_block(&mut server, b"!syntax error near SELECT");
        });

        let mut framer = Framer::new(client);
        let err = cmd(&mut framer, "sSELEC 1;").unwrap_err();
        assert!(matches!(err, Error::Server(msg) if msg == "syntax error near SELECT"));
        server_thread.join().unwrap();
    }

    #[test]
    fn more_sentinel_recurses_once_then_returns_final_reply() {
        let (client, mut server) = loopback_pair();
        let server_thread = thread::spawn(move || {
            let _req = read_block(&mut server);
            write_block(&mut server, &[0x01, 0x02, 0x0A]);
            let ack = read_block(&mut server);
            assert!(ack.is_empty());
            write_block(&mut server, b"=OK done");
        });

        let mut framer = Framer::new(client);
        assert_eq!(cmd(&mut framer, "sBEGIN;").unwrap(), "done");
        server_thread.join().unwrap();
    }

    #[test]
    fn execute_wraps_sql_in_s_prefix_and_semicolon() {
        let (client, mut server) = loopback_pair();
        let server_thread = thread::spawn(move || {
            let req = read_block(&mut server);
            assert_eq!(req, b"sSELECT 1;");
            write_block(&mut server, b"");
        });

        let mut framer = Framer::new(client);
        execute(&mut framer, "SELECT 1").unwrap();
        server_thread.join().unwrap();
    }
}
