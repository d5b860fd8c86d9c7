//! End-to-end exercise of the handshake, command channel, and response
//! parser over a real loopback socket, driven by a scripted fake MonetDB
//! server running on a spawned thread — the sync counterpart of the
//! teacher's own packet-level stream tests, extended to a full round trip.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;

use monetdb_mapi::{MapiConnectOptions, MonetValue, Session};

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
fn connect_execute_and_iterate_rows() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let server = thread::spawn(move || {
        let (mut socket, _) = listener.accept().unwrap();

        write_block(&mut socket, b"saltvalue:x:9:MD5,SHA1:x:SHA512");
        let response = read_block(&mut socket);
        assert!(String::from_utf8_lossy(&response).starts_with("BIG:monetdb:"));
        write_block(&mut socket, b"");

        let query = read_block(&mut socket);
        assert_eq!(query, b"sSELECT name, age FROM people;");
        write_block(
            &mut socket,
            b"&1 7 2 2\n% name,\tage # name\n% varchar,\tint # type\n[ 'alice',\t30 ]\n[ 'bob',\t41 ]\n",
        );
    });

    let options = MapiConnectOptions::new()
        .with_host(addr.ip().to_string())
        .with_port(addr.port())
        .with_username("monetdb")
        .with_password("monetdb")
        .with_database("demo");

    let mut session = Session::connect(options).unwrap();
    assert!(session.is_ready());

    let statement = session.execute("SELECT name, age FROM people").unwrap();
    assert_eq!(statement.row_count(), 2);
    assert_eq!(statement.column_count(), 2);
    assert_eq!(statement.columns()[0].name, "name");
    assert_eq!(statement.columns()[1].name, "age");

    let rows: Vec<Vec<MonetValue>> = statement.rows().collect::<Result<_, _>>().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0], vec![MonetValue::Str("alice".to_string()), MonetValue::Int(30)]);
    assert_eq!(rows[1], vec![MonetValue::Str("bob".to_string()), MonetValue::Int(41)]);

    server.join().unwrap();
}

#[test]
fn connect_fails_without_database() {
    let options = MapiConnectOptions::new().with_username("monetdb").with_password("monetdb");
    assert!(Session::connect(options).is_err());
}
