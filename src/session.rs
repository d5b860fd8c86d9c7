//! The thin session facade: a `Connect`-to-`READY` state machine over the
//! handshake (C2) and command channel (C3), mirroring the shape of the
//! original source's `MapiConn`/`conn.go` pair but exposing a blocking,
//! directly-constructed API rather than a `database/sql` driver.

use crate::auth;
use crate::command;
use crate::error::{Error, Result};
use crate::frame::Framer;
use crate::net;
use crate::options::MapiConnectOptions;
use crate::response::ResultDescriptor;
use crate::statement::Statement;

/// A session's connection state, per SPEC_FULL.md §3's `{INIT, READY}`
/// lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Init,
    Ready,
}

/// An authenticated MAPI connection. Not safe for concurrent use from
/// multiple threads (see SPEC_FULL.md §5) — a single session handles one
/// request/response turn at a time.
pub struct Session {
    framer: Option<Framer>,
    options: MapiConnectOptions,
    state: State,
}

impl Session {
    /// Connects to the server and runs the handshake, returning a session
    /// in the `READY` state.
    ///
    /// `options.database` must already be set: unlike the original DSN
    /// parser (which silently accepts a bare `"localhost"` with no
    /// database), this core treats an absent database as a caller error
    /// rather than defaulting it (see SPEC_FULL.md §9).
    pub fn connect(options: MapiConnectOptions) -> Result<Self> {
        if options.database.is_empty() {
            return Err(Error::Protocol(
                "MapiConnectOptions::database must be set before connecting".to_string(),
            ));
        }

        log::debug!("connecting to {}:{}", options.host, options.port);
        let socket = net::connect(&options.host, options.port)?;
        let socket = auth::login(socket, &options)?;
        log::debug!("MAPI handshake complete, session ready");

        Ok(Self {
            framer: Some(Framer::new(socket)),
            options,
            state: State::Ready,
        })
    }

    /// Closes the socket and returns the session to `INIT`. Further calls
    /// to [`execute`](Self::execute) fail with [`Error::NotConnected`]
    /// until [`connect`](Self::connect) is called again on a fresh
    /// `Session`.
    pub fn disconnect(&mut self) {
        self.framer = None;
        self.state = State::Init;
    }

    pub fn is_ready(&self) -> bool {
        self.state == State::Ready
    }

    pub fn options(&self) -> &MapiConnectOptions {
        &self.options
    }

    /// Sends one SQL statement and parses its result body into a
    /// [`Statement`] borrowing this session for any follow-up row paging.
    pub fn execute(&mut self, sql: &str) -> Result<Statement<'_>> {
        let body = {
            let framer = self.framer_mut()?;
            command::execute(framer, sql)?
        };

        let mut descriptor = ResultDescriptor::new();
        if is_result_body(&body) {
            descriptor.parse(&body)?;
        }

        Ok(Statement::new(self, descriptor))
    }

    /// Two one-line helpers over `execute`, grounded on the original
    /// source's `Tx.Commit`/`Tx.Rollback` (transaction control is plain SQL
    /// on this wire, not a distinct MAPI command).
    pub fn commit(&mut self) -> Result<()> {
        self.execute("COMMIT")?;
        Ok(())
    }

    pub fn rollback(&mut self) -> Result<()> {
        self.execute("ROLLBACK")?;
        Ok(())
    }

    pub(crate) fn fetch_page(&mut self, xexport_command: &str) -> Result<String> {
        let framer = self.framer_mut()?;
        command::x(framer, xexport_command)
    }

    fn framer_mut(&mut self) -> Result<&mut Framer> {
        if self.state != State::Ready {
            return Err(Error::NotConnected);
        }
        self.framer.as_mut().ok_or(Error::NotConnected)
    }
}

/// A `cmd`/C3 reply is a result body (for C4) only when it carries one of
/// the `&`/`%`/`[` prefixes; an empty ack or `=OK` trailing text is not.
fn is_result_body(body: &str) -> bool {
    body.starts_with('&') || body.starts_with('%') || body.starts_with('[')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_rejects_missing_database() {
        let options = MapiConnectOptions::new().with_username("monetdb").with_password("monetdb");
        let err = Session::connect(options).unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }
}
