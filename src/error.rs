use std::fmt;
use std::io;

/// The single error type returned by every fallible operation in this crate.
///
/// Each variant corresponds to one of the error kinds distinguished by the
/// MAPI core: transport failures surface the underlying [`io::Error`],
/// protocol violations and server-side failures carry the offending text,
/// and [`Error::NotConnected`] guards the READY-only precondition on
/// [`crate::command`].
#[derive(Debug)]
pub enum Error {
    /// An I/O failure on the underlying socket. The session should be
    /// considered dead and transitioned back to `INIT`.
    Io(io::Error),

    /// A malformed frame, an unrecognized response-line prefix, or any
    /// other violation of the MAPI wire format that isn't specific to
    /// authentication.
    Protocol(String),

    /// The server rejected the handshake (a `!`-prefixed prompt during
    /// `login`), or the handshake could not proceed (unsupported protocol
    /// version, unsupported hash algorithm, redirect cap reached).
    Authentication(String),

    /// The server replied with a `!`-prefixed error to a command issued
    /// after the handshake completed.
    Server(String),

    /// A cell could not be decoded under its declared column type, or a
    /// host value has no MAPI literal encoding.
    Type(String),

    /// A command was issued while the session was not in the `READY`
    /// state.
    NotConnected,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "transport error: {e}"),
            Error::Protocol(msg) => write!(f, "protocol error: {msg}"),
            Error::Authentication(msg) => write!(f, "authentication failed: {msg}"),
            Error::Server(msg) => write!(f, "server error: {msg}"),
            Error::Type(msg) => write!(f, "type error: {msg}"),
            Error::NotConnected => write!(f, "not connected"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

/// Builds an [`Error::Protocol`] with a formatted message, mirroring the
/// `err_protocol!` convention used throughout the teacher driver's
/// protocol modules (e.g. its mssql and mysql packet decoders).
macro_rules! err_protocol {
    ($($arg:tt)*) => {
        $crate::error::Error::Protocol(format!($($arg)*))
    };
}

pub(crate) use err_protocol;

pub type Result<T> = std::result::Result<T, Error>;
