//! A client implementation of the MonetDB MAPI wire protocol: block
//! framing, challenge/response authentication with redirect handling, and a
//! line-oriented response parser that decodes the server's typed,
//! tuple-based reply format into host values.
//!
//! This crate is the transport and protocol-interpreter layer only. It does
//! not register a `database/sql`-style driver, parse connection URLs, or
//! provide connection pooling; an embedding facade is expected to add
//! those. See [`Session`], [`MapiConnectOptions`], and [`MonetValue`] for
//! the entry points.

mod auth;
mod command;
mod error;
mod frame;
mod io;
mod net;
mod options;
mod response;
mod rows;
mod session;
mod statement;
mod value;

pub use error::{Error, Result};
pub use options::MapiConnectOptions;
pub use response::{ColumnDescription, ResultDescriptor};
pub use rows::Rows;
pub use session::Session;
pub use statement::Statement;
pub use value::{ColumnType, MonetDate, MonetTime, MonetTimestamp, MonetValue};
