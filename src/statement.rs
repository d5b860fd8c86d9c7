//! The statement handle returned by [`crate::session::Session::execute`]:
//! exposes the parsed result metadata and hands off to [`crate::rows::Rows`]
//! for row iteration.

use crate::response::{ColumnDescription, ResultDescriptor};
use crate::rows::Rows;
use crate::session::Session;

/// One statement's execution result: metadata plus (for `SELECT`-shaped
/// queries) the means to iterate its rows.
pub struct Statement<'a> {
    session: &'a mut Session,
    descriptor: ResultDescriptor,
}

impl<'a> Statement<'a> {
    pub(crate) fn new(session: &'a mut Session, descriptor: ResultDescriptor) -> Self {
        Self { session, descriptor }
    }

    /// The query identifier assigned by the server, or `-1` if this
    /// statement produced no query (e.g. DDL).
    pub fn query_id(&self) -> i64 {
        self.descriptor.query_id
    }

    /// Total row count for a `SELECT`, or affected-row count for an
    /// update/insert/delete.
    pub fn row_count(&self) -> i64 {
        self.descriptor.row_count
    }

    /// The last auto-generated row id, populated by `QUPDATE` results.
    pub fn last_row_id(&self) -> i64 {
        self.descriptor.last_row_id
    }

    pub fn column_count(&self) -> usize {
        self.descriptor.column_count
    }

    pub fn columns(&self) -> &[ColumnDescription] {
        &self.descriptor.columns
    }

    /// The server-assigned handle from a `QPREPARE` response, if this
    /// statement was a `PREPARE`. Unused by the current `execute` path
    /// beyond being carried for forward compatibility (see SPEC_FULL.md
    /// §9's open-question resolution).
    pub fn exec_id(&self) -> Option<i64> {
        self.descriptor.exec_id
    }

    /// Consumes this statement and returns an iterator over its rows,
    /// fetching additional pages from the server transparently as the
    /// buffered window is exhausted.
    pub fn rows(self) -> Rows<'a> {
        Rows::new(self.session, self.descriptor)
    }
}
