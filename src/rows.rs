//! The row iterator returned by [`crate::statement::Statement::rows`].
//!
//! Grounded on the original source's `Rows.Next`/`Rows.fetchNext`
//! (`rows.go`): row exhaustion that the Go source signals with `io.EOF` is
//! modeled here as `Iterator::next` returning `None`, the idiomatic Rust
//! counterpart (see SPEC_FULL.md §7).

use crate::error::Result;
use crate::response::ResultDescriptor;
use crate::session::Session;
use crate::value::MonetValue;

/// Iterates the rows of a statement's result set, fetching additional
/// `Xexport` pages from the server as needed. Each item is one decoded row
/// (one [`MonetValue`] per column).
pub struct Rows<'a> {
    session: &'a mut Session,
    descriptor: ResultDescriptor,
    row_num: i64,
}

impl<'a> Rows<'a> {
    pub(crate) fn new(session: &'a mut Session, descriptor: ResultDescriptor) -> Self {
        Self {
            session,
            descriptor,
            row_num: 0,
        }
    }

    pub fn column_count(&self) -> usize {
        self.descriptor.column_count
    }

    fn buffered_has(&self, row_num: i64) -> bool {
        row_num >= self.descriptor.offset && row_num < self.descriptor.buffered_end()
    }

    fn fetch_more(&mut self) -> Result<()> {
        let Some(command) = self.descriptor.next_fetch(self.row_num) else {
            return Ok(());
        };
        let new_offset = self.descriptor.buffered_end();
        let body = self.session.fetch_page(&command)?;
        self.descriptor.parse(&body)?;
        // An Xexport reply carries QBLOCK + tuple lines, not a fresh header,
        // so the dispatcher never learns the new window's base offset on
        // its own; the caller (who built the command) supplies it.
        self.descriptor.set_offset(new_offset);
        Ok(())
    }
}

impl<'a> Iterator for Rows<'a> {
    type Item = Result<Vec<MonetValue>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.row_num >= self.descriptor.row_count {
            return None;
        }

        if !self.buffered_has(self.row_num) {
            if let Err(e) = self.fetch_more() {
                return Some(Err(e));
            }
            if !self.buffered_has(self.row_num) {
                return None;
            }
        }

        let idx = (self.row_num - self.descriptor.offset) as usize;
        let row = self.descriptor.rows.get(idx).cloned()?;
        self.row_num += 1;
        Some(Ok(row))
    }
}
