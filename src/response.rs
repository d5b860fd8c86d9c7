//! The response parser (component C4): turns the result body returned by
//! [`crate::command::cmd`] into a [`ResultDescriptor`], mirroring the
//! line-dispatch loop in the original driver's `Stmt.storeResult`.

use crate::error::{err_protocol, Error, Result};
use crate::value::{self, ColumnType, MonetValue};

/// How many additional rows a single `Xexport` page fetches, matching the
/// original driver's `ARRAY_SIZE`.
pub(crate) const ARRAY_SIZE: i64 = 100;

/// One column's metadata, as reported by the `%name#name` / `%type#type` /
/// `%typesizes#typesizes` header lines. `display_size` and `null_ok` are
/// never populated by this wire format (the original driver leaves their
/// backing arrays zeroed too) and are carried only for interface symmetry
/// with SPEC_FULL.md's data model.
#[derive(Debug, Clone)]
pub struct ColumnDescription {
    pub name: String,
    pub column_type: ColumnType,
    pub display_size: i64,
    pub internal_size: i64,
    pub precision: i64,
    pub scale: i64,
    pub null_ok: bool,
}

/// Accumulated state for one statement execution: identifiers, row counts,
/// column metadata, and the window of rows fetched so far.
#[derive(Debug, Clone)]
pub struct ResultDescriptor {
    pub query_id: i64,
    pub row_count: i64,
    pub last_row_id: i64,
    pub column_count: usize,
    pub columns: Vec<ColumnDescription>,
    pub exec_id: Option<i64>,
    pub(crate) rows: Vec<Vec<MonetValue>>,
    pub(crate) offset: i64,
    column_names: Vec<String>,
    column_type_tags: Vec<String>,
}

impl Default for ResultDescriptor {
    fn default() -> Self {
        Self {
            query_id: -1,
            row_count: 0,
            last_row_id: 0,
            column_count: 0,
            columns: Vec::new(),
            exec_id: None,
            rows: Vec::new(),
            offset: 0,
            column_names: Vec::new(),
            column_type_tags: Vec::new(),
        }
    }
}

impl ResultDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds `body` (the raw text returned by `cmd`) through the line
    /// dispatcher, mutating this descriptor in place. Returns once a
    /// `MSG_PROMPT` (blank) line is seen; reaching the end of `body`
    /// without one is a protocol error.
    pub(crate) fn parse(&mut self, body: &str) -> Result<()> {
        for line in body.split('\n') {
            if line.is_empty() {
                return Ok(());
            }

            if let Some(rest) = line.strip_prefix("&5") {
                let id = rest
                    .split_whitespace()
                    .next()
                    .and_then(|tok| tok.parse::<i64>().ok())
                    .ok_or_else(|| err_protocol!("malformed QPREPARE line: {line:?}"))?;
                self.exec_id = Some(id);
                return Ok(());
            }
            if let Some(rest) = line.strip_prefix("&1") {
                let fields = parse_ints(rest, 3, "QTABLE")?;
                self.query_id = fields[0];
                self.row_count = fields[1];
                self.column_count = fields[2] as usize;
                self.column_names = Vec::new();
                self.column_type_tags = Vec::new();
                self.columns.clear();
                continue;
            }
            if let Some(rest) = line.strip_prefix("&2") {
                let fields = parse_ints(rest, 2, "QUPDATE")?;
                self.row_count = fields[0];
                self.last_row_id = fields[1];
                continue;
            }
            if line.starts_with("&3") || line.starts_with("&4") {
                self.offset = 0;
                self.row_count = 0;
                self.last_row_id = 0;
                self.rows.clear();
                self.columns.clear();
                continue;
            }
            if line.starts_with("&6") {
                self.rows.clear();
                continue;
            }
            if let Some(rest) = line.strip_prefix('%') {
                self.parse_header(rest)?;
                self.offset = 0;
                self.last_row_id = 0;
                continue;
            }
            if line.starts_with('[') {
                let row = self.parse_tuple(line)?;
                self.rows.push(row);
                continue;
            }
            if let Some(rest) = line.strip_prefix('!') {
                return Err(Error::Server(rest.trim().to_string()));
            }
            if line.starts_with('#') {
                continue;
            }

            return Err(err_protocol!("unknown response line: {line:?}"));
        }

        Err(err_protocol!("response body ended without a prompt"))
    }

    fn parse_header(&mut self, rest: &str) -> Result<()> {
        let (data, identity) = rest
            .split_once('#')
            .ok_or_else(|| err_protocol!("malformed header line: %{rest:?}"))?;
        let identity = identity.trim();
        let values: Vec<String> = data.split(',').map(|v| v.trim().to_string()).collect();

        match identity {
            "name" => {
                self.column_names = values;
                self.rebuild_columns()?;
            }
            "type" => {
                self.column_type_tags = values;
                self.rebuild_columns()?;
            }
            "typesizes" => self.apply_typesizes(&values)?,
            _ => {}
        }

        Ok(())
    }

    fn apply_typesizes(&mut self, values: &[String]) -> Result<()> {
        if self.columns.len() != self.column_type_tags.len() || self.columns.is_empty() {
            self.rebuild_columns()?;
        }
        for (i, value) in values.iter().enumerate() {
            let parts: Vec<i64> = value
                .split_whitespace()
                .map(|p| p.parse::<i64>().unwrap_or(0))
                .collect();
            let Some(column) = self.columns.get_mut(i) else { continue };
            let first = parts.first().copied().unwrap_or(0);
            let second = parts.get(1).copied().unwrap_or(0);
            if column.column_type == ColumnType::Decimal {
                column.precision = first;
                column.scale = second;
            } else {
                column.internal_size = first;
            }
        }
        Ok(())
    }

    /// Rebuilds `columns` from the accumulated name/type header data. A
    /// no-op until both arrays are populated and the same length.
    fn rebuild_columns(&mut self) -> Result<()> {
        if self.column_names.is_empty() || self.column_type_tags.is_empty() {
            return Ok(());
        }
        if self.column_names.len() != self.column_type_tags.len() {
            return Err(err_protocol!(
                "column name/type header length mismatch ({} names, {} types)",
                self.column_names.len(),
                self.column_type_tags.len()
            ));
        }

        let mut columns = Vec::with_capacity(self.column_names.len());
        for (name, tag) in self.column_names.iter().zip(self.column_type_tags.iter()) {
            columns.push(ColumnDescription {
                name: name.clone(),
                column_type: ColumnType::parse(tag)?,
                display_size: 0,
                internal_size: 0,
                precision: 0,
                scale: 0,
                null_ok: false,
            });
        }
        self.columns = columns;
        Ok(())
    }

    fn parse_tuple(&self, line: &str) -> Result<Vec<MonetValue>> {
        let inner = line
            .strip_prefix('[')
            .and_then(|s| s.strip_suffix(']'))
            .ok_or_else(|| err_protocol!("malformed tuple line: {line:?}"))?;

        let cells: Vec<&str> = if inner.is_empty() {
            Vec::new()
        } else {
            inner.split(",\t").collect()
        };

        if cells.len() != self.column_count {
            return Err(err_protocol!(
                "tuple has {} cells, expected {} (column count)",
                cells.len(),
                self.column_count
            ));
        }

        cells
            .iter()
            .zip(self.columns.iter())
            .map(|(cell, column)| value::decode(cell, column.column_type))
            .collect()
    }

    /// The absolute row index one past the last buffered row.
    pub(crate) fn buffered_end(&self) -> i64 {
        self.offset + self.rows.len() as i64
    }

    /// Sets the absolute offset of the currently buffered row window. An
    /// `Xexport` page reply carries no header line to convey this, so the
    /// caller that issued the fetch supplies it directly.
    pub(crate) fn set_offset(&mut self, offset: i64) {
        self.offset = offset;
    }

    /// The `Xexport` command to fetch the next page covering absolute row
    /// `row_num`, or `None` if `row_num` has already reached `row_count`.
    /// The new offset is the end of the currently buffered window (mirrors
    /// the original driver's `r.data.offset += len(r.data.rows)` performed
    /// before building the command).
    pub(crate) fn next_fetch(&self, row_num: i64) -> Option<String> {
        if row_num >= self.row_count {
            return None;
        }
        let new_offset = self.buffered_end();
        let end = std::cmp::min(self.row_count, row_num + ARRAY_SIZE);
        let amount = end - new_offset;
        Some(format!("Xexport {} {} {}", self.query_id, new_offset, amount))
    }
}

fn parse_ints(rest: &str, count: usize, label: &str) -> Result<Vec<i64>> {
    let fields: Vec<i64> = rest
        .split_whitespace()
        .take(count)
        .map(|tok| tok.parse::<i64>())
        .collect::<std::result::Result<_, _>>()
        .map_err(|_| err_protocol!("malformed {label} line: {rest:?}"))?;
    if fields.len() != count {
        return Err(err_protocol!("malformed {label} line: {rest:?}"));
    }
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_qtable_header_and_tuples() {
        let body = "&1 17 2 1\n% name # name\n% int # type\n[ 7 ]\n[ 8 ]\n";
        let mut descriptor = ResultDescriptor::new();
        descriptor.parse(body).unwrap();

        assert_eq!(descriptor.query_id, 17);
        assert_eq!(descriptor.row_count, 2);
        assert_eq!(descriptor.column_count, 1);
        assert_eq!(descriptor.columns.len(), 1);
        assert_eq!(descriptor.columns[0].name, "name");
        assert_eq!(descriptor.columns[0].column_type, ColumnType::Int);
        assert_eq!(descriptor.rows.len(), 2);
        assert_eq!(descriptor.rows[0], vec![MonetValue::Int(7)]);
        assert_eq!(descriptor.rows[1], vec![MonetValue::Int(8)]);
    }

    #[test]
    fn parses_qupdate() {
        let body = "&2 3 42\n";
        let mut descriptor = ResultDescriptor::new();
        descriptor.parse(body).unwrap();
        assert_eq!(descriptor.row_count, 3);
        assert_eq!(descriptor.last_row_id, 42);
    }

    #[test]
    fn decimal_typesizes_populate_precision_and_scale() {
        let body = "&1 1 1 1\n% amount # name\n% decimal # type\n% 10 2 # typesizes\n[ 12.50 ]\n";
        let mut descriptor = ResultDescriptor::new();
        descriptor.parse(body).unwrap();
        assert_eq!(descriptor.columns[0].precision, 10);
        assert_eq!(descriptor.columns[0].scale, 2);
    }

    #[test]
    fn tuple_arity_mismatch_is_an_error() {
        let body = "&1 1 1 2\n% a,b # name\n% int,int # type\n[ 1 ]\n";
        let mut descriptor = ResultDescriptor::new();
        let err = descriptor.parse(body).unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[test]
    fn server_error_line_surfaces_as_server_error() {
        let body = "!syntax error\n";
        let mut descriptor = ResultDescriptor::new();
        let err = descriptor.parse(body).unwrap_err();
        assert!(matches!(err, Error::Server(msg) if msg == "syntax error"));
    }

    #[test]
    fn body_without_prompt_is_unknown_state() {
        let body = "&2 1 1";
        let mut descriptor = ResultDescriptor::new();
        let err = descriptor.parse(body).unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[test]
    fn qschema_resets_row_state() {
        let mut descriptor = ResultDescriptor::new();
        descriptor.parse("&1 1 5 1\n% a # name\n% int # type\n[ 1 ]\n").unwrap();
        descriptor.parse("&3\n").unwrap();
        assert_eq!(descriptor.row_count, 0);
        assert!(descriptor.rows.is_empty());
        assert!(descriptor.columns.is_empty());
    }

    #[test]
    fn next_fetch_bounds_amount_to_array_size_and_row_count() {
        let mut descriptor = ResultDescriptor::new();
        descriptor.row_count = 250;
        descriptor.query_id = 9;

        assert_eq!(descriptor.next_fetch(0).unwrap(), "Xexport 9 0 100");

        descriptor.offset = 0;
        descriptor.rows = vec![Vec::new(); 100];
        assert_eq!(descriptor.next_fetch(100).unwrap(), "Xexport 9 100 100");

        descriptor.offset = 100;
        descriptor.rows = vec![Vec::new(); 100];
        assert_eq!(descriptor.next_fetch(200).unwrap(), "Xexport 9 200 50");

        descriptor.offset = 200;
        descriptor.rows = vec![Vec::new(); 50];
        assert_eq!(descriptor.next_fetch(250), None);
    }
}
