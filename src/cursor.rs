use std::collections::VecDeque;

use serde::Deserialize;

use crate::error::{Result, StreamError};
use crate::value::Value;

/// A forward-only source of fixed-width rows.
///
/// `advance` moves to the next row and returns `false` once exhausted;
/// `get_values` then fills the caller's slice (of length `field_count`)
/// with the current row. Cursors are not restartable.
pub trait RowCursor {
    fn is_closed(&self) -> bool;

    /// Number of columns per row, constant for the cursor's lifetime.
    fn field_count(&self) -> usize;

    fn advance(&mut self) -> Result<bool>;

    /// Returns the number of values written.
    fn get_values(&mut self, out: &mut [Value]) -> Result<usize>;

    fn close(&mut self);
}

impl<C: RowCursor + ?Sized> RowCursor for Box<C> {
    fn is_closed(&self) -> bool {
        (**self).is_closed()
    }

    fn field_count(&self) -> usize {
        (**self).field_count()
    }

    fn advance(&mut self) -> Result<bool> {
        (**self).advance()
    }

    fn get_values(&mut self, out: &mut [Value]) -> Result<usize> {
        (**self).get_values(out)
    }

    fn close(&mut self) {
        (**self).close()
    }
}

/// An in-memory cursor over rows that are already materialized.
pub struct MemoryCursor {
    rows: VecDeque<Vec<Value>>,
    current: Option<Vec<Value>>,
    field_count: usize,
    closed: bool,
}

impl MemoryCursor {
    /// Every row must hold exactly `field_count` values.
    pub fn new(field_count: usize, rows: Vec<Vec<Value>>) -> Result<Self> {
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != field_count) {
            return Err(StreamError::Config(format!(
                "Row {i} has {} values, expected {field_count}",
                row.len()
            )));
        }
        Ok(Self {
            rows: VecDeque::from(rows),
            current: None,
            field_count,
            closed: false,
        })
    }

    /// Build a cursor whose width is taken from the first row.
    pub fn from_rows<R, V>(rows: R) -> Result<Self>
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let rows: Vec<Vec<Value>> = rows
            .into_iter()
            .map(|row| row.into_iter().map(Into::into).collect())
            .collect();
        let field_count = rows.first().map_or(0, Vec::len);
        Self::new(field_count, rows)
    }

    /// Parse a JSON row set sent over FFI.
    pub fn from_json(json: &str) -> Result<Self> {
        let set: RowSet = serde_json::from_str(json)
            .map_err(|e| StreamError::Config(format!("Invalid row set JSON: {e}")))?;
        set.into_cursor()
    }

    /// Rows not yet returned by `advance`.
    pub fn rows_remaining(&self) -> usize {
        self.rows.len()
    }
}

impl RowCursor for MemoryCursor {
    fn is_closed(&self) -> bool {
        self.closed
    }

    fn field_count(&self) -> usize {
        self.field_count
    }

    fn advance(&mut self) -> Result<bool> {
        if self.closed {
            return Err(StreamError::Cursor("Cursor is closed".into()));
        }
        self.current = self.rows.pop_front();
        Ok(self.current.is_some())
    }

    fn get_values(&mut self, out: &mut [Value]) -> Result<usize> {
        let row = self
            .current
            .as_ref()
            .ok_or_else(|| StreamError::Cursor("No current row".into()))?;
        let n = row.len().min(out.len());
        out[..n].clone_from_slice(&row[..n]);
        Ok(n)
    }

    fn close(&mut self) {
        self.closed = true;
        self.current = None;
        self.rows.clear();
    }
}

// ── JSON row sets ─────────────────────────────────────────────

#[derive(Deserialize)]
pub struct RowSet {
    #[serde(default)]
    pub columns: Option<Vec<RowSetColumn>>,
    pub rows: Vec<Vec<serde_json::Value>>,
}

#[derive(Deserialize)]
pub struct RowSetColumn {
    /// Informational only; no header row is written.
    pub name: String,
    #[serde(rename = "type", default)]
    pub col_type: Option<String>,
}

impl RowSet {
    /// Convert to a cursor, parsing typed columns when a column list is given.
    pub fn into_cursor(self) -> Result<MemoryCursor> {
        let field_count = match &self.columns {
            Some(cols) => cols.len(),
            None => self.rows.first().map_or(0, Vec::len),
        };
        let hints: Vec<Option<&str>> = match &self.columns {
            Some(cols) => cols.iter().map(|c| c.col_type.as_deref()).collect(),
            None => vec![None; field_count],
        };

        let mut rows = Vec::with_capacity(self.rows.len());
        for (i, row) in self.rows.iter().enumerate() {
            if row.len() != field_count {
                return Err(StreamError::Config(format!(
                    "Row {i} has {} values, expected {field_count}",
                    row.len()
                )));
            }
            let values = row
                .iter()
                .zip(&hints)
                .map(|(cell, hint)| Value::from_json(cell, *hint))
                .collect::<Result<Vec<_>>>()?;
            rows.push(values);
        }
        MemoryCursor::new(field_count, rows)
    }
}
