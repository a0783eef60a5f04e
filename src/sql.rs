use std::collections::VecDeque;

use mssql_client::{Client, Ready, Row, SqlValue};

use crate::cursor::RowCursor;
use crate::debug::{debug_log, preview};
use crate::error::{Result, StreamError};
use crate::value::Value;

/// A cursor over SQL Server query results.
///
/// mssql-client's QueryStream buffers all rows upfront, so the rows are
/// held here and converted to values one row at a time as the cursor
/// advances.
pub struct SqlRowCursor {
    rows: VecDeque<Row>,
    current: Option<Row>,
    field_count: usize,
    closed: bool,
}

impl SqlRowCursor {
    pub fn new(rows: Vec<Row>) -> Self {
        let field_count = rows.first().map_or(0, |row| row.columns().len());
        Self {
            rows: VecDeque::from(rows),
            current: None,
            field_count,
            closed: false,
        }
    }
}

impl RowCursor for SqlRowCursor {
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
        let mut written = 0;
        for (slot, col) in out.iter_mut().zip(row.columns()) {
            *slot = sql_value_to_value(row.get_raw(col.index));
            written += 1;
        }
        Ok(written)
    }

    fn close(&mut self) {
        self.closed = true;
        self.current = None;
        self.rows.clear();
    }
}

/// Convert a raw column value from mssql-client into a stream value.
pub fn sql_value_to_value(raw: Option<SqlValue>) -> Value {
    match raw {
        None | Some(SqlValue::Null) => Value::Null,
        Some(SqlValue::Bool(b)) => Value::Bool(b),
        Some(SqlValue::TinyInt(n)) => Value::Int(n.into()),
        Some(SqlValue::SmallInt(n)) => Value::Int(n.into()),
        Some(SqlValue::Int(n)) => Value::Int(n.into()),
        Some(SqlValue::BigInt(n)) => Value::Int(n),
        Some(SqlValue::Float(n)) => Value::Float(n.into()),
        Some(SqlValue::Double(n)) => Value::Float(n),
        Some(SqlValue::String(s)) => Value::Text(s),
        Some(SqlValue::Binary(bytes)) => Value::Bytes(bytes.to_vec()),
        Some(SqlValue::Uuid(u)) => Value::Uuid(u),
        Some(SqlValue::Date(d)) => Value::Date(d),
        Some(SqlValue::Time(t)) => Value::Time(t),
        Some(SqlValue::DateTime(dt)) => Value::DateTime(dt),
        Some(SqlValue::DateTimeOffset(dt)) => Value::DateTimeOffset(dt),
        Some(SqlValue::Xml(s)) => Value::Text(s),
        Some(other) => Value::Text(format!("{other:?}")),
    }
}

/// Run a query and buffer its rows into a cursor.
pub async fn open_query_cursor(client: &mut Client<Ready>, sql: &str) -> Result<SqlRowCursor> {
    debug_log!("Opening query cursor: {}", preview(sql, 100));

    let stream = client.query(sql, &[]).await?;
    let mut rows = Vec::new();
    for result in stream {
        let row: Row = result?;
        rows.push(row);
    }

    debug_log!("Query cursor buffered {} rows", rows.len());
    Ok(SqlRowCursor::new(rows))
}
