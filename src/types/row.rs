use std::sync::Arc;

use crate::error::{DbResultError, Result};
use crate::types::{ColumnDescriptor, SqlValue};

/// A single fetched row.
/// Values are stored in column order and can be accessed by name or index.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    names: Arc<[String]>,
    values: Vec<SqlValue>,
}

impl Row {
    pub(crate) fn new(names: Arc<[String]>, values: Vec<SqlValue>) -> Self {
        Self { names, values }
    }

    /// Gets a value by column name.
    pub fn get(&self, column: &str) -> Result<&SqlValue> {
        self.names
            .iter()
            .position(|name| name == column)
            .and_then(|i| self.values.get(i))
            .ok_or_else(|| DbResultError::ColumnNotFound(column.to_string()))
    }

    /// Gets a value by its zero-based position.
    pub fn get_index(&self, index: usize) -> Result<&SqlValue> {
        self.values
            .get(index)
            .ok_or_else(|| DbResultError::ColumnNotFound(format!("#{}", index)))
    }

    /// Returns all column names in this row, in order.
    pub fn columns(&self) -> Vec<&str> {
        self.names.iter().map(|s| s.as_str()).collect()
    }

    /// Returns the values of this row, in column order.
    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }

    /// Returns the number of columns in this row.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if this row has no columns.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A tabular batch returned by one fetch: zero or more rows with exactly
/// the columns described by the result's column info.
#[derive(Debug, Clone, PartialEq)]
pub struct RowBatch {
    columns: Vec<ColumnDescriptor>,
    rows: Vec<Row>,
}

impl RowBatch {
    /// Creates a batch from column descriptors and raw row values.
    pub fn new(columns: Vec<ColumnDescriptor>, rows: Vec<Vec<SqlValue>>) -> Self {
        let names: Arc<[String]> = columns.iter().map(|c| c.name.clone()).collect();
        let rows = rows
            .into_iter()
            .map(|values| Row::new(Arc::clone(&names), values))
            .collect();
        Self { columns, rows }
    }

    /// A batch with the given columns and no rows.
    pub fn empty(columns: Vec<ColumnDescriptor>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Appends the rows of another batch with the same shape.
    pub fn append(&mut self, other: RowBatch) {
        self.rows.extend(other.rows);
    }

    /// Extracts a single row from the batch.
    /// Returns an error if the batch contains zero or more than one row.
    pub fn single_row(self) -> Result<Row> {
        let actual = self.rows.len();
        match <[Row; 1]>::try_from(self.rows) {
            Ok([row]) => Ok(row),
            Err(_) => Err(DbResultError::UnexpectedRowCount {
                expected: 1,
                actual,
            }),
        }
    }

    /// Returns all rows from the batch.
    pub fn rows(self) -> Vec<Row> {
        self.rows
    }

    /// Returns a reference to the rows without consuming the batch.
    pub fn rows_ref(&self) -> &[Row] {
        &self.rows
    }

    /// Returns the column descriptors of this batch.
    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    /// Returns the number of rows in this batch.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if this batch contains no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
