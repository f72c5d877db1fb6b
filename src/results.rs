use std::sync::Arc;

use crate::types::RowValues;

/// A single row from a query result.
///
/// Column names are shared across all rows of a result set to avoid
/// duplicating the header per row.
#[derive(Debug, Clone)]
pub struct Row {
    column_names: Arc<Vec<String>>,
    values: Vec<RowValues>,
}

impl Row {
    #[must_use]
    pub fn new(column_names: Arc<Vec<String>>, values: Vec<RowValues>) -> Self {
        Self {
            column_names,
            values,
        }
    }

    /// Column names, in result order.
    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Get a value by column name, or `None` if the column does not exist.
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&RowValues> {
        self.column_names
            .iter()
            .position(|col| col == column_name)
            .and_then(|idx| self.values.get(idx))
    }

    /// Get a value by column index, or `None` if out of bounds.
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&RowValues> {
        self.values.get(index)
    }

    /// All values in column order.
    #[must_use]
    pub fn values(&self) -> &[RowValues] {
        &self.values
    }
}

/// Rows returned by a SELECT, sharing one column-name header.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    column_names: Arc<Vec<String>>,
    rows: Vec<Row>,
}

impl ResultSet {
    /// Create an empty result set with the given column header.
    #[must_use]
    pub fn new(column_names: Vec<String>) -> Self {
        Self {
            column_names: Arc::new(column_names),
            rows: Vec::new(),
        }
    }

    /// Append a row of values. The values must align with the column header.
    pub fn push_values(&mut self, values: Vec<RowValues>) {
        self.rows
            .push(Row::new(Arc::clone(&self.column_names), values));
    }

    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }
}

/// Outcome of a mutation (INSERT/UPDATE/DELETE).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecOutcome {
    /// Number of rows the statement changed.
    pub rows_affected: u64,
    /// Identifier generated by the statement, when the driver reports one.
    pub last_insert_id: Option<i64>,
}
