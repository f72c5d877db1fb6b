use rusqlite::types::{Value, ValueRef};
use rusqlite::{Statement, ToSql};

use crate::error::SqlPoolError;
use crate::results::ResultSet;
use crate::types::RowValues;

/// Run a prepared statement and materialize every row.
///
/// The column header is captured before iterating because `rusqlite` ties
/// column metadata to the statement, not to individual rows.
pub(crate) fn build_result_set(
    stmt: &mut Statement<'_>,
    params: &[Value],
) -> Result<ResultSet, SqlPoolError> {
    let column_names: Vec<String> = stmt
        .column_names()
        .into_iter()
        .map(ToOwned::to_owned)
        .collect();
    let column_count = column_names.len();
    let mut result_set = ResultSet::new(column_names);

    let refs: Vec<&dyn ToSql> = params.iter().map(|v| v as &dyn ToSql).collect();
    let mut rows = stmt
        .query(&refs[..])
        .map_err(|e| SqlPoolError::QueryFailed(e.to_string()))?;

    while let Some(row) = rows
        .next()
        .map_err(|e| SqlPoolError::QueryFailed(e.to_string()))?
    {
        let mut values = Vec::with_capacity(column_count);
        for idx in 0..column_count {
            let value = row
                .get_ref(idx)
                .map_err(|e| SqlPoolError::QueryFailed(e.to_string()))?;
            values.push(extract_value(value));
        }
        result_set.push_values(values);
    }

    Ok(result_set)
}

fn extract_value(value: ValueRef<'_>) -> RowValues {
    match value {
        ValueRef::Null => RowValues::Null,
        ValueRef::Integer(i) => RowValues::Int(i),
        ValueRef::Real(f) => RowValues::Float(f),
        ValueRef::Text(bytes) => RowValues::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => RowValues::Blob(bytes.to_vec()),
    }
}
