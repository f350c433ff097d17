//! SQL session seam
//!
//! Components never reach for a global cursor: every operation that talks to
//! the cluster takes a `&mut dyn SqlSession` connected to the seed dnode.

use crate::error::{HarnessError, Result};

/// A connected session against the system under test.
pub trait SqlSession {
    /// Execute a statement, returning the affected row count when reported.
    fn execute(&mut self, sql: &str) -> Result<u64>;

    /// Run a query and return the full result set.
    fn query(&mut self, sql: &str) -> Result<ResultSet>;
}

impl<S: SqlSession + ?Sized> SqlSession for &mut S {
    fn execute(&mut self, sql: &str) -> Result<u64> {
        (**self).execute(sql)
    }

    fn query(&mut self, sql: &str) -> Result<ResultSet> {
        (**self).query(sql)
    }
}

impl<S: SqlSession + ?Sized> SqlSession for Box<S> {
    fn execute(&mut self, sql: &str) -> Result<u64> {
        (**self).execute(sql)
    }

    fn query(&mut self, sql: &str) -> Result<ResultSet> {
        (**self).query(sql)
    }
}

/// Rows returned by a query, rendered as text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultSet {
    /// Column headers, empty when the client did not report them
    pub columns: Vec<String>,
    /// Row values in column order
    pub rows: Vec<Vec<String>>,
}

impl ResultSet {
    /// Build a result set from headers and rows.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        ResultSet { columns, rows }
    }

    /// Number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Position of a column by case-insensitive name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
    }

    /// Cell at `(row, col)`
    pub fn get(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row)?.get(col).map(String::as_str)
    }

    /// Cell at `(row, col)` parsed as an integer.
    pub fn get_i64(&self, row: usize, col: usize) -> Result<i64> {
        let cell = self.get(row, col).ok_or_else(|| {
            HarnessError::Assertion(format!("no cell at row {} column {}", row, col))
        })?;
        cell.trim().parse::<i64>().map_err(|e| {
            HarnessError::Assertion(format!(
                "cell at row {} column {} is not an integer ({:?}): {}",
                row, col, cell, e
            ))
        })
    }
}
