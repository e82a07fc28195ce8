//! Append-only result tables accumulated across repeated scans

use crate::{AnalysisError, Result};
use serde::{Deserialize, Serialize};

/// Named columns of `f64`, rows in append order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultTable {
    columns: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl ResultTable {
    pub fn new(columns: &[&str]) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn with_columns(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Appends `row` to `table`, or starts a new table with `columns` when there is none.
    ///
    /// `row` is laid out as `columns`. An existing table must carry exactly
    /// those columns, in any order; the row is stored in the table's own order.
    pub fn append_or_start(
        table: Option<ResultTable>,
        columns: &[&str],
        row: Vec<f64>,
    ) -> Result<Self> {
        if row.len() != columns.len() {
            return Err(AnalysisError::RowWidth {
                expected: columns.len(),
                actual: row.len(),
            });
        }
        let mut table = match table {
            Some(existing) => existing,
            None => ResultTable::new(columns),
        };
        let order = table.schema_order(columns)?;
        table.push_row(order.into_iter().map(|i| row[i]).collect())?;
        Ok(table)
    }

    /// Position in `columns` of each of this table's columns.
    fn schema_order(&self, columns: &[&str]) -> Result<Vec<usize>> {
        if let Some(missing) = columns.iter().find(|c| !self.columns.iter().any(|own| own == *c)) {
            return Err(AnalysisError::MissingColumn(missing.to_string()));
        }
        if self.columns.len() != columns.len() {
            return Err(AnalysisError::RowWidth {
                expected: self.columns.len(),
                actual: columns.len(),
            });
        }
        self.columns
            .iter()
            .map(|own| {
                columns
                    .iter()
                    .position(|c| c == own)
                    .ok_or_else(|| AnalysisError::MissingColumn(own.clone()))
            })
            .collect()
    }

    pub fn push_row(&mut self, row: Vec<f64>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(AnalysisError::RowWidth {
                expected: self.columns.len(),
                actual: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| AnalysisError::MissingColumn(name.to_string()))
    }

    /// Copy of one column, in row order.
    pub fn column(&self, name: &str) -> Result<Vec<f64>> {
        let index = self.column_index(name)?;
        Ok(self.rows.iter().map(|row| row[index]).collect())
    }

    pub fn last_row(&self) -> Option<&[f64]> {
        self.rows.last().map(Vec::as_slice)
    }
}
