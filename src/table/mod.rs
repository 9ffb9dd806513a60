// src/table/mod.rs
pub mod atomic;
pub mod csv;
pub mod parquet;
pub mod utils;

use std::collections::HashSet;

use crate::error::{MergeError, Result};

/// A single cell. `None` is a null (an empty field in the source CSV).
pub type Cell = Option<String>;
/// One row, aligned with `Table::headers`.
pub type Row = Vec<Cell>;

/// An in-memory, string-typed table.
///
/// Every row carries exactly `headers.len()` cells; constructors and the
/// row-appending methods enforce this so later column lookups can index
/// without bounds checks failing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Table {
    /// Label used in logs and error messages (usually the source file name).
    name: String,
    headers: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    pub fn new(name: impl Into<String>, headers: Vec<String>, rows: Vec<Row>) -> Result<Self> {
        let name = name.into();
        check_widths(&name, headers.len(), &rows)?;
        Ok(Self {
            name,
            headers,
            rows,
        })
    }

    /// Build a table from string literals; empty strings become nulls.
    pub fn from_literal(name: &str, headers: &[&str], rows: &[&[&str]]) -> Result<Self> {
        let headers = headers.iter().map(|h| h.to_string()).collect();
        let rows = rows
            .iter()
            .map(|r| {
                r.iter()
                    .map(|c| (!c.is_empty()).then(|| c.to_string()))
                    .collect()
            })
            .collect();
        Self::new(name, headers, rows)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == column)
    }

    /// Like `column_index`, but a missing column is a `Schema` error.
    pub fn require_column(&self, column: &str) -> Result<usize> {
        self.column_index(column)
            .ok_or_else(|| MergeError::schema(&self.name, column))
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .and_then(|c| c.as_deref())
    }

    pub fn column_values(&self, column: &str) -> Result<Vec<Option<&str>>> {
        let idx = self.require_column(column)?;
        Ok(self.rows.iter().map(|r| r[idx].as_deref()).collect())
    }

    /// Append rows after validating their width.
    pub fn extend_rows(&mut self, rows: Vec<Row>) -> Result<()> {
        check_widths(&self.name, self.headers.len(), &rows)?;
        self.rows.extend(rows);
        Ok(())
    }

    /// Rename columns by `(from, to)` pairs. Pairs naming absent columns are ignored.
    pub fn rename_columns(mut self, renames: &[(&str, &str)]) -> Self {
        for header in self.headers.iter_mut() {
            if let Some((_, to)) = renames.iter().find(|(from, _)| header == from) {
                *header = to.to_string();
            }
        }
        self
    }

    /// Stack `tables` vertically. Headers are the union in first-seen order;
    /// cells for columns a source lacks are null.
    pub fn concat(name: impl Into<String>, tables: &[Table]) -> Table {
        let mut headers: Vec<String> = Vec::new();
        for table in tables {
            for h in &table.headers {
                if !headers.contains(h) {
                    headers.push(h.clone());
                }
            }
        }

        let total = tables.iter().map(Table::len).sum();
        let mut rows = Vec::with_capacity(total);
        for table in tables {
            let mapping: Vec<Option<usize>> =
                headers.iter().map(|h| table.column_index(h)).collect();
            for row in &table.rows {
                rows.push(
                    mapping
                        .iter()
                        .map(|m| m.and_then(|i| row[i].clone()))
                        .collect(),
                );
            }
        }

        Table {
            name: name.into(),
            headers,
            rows,
        }
    }

    /// Keep the first row for each distinct value of `column`. Nulls are one key.
    pub fn drop_duplicates_by(&self, column: &str) -> Result<Table> {
        let idx = self.require_column(column)?;
        let mut seen: HashSet<Option<&str>> = HashSet::with_capacity(self.rows.len());
        let rows = self
            .rows
            .iter()
            .filter(|r| seen.insert(r[idx].as_deref()))
            .cloned()
            .collect();
        Ok(self.derive(rows))
    }

    /// Keep the first of every set of fully identical rows.
    pub fn drop_duplicates(&self) -> Table {
        let mut seen: HashSet<&Row> = HashSet::with_capacity(self.rows.len());
        let rows = self
            .rows
            .iter()
            .filter(|r| seen.insert(*r))
            .cloned()
            .collect();
        self.derive(rows)
    }

    pub fn drop_columns(&self, columns: &[&str]) -> Result<Table> {
        let mut drop = Vec::with_capacity(columns.len());
        for c in columns {
            drop.push(self.require_column(c)?);
        }
        let keep: Vec<usize> = (0..self.headers.len())
            .filter(|i| !drop.contains(i))
            .collect();
        Ok(Table {
            name: self.name.clone(),
            headers: keep.iter().map(|&i| self.headers[i].clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|r| keep.iter().map(|&i| r[i].clone()).collect())
                .collect(),
        })
    }

    /// Drop rows with a null in any of `subset`; an empty subset checks every column.
    pub fn drop_null_rows(&self, subset: &[&str]) -> Result<Table> {
        let idxs: Vec<usize> = if subset.is_empty() {
            (0..self.headers.len()).collect()
        } else {
            subset
                .iter()
                .map(|c| self.require_column(c))
                .collect::<Result<_>>()?
        };
        Ok(self.filter_rows(|r| idxs.iter().all(|&i| r[i].is_some())))
    }

    pub fn filter_rows<F>(&self, mut keep: F) -> Table
    where
        F: FnMut(&Row) -> bool,
    {
        let rows = self.rows.iter().filter(|r| keep(r)).cloned().collect();
        self.derive(rows)
    }

    /// Replace every cell of `column` with `f(cell)`.
    pub fn map_column<F>(&self, column: &str, mut f: F) -> Result<Table>
    where
        F: FnMut(Option<&str>) -> Result<Cell>,
    {
        let idx = self.require_column(column)?;
        let mut out = self.clone();
        for row in out.rows.iter_mut() {
            row[idx] = f(row[idx].as_deref())?;
        }
        Ok(out)
    }

    fn derive(&self, rows: Vec<Row>) -> Table {
        Table {
            name: self.name.clone(),
            headers: self.headers.clone(),
            rows,
        }
    }
}

fn check_widths(name: &str, width: usize, rows: &[Row]) -> Result<()> {
    if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != width) {
        return Err(MergeError::mismatch(format!(
            "table `{}` row {} has {} cells, expected {}",
            name,
            i,
            row.len(),
            width
        )));
    }
    Ok(())
}
