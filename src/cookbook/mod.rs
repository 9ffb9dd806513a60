//! Column descriptions ("cookbook") and the reports built from them.

use csv::ReaderBuilder;
use serde::Serialize;
use std::{
    collections::HashMap,
    fs::File,
    io::{BufReader, Read},
    path::Path,
};
use tracing::{info, warn};

use crate::error::{MergeError, Result};
use crate::table::Table;

/// Column name -> description, in file order.
#[derive(Debug, Clone, Default)]
pub struct Cookbook {
    entries: Vec<(String, String)>,
    index: HashMap<String, usize>,
}

impl Cookbook {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            std::io::Error::new(e.kind(), format!("opening {}: {}", path.display(), e))
        })?;
        Self::from_reader(BufReader::new(file))
    }

    /// The first record is a header and is skipped. Each following record uses
    /// its first field as the column name and its second as the description.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let mut book = Cookbook::default();
        for (idx, result) in rdr.records().enumerate() {
            let record = result?;
            let (Some(key), Some(value)) = (record.get(0), record.get(1)) else {
                return Err(MergeError::mismatch(format!(
                    "cookbook record {} has {} fields, expected at least 2",
                    idx + 1,
                    record.len()
                )));
            };
            book.insert(key, value);
        }
        Ok(book)
    }

    /// Later duplicates replace the description but keep the first position.
    pub fn insert(&mut self, key: &str, description: &str) {
        if let Some(&i) = self.index.get(key) {
            self.entries[i].1 = description.to_string();
            return;
        }
        self.index.insert(key.to_string(), self.entries.len());
        self.entries.push((key.to_string(), description.to_string()));
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.index.get(key).map(|&i| self.entries[i].1.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDescription {
    pub column: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnReport {
    pub columns: Vec<ColumnDescription>,
    pub undocumented: Vec<String>,
}

impl ColumnReport {
    pub fn all_documented(&self) -> bool {
        self.undocumented.is_empty()
    }
}

/// Describe every column of `table`, flagging the ones the cookbook lacks.
pub fn describe_columns(table: &Table, cookbook: &Cookbook) -> ColumnReport {
    let columns: Vec<ColumnDescription> = table
        .headers()
        .iter()
        .map(|h| ColumnDescription {
            column: h.clone(),
            description: cookbook.get(h).map(str::to_string),
        })
        .collect();
    let undocumented: Vec<String> = columns
        .iter()
        .filter(|c| c.description.is_none())
        .map(|c| c.column.clone())
        .collect();

    if undocumented.is_empty() {
        info!(table = table.name(), "all columns have descriptions");
    } else {
        warn!(
            table = table.name(),
            missing = %undocumented.join(", "),
            "columns without descriptions"
        );
    }
    ColumnReport {
        columns,
        undocumented,
    }
}

/// Cookbook entries that name no column of `table`.
pub fn unused_entries(cookbook: &Cookbook, table: &Table) -> Vec<String> {
    cookbook
        .keys()
        .filter(|k| table.column_index(k).is_none())
        .map(str::to_string)
        .collect()
}
