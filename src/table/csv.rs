// src/table/csv.rs
use csv::{ReaderBuilder, WriterBuilder};
use std::{
    fs::File,
    io::{BufReader, Read, Write},
    path::Path,
};
use tracing::debug;

use super::{atomic::write_atomic, Row, Table};
use crate::error::{MergeError, Result};

/// Load a headed CSV file. The table is named after the file.
#[tracing::instrument(level = "debug", skip(path), fields(path = %path.as_ref().display()))]
pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Table> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| {
        std::io::Error::new(e.kind(), format!("opening {}: {}", path.display(), e))
    })?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    read_csv_from(name, BufReader::new(file))
}

/// Parse CSV from any reader. Empty fields become nulls; a record whose field
/// count differs from the header is a `TypeMismatch`.
pub fn read_csv_from<R: Read>(name: impl Into<String>, reader: R) -> Result<Table> {
    let name = name.into();
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.to_string()).collect();

    let mut rows: Vec<Row> = Vec::new();
    for (idx, result) in rdr.records().enumerate() {
        let record = result?;
        if record.len() != headers.len() {
            return Err(MergeError::mismatch(format!(
                "{} record {} has {} fields, header has {}",
                name,
                idx,
                record.len(),
                headers.len()
            )));
        }
        rows.push(
            record
                .iter()
                .map(|f| (!f.is_empty()).then(|| f.to_string()))
                .collect(),
        );
    }
    debug!(table = %name, rows = rows.len(), columns = headers.len(), "read csv");

    Table::new(name, headers, rows)
}

/// Serialize `table` (header first, nulls as empty fields).
pub fn write_csv_to<W: Write>(table: &Table, writer: W) -> Result<()> {
    let mut wtr = WriterBuilder::new().from_writer(writer);
    wtr.write_record(table.headers())?;
    for row in table.rows() {
        wtr.write_record(row.iter().map(|c| c.as_deref().unwrap_or("")))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write `table` to `path` through a tmp file + rename.
pub fn write_csv<P: AsRef<Path>>(table: &Table, path: P) -> Result<()> {
    write_atomic(path, |w| write_csv_to(table, w))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn empty_fields_read_as_null_and_write_back_empty() -> anyhow::Result<()> {
        let src = "City,CBSA,CSA Title\n\"Springfield, IL\",200,\n";
        let table = read_csv_from("list", Cursor::new(src))?;
        assert_eq!(table.headers(), &["City", "CBSA", "CSA Title"]);
        assert_eq!(table.cell(0, 0), Some("Springfield, IL"));
        assert_eq!(table.cell(0, 2), None);

        let mut out = Vec::new();
        write_csv_to(&table, &mut out)?;
        assert_eq!(String::from_utf8(out)?, src);
        Ok(())
    }

    #[test]
    fn short_record_is_type_mismatch() {
        let err = read_csv_from("bad", Cursor::new("a,b\n1\n")).unwrap_err();
        assert!(matches!(err, MergeError::TypeMismatch(_)));
    }
}
