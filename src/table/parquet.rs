use arrow::{
    array::{ArrayRef, Float64Array, StringArray},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use parquet::{
    arrow::ArrowWriter,
    basic::{BrotliLevel, Compression},
    file::properties::WriterProperties,
};
use std::{io::Write, path::Path, sync::Arc};
use tracing::debug;

use super::{
    atomic::write_atomic,
    utils::{infer_arrow_dtype, parse_number},
    Table,
};
use crate::error::Result;

/// Convert a table into a single Arrow batch, typing numeric columns as
/// `Float64` and everything else as nullable `Utf8`.
pub fn to_record_batch(table: &Table) -> Result<RecordBatch> {
    let mut fields = Vec::with_capacity(table.headers().len());
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(table.headers().len());

    for (i, header) in table.headers().iter().enumerate() {
        let cells = || table.rows().iter().map(move |r| r[i].as_deref());
        let dtype = infer_arrow_dtype(cells());
        let array: ArrayRef = match dtype {
            DataType::Float64 => Arc::new(
                cells()
                    .map(|c| c.and_then(parse_number))
                    .collect::<Float64Array>(),
            ),
            _ => Arc::new(cells().collect::<StringArray>()),
        };
        fields.push(Field::new(header, dtype, true));
        columns.push(array);
    }

    let schema = Arc::new(Schema::new(fields));
    Ok(RecordBatch::try_new(schema, columns)?)
}

/// Encode `table` as Brotli-compressed Parquet into `writer`.
pub fn write_parquet_to<W: Write + Send>(table: &Table, writer: W) -> Result<()> {
    let batch = to_record_batch(table)?;
    let props = WriterProperties::builder()
        .set_compression(Compression::BROTLI(BrotliLevel::try_new(5)?))
        .build();

    let mut writer = ArrowWriter::try_new(writer, batch.schema(), Some(props))?;
    writer.write(&batch)?;
    writer.close()?;
    debug!(table = table.name(), rows = batch.num_rows(), "wrote parquet");
    Ok(())
}

/// Write `table` as a Parquet file, atomically.
pub fn write_parquet<P: AsRef<Path>>(table: &Table, path: P) -> Result<()> {
    write_atomic(path.as_ref(), |w| write_parquet_to(table, w))
}
