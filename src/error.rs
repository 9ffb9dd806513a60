//! Error type shared by every table operation in the crate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MergeError {
    /// A column the operation depends on is absent from the named table.
    #[error("table `{table}` is missing required column `{column}`")]
    Schema { table: String, column: String },

    /// An argument had the wrong shape: ragged rows, non-numeric cells in a
    /// numeric column, an empty source list and so on.
    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MergeError {
    pub fn schema(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self::Schema {
            table: table.into(),
            column: column.into(),
        }
    }

    pub fn mismatch(msg: impl Into<String>) -> Self {
        Self::TypeMismatch(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, MergeError>;
