// src/normalize/mod.rs
use crate::error::{MergeError, Result};
use crate::table::{
    utils::{format_number, parse_number},
    Table,
};

/// Marker the source surveys use for "no data".
pub const MISSING_SENTINEL: f64 = -99999.0;

/// Replace each listed column with `1 - (x - min) / (max - min)`.
///
/// Nulls stay null and do not take part in min/max. A constant column maps
/// to `1`. Every column is checked before anything is rewritten.
pub fn inverse_min_max(table: &Table, columns: &[&str]) -> Result<Table> {
    for c in columns {
        table.require_column(c)?;
    }

    let mut out = table.clone();
    for column in columns {
        let values: Vec<Option<f64>> = out
            .column_values(column)?
            .into_iter()
            .map(|cell| match cell {
                None => Ok(None),
                Some(raw) => parse_number(raw).map(Some).ok_or_else(|| {
                    MergeError::mismatch(format!("`{}` in `{}` is not numeric", raw, column))
                }),
            })
            .collect::<Result<_>>()?;

        let (min, max) = values
            .iter()
            .flatten()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        let range = max - min;

        let mut iter = values.into_iter();
        out = out.map_column(column, |_| {
            Ok(iter.next().flatten().map(|v| {
                let scaled = if range > 0.0 { (v - min) / range } else { 0.0 };
                format_number(1.0 - scaled)
            }))
        })?;
    }
    Ok(out)
}

/// Drop rows holding `sentinel` in any cell, then rows with any null.
pub fn drop_sentinel_rows(table: &Table, sentinel: f64) -> Result<Table> {
    table
        .filter_rows(|row| {
            !row
                .iter()
                .flatten()
                .any(|cell| parse_number(cell) == Some(sentinel))
        })
        .drop_null_rows(&[])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inverse_scales_and_preserves_nulls() -> anyhow::Result<()> {
        let t = Table::from_literal(
            "t",
            &["Crime", "Other"],
            &[&["10", "a"], &["20", "b"], &["", "c"], &["15", "d"]],
        )?;
        let out = inverse_min_max(&t, &["Crime"])?;
        assert_eq!(
            out.column_values("Crime")?,
            vec![Some("1"), Some("0"), None, Some("0.5")]
        );
        assert_eq!(out.column_values("Other")?, t.column_values("Other")?);
        Ok(())
    }

    #[test]
    fn constant_column_maps_to_one() -> anyhow::Result<()> {
        let t = Table::from_literal("t", &["x"], &[&["3"], &["3"]])?;
        let out = inverse_min_max(&t, &["x"])?;
        assert_eq!(out.column_values("x")?, vec![Some("1"), Some("1")]);
        Ok(())
    }

    #[test]
    fn missing_column_is_schema_error() {
        let t = Table::from_literal("t", &["x"], &[]).unwrap();
        assert!(matches!(
            inverse_min_max(&t, &["x", "y"]),
            Err(MergeError::Schema { .. })
        ));
    }

    #[test]
    fn sentinel_and_null_rows_are_dropped() -> anyhow::Result<()> {
        let t = Table::from_literal(
            "t",
            &["a", "b"],
            &[&["1", "2"], &["-99999", "3"], &["4", ""], &["5", "-99999.0"], &["6", "7"]],
        )?;
        let out = drop_sentinel_rows(&t, MISSING_SENTINEL)?;
        assert_eq!(out.column_values("a")?, vec![Some("1"), Some("6")]);
        Ok(())
    }
}
