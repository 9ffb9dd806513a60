//! Key-based joins between tables, and the `City` enrichment built on them.

use std::collections::HashMap;
use tracing::{info, instrument, warn};

use crate::error::Result;
use crate::reference::CITY;
use crate::table::{Row, Table};

/// Suffixes appended to non-key columns present on both sides.
pub const LEFT_SUFFIX: &str = "_x";
pub const RIGHT_SUFFIX: &str = "_y";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// Every left row at least once, in left order.
    Left,
    /// Only matched rows, in left order.
    Inner,
    /// Every right row at least once, in right order.
    Right,
}

/// Left outer join of `external` onto the canonical table on `City`.
///
/// Neither input is modified. Output row count equals `external.len()` when
/// the canonical `City` values are unique.
#[instrument(level = "info", skip_all, fields(external = external.len(), canonical = canonical.len()))]
pub fn merge(external: &Table, canonical: &Table) -> Result<Table> {
    let enriched = join(external, canonical, &[CITY], JoinKind::Left)?;
    if enriched.len() != external.len() {
        warn!(
            external = external.len(),
            enriched = enriched.len(),
            "canonical table has duplicate City keys; rows were multiplied"
        );
    }
    let matched = right_cells_present(&enriched, external.headers().len());
    info!(rows = enriched.len(), matched, "enriched external table");
    Ok(enriched)
}

/// Join `left` and `right` on the columns named in `on`.
///
/// Output columns are the left columns followed by the right columns that are
/// not join keys. A row with a null in any key column never matches.
pub fn join(left: &Table, right: &Table, on: &[&str], kind: JoinKind) -> Result<Table> {
    let left_keys: Vec<usize> = on
        .iter()
        .map(|k| left.require_column(k))
        .collect::<Result<_>>()?;
    let right_keys: Vec<usize> = on
        .iter()
        .map(|k| right.require_column(k))
        .collect::<Result<_>>()?;
    let right_rest: Vec<usize> = (0..right.headers().len())
        .filter(|i| !right_keys.contains(i))
        .collect();

    let headers = joined_headers(left, right, &left_keys, &right_rest);
    let width = headers.len();
    let mut rows: Vec<Row> = Vec::new();

    match kind {
        JoinKind::Left | JoinKind::Inner => {
            let index = key_index(right, &right_keys);
            for lrow in left.rows() {
                let matches = row_key(lrow, &left_keys).and_then(|k| index.get(&k));
                match matches {
                    Some(hits) => {
                        for &r in hits {
                            rows.push(combine(Some(lrow), &right.rows()[r], &right_rest));
                        }
                    }
                    None if kind == JoinKind::Left => {
                        let mut row = lrow.clone();
                        row.resize(width, None);
                        rows.push(row);
                    }
                    None => {}
                }
            }
        }
        JoinKind::Right => {
            let index = key_index(left, &left_keys);
            let left_width = left.headers().len();
            for rrow in right.rows() {
                match row_key(rrow, &right_keys).and_then(|k| index.get(&k)) {
                    Some(hits) => {
                        for &l in hits {
                            rows.push(combine(Some(&left.rows()[l]), rrow, &right_rest));
                        }
                    }
                    None => {
                        // key cells come from the right row
                        let mut lrow: Row = vec![None; left_width];
                        for (&li, &ri) in left_keys.iter().zip(&right_keys) {
                            lrow[li] = rrow[ri].clone();
                        }
                        rows.push(combine(Some(&lrow), rrow, &right_rest));
                    }
                }
            }
        }
    }

    Table::new(left.name(), headers, rows)
}

fn joined_headers(left: &Table, right: &Table, left_keys: &[usize], right_rest: &[usize]) -> Vec<String> {
    let left_rest_names: Vec<&String> = left
        .headers()
        .iter()
        .enumerate()
        .filter(|(i, _)| !left_keys.contains(i))
        .map(|(_, h)| h)
        .collect();
    let right_rest_names: Vec<&String> = right_rest.iter().map(|&i| &right.headers()[i]).collect();

    let mut headers = Vec::with_capacity(left.headers().len() + right_rest.len());
    for (i, h) in left.headers().iter().enumerate() {
        if !left_keys.contains(&i) && right_rest_names.contains(&h) {
            headers.push(format!("{}{}", h, LEFT_SUFFIX));
        } else {
            headers.push(h.clone());
        }
    }
    for h in right_rest_names {
        if left_rest_names.contains(&h) {
            headers.push(format!("{}{}", h, RIGHT_SUFFIX));
        } else {
            headers.push(h.clone());
        }
    }
    headers
}

fn row_key<'a>(row: &'a Row, keys: &[usize]) -> Option<Vec<&'a str>> {
    keys.iter().map(|&i| row[i].as_deref()).collect()
}

fn key_index<'a>(table: &'a Table, keys: &[usize]) -> HashMap<Vec<&'a str>, Vec<usize>> {
    let mut index: HashMap<Vec<&str>, Vec<usize>> = HashMap::with_capacity(table.len());
    for (i, row) in table.rows().iter().enumerate() {
        if let Some(k) = row_key(row, keys) {
            index.entry(k).or_default().push(i);
        }
    }
    index
}

fn combine(left: Option<&Row>, right: &Row, right_rest: &[usize]) -> Row {
    let mut row = left.cloned().unwrap_or_default();
    row.extend(right_rest.iter().map(|&i| right[i].clone()));
    row
}

/// Count rows that picked up at least one non-null cell from the right side.
fn right_cells_present(table: &Table, left_width: usize) -> usize {
    table
        .rows()
        .iter()
        .filter(|r| r[left_width..].iter().any(Option::is_some))
        .count()
}
