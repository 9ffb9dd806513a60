// src/walkability/mod.rs
use std::{cmp::Ordering, collections::BTreeMap};
use tracing::{debug, info, instrument};

use crate::enrich::{join, JoinKind};
use crate::error::{MergeError, Result};
use crate::reference::{CBSA, CITY};
use crate::table::{
    utils::{format_number, parse_number},
    Table,
};

pub const NAT_WALK_IND: &str = "NatWalkInd";
pub const AVERAGE_NAT_WALK_IND: &str = "Average NatWalkInd";

/// Drop rows null in any `na_subset` column, then rewrite `int_column` as
/// integers (parsed as float, truncated toward zero).
pub fn preprocess(table: &Table, na_subset: &[&str], int_column: &str) -> Result<Table> {
    let kept = table.drop_null_rows(na_subset)?;
    let dropped = table.len() - kept.len();
    let out = kept.map_column(int_column, |cell| {
        let raw = cell.ok_or_else(|| {
            MergeError::mismatch(format!("null value in integer column `{}`", int_column))
        })?;
        let value = parse_number(raw)
            .filter(|v| v.is_finite())
            .ok_or_else(|| {
                MergeError::mismatch(format!(
                    "`{}` in column `{}` is not a finite number",
                    raw, int_column
                ))
            })?;
        Ok(Some((value.trunc() as i64).to_string()))
    })?;
    debug!(table = out.name(), dropped, int_column, "preprocessed");
    Ok(out)
}

/// Inner join of two tables on `CBSA`.
pub fn merge_on_cbsa(left: &Table, right: &Table) -> Result<Table> {
    join(left, right, &[CBSA], JoinKind::Inner)
}

/// Mean `NatWalkInd` per `(City, CBSA)`, then the merged table (without the
/// raw index) right-joined onto those averages with exact duplicates removed.
///
/// Returns `(averages, merged_with_average)`. Groups are ordered by `City`,
/// then by `CBSA` numerically when both codes parse.
#[instrument(level = "info", skip_all, fields(rows = merged.len()))]
pub fn average_by_city(merged: &Table) -> Result<(Table, Table)> {
    let city = merged.require_column(CITY)?;
    let cbsa = merged.require_column(CBSA)?;
    let walk = merged.require_column(NAT_WALK_IND)?;

    // (sum, count) per group; keys with a null part are skipped
    let mut groups: BTreeMap<GroupKey, (f64, usize)> = BTreeMap::new();
    for row in merged.rows() {
        let (Some(c), Some(b)) = (row[city].as_deref(), row[cbsa].as_deref()) else {
            continue;
        };
        let entry = groups
            .entry(GroupKey::new(c, b))
            .or_insert((0.0, 0));
        if let Some(raw) = row[walk].as_deref() {
            let value = parse_number(raw).ok_or_else(|| {
                MergeError::mismatch(format!("`{}` in `{}` is not numeric", raw, NAT_WALK_IND))
            })?;
            entry.0 += value;
            entry.1 += 1;
        }
    }

    let average_rows = groups
        .into_iter()
        .map(|(key, (sum, count))| {
            let mean = (count > 0).then(|| format_number(sum / count as f64));
            vec![Some(key.city), Some(key.cbsa), mean]
        })
        .collect();
    let averages = Table::new(
        "average NatWalkInd",
        vec![CITY.into(), CBSA.into(), AVERAGE_NAT_WALK_IND.into()],
        average_rows,
    )?;

    let without_raw = merged.drop_columns(&[NAT_WALK_IND])?;
    let merged_with_average =
        join(&without_raw, &averages, &[CITY, CBSA], JoinKind::Right)?.drop_duplicates();
    info!(
        groups = averages.len(),
        rows = merged_with_average.len(),
        "averaged NatWalkInd per city"
    );
    Ok((averages, merged_with_average))
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct GroupKey {
    city: String,
    cbsa: String,
}

impl GroupKey {
    fn new(city: &str, cbsa: &str) -> Self {
        Self {
            city: city.to_string(),
            cbsa: cbsa.to_string(),
        }
    }
}

impl Ord for GroupKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.city.cmp(&other.city).then_with(|| {
            match (parse_number(&self.cbsa), parse_number(&other.cbsa)) {
                (Some(a), Some(b)) => a.total_cmp(&b).then_with(|| self.cbsa.cmp(&other.cbsa)),
                _ => self.cbsa.cmp(&other.cbsa),
            }
        })
    }
}

impl PartialOrd for GroupKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
