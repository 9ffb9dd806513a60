//! Compound-title expansion.
//!
//! A statistical-area title such as `"Minneapolis-St. Paul-Bloomington, MN-WI"`
//! names several cities that share a trailing suffix. Expansion turns one row
//! carrying such a title into one synthetic row per city, each a full copy of
//! the source row with only the `City` cell replaced.

use once_cell::sync::Lazy;
use rayon::prelude::*;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::error::Result;
use crate::table::{Row, Table};

/// Split tokens, tried leftmost-first in this order.
static DELIMITERS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r", |_|-|!|\+").expect("delimiter pattern is valid"));

/// A title expands only if it contains this character.
pub const EXPANSION_MARKER: char = '-';

/// What to do with the final segment, which is also the suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuffixPolicy {
    /// Emit every segment, including the suffix paired with itself (`"WI, WI"`).
    /// Matches the historical output; dedup keeps these keys harmless.
    #[default]
    SelfPair,
    /// Stop before the last segment.
    SkipSuffix,
}

impl fmt::Display for SuffixPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SuffixPolicy::SelfPair => "self_pair",
            SuffixPolicy::SkipSuffix => "skip_suffix",
        })
    }
}

impl FromStr for SuffixPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "self_pair" => Ok(SuffixPolicy::SelfPair),
            "skip_suffix" => Ok(SuffixPolicy::SkipSuffix),
            other => Err(format!(
                "unknown suffix policy `{}` (expected self_pair or skip_suffix)",
                other
            )),
        }
    }
}

/// Split `title` on the fixed delimiter set. Adjacent delimiters yield empty segments.
pub fn split_title(title: &str) -> Vec<&str> {
    DELIMITERS.split(title).collect()
}

/// The city keys a title expands into, or an empty list if it has no marker.
pub fn expand_title(title: &str, policy: SuffixPolicy) -> Vec<String> {
    if !title.contains(EXPANSION_MARKER) {
        return Vec::new();
    }
    let segments = split_title(title);
    let Some(suffix) = segments.last() else {
        return Vec::new();
    };
    let take = match policy {
        SuffixPolicy::SelfPair => segments.len(),
        SuffixPolicy::SkipSuffix => segments.len() - 1,
    };
    segments[..take]
        .iter()
        .map(|seg| format!("{}, {}", seg, suffix))
        .collect()
}

/// Expands rows of a table on a title column into a target column.
#[derive(Debug, Clone)]
pub struct Expander {
    target: String,
    policy: SuffixPolicy,
    parallel: bool,
}

impl Expander {
    pub fn new(target: impl Into<String>, policy: SuffixPolicy) -> Self {
        Self {
            target: target.into(),
            policy,
            parallel: false,
        }
    }

    /// Fan the per-row work out over rayon. Output order is unchanged.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn policy(&self) -> SuffixPolicy {
        self.policy
    }

    /// Synthesize the expansion rows for `table` keyed on `title_column`.
    ///
    /// The originals are not included. Rows with a null title are skipped, and
    /// an absent title column yields nothing. The target column must exist.
    pub fn expand(&self, table: &Table, title_column: &str) -> Result<Vec<Row>> {
        let target = table.require_column(&self.target)?;
        let Some(title) = table.column_index(title_column) else {
            return Ok(Vec::new());
        };

        let policy = self.policy;
        let per_row = |row: &Row| -> Vec<Row> {
            let Some(text) = row[title].as_deref() else {
                return Vec::new();
            };
            expand_title(text, policy)
                .into_iter()
                .map(|key| {
                    let mut copy = row.clone();
                    copy[target] = Some(key);
                    copy
                })
                .collect()
        };

        // rayon's indexed collect keeps input order, so first-wins dedup downstream
        // sees the same sequence either way.
        let chunks: Vec<Vec<Row>> = if self.parallel {
            table.rows().par_iter().map(per_row).collect()
        } else {
            table.rows().iter().map(per_row).collect()
        };
        Ok(chunks.into_iter().flatten().collect())
    }
}
