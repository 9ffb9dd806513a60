// src/reference/mod.rs
use tracing::{debug, info, instrument};

use crate::error::{MergeError, Result};
use crate::expand::{Expander, SuffixPolicy};
use crate::table::Table;

pub const CBSA_TITLE: &str = "CBSA Title";
pub const CBSA_CODE: &str = "CBSA Code";
pub const CSA_TITLE: &str = "CSA Title";

/// Canonical key column.
pub const CITY: &str = "City";
/// Canonical area-code column.
pub const CBSA: &str = "CBSA";

/// Columns every raw reference source must carry.
pub const REQUIRED_COLUMNS: [&str; 2] = [CBSA_TITLE, CBSA_CODE];

/// Builds the canonical, city-keyed reference table from raw CBSA/CSA lists.
#[derive(Debug, Clone)]
pub struct ReferenceBuilder {
    expander: Expander,
}

impl Default for ReferenceBuilder {
    fn default() -> Self {
        Self::new(SuffixPolicy::default(), false)
    }
}

impl ReferenceBuilder {
    pub fn new(policy: SuffixPolicy, parallel: bool) -> Self {
        Self {
            expander: Expander::new(CITY, policy).parallel(parallel),
        }
    }

    pub fn policy(&self) -> SuffixPolicy {
        self.expander.policy()
    }

    /// Concatenate, rename, expand on `City` then `CSA Title`, and dedup on `City`.
    ///
    /// Every source is checked for the required columns before any work starts;
    /// the first gap aborts the build. `CSA Title` only has to exist somewhere
    /// in the concatenated table.
    #[instrument(level = "info", skip_all, fields(sources = raw_tables.len()))]
    pub fn build(&self, raw_tables: &[Table]) -> Result<Table> {
        // 1) fail fast on schema
        validate_sources(raw_tables)?;

        // 2) concatenate in source order and move to canonical names
        let mut working = Table::concat("canonical reference", raw_tables)
            .rename_columns(&[(CBSA_TITLE, CITY), (CBSA_CODE, CBSA)]);
        // sources without a combined-area title contribute nulls here
        working.require_column(CSA_TITLE)?;
        let base_rows = working.len();

        // 3) first pass on the renamed title; collected, then appended once
        let city_rows = self.expander.expand(&working, CITY)?;
        let city_expansions = city_rows.len();
        working.extend_rows(city_rows)?;

        // 4) second pass on the combined-area title over everything so far
        let csa_rows = self.expander.expand(&working, CSA_TITLE)?;
        let csa_expansions = csa_rows.len();
        working.extend_rows(csa_rows)?;
        debug!(base_rows, city_expansions, csa_expansions, "expanded titles");

        // 5) first occurrence of each City wins
        let canonical = working.drop_duplicates_by(CITY)?;
        info!(
            base_rows,
            generated = city_expansions + csa_expansions,
            canonical = canonical.len(),
            policy = %self.policy(),
            "built canonical reference table"
        );
        Ok(canonical)
    }
}

/// Check each source in order for `REQUIRED_COLUMNS`.
pub fn validate_sources(raw_tables: &[Table]) -> Result<()> {
    if raw_tables.is_empty() {
        return Err(MergeError::mismatch(
            "at least one reference table is required",
        ));
    }
    for table in raw_tables {
        for column in REQUIRED_COLUMNS {
            table.require_column(column)?;
        }
    }
    Ok(())
}
