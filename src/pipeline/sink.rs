use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};
use tracing::{debug, info};

use super::{OutputSink, PipelineOutput};
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::expand::SuffixPolicy;
use crate::table::{atomic::StagedWrites, csv::write_csv_to, parquet::write_parquet_to};

pub const MANIFEST_FILE: &str = "run_manifest.json";

/// Summary of one run, written beside the outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub generated_at: DateTime<Utc>,
    pub suffix_policy: SuffixPolicy,
    pub canonical_rows: usize,
    pub enriched_rows: usize,
    pub outputs: Vec<String>,
}

/// Writes both tables as CSV (and optionally Parquet) into a directory.
#[derive(Debug, Clone)]
pub struct FsSink {
    out_dir: PathBuf,
    canonical_name: String,
    enriched_name: String,
    parquet: bool,
    manifest: bool,
}

impl FsSink {
    pub fn new(
        out_dir: impl Into<PathBuf>,
        canonical_name: impl Into<String>,
        enriched_name: impl Into<String>,
    ) -> Self {
        Self {
            out_dir: out_dir.into(),
            canonical_name: canonical_name.into(),
            enriched_name: enriched_name.into(),
            parquet: false,
            manifest: false,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(
            &config.dataset_dir,
            &config.canonical_output,
            &config.enriched_output,
        )
        .with_parquet(config.write_parquet)
        .with_manifest(config.write_manifest)
    }

    pub fn with_parquet(mut self, on: bool) -> Self {
        self.parquet = on;
        self
    }

    pub fn with_manifest(mut self, on: bool) -> Self {
        self.manifest = on;
        self
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }
}

impl OutputSink for FsSink {
    /// Every file is staged to a tmp path first; targets are only replaced once
    /// the last one has been written, so a failure leaves the previous run intact.
    fn write(&mut self, output: &PipelineOutput, policy: SuffixPolicy) -> Result<()> {
        fs::create_dir_all(&self.out_dir)?;

        let mut staged = StagedWrites::new();
        let mut written = Vec::new();
        for (table, name) in [
            (&output.enriched, &self.enriched_name),
            (&output.canonical, &self.canonical_name),
        ] {
            let csv_path = self.out_dir.join(name);
            staged.stage(&csv_path, |w| write_csv_to(table, w))?;
            written.push(name.clone());
            debug!(path = %csv_path.display(), rows = table.len(), "staged csv");

            if self.parquet {
                let pq_path = csv_path.with_extension("parquet");
                staged.stage(&pq_path, |w| write_parquet_to(table, w))?;
                written.push(
                    pq_path
                        .file_name()
                        .map(|n| n.to_string_lossy().to_string())
                        .unwrap_or_default(),
                );
            }
        }

        if self.manifest {
            let manifest = RunManifest {
                generated_at: Utc::now(),
                suffix_policy: policy,
                canonical_rows: output.canonical.len(),
                enriched_rows: output.enriched.len(),
                outputs: written.clone(),
            };
            staged.stage(self.out_dir.join(MANIFEST_FILE), |w| {
                serde_json::to_writer_pretty(&mut *w, &manifest)?;
                w.write_all(b"\n")?;
                Ok(())
            })?;
        }

        let files = staged.len();
        staged.commit()?;
        info!(out_dir = %self.out_dir.display(), files, outputs = ?written, "wrote outputs");
        Ok(())
    }
}

/// Keeps every output in memory; for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub written: Vec<PipelineOutput>,
}

impl OutputSink for MemorySink {
    fn write(&mut self, output: &PipelineOutput, _policy: SuffixPolicy) -> Result<()> {
        self.written.push(output.clone());
        Ok(())
    }
}
