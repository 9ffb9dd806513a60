// src/config.rs
use glob::glob;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    path::{Path, PathBuf},
};
use tracing::debug;

use crate::error::{MergeError, Result};
use crate::expand::SuffixPolicy;

/// Everything a pipeline run needs to find its inputs and place its outputs.
///
/// Every field has a default, so an empty YAML document (or no file at all)
/// reproduces the historical `./dataset/` layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory all relative input and output names resolve against.
    pub dataset_dir: PathBuf,
    pub happiness_file: String,
    /// File names or glob patterns, concatenated in this order.
    pub reference_files: Vec<String>,
    pub enriched_output: String,
    pub canonical_output: String,
    /// Happiness columns removed before enrichment.
    pub happiness_drop_columns: Vec<String>,
    pub suffix_policy: SuffixPolicy,
    /// Expand titles on the rayon pool.
    pub parallel: bool,
    /// Also write `.parquet` siblings of both outputs.
    pub write_parquet: bool,
    /// Write `run_manifest.json` next to the outputs.
    pub write_manifest: bool,
    /// Optional column cookbook used for the post-run description report.
    pub cookbook_file: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            dataset_dir: PathBuf::from("./dataset/"),
            happiness_file: "Happiness_index.csv".into(),
            reference_files: vec!["list1_2023.csv".into(), "list2_2023.csv".into()],
            enriched_output: "Happiness_index_merged.csv".into(),
            canonical_output: "list_2023_filtered.csv".into(),
            happiness_drop_columns: Vec::new(),
            suffix_policy: SuffixPolicy::default(),
            parallel: false,
            write_parquet: false,
            write_manifest: true,
            cookbook_file: None,
        }
    }
}

impl PipelineConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            std::io::Error::new(e.kind(), format!("opening {}: {}", path.display(), e))
        })?;
        let config: PipelineConfig = serde_yaml::from_reader(file)?;
        debug!(?config, "loaded config");
        Ok(config)
    }

    pub fn from_yaml_str(s: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(s)?)
    }

    pub fn resolve(&self, name: &str) -> PathBuf {
        self.dataset_dir.join(name)
    }

    pub fn happiness_path(&self) -> PathBuf {
        self.resolve(&self.happiness_file)
    }

    pub fn cookbook_path(&self) -> Option<PathBuf> {
        self.cookbook_file.as_deref().map(|f| self.resolve(f))
    }

    /// Expand `reference_files` against `dataset_dir`. Plain names must exist;
    /// patterns must match at least one file, and their matches are sorted.
    pub fn reference_paths(&self) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for entry in &self.reference_files {
            let full = self.resolve(entry);
            let pattern = full.to_string_lossy().to_string();
            let mut matched: Vec<PathBuf> = glob(&pattern)
                .map_err(|e| MergeError::Config(format!("bad pattern `{}`: {}", entry, e)))?
                .filter_map(|p| p.ok())
                .filter(|p| p.is_file())
                .collect();
            if matched.is_empty() {
                return Err(MergeError::Config(format!(
                    "reference source `{}` matched no files under {}",
                    entry,
                    self.dataset_dir.display()
                )));
            }
            matched.sort();
            paths.extend(matched);
        }
        Ok(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn empty_document_uses_historical_layout() -> anyhow::Result<()> {
        let cfg = PipelineConfig::from_yaml_str("{}")?;
        assert_eq!(cfg, PipelineConfig::default());
        assert_eq!(cfg.happiness_path(), PathBuf::from("./dataset/Happiness_index.csv"));
        Ok(())
    }

    #[test]
    fn yaml_overrides_policy_and_outputs() -> anyhow::Result<()> {
        let cfg = PipelineConfig::from_yaml_str(
            "suffix_policy: skip_suffix\nwrite_parquet: true\nreference_files: ['list*.csv']\n",
        )?;
        assert_eq!(cfg.suffix_policy, SuffixPolicy::SkipSuffix);
        assert!(cfg.write_parquet);
        assert_eq!(cfg.canonical_output, "list_2023_filtered.csv");
        Ok(())
    }

    #[test]
    fn reference_globs_expand_sorted() -> anyhow::Result<()> {
        let dir = tempdir()?;
        fs::write(dir.path().join("list2_2023.csv"), "")?;
        fs::write(dir.path().join("list1_2023.csv"), "")?;
        let cfg = PipelineConfig {
            dataset_dir: dir.path().to_path_buf(),
            reference_files: vec!["list*_2023.csv".into()],
            ..Default::default()
        };
        let paths = cfg.reference_paths()?;
        let names: Vec<_> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["list1_2023.csv", "list2_2023.csv"]);
        Ok(())
    }

    #[test]
    fn missing_reference_file_is_config_error() {
        let dir = tempdir().unwrap();
        let cfg = PipelineConfig {
            dataset_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        assert!(matches!(cfg.reference_paths(), Err(MergeError::Config(_))));
    }
}
