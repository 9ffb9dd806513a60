use anyhow::Result;
use metrojoin::{
    pipeline::{load_inputs, sink::MANIFEST_FILE, RunManifest},
    table::csv::read_csv,
    FsSink, MergeError, Pipeline, PipelineConfig, SuffixPolicy,
};
use std::{fs, path::Path};
use tempfile::tempdir;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn init_test_logging() {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,metrojoin=debug")),
        )
        .with_test_writer()
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

const HAPPINESS: &str = "\
City,Overall,Rank
\"St. Paul, WI\",60.5,1
\"Springfield, IL\",50.1,2
\"Chicago, IN\",55.0,3
\"Atlantis, ZZ\",10.0,4
";

const LIST1: &str = "\
CBSA Code,CBSA Title,Metropolitan/Micropolitan Statistical Area,CSA Title
100,\"Minneapolis-St. Paul, MN-WI\",Metropolitan Statistical Area,
16980,\"Chicago-Naperville-Elgin, IL-IN\",Metropolitan Statistical Area,\"Chicago-Naperville, IL-IN-WI\"
";

// principal-city list: no combined-area title column
const LIST2: &str = "\
CBSA Code,CBSA Title,Metropolitan/Micropolitan Statistical Area,Principal City Name
200,\"Springfield, IL\",Metropolitan Statistical Area,Springfield
";

fn seed(dir: &Path) -> Result<()> {
    fs::write(dir.join("Happiness_index.csv"), HAPPINESS)?;
    fs::write(dir.join("list1_2023.csv"), LIST1)?;
    fs::write(dir.join("list2_2023.csv"), LIST2)?;
    Ok(())
}

fn config(dir: &Path) -> PipelineConfig {
    PipelineConfig {
        dataset_dir: dir.to_path_buf(),
        ..Default::default()
    }
}

fn run_once(cfg: &PipelineConfig) -> Result<()> {
    let inputs = load_inputs(cfg)?;
    let mut sink = FsSink::from_config(cfg);
    Pipeline::from_config(cfg).run(&inputs, &mut sink)?;
    Ok(())
}

#[test]
fn end_to_end_writes_enriched_and_canonical_tables() -> Result<()> {
    init_test_logging();
    let dir = tempdir()?;
    seed(dir.path())?;
    let cfg = config(dir.path());
    run_once(&cfg)?;

    let enriched = read_csv(dir.path().join("Happiness_index_merged.csv"))?;
    assert_eq!(enriched.len(), 4);
    assert_eq!(
        enriched.headers(),
        &[
            "City",
            "Overall",
            "Rank",
            "CBSA",
            "Metropolitan/Micropolitan Statistical Area",
            "CSA Title",
            "Principal City Name"
        ]
    );
    assert_eq!(
        enriched.column_values("CBSA")?,
        vec![Some("100"), Some("200"), Some("16980"), None]
    );

    let canonical = read_csv(dir.path().join("list_2023_filtered.csv"))?;
    let cities = canonical.column_values("City")?;
    for expected in ["Minneapolis, WI", "St. Paul, WI", "Springfield, IL", "Chicago, IN", "Chicago, WI"] {
        assert!(cities.contains(&Some(expected)), "missing {expected}");
    }
    let mut unique = cities.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), cities.len());

    let manifest: RunManifest =
        serde_json::from_str(&fs::read_to_string(dir.path().join(MANIFEST_FILE))?)?;
    assert_eq!(manifest.suffix_policy, SuffixPolicy::SelfPair);
    assert_eq!(manifest.enriched_rows, 4);
    assert_eq!(manifest.canonical_rows, canonical.len());
    Ok(())
}

#[test]
fn rerun_produces_byte_identical_outputs() -> Result<()> {
    init_test_logging();
    let dir = tempdir()?;
    seed(dir.path())?;
    let cfg = PipelineConfig {
        parallel: true,
        ..config(dir.path())
    };

    run_once(&cfg)?;
    let first = fs::read(dir.path().join("list_2023_filtered.csv"))?;
    let first_enriched = fs::read(dir.path().join("Happiness_index_merged.csv"))?;
    run_once(&cfg)?;
    assert_eq!(first, fs::read(dir.path().join("list_2023_filtered.csv"))?);
    assert_eq!(
        first_enriched,
        fs::read(dir.path().join("Happiness_index_merged.csv"))?
    );
    Ok(())
}

#[test]
fn schema_failure_leaves_previous_outputs_untouched() -> Result<()> {
    init_test_logging();
    let dir = tempdir()?;
    seed(dir.path())?;
    let cfg = config(dir.path());
    run_once(&cfg)?;
    let before = fs::read(dir.path().join("Happiness_index_merged.csv"))?;

    fs::write(
        dir.path().join("list2_2023.csv"),
        "CBSA Code,CSA Title\n200,\n",
    )?;
    let inputs = load_inputs(&cfg)?;
    let mut sink = FsSink::from_config(&cfg);
    let err = Pipeline::from_config(&cfg)
        .run(&inputs, &mut sink)
        .unwrap_err();
    match err {
        MergeError::Schema { table, column } => {
            assert_eq!(table, "list2_2023.csv");
            assert_eq!(column, "CBSA Title");
        }
        other => panic!("expected schema error, got {other:?}"),
    }
    assert_eq!(before, fs::read(dir.path().join("Happiness_index_merged.csv"))?);
    Ok(())
}

#[test]
fn failed_output_write_keeps_every_previous_file() -> Result<()> {
    init_test_logging();
    let dir = tempdir()?;
    seed(dir.path())?;
    let cfg = config(dir.path());
    run_once(&cfg)?;
    let enriched_before = fs::read(dir.path().join("Happiness_index_merged.csv"))?;
    let canonical_before = fs::read(dir.path().join("list_2023_filtered.csv"))?;
    let manifest_before = fs::read(dir.path().join(MANIFEST_FILE))?;

    // new input so a committed enriched table would differ
    fs::write(
        dir.path().join("Happiness_index.csv"),
        format!("{HAPPINESS}\"Minneapolis, WI\",70.0,5\n"),
    )?;
    // the canonical table cannot be staged: its tmp path is taken by a directory
    fs::create_dir(dir.path().join(".list_2023_filtered.csv.tmp"))?;

    assert!(run_once(&cfg).is_err());
    assert_eq!(enriched_before, fs::read(dir.path().join("Happiness_index_merged.csv"))?);
    assert_eq!(canonical_before, fs::read(dir.path().join("list_2023_filtered.csv"))?);
    assert_eq!(manifest_before, fs::read(dir.path().join(MANIFEST_FILE))?);
    assert!(!dir.path().join(".Happiness_index_merged.csv.tmp").exists());
    Ok(())
}

#[test]
fn skip_suffix_policy_and_parquet_outputs() -> Result<()> {
    init_test_logging();
    let dir = tempdir()?;
    seed(dir.path())?;
    let cfg = PipelineConfig {
        suffix_policy: SuffixPolicy::SkipSuffix,
        write_parquet: true,
        ..config(dir.path())
    };
    run_once(&cfg)?;

    let canonical = read_csv(dir.path().join("list_2023_filtered.csv"))?;
    let cities = canonical.column_values("City")?;
    assert!(!cities.contains(&Some("WI, WI")));
    assert!(cities.contains(&Some("MN, WI")));
    assert!(dir.path().join("list_2023_filtered.parquet").is_file());
    assert!(dir.path().join("Happiness_index_merged.parquet").is_file());
    Ok(())
}

#[test]
fn configured_happiness_columns_are_dropped() -> Result<()> {
    let dir = tempdir()?;
    seed(dir.path())?;
    let cfg = PipelineConfig {
        happiness_drop_columns: vec!["Rank".into()],
        ..config(dir.path())
    };
    let inputs = load_inputs(&cfg)?;
    assert_eq!(inputs.external.headers(), &["City", "Overall"]);
    assert_eq!(inputs.references.len(), 2);
    Ok(())
}
