use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use metrojoin::{
    cookbook::{describe_columns, unused_entries, Cookbook},
    pipeline::{load_inputs, FsSink, Pipeline},
    table::csv::{read_csv, write_csv},
    walkability, PipelineConfig, SuffixPolicy,
};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Expand CBSA/CSA titles into a city-keyed reference table and enrich city datasets"
)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the canonical reference table and the enriched happiness table.
    Run {
        /// YAML config; defaults reproduce the ./dataset/ layout
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(long)]
        dataset_dir: Option<PathBuf>,
        /// self_pair or skip_suffix
        #[arg(long)]
        suffix_policy: Option<SuffixPolicy>,
        #[arg(long)]
        parallel: bool,
        #[arg(long)]
        parquet: bool,
    },
    /// Print cookbook descriptions for every column of a CSV.
    Describe {
        csv: PathBuf,
        #[arg(long)]
        cookbook: PathBuf,
    },
    /// Join an enriched table with walkability data and average NatWalkInd per city.
    Walkability {
        #[arg(long)]
        enriched: PathBuf,
        #[arg(long)]
        walkability: PathBuf,
        #[arg(long, default_value = "./dataset/")]
        output: PathBuf,
        /// Columns whose nulls drop a row before the join
        #[arg(long, value_delimiter = ',', default_value = "CBSA")]
        na_subset: Vec<String>,
        #[arg(long, default_value = "CBSA")]
        int_column: String,
    },
}

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();

    match Args::parse().command {
        Command::Run {
            config,
            dataset_dir,
            suffix_policy,
            parallel,
            parquet,
        } => {
            // ─── 2) config: file, then flag overrides ────────────────
            let mut cfg = match config {
                Some(path) => PipelineConfig::load(&path)
                    .with_context(|| format!("loading config {}", path.display()))?,
                None => PipelineConfig::default(),
            };
            if let Some(dir) = dataset_dir {
                cfg.dataset_dir = dir;
            }
            if let Some(policy) = suffix_policy {
                cfg.suffix_policy = policy;
            }
            cfg.parallel |= parallel;
            cfg.write_parquet |= parquet;
            run(&cfg)
        }
        Command::Describe { csv, cookbook } => describe(&csv, &cookbook),
        Command::Walkability {
            enriched,
            walkability,
            output,
            na_subset,
            int_column,
        } => walk(&enriched, &walkability, &output, &na_subset, &int_column),
    }
}

fn run(cfg: &PipelineConfig) -> Result<()> {
    // ─── 3) load everything before any output is touched ────────────
    let inputs = load_inputs(cfg)?;

    // ─── 4) build, enrich, write ─────────────────────────────────────
    let mut sink = FsSink::from_config(cfg);
    let output = Pipeline::from_config(cfg)
        .run(&inputs, &mut sink)
        .context("pipeline failed; no outputs written")?;

    // ─── 5) optional column report ───────────────────────────────────
    if let Some(path) = cfg.cookbook_path() {
        let book = Cookbook::load(&path)
            .with_context(|| format!("loading cookbook {}", path.display()))?;
        let report = describe_columns(&output.enriched, &book);
        info!(
            documented = report.columns.len() - report.undocumented.len(),
            undocumented = report.undocumented.len(),
            "column report"
        );
    }
    Ok(())
}

fn describe(csv: &Path, cookbook: &Path) -> Result<()> {
    let table = read_csv(csv).with_context(|| format!("reading {}", csv.display()))?;
    let book = Cookbook::load(cookbook)
        .with_context(|| format!("loading cookbook {}", cookbook.display()))?;

    let report = describe_columns(&table, &book);
    for col in &report.columns {
        match &col.description {
            Some(d) => println!("{}: {}", col.column, d),
            None => println!("{}: no description", col.column),
        }
    }
    if report.all_documented() {
        println!("All columns have descriptions.");
    } else {
        println!("Columns without descriptions: {}", report.undocumented.join(", "));
    }

    let unused = unused_entries(&book, &table);
    for key in &unused {
        warn!(column = %key, "cookbook entry not used");
    }
    Ok(())
}

fn walk(
    enriched: &Path,
    walkability_path: &Path,
    output: &Path,
    na_subset: &[String],
    int_column: &str,
) -> Result<()> {
    let happy = read_csv(enriched).with_context(|| format!("reading {}", enriched.display()))?;
    let walk = read_csv(walkability_path)
        .with_context(|| format!("reading {}", walkability_path.display()))?;

    let subset: Vec<&str> = na_subset.iter().map(String::as_str).collect();
    let happy = walkability::preprocess(&happy, &subset, int_column)?;
    let walk = walkability::preprocess(&walk, &[int_column], int_column)?;
    let merged = walkability::merge_on_cbsa(&happy, &walk)?;
    let (averages, merged_with_average) = walkability::average_by_city(&merged)?;

    std::fs::create_dir_all(output)?;
    write_csv(&averages, output.join("average_natwalkind.csv"))?;
    write_csv(
        &merged_with_average,
        output.join("happiness_walkability_merged.csv"),
    )?;
    info!(
        groups = averages.len(),
        rows = merged_with_average.len(),
        "wrote walkability outputs"
    );
    Ok(())
}
