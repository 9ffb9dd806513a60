// src/pipeline/mod.rs
pub mod load;
pub mod sink;

use tracing::{info, instrument};

use crate::config::PipelineConfig;
use crate::enrich;
use crate::error::Result;
use crate::expand::SuffixPolicy;
use crate::reference::ReferenceBuilder;
use crate::table::Table;

pub use load::load_inputs;
pub use sink::{FsSink, MemorySink, RunManifest};

/// Tables a run consumes, already in memory.
#[derive(Debug, Clone)]
pub struct PipelineInputs {
    /// Dataset to enrich (the happiness index), keyed by `City`.
    pub external: Table,
    /// Raw CBSA/CSA lists, in concatenation order.
    pub references: Vec<Table>,
}

/// The two artifacts of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOutput {
    pub canonical: Table,
    pub enriched: Table,
}

/// Where a finished run goes.
pub trait OutputSink {
    fn write(&mut self, output: &PipelineOutput, policy: SuffixPolicy) -> Result<()>;
}

/// Build -> enrich -> write, with no state outside the value itself.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    builder: ReferenceBuilder,
}

impl Pipeline {
    pub fn new(builder: ReferenceBuilder) -> Self {
        Self { builder }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(ReferenceBuilder::new(config.suffix_policy, config.parallel))
    }

    /// Run the pure part: canonical reference table, then the enriched table.
    pub fn process(&self, inputs: &PipelineInputs) -> Result<PipelineOutput> {
        let canonical = self.builder.build(&inputs.references)?;
        let enriched = enrich::merge(&inputs.external, &canonical)?;
        Ok(PipelineOutput {
            canonical,
            enriched,
        })
    }

    /// Process, then hand the result to `sink`. Nothing reaches the sink if
    /// processing fails.
    #[instrument(level = "info", skip_all, fields(references = inputs.references.len()))]
    pub fn run<S: OutputSink + ?Sized>(
        &self,
        inputs: &PipelineInputs,
        sink: &mut S,
    ) -> Result<PipelineOutput> {
        let output = self.process(inputs)?;
        sink.write(&output, self.builder.policy())?;
        info!(
            canonical = output.canonical.len(),
            enriched = output.enriched.len(),
            "pipeline finished"
        );
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MergeError;

    fn inputs() -> PipelineInputs {
        let happiness = Table::from_literal(
            "Happiness_index.csv",
            &["City", "Score"],
            &[&["Minneapolis, WI", "61.2"], &["Springfield, IL", "50.1"], &["Nowhere, ZZ", "1"]],
        )
        .unwrap();
        let list1 = Table::from_literal(
            "list1_2023.csv",
            &["CBSA Code", "CBSA Title", "CSA Title"],
            &[&["100", "Minneapolis-St. Paul, MN-WI", ""]],
        )
        .unwrap();
        let list2 = Table::from_literal(
            "list2_2023.csv",
            &["CBSA Code", "CBSA Title", "CSA Title"],
            &[&["200", "Springfield, IL", ""]],
        )
        .unwrap();
        PipelineInputs {
            external: happiness,
            references: vec![list1, list2],
        }
    }

    #[test]
    fn run_writes_one_output_to_sink() -> anyhow::Result<()> {
        let mut sink = MemorySink::default();
        let out = Pipeline::default().run(&inputs(), &mut sink)?;
        assert_eq!(sink.written.len(), 1);
        assert_eq!(sink.written[0], out);
        assert_eq!(out.enriched.len(), 3);
        assert_eq!(
            out.enriched.column_values("CBSA")?,
            vec![Some("100"), Some("200"), None]
        );
        Ok(())
    }

    #[test]
    fn failed_build_writes_nothing() {
        let mut bad = inputs();
        bad.references[1] = Table::from_literal("list2_2023.csv", &["CBSA Code"], &[]).unwrap();
        let mut sink = MemorySink::default();
        let err = Pipeline::default().run(&bad, &mut sink).unwrap_err();
        assert!(matches!(err, MergeError::Schema { .. }));
        assert!(sink.written.is_empty());
    }
}
