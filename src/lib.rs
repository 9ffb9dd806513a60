//! Expand compound CBSA/CSA titles into a city-keyed reference table and use
//! it to enrich city-level datasets.

pub mod config;
pub mod cookbook;
pub mod enrich;
pub mod error;
pub mod expand;
pub mod normalize;
pub mod pipeline;
pub mod reference;
pub mod table;
pub mod walkability;

pub use config::PipelineConfig;
pub use error::{MergeError, Result};
pub use expand::{Expander, SuffixPolicy};
pub use pipeline::{FsSink, MemorySink, OutputSink, Pipeline, PipelineInputs, PipelineOutput};
pub use reference::ReferenceBuilder;
pub use table::Table;
