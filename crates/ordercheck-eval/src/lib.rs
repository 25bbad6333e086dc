pub mod efficacy;
pub mod generator;
pub mod runner;
pub mod suite;
pub mod summary;
pub mod table;

pub use efficacy::{CommandEfficacy, EfficacyProvider, EfficacyRequest, NativeEfficacy};
pub use generator::generate_fixtures;
pub use runner::{run_batch, run_suite, BatchArtifacts, BatchOutcome, ReplicateFailure};
pub use suite::{AlgorithmConfig, BatchSuite, GenerateConfig, ReplicateRange};
pub use summary::{summarize, write_summary, GroupSummary, PlotSpec, Summary};
pub use table::{ResultTable, ResultTableBuilder, ScoreRecord};
