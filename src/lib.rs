pub mod error;
pub mod output;
pub mod parser;
pub mod pipeline;
pub mod records;
pub mod reference;

pub use error::NrfiError;
pub use parser::{Dataset, load_dataset};
pub use pipeline::{PipelineOutput, ScoreRecord, ScoringConfig, run};
pub use reference::{Polarity, ReferenceIntakeEntry, ReferenceIntakeTable};
