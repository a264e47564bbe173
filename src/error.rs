//! Error types for loading relations and running the scoring pipeline.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::records::Relation;

/// Fatal errors. Any of these aborts a run before output is produced.
///
/// Non-fatal anomalies (unknown nutrient codes, missing join targets) are
/// never raised as errors; they are counted in
/// [`Diagnostics`](crate::pipeline::Diagnostics) instead.
#[derive(Debug, Error)]
pub enum NrfiError {
    /// A numeric cell is present but does not hold a finite number.
    #[error("{relation}: column `{column}` on line {line} is not a number: {value:?}")]
    MalformedInput {
        relation: Relation,
        column: &'static str,
        line: usize,
        value: String,
    },

    /// A column the relation cannot be scored without is absent from the header.
    #[error("{relation}: required column `{column}` is missing from the header")]
    MissingColumn {
        relation: Relation,
        column: &'static str,
    },

    /// A row has an empty product key.
    #[error("{relation}: line {line} is missing required join key `{column}`")]
    MissingJoinKey {
        relation: Relation,
        column: &'static str,
        line: usize,
    },

    /// A relation that must be unique per product repeats a key.
    #[error("{relation}: product key {key:?} appears more than once")]
    DuplicateKey { relation: Relation, key: String },

    /// The reference table or scoring settings cannot produce meaningful ratios.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("{relation}: {source}")]
    Csv {
        relation: Relation,
        #[source]
        source: csv::Error,
    },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid reference table {}: {source}", path.display())]
    ReferenceTable {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl NrfiError {
    pub fn configuration(message: impl Into<String>) -> Self {
        NrfiError::Configuration(message.into())
    }

    /// True for errors caused by the content of an input relation.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            NrfiError::MalformedInput { .. }
                | NrfiError::MissingColumn { .. }
                | NrfiError::MissingJoinKey { .. }
                | NrfiError::DuplicateKey { .. }
                | NrfiError::Csv { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_input_names_relation_and_column() {
        let err = NrfiError::MalformedInput {
            relation: Relation::Nutrients,
            column: "output_value",
            line: 7,
            value: "abc".to_string(),
        };
        let message = err.to_string();

        assert!(message.contains("nutrients"));
        assert!(message.contains("output_value"));
        assert!(message.contains("line 7"));
        assert!(message.contains("\"abc\""));
        assert!(err.is_input_error());
    }

    #[test]
    fn test_configuration_is_not_input_error() {
        let err = NrfiError::configuration("reference quantity for 401 must be positive");
        assert!(!err.is_input_error());
        assert!(err.to_string().starts_with("configuration error"));
    }
}
