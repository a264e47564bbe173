//! The NRFI scoring pipeline.
//!
//! A run is a straight-line batch transform:
//! join -> energy -> normalize -> aggregate -> assemble.
//! Each stage is a plain function over in-memory rows; the run is a pure
//! function of the [`Dataset`], the [`ReferenceIntakeTable`] and the
//! [`ScoringConfig`].

pub mod aggregate;
pub mod assemble;
pub mod diagnostics;
pub mod energy;
pub mod join;
pub mod normalize;

pub use aggregate::PolaritySums;
pub use assemble::ScoreRecord;
pub use diagnostics::Diagnostics;
pub use energy::EnrichedRow;
pub use normalize::NormalizedRatio;

use std::collections::BTreeSet;
use tracing::info;

use crate::error::NrfiError;
use crate::parser::Dataset;
use crate::reference::ReferenceIntakeTable;

/// Scoring constants that are not part of the reference table.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringConfig {
    /// Nutrient code of the caloric energy measurement.
    pub energy_code: String,
    /// Upper bound of `value / reference quantity` for one nutrient.
    pub ratio_cap: f64,
    /// Measurements are reported per this many units of the base measure.
    pub reference_scale: f64,
    /// Unit label written next to `energy_per_serving`.
    pub energy_unit: String,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            energy_code: "208".to_string(),
            ratio_cap: 1.0,
            reference_scale: 100.0,
            energy_unit: "kcal".to_string(),
        }
    }
}

impl ScoringConfig {
    pub fn validate(&self) -> Result<(), NrfiError> {
        if self.energy_code.is_empty() {
            return Err(NrfiError::configuration("energy nutrient code is empty"));
        }
        if !(self.ratio_cap.is_finite() && self.ratio_cap > 0.0) {
            return Err(NrfiError::configuration(format!(
                "ratio cap must be positive, got {}",
                self.ratio_cap
            )));
        }
        if !(self.reference_scale.is_finite() && self.reference_scale > 0.0) {
            return Err(NrfiError::configuration(format!(
                "reference scale must be positive, got {}",
                self.reference_scale
            )));
        }
        Ok(())
    }
}

/// Everything a run produces.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    /// One record per product key, ordered by key.
    pub scores: Vec<ScoreRecord>,
    /// The per-measurement relation the scores were computed from.
    pub enriched: Vec<EnrichedRow>,
    pub diagnostics: Diagnostics,
}

/// Scores every product that has at least one nutrient measurement.
///
/// # Errors
///
/// Fails on an invalid `config` or on duplicate keys in the product or
/// serving-size relations. No partial output is produced.
#[tracing::instrument(skip_all, fields(measurements = dataset.measurements.len(), reference_entries = table.len()))]
pub fn run(
    dataset: &Dataset,
    table: &ReferenceIntakeTable,
    config: &ScoringConfig,
) -> Result<PipelineOutput, NrfiError> {
    config.validate()?;
    let mut diagnostics = Diagnostics::default();

    let branded = join::join(dataset, &mut diagnostics)?;
    let enriched = energy::attach_energy(branded, config, &mut diagnostics);
    let ratios = normalize::normalize(&enriched, table, config, &mut diagnostics);

    let product_keys: BTreeSet<&str> = enriched.iter().map(|r| r.branded.ndb_no.as_str()).collect();
    let sums = aggregate::aggregate(product_keys, &ratios);
    let scores = assemble::assemble(&sums, &enriched, config);

    diagnostics.products_scored = scores.len();
    info!(products = scores.len(), ratios = ratios.len(), "Scoring complete");

    Ok(PipelineOutput {
        scores,
        enriched,
        diagnostics,
    })
}
