//! Per-measurement normalization against the reference intake table.

use tracing::debug;

use crate::pipeline::energy::EnrichedRow;
use crate::pipeline::{Diagnostics, ScoringConfig};
use crate::reference::{Polarity, ReferenceIntakeEntry, ReferenceIntakeTable};

/// Capped, serving-scaled contribution of one nutrient to one product.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRatio {
    pub ndb_no: String,
    pub nutrient_code: String,
    pub polarity: Polarity,
    /// `None` when the measurement value or serving size is missing.
    pub nrn: Option<f64>,
}

/// `value / quantity`, clamped to `[0, cap]`.
pub fn capped_ratio(value: f64, quantity: f64, cap: f64) -> f64 {
    (value / quantity).clamp(0.0, cap)
}

/// Computes `nrn` for a single measurement against its reference entry.
pub fn nrn(
    value: Option<f64>,
    serving_size: Option<f64>,
    entry: &ReferenceIntakeEntry,
    config: &ScoringConfig,
) -> Option<f64> {
    Some(capped_ratio(value?, entry.quantity, config.ratio_cap) * serving_size?)
}

/// Looks up the reference entry for a row, if its nutrient is scored.
pub fn reference_for<'t>(
    row: &EnrichedRow,
    table: &'t ReferenceIntakeTable,
) -> Option<&'t ReferenceIntakeEntry> {
    row.branded
        .nutrient_code
        .as_deref()
        .and_then(|code| table.get(code))
}

/// Normalizes every row whose nutrient code is in `table`.
///
/// Rows with unknown or missing codes are dropped and counted, except the
/// energy rows, which are expected to be unscored.
pub fn normalize(
    rows: &[EnrichedRow],
    table: &ReferenceIntakeTable,
    config: &ScoringConfig,
    diagnostics: &mut Diagnostics,
) -> Vec<NormalizedRatio> {
    let mut ratios = Vec::new();

    for row in rows {
        let Some(entry) = reference_for(row, table) else {
            match row.branded.nutrient_code.as_deref() {
                Some(code) if code == config.energy_code => {}
                code => diagnostics.record_unknown_code(code.unwrap_or_default()),
            }
            continue;
        };

        let nrn = nrn(row.branded.output_value, row.branded.serving_size, entry, config);
        match nrn {
            None => diagnostics.unscorable_measurements += 1,
            Some(_) if row.branded.serving_size.is_some_and(|s| s < 0.0) => {
                diagnostics.negative_serving_measurements += 1;
            }
            Some(_) => {}
        }

        ratios.push(NormalizedRatio {
            ndb_no: row.branded.ndb_no.clone(),
            nutrient_code: entry.nutrient_code.clone(),
            polarity: entry.polarity,
            nrn,
        });
    }

    debug!(
        ratios = ratios.len(),
        dropped = rows.len() - ratios.len(),
        "Ratios normalized"
    );
    ratios
}
