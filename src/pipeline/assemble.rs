//! Collapses the joined rows into one score record per product.

use serde::Serialize;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use crate::pipeline::ScoringConfig;
use crate::pipeline::aggregate::PolaritySums;
use crate::pipeline::energy::EnrichedRow;

/// Final per-product output row.
///
/// Field order is the column order of the score CSV. The polarity sums are
/// kept for callers but not written out.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreRecord {
    pub ndb_no: String,
    pub nrfi: f64,
    #[serde(skip_serializing)]
    pub nrn_pos: f64,
    #[serde(skip_serializing)]
    pub nrn_neg: f64,
    pub long_name: Option<String>,
    pub manufacturer: Option<String>,
    pub serving_size: Option<f64>,
    pub serving_size_uom: Option<String>,
    pub household_serving_size: Option<f64>,
    pub household_serving_size_uom: Option<String>,
    pub energy_per_serving: Option<f64>,
    pub energy_per_serving_uom: String,
}

impl ScoreRecord {
    fn new(ndb_no: &str, sums: PolaritySums, row: &EnrichedRow, config: &ScoringConfig) -> Self {
        let b = &row.branded;
        ScoreRecord {
            ndb_no: ndb_no.to_string(),
            nrfi: sums.nrfi(),
            nrn_pos: sums.nrn_pos,
            nrn_neg: sums.nrn_neg,
            long_name: b.long_name.clone(),
            manufacturer: b.manufacturer.clone(),
            serving_size: b.serving_size,
            serving_size_uom: b.serving_size_uom.clone(),
            household_serving_size: b.household_serving_size,
            household_serving_size_uom: b.household_serving_size_uom.clone(),
            energy_per_serving: row.energy_per_serving,
            energy_per_serving_uom: config.energy_unit.clone(),
        }
    }
}

/// Re-joins per-product sums onto the enriched rows and collapses the
/// nutrient-level rows into one record per product, ordered by key.
///
/// Product and serving keys are unique after the join and energy is taken
/// from one row per product, so every row of a product projects to the same
/// record and the first one stands for all of them.
pub fn assemble(
    sums: &BTreeMap<String, PolaritySums>,
    rows: &[EnrichedRow],
    config: &ScoringConfig,
) -> Vec<ScoreRecord> {
    let mut records: BTreeMap<&str, ScoreRecord> = BTreeMap::new();

    for row in rows {
        let key = row.branded.ndb_no.as_str();
        let Some(product_sums) = sums.get(key) else {
            continue;
        };
        if let Entry::Vacant(slot) = records.entry(key) {
            slot.insert(ScoreRecord::new(key, *product_sums, row, config));
        }
    }

    records.into_values().collect()
}
