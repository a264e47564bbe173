//! Energy extraction and per-serving energy for every joined row.

use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::pipeline::join::BrandedRow;
use crate::pipeline::{Diagnostics, ScoringConfig};

/// The caloric energy measurement of one product.
#[derive(Debug, Clone, PartialEq)]
pub struct EnergyRecord {
    pub energy_value: Option<f64>,
    pub energy_uom: Option<String>,
}

/// A joined row with its product's energy attached.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedRow {
    pub branded: BrandedRow,
    pub energy_value: Option<f64>,
    pub energy_uom: Option<String>,
    pub energy_per_serving: Option<f64>,
}

/// Collects the energy measurement of each product, keyed by product.
///
/// Only the first energy row of a product is kept; later ones are counted in
/// `diagnostics.duplicate_energy_rows`.
pub fn extract_energy(
    rows: &[BrandedRow],
    config: &ScoringConfig,
    diagnostics: &mut Diagnostics,
) -> HashMap<String, EnergyRecord> {
    let mut energy: HashMap<String, EnergyRecord> = HashMap::new();

    for row in rows {
        if row.nutrient_code.as_deref() != Some(config.energy_code.as_str()) {
            continue;
        }
        if energy.contains_key(&row.ndb_no) {
            diagnostics.duplicate_energy_rows += 1;
            continue;
        }
        energy.insert(
            row.ndb_no.clone(),
            EnergyRecord {
                energy_value: row.output_value,
                energy_uom: row.output_uom.clone(),
            },
        );
    }

    energy
}

/// Left-joins each product's energy back onto its rows and derives
/// `energy_per_serving`.
pub fn attach_energy(
    rows: Vec<BrandedRow>,
    config: &ScoringConfig,
    diagnostics: &mut Diagnostics,
) -> Vec<EnrichedRow> {
    let energy = extract_energy(&rows, config, diagnostics);
    let products: HashSet<&str> = rows.iter().map(|r| r.ndb_no.as_str()).collect();
    diagnostics.products_without_energy = products
        .iter()
        .filter(|key| !energy.contains_key(**key))
        .count();
    debug!(products_with_energy = energy.len(), "Energy extracted");

    rows.into_iter()
        .map(|branded| {
            let record = energy.get(&branded.ndb_no);
            let energy_value = record.and_then(|r| r.energy_value);
            let energy_uom = record.and_then(|r| r.energy_uom.clone());
            let energy_per_serving =
                energy_per_serving(energy_value, branded.serving_size, config.reference_scale);

            EnrichedRow {
                branded,
                energy_value,
                energy_uom,
                energy_per_serving,
            }
        })
        .collect()
}

/// Rescales a per-`reference_scale` energy value to the product's serving.
///
/// Missing energy or serving size yields `None`, never zero.
pub fn energy_per_serving(
    energy_value: Option<f64>,
    serving_size: Option<f64>,
    reference_scale: f64,
) -> Option<f64> {
    Some(energy_value? / reference_scale * serving_size?)
}
