//! Counters for anomalies that are absorbed rather than aborting a run.

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Counters for the non-fatal anomalies a run absorbs.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Diagnostics {
    pub measurements: usize,
    pub products_scored: usize,
    pub measurements_without_product: usize,
    pub measurements_without_serving: usize,
    pub products_without_energy: usize,
    pub duplicate_energy_rows: usize,
    /// Rows with a known nutrient but no value or serving size.
    pub unscorable_measurements: usize,
    /// Scored rows whose serving size is below zero; their contribution keeps the sign.
    pub negative_serving_measurements: usize,
    pub unknown_nutrient_rows: usize,
    pub unknown_nutrient_codes: BTreeMap<String, usize>,
}

impl Diagnostics {
    pub fn record_unknown_code(&mut self, code: &str) {
        self.unknown_nutrient_rows += 1;
        *self.unknown_nutrient_codes.entry(code.to_string()).or_default() += 1;
    }

    /// Emits the counters as log events.
    pub fn report(&self) {
        info!(
            measurements = self.measurements,
            products_scored = self.products_scored,
            unknown_nutrient_rows = self.unknown_nutrient_rows,
            unscorable_measurements = self.unscorable_measurements,
            "Run diagnostics"
        );

        if self.measurements_without_product > 0 || self.measurements_without_serving > 0 {
            warn!(
                without_product = self.measurements_without_product,
                without_serving = self.measurements_without_serving,
                "Measurements with no matching product or serving row"
            );
        }
        if self.duplicate_energy_rows > 0 {
            warn!(
                duplicate_energy_rows = self.duplicate_energy_rows,
                "Products with more than one energy measurement"
            );
        }
        if self.negative_serving_measurements > 0 {
            warn!(
                negative_serving_measurements = self.negative_serving_measurements,
                "Scored measurements with a negative serving size"
            );
        }
        if self.products_without_energy > 0 {
            debug!(
                products_without_energy = self.products_without_energy,
                "Products with no energy measurement"
            );
        }
        for (code, count) in &self.unknown_nutrient_codes {
            debug!(nutrient_code = %code, count, "Unscored nutrient code");
        }
    }
}
