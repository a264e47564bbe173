//! Left join of measurements onto products and serving sizes by product key.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use tracing::debug;

use crate::error::NrfiError;
use crate::parser::Dataset;
use crate::pipeline::Diagnostics;
use crate::records::Relation;

/// One nutrient measurement enriched with its product and serving attributes.
///
/// Product and serving fields are `None` when the left join found no match.
#[derive(Debug, Clone, PartialEq)]
pub struct BrandedRow {
    pub ndb_no: String,
    pub nutrient_code: Option<String>,
    pub nutrient_name: Option<String>,
    pub output_value: Option<f64>,
    pub output_uom: Option<String>,
    pub long_name: Option<String>,
    pub manufacturer: Option<String>,
    pub serving_size: Option<f64>,
    pub serving_size_uom: Option<String>,
    pub household_serving_size: Option<f64>,
    pub household_serving_size_uom: Option<String>,
}

/// Left-joins measurements onto products, then onto serving sizes.
///
/// Every measurement yields exactly one row. Products and serving sizes are
/// indexed by key first, so a repeated key in either is rejected rather than
/// multiplying measurement rows.
pub fn join(dataset: &Dataset, diagnostics: &mut Diagnostics) -> Result<Vec<BrandedRow>, NrfiError> {
    let products = index_unique(Relation::Products, &dataset.products, |p| &p.ndb_number)?;
    let servings = index_unique(Relation::ServingSize, &dataset.serving_sizes, |s| &s.ndb_no)?;

    let mut rows = Vec::with_capacity(dataset.measurements.len());
    for m in &dataset.measurements {
        let product = products.get(m.ndb_no.as_str()).copied();
        let serving = servings.get(m.ndb_no.as_str()).copied();

        if product.is_none() {
            diagnostics.measurements_without_product += 1;
        }
        if serving.is_none() {
            diagnostics.measurements_without_serving += 1;
        }

        rows.push(BrandedRow {
            ndb_no: m.ndb_no.clone(),
            nutrient_code: m.nutrient_code.clone(),
            nutrient_name: m.nutrient_name.clone(),
            output_value: m.output_value,
            output_uom: m.output_uom.clone(),
            long_name: product.and_then(|p| p.long_name.clone()),
            manufacturer: product.and_then(|p| p.manufacturer.clone()),
            serving_size: serving.and_then(|s| s.serving_size),
            serving_size_uom: serving.and_then(|s| s.serving_size_uom.clone()),
            household_serving_size: serving.and_then(|s| s.household_serving_size),
            household_serving_size_uom: serving.and_then(|s| s.household_serving_size_uom.clone()),
        });
    }

    diagnostics.measurements = rows.len();
    debug!(
        rows = rows.len(),
        products = products.len(),
        serving_sizes = servings.len(),
        "Relations joined"
    );
    Ok(rows)
}

fn index_unique<'a, T>(
    relation: Relation,
    rows: &'a [T],
    key: impl Fn(&'a T) -> &'a String,
) -> Result<HashMap<&'a str, &'a T>, NrfiError> {
    let mut index = HashMap::with_capacity(rows.len());
    for row in rows {
        match index.entry(key(row).as_str()) {
            Entry::Vacant(slot) => {
                slot.insert(row);
            }
            Entry::Occupied(slot) => {
                return Err(NrfiError::DuplicateKey {
                    relation,
                    key: slot.key().to_string(),
                });
            }
        }
    }
    Ok(index)
}
