//! Typed rows of the three input relations.
//!
//! Text fields stay `Option<String>` so that "missing" and "present but empty"
//! remain distinguishable until the output boundary.

use serde::Deserialize;
use std::fmt;

use crate::error::NrfiError;

/// Identifies an input relation in diagnostics and error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    Products,
    Nutrients,
    ServingSize,
}

impl Relation {
    /// Name of the product key column in this relation (lower-cased).
    pub fn key_column(self) -> &'static str {
        match self {
            Relation::Products => "ndb_number",
            Relation::Nutrients | Relation::ServingSize => "ndb_no",
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Relation::Products => "products",
            Relation::Nutrients => "nutrients",
            Relation::ServingSize => "serving_size",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub ndb_number: String,
    pub long_name: Option<String>,
    pub manufacturer: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NutrientMeasurement {
    pub ndb_no: String,
    pub nutrient_code: Option<String>,
    pub nutrient_name: Option<String>,
    pub output_value: Option<f64>,
    pub output_uom: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServingSize {
    pub ndb_no: String,
    pub serving_size: Option<f64>,
    pub serving_size_uom: Option<String>,
    pub household_serving_size: Option<f64>,
    pub household_serving_size_uom: Option<String>,
}

/// Converts a raw CSV row into its typed form, given the 1-based line it came from.
pub trait FromRaw: Sized {
    type Raw: for<'de> Deserialize<'de>;
    const RELATION: Relation;
    /// Lower-cased header names that must be present.
    const REQUIRED: &'static [&'static str];

    fn from_raw(raw: Self::Raw, line: usize) -> Result<Self, NrfiError>;
}

#[derive(Debug, Deserialize)]
pub struct RawProduct {
    ndb_number: Option<String>,
    long_name: Option<String>,
    manufacturer: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawNutrient {
    ndb_no: Option<String>,
    nutrient_code: Option<String>,
    nutrient_name: Option<String>,
    output_value: Option<String>,
    output_uom: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawServingSize {
    ndb_no: Option<String>,
    serving_size: Option<String>,
    serving_size_uom: Option<String>,
    household_serving_size: Option<String>,
    household_serving_size_uom: Option<String>,
}

impl FromRaw for Product {
    type Raw = RawProduct;
    const RELATION: Relation = Relation::Products;
    const REQUIRED: &'static [&'static str] = &["ndb_number"];

    fn from_raw(raw: RawProduct, line: usize) -> Result<Self, NrfiError> {
        Ok(Product {
            ndb_number: required_key(Self::RELATION, raw.ndb_number, line)?,
            long_name: text(raw.long_name),
            manufacturer: text(raw.manufacturer),
        })
    }
}

impl FromRaw for NutrientMeasurement {
    type Raw = RawNutrient;
    const RELATION: Relation = Relation::Nutrients;
    const REQUIRED: &'static [&'static str] = &["ndb_no", "nutrient_code", "output_value"];

    fn from_raw(raw: RawNutrient, line: usize) -> Result<Self, NrfiError> {
        Ok(NutrientMeasurement {
            ndb_no: required_key(Self::RELATION, raw.ndb_no, line)?,
            nutrient_code: text(raw.nutrient_code),
            nutrient_name: text(raw.nutrient_name),
            output_value: numeric(Self::RELATION, "output_value", raw.output_value, line)?,
            output_uom: text(raw.output_uom),
        })
    }
}

impl FromRaw for ServingSize {
    type Raw = RawServingSize;
    const RELATION: Relation = Relation::ServingSize;
    const REQUIRED: &'static [&'static str] = &["ndb_no", "serving_size", "household_serving_size"];

    fn from_raw(raw: RawServingSize, line: usize) -> Result<Self, NrfiError> {
        Ok(ServingSize {
            ndb_no: required_key(Self::RELATION, raw.ndb_no, line)?,
            serving_size: numeric(Self::RELATION, "serving_size", raw.serving_size, line)?,
            serving_size_uom: text(raw.serving_size_uom),
            household_serving_size: numeric(
                Self::RELATION,
                "household_serving_size",
                raw.household_serving_size,
                line,
            )?,
            household_serving_size_uom: text(raw.household_serving_size_uom),
        })
    }
}

fn text(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn required_key(relation: Relation, value: Option<String>, line: usize) -> Result<String, NrfiError> {
    match value.map(|v| v.trim().to_string()) {
        Some(key) if !key.is_empty() => Ok(key),
        _ => Err(NrfiError::MissingJoinKey {
            relation,
            column: relation.key_column(),
            line,
        }),
    }
}

/// Parses an optional numeric cell. Blank cells are missing; anything else
/// must be a finite float.
pub fn numeric(
    relation: Relation,
    column: &'static str,
    value: Option<String>,
    line: usize,
) -> Result<Option<f64>, NrfiError> {
    let Some(raw) = value else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(NrfiError::MalformedInput {
            relation,
            column,
            line,
            value: raw,
        }),
    }
}
