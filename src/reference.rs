//! Reference intake tables.
//!
//! A [`ReferenceIntakeTable`] maps USDA nutrient codes to a daily reference
//! quantity and a [`Polarity`]. Codes absent from the table never contribute
//! to a score.
//!
//! Tables can be loaded from a JSON array on disk:
//! ```json
//! [
//!   { "nutrient_code": "401", "nutrient_name": "vitamin c",
//!     "quantity": 90.0, "unit": "mg/d", "polarity": "beneficial" }
//! ]
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::NrfiError;

/// Whether a nutrient raises or lowers the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    Beneficial,
    Detrimental,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceIntakeEntry {
    pub nutrient_code: String,
    pub nutrient_name: String,
    pub quantity: f64,
    pub unit: String,
    pub polarity: Polarity,
}

impl ReferenceIntakeEntry {
    fn new(code: &str, name: &str, quantity: f64, unit: &str, polarity: Polarity) -> Self {
        Self {
            nutrient_code: code.to_string(),
            nutrient_name: name.to_string(),
            quantity,
            unit: unit.to_string(),
            polarity,
        }
    }
}

/// Immutable lookup from nutrient code to reference entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceIntakeTable {
    entries: BTreeMap<String, ReferenceIntakeEntry>,
}

impl ReferenceIntakeTable {
    /// Builds a table, rejecting empty tables, duplicate codes, and
    /// non-positive quantities.
    pub fn new(entries: Vec<ReferenceIntakeEntry>) -> Result<Self, NrfiError> {
        if entries.is_empty() {
            return Err(NrfiError::configuration("reference table has no entries"));
        }

        let mut map = BTreeMap::new();
        for entry in entries {
            if !(entry.quantity.is_finite() && entry.quantity > 0.0) {
                return Err(NrfiError::configuration(format!(
                    "reference quantity for nutrient {} must be positive, got {}",
                    entry.nutrient_code, entry.quantity
                )));
            }
            let code = entry.nutrient_code.clone();
            if map.insert(code.clone(), entry).is_some() {
                return Err(NrfiError::configuration(format!(
                    "nutrient {code} is listed more than once"
                )));
            }
        }

        Ok(Self { entries: map })
    }

    /// USDA Dietary Reference Intakes, averaged over adults aged 19-50.
    ///
    /// Added sugar and saturated fat come from the 2015-2020 Dietary
    /// Guidelines for a 2000 kcal diet. Vitamin A and E are converted to IU
    /// (0.3 mcg vitamin A = 1 IU, 0.56 mg vitamin E = 1 IU).
    pub fn usda_dri() -> Self {
        use Polarity::{Beneficial, Detrimental};

        let entries = [
            ReferenceIntakeEntry::new("318", "vitamin a", 900.0 / 0.3, "iu/d", Beneficial),
            ReferenceIntakeEntry::new("401", "vitamin c", 90.0, "mg/d", Beneficial),
            ReferenceIntakeEntry::new("340", "vitamin e", 15.0 / 0.56, "iu/d", Beneficial),
            ReferenceIntakeEntry::new("203", "protein", 51.0, "g/d", Beneficial),
            ReferenceIntakeEntry::new("301", "calcium", 1000.0, "mg/d", Beneficial),
            ReferenceIntakeEntry::new("304", "magnesium", 363.0, "mg/d", Beneficial),
            ReferenceIntakeEntry::new("303", "iron", 13.0, "mg/d", Beneficial),
            ReferenceIntakeEntry::new("291", "total fiber", 32.0, "g/d", Beneficial),
            ReferenceIntakeEntry::new("306", "potassium", 4700.0, "mg/d", Beneficial),
            ReferenceIntakeEntry::new("606", "fatty acids, total saturated", 22.0, "g/d", Detrimental),
            ReferenceIntakeEntry::new("539", "sugars, added", 50.0, "g/d", Detrimental),
            ReferenceIntakeEntry::new("307", "sodium", 1500.0, "mg/d", Detrimental),
        ];

        Self {
            entries: entries
                .into_iter()
                .map(|e| (e.nutrient_code.clone(), e))
                .collect(),
        }
    }

    /// Loads and validates a table from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self, NrfiError> {
        let content = std::fs::read_to_string(path).map_err(|source| NrfiError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let entries: Vec<ReferenceIntakeEntry> =
            serde_json::from_str(&content).map_err(|source| NrfiError::ReferenceTable {
                path: path.to_path_buf(),
                source,
            })?;
        Self::new(entries)
    }

    pub fn get(&self, nutrient_code: &str) -> Option<&ReferenceIntakeEntry> {
        self.entries.get(nutrient_code)
    }

    pub fn polarity(&self, nutrient_code: &str) -> Option<Polarity> {
        self.get(nutrient_code).map(|e| e.polarity)
    }

    /// Iterates over entries in nutrient-code order.
    pub fn iter(&self) -> impl Iterator<Item = &ReferenceIntakeEntry> {
        self.entries.values()
    }

    /// Nutrient codes with the given polarity, in code order.
    pub fn codes(&self, polarity: Polarity) -> impl Iterator<Item = &str> {
        self.iter()
            .filter(move |e| e.polarity == polarity)
            .map(|e| e.nutrient_code.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ReferenceIntakeTable {
    fn default() -> Self {
        Self::usda_dri()
    }
}
