//! CSV parser for the USDA branded-food relations.

use csv::{ReaderBuilder, StringRecord};
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::debug;

use crate::error::NrfiError;
use crate::records::{FromRaw, NutrientMeasurement, Product, ServingSize};

/// The three input relations of one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub products: Vec<Product>,
    pub measurements: Vec<NutrientMeasurement>,
    pub serving_sizes: Vec<ServingSize>,
}

/// Reads one relation from a CSV source with a header row.
///
/// Header names are lower-cased before rows are matched against them, and
/// unknown columns are ignored.
///
/// # Errors
///
/// Returns an error if the CSV is malformed, a required column is absent,
/// a key cell is empty, or a numeric cell does not hold a number.
pub fn parse_relation<T: FromRaw, R: Read>(reader: R) -> Result<Vec<T>, NrfiError> {
    let relation = T::RELATION;
    let csv_err = |source| NrfiError::Csv { relation, source };

    let mut rdr = ReaderBuilder::new().trim(csv::Trim::Headers).from_reader(reader);
    let headers: StringRecord = rdr
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(str::to_lowercase)
        .collect();
    if let Some(column) = T::REQUIRED
        .iter()
        .copied()
        .find(|required| !headers.iter().any(|h| h == *required))
    {
        return Err(NrfiError::MissingColumn { relation, column });
    }
    rdr.set_headers(headers);

    let mut rows = Vec::new();
    for (idx, result) in rdr.deserialize::<T::Raw>().enumerate() {
        let raw = result.map_err(csv_err)?;
        // line 1 is the header
        rows.push(T::from_raw(raw, idx + 2)?);
    }

    debug!(%relation, rows = rows.len(), "Relation parsed");
    Ok(rows)
}

/// Opens `path` for reading, gunzipping it when the name ends in `.gz`.
pub fn open_input(path: &Path) -> Result<Box<dyn Read>, NrfiError> {
    let file = File::open(path).map_err(|source| NrfiError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let reader = BufReader::new(file);

    if is_gzip(path) {
        Ok(Box::new(GzDecoder::new(reader)))
    } else {
        Ok(Box::new(reader))
    }
}

pub fn is_gzip(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("gz")
}

/// Loads all three relations from files.
#[tracing::instrument(skip_all, fields(products = %products.display(), nutrients = %nutrients.display(), serving_size = %serving_size.display()))]
pub fn load_dataset(
    products: &Path,
    nutrients: &Path,
    serving_size: &Path,
) -> Result<Dataset, NrfiError> {
    Ok(Dataset {
        products: parse_relation(open_input(products)?)?,
        measurements: parse_relation(open_input(nutrients)?)?,
        serving_sizes: parse_relation(open_input(serving_size)?)?,
    })
}
