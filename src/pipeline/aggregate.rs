//! Per-product sums of contributions, split by polarity.

use std::collections::BTreeMap;

use crate::pipeline::normalize::NormalizedRatio;
use crate::reference::Polarity;

/// Per-product sums of beneficial and detrimental contributions.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PolaritySums {
    pub nrn_pos: f64,
    pub nrn_neg: f64,
}

impl PolaritySums {
    pub fn add(&mut self, polarity: Polarity, nrn: f64) {
        match polarity {
            Polarity::Beneficial => self.nrn_pos += nrn,
            Polarity::Detrimental => self.nrn_neg += nrn,
        }
    }

    /// The signed index: beneficial minus detrimental.
    pub fn nrfi(&self) -> f64 {
        self.nrn_pos - self.nrn_neg
    }
}

/// Sums `nrn` per product and polarity.
///
/// Every key in `products` gets an entry, starting from zero, so a product
/// with no measurements in a polarity group scores zero for that group.
/// Ratios with an unset `nrn` add nothing.
pub fn aggregate<'a>(
    products: impl IntoIterator<Item = &'a str>,
    ratios: &[NormalizedRatio],
) -> BTreeMap<String, PolaritySums> {
    let mut sums: BTreeMap<String, PolaritySums> = products
        .into_iter()
        .map(|key| (key.to_string(), PolaritySums::default()))
        .collect();

    for ratio in ratios {
        let Some(nrn) = ratio.nrn else {
            continue;
        };
        sums.entry(ratio.ndb_no.clone())
            .or_default()
            .add(ratio.polarity, nrn);
    }

    sums
}
