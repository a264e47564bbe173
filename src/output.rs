//! Output formatting and persistence for scored products.
//!
//! Supports pretty-printing, JSON run reports, and CSV export of the score
//! and enriched relations. Missing values become empty cells here and
//! nowhere earlier.

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use csv::WriterBuilder;
use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

use crate::parser::is_gzip;
use crate::pipeline::normalize::{nrn, reference_for};
use crate::pipeline::{Diagnostics, EnrichedRow, PipelineOutput, ScoreRecord, ScoringConfig};
use crate::reference::ReferenceIntakeTable;

/// One measurement row of the enriched relation, with its reference intake
/// and contribution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedRecord<'a> {
    pub ndb_no: &'a str,
    pub nutrient_code: Option<&'a str>,
    pub nutrient_name: Option<&'a str>,
    pub output_value: Option<f64>,
    pub output_uom: Option<&'a str>,
    pub long_name: Option<&'a str>,
    pub manufacturer: Option<&'a str>,
    pub serving_size: Option<f64>,
    pub serving_size_uom: Option<&'a str>,
    pub household_serving_size: Option<f64>,
    pub household_serving_size_uom: Option<&'a str>,
    pub dri: Option<f64>,
    pub dri_uom: Option<&'a str>,
    pub energy_value: Option<f64>,
    pub energy_uom: Option<&'a str>,
    pub energy_per_serving: Option<f64>,
    pub energy_per_serving_uom: &'a str,
    pub nrn: Option<f64>,
}

/// Summary of a run, written as JSON next to the score relation.
#[derive(Debug, Serialize)]
pub struct RunReport<'a> {
    pub generated_at: DateTime<Utc>,
    pub reference_entries: usize,
    pub products: usize,
    pub diagnostics: &'a Diagnostics,
}

/// Builds the enriched relation for export.
pub fn enriched_records<'a>(
    rows: &'a [EnrichedRow],
    table: &'a ReferenceIntakeTable,
    config: &'a ScoringConfig,
) -> Vec<EnrichedRecord<'a>> {
    rows.iter()
        .map(|row| {
            let b = &row.branded;
            let entry = reference_for(row, table);
            EnrichedRecord {
                ndb_no: &b.ndb_no,
                nutrient_code: b.nutrient_code.as_deref(),
                nutrient_name: b.nutrient_name.as_deref(),
                output_value: b.output_value,
                output_uom: b.output_uom.as_deref(),
                long_name: b.long_name.as_deref(),
                manufacturer: b.manufacturer.as_deref(),
                serving_size: b.serving_size,
                serving_size_uom: b.serving_size_uom.as_deref(),
                household_serving_size: b.household_serving_size,
                household_serving_size_uom: b.household_serving_size_uom.as_deref(),
                dri: entry.map(|e| e.quantity),
                dri_uom: entry.map(|e| e.unit.as_str()),
                energy_value: row.energy_value,
                energy_uom: row.energy_uom.as_deref(),
                energy_per_serving: row.energy_per_serving,
                energy_per_serving_uom: &config.energy_unit,
                nrn: entry.and_then(|e| nrn(b.output_value, b.serving_size, e, config)),
            }
        })
        .collect()
}

/// Logs score records using Rust's debug pretty-print format.
pub fn print_pretty(scores: &[ScoreRecord]) {
    for score in scores {
        debug!("{:#?}", score);
    }
}

/// Logs the reference table as a pretty-printed JSON array, in the same
/// layout [`ReferenceIntakeTable::load`] accepts.
pub fn print_reference_json(table: &ReferenceIntakeTable) -> Result<String> {
    let entries: Vec<_> = table.iter().collect();
    let json = serde_json::to_string_pretty(&entries)?;
    info!("{}", json);
    Ok(json)
}

/// Writes `records` as a CSV relation with a header row, replacing any
/// existing file. A path ending in `.gz` is gzip-compressed.
pub fn write_records<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    debug!(path = %path.display(), rows = records.len(), "Writing CSV relation");

    if is_gzip(path) {
        let encoder = write_csv(GzEncoder::new(file, Compression::default()), records)?;
        encoder.finish()?;
    } else {
        write_csv(file, records)?;
    }

    Ok(())
}

fn write_csv<W: Write, T: Serialize>(sink: W, records: &[T]) -> Result<W> {
    let mut writer = WriterBuilder::new().has_headers(true).from_writer(sink);

    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;

    writer
        .into_inner()
        .map_err(|e| anyhow!("failed to flush CSV writer: {}", e.error()))
}

/// Writes the score relation to `path`.
pub fn write_scores(path: &Path, output: &PipelineOutput) -> Result<()> {
    write_records(path, &output.scores)?;
    info!(path = %path.display(), rows = output.scores.len(), "Scores written");
    Ok(())
}

/// Writes the enriched per-measurement relation to `path`.
pub fn write_enriched(
    path: &Path,
    output: &PipelineOutput,
    table: &ReferenceIntakeTable,
    config: &ScoringConfig,
) -> Result<()> {
    let records = enriched_records(&output.enriched, table, config);
    write_records(path, &records)?;
    info!(path = %path.display(), rows = records.len(), "Enriched relation written");
    Ok(())
}

/// Writes a JSON run report to `path`.
pub fn write_report(path: &Path, output: &PipelineOutput, table: &ReferenceIntakeTable) -> Result<()> {
    let report = RunReport {
        generated_at: Utc::now(),
        reference_entries: table.len(),
        products: output.scores.len(),
        diagnostics: &output.diagnostics,
    };
    let body = serde_json::to_vec_pretty(&report)?;
    std::fs::write(path, body).with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), "Run report written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Dataset;
    use crate::pipeline::run;
    use crate::records::{NutrientMeasurement, ServingSize};
    use flate2::read::GzDecoder;
    use std::env;
    use std::fs;
    use std::io::Read;
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        env::temp_dir().join(name)
    }

    fn output() -> PipelineOutput {
        let dataset = Dataset {
            products: vec![],
            measurements: vec![
                NutrientMeasurement {
                    ndb_no: "1".to_string(),
                    nutrient_code: Some("208".to_string()),
                    nutrient_name: Some("Energy".to_string()),
                    output_value: Some(200.0),
                    output_uom: Some("kcal".to_string()),
                },
                NutrientMeasurement {
                    ndb_no: "1".to_string(),
                    nutrient_code: Some("203".to_string()),
                    nutrient_name: Some("Protein".to_string()),
                    output_value: Some(51.0),
                    output_uom: Some("g".to_string()),
                },
            ],
            serving_sizes: vec![ServingSize {
                ndb_no: "1".to_string(),
                serving_size: Some(30.0),
                serving_size_uom: Some("g".to_string()),
                household_serving_size: None,
                household_serving_size_uom: None,
            }],
        };
        run(&dataset, &ReferenceIntakeTable::usda_dri(), &ScoringConfig::default()).unwrap()
    }

    #[test]
    fn test_print_pretty_does_not_panic() {
        print_pretty(&output().scores);
    }

    #[test]
    fn test_print_reference_json_reloads() {
        let path = temp_path("usda_nrfi_test_reference_roundtrip.json");
        let table = ReferenceIntakeTable::usda_dri();

        let json = print_reference_json(&table).unwrap();
        fs::write(&path, json).unwrap();

        assert_eq!(ReferenceIntakeTable::load(&path).unwrap(), table);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_write_scores_missing_text_is_empty_cell() {
        let path = temp_path("usda_nrfi_test_scores.csv");
        let _ = fs::remove_file(&path);

        write_scores(&path, &output()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("ndb_no,nrfi,long_name"));
        assert_eq!(lines[1], "1,30.0,,,30.0,g,,,60.0,kcal");

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_write_scores_overwrites() {
        let path = temp_path("usda_nrfi_test_overwrite.csv");
        let _ = fs::remove_file(&path);

        write_scores(&path, &output()).unwrap();
        let first = fs::read(&path).unwrap();
        write_scores(&path, &output()).unwrap();
        let second = fs::read(&path).unwrap();

        assert_eq!(first, second);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_write_records_gzip() {
        let path = temp_path("usda_nrfi_test_scores.csv.gz");
        let _ = fs::remove_file(&path);

        write_scores(&path, &output()).unwrap();

        let mut decoded = String::new();
        GzDecoder::new(File::open(&path).unwrap())
            .read_to_string(&mut decoded)
            .unwrap();
        assert!(decoded.starts_with("ndb_no,nrfi"));

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_enriched_records_carry_reference_and_nrn() {
        let output = output();
        let table = ReferenceIntakeTable::usda_dri();
        let config = ScoringConfig::default();

        let records = enriched_records(&output.enriched, &table, &config);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].dri, None);
        assert_eq!(records[0].nrn, None);
        assert_eq!(records[1].dri, Some(51.0));
        assert_eq!(records[1].dri_uom, Some("g/d"));
        assert_eq!(records[1].nrn, Some(30.0));
        assert_eq!(records[1].energy_per_serving, Some(60.0));
    }

    #[test]
    fn test_write_report() {
        let path = temp_path("usda_nrfi_test_report.json");
        let _ = fs::remove_file(&path);

        write_report(&path, &output(), &ReferenceIntakeTable::usda_dri()).unwrap();

        let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["products"], 1);
        assert_eq!(json["reference_entries"], 12);
        assert_eq!(json["diagnostics"]["measurements"], 2);

        fs::remove_file(&path).unwrap();
    }
}
