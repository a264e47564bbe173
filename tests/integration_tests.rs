use flate2::Compression;
use flate2::write::GzEncoder;
use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use usda_nrfi::output::write_scores;
use usda_nrfi::{
    NrfiError, Polarity, ReferenceIntakeTable, ScoreRecord, ScoringConfig, load_dataset, run,
};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn score_fixtures(table: &ReferenceIntakeTable) -> Vec<ScoreRecord> {
    let dataset = load_dataset(
        &fixture("Products.csv"),
        &fixture("Nutrients.csv"),
        &fixture("Serving_size.csv"),
    )
    .expect("Failed to load fixtures");
    run(&dataset, table, &ScoringConfig::default())
        .expect("Failed to score fixtures")
        .scores
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

#[test]
fn test_full_pipeline() {
    let scores = score_fixtures(&ReferenceIntakeTable::usda_dri());

    let keys: Vec<_> = scores.iter().map(|s| s.ndb_no.as_str()).collect();
    assert_eq!(keys, vec!["45001001", "45001002", "45001003", "45001004"]);

    let oats = &scores[0];
    assert_close(oats.nrn_pos, 125.0);
    assert_close(oats.nrn_neg, 20.0);
    assert_close(oats.nrfi, 105.0);
    assert_eq!(oats.long_name.as_deref(), Some("WHOLE GRAIN OATS"));
    assert_eq!(oats.manufacturer.as_deref(), Some("Acme Foods"));
    assert_eq!(oats.household_serving_size_uom.as_deref(), Some("cup"));
    assert_eq!(oats.energy_per_serving, Some(200.0));

    // vitamin c at 5x reference is capped; missing added sugar scores zero
    let juice = &scores[1];
    assert_close(juice.nrn_pos, 50.0);
    assert_eq!(juice.nrn_neg, 0.0);
    assert_close(juice.nrfi, 50.0);
    assert_eq!(juice.energy_per_serving, Some(22.5));

    let crackers = &scores[2];
    assert_eq!(crackers.nrn_pos, 0.0);
    assert_close(crackers.nrn_neg, 45.0);
    assert_close(crackers.nrfi, -45.0);
    assert_eq!(crackers.manufacturer, None);
    assert_eq!(crackers.energy_per_serving, Some(60.0));

    // measured but unknown to products and serving sizes
    let orphan = &scores[3];
    assert_eq!(orphan.nrfi, 0.0);
    assert_eq!(orphan.long_name, None);
    assert_eq!(orphan.serving_size, None);
    assert_eq!(orphan.energy_per_serving, None);
}

#[test]
fn test_scores_satisfy_invariants() {
    let scores = score_fixtures(&ReferenceIntakeTable::usda_dri());

    for s in &scores {
        assert!(s.nrn_pos >= 0.0);
        assert!(s.nrn_neg >= 0.0);
        assert_eq!(s.nrfi, s.nrn_pos - s.nrn_neg);
    }

    let unique: BTreeSet<_> = scores.iter().map(|s| &s.ndb_no).collect();
    assert_eq!(unique.len(), scores.len());
}

#[test]
fn test_nutrients_outside_table_never_contribute() {
    let table = ReferenceIntakeTable::new(
        ReferenceIntakeTable::usda_dri()
            .iter()
            .filter(|e| e.nutrient_code != "291")
            .cloned()
            .collect(),
    )
    .unwrap();
    assert_eq!(table.codes(Polarity::Beneficial).count(), 8);

    let scores = score_fixtures(&table);

    // fiber no longer adds its 25
    assert_close(scores[0].nrn_pos, 100.0);
    assert_close(scores[0].nrfi, 80.0);
}

#[test]
fn test_rerun_output_is_byte_identical() {
    let dir = env::temp_dir();
    let first_path = dir.join("usda_nrfi_it_first.csv");
    let second_path = dir.join("usda_nrfi_it_second.csv");

    for path in [&first_path, &second_path] {
        let dataset = load_dataset(
            &fixture("Products.csv"),
            &fixture("Nutrients.csv"),
            &fixture("Serving_size.csv"),
        )
        .unwrap();
        let output = run(&dataset, &ReferenceIntakeTable::usda_dri(), &ScoringConfig::default()).unwrap();
        write_scores(path, &output).unwrap();
    }

    let first = fs::read(&first_path).unwrap();
    let second = fs::read(&second_path).unwrap();
    assert_eq!(first, second);

    let text = String::from_utf8(first).unwrap();
    assert_eq!(text.lines().count(), 5);

    fs::remove_file(&first_path).unwrap();
    fs::remove_file(&second_path).unwrap();
}

#[test]
fn test_gzip_input_matches_plain_input() {
    let gz_path = env::temp_dir().join("usda_nrfi_it_Nutrients.csv.gz");
    let mut encoder = GzEncoder::new(fs::File::create(&gz_path).unwrap(), Compression::default());
    encoder
        .write_all(&fs::read(fixture("Nutrients.csv")).unwrap())
        .unwrap();
    encoder.finish().unwrap();

    let plain = load_dataset(
        &fixture("Products.csv"),
        &fixture("Nutrients.csv"),
        &fixture("Serving_size.csv"),
    )
    .unwrap();
    let gzipped = load_dataset(
        &fixture("Products.csv"),
        &gz_path,
        &fixture("Serving_size.csv"),
    )
    .unwrap();

    assert_eq!(plain, gzipped);

    fs::remove_file(&gz_path).unwrap();
}

#[test]
fn test_malformed_numeric_aborts_run() {
    let path = env::temp_dir().join("usda_nrfi_it_bad_serving.csv");
    fs::write(
        &path,
        "NDB_No,Serving_Size,Serving_Size_UOM,Household_Serving_Size,Household_Serving_Size_UOM\n\
         45001001,one hundred,g,1,cup\n",
    )
    .unwrap();

    let err = load_dataset(&fixture("Products.csv"), &fixture("Nutrients.csv"), &path).unwrap_err();

    assert!(err.is_input_error());
    assert!(matches!(
        err,
        NrfiError::MalformedInput { column: "serving_size", line: 2, .. }
    ));

    fs::remove_file(&path).unwrap();
}
