use std::fs;

use assert_matches::assert_matches;
use serde_json::json;

use song_validator::config::{ConfigLoader, DonorSelection};
use song_validator::error::ValidatorError;
use song_validator::fields::TrackedField;

#[test]
fn config_file_references_resolve_next_to_it() {
    let temp = tempfile::tempdir().unwrap();
    fs::create_dir(temp.path().join("es")).unwrap();
    fs::write(
        temp.path().join("es/mapping.json"),
        json!({"mappings": {"properties": {"analysisId": {"type": "keyword"}}}}).to_string(),
    )
    .unwrap();
    fs::write(
        temp.path().join("es/aggs.json"),
        json!({"aggs": {"strategies": {"terms": {"field": "experiment.experimental_strategy"}}}})
            .to_string(),
    )
    .unwrap();
    let config_path = temp.path().join("song-validator.json");
    fs::write(
        &config_path,
        json!({
            "schema_version": 1,
            "elasticsearch_url": "http://search:9200",
            "mapping_file": "es/mapping.json",
            "aggregations_file": "es/aggs.json",
            "page_size": 500,
            "tracked_fields": [
                "samples.submitterSampleId",
                "samples.specimen.tumourNormalDesignation",
                "samples.donor.gender",
                "gender"
            ]
        })
        .to_string(),
    )
    .unwrap();

    let resolved = ConfigLoader::resolve(config_path.to_str()).unwrap();
    assert_eq!(resolved.elasticsearch_url, "http://search:9200");
    assert_eq!(resolved.page_size, 500);
    assert_eq!(
        resolved.mapping["mappings"]["properties"]["analysisId"]["type"],
        "keyword"
    );
    assert!(resolved.aggregations.unwrap()["aggs"]["strategies"].is_object());
    assert_eq!(
        resolved.tracked_fields,
        vec![
            TrackedField::SubmitterSampleId,
            TrackedField::TumourNormalDesignation,
            TrackedField::Gender,
        ]
    );
}

#[test]
fn tracked_fields_without_pairing_inputs_are_rejected() {
    let temp = tempfile::tempdir().unwrap();
    let config_path = temp.path().join("song-validator.json");

    fs::write(&config_path, r#"{"tracked_fields": ["samples.sampleType"]}"#).unwrap();
    let err = ConfigLoader::resolve(config_path.to_str()).unwrap_err();
    assert_matches!(
        err,
        ValidatorError::MissingPairingField("submitterSampleId")
    );

    fs::write(
        &config_path,
        r#"{"tracked_fields": ["samples.sampleType", "samples.submitterSampleId"]}"#,
    )
    .unwrap();
    let err = ConfigLoader::resolve(config_path.to_str()).unwrap_err();
    assert_matches!(
        err,
        ValidatorError::MissingPairingField("tumourNormalDesignation")
    );
}

#[test]
fn unknown_tracked_field_is_rejected() {
    let temp = tempfile::tempdir().unwrap();
    let config_path = temp.path().join("song-validator.json");
    fs::write(&config_path, r#"{"tracked_fields": ["samples.colour"]}"#).unwrap();

    let err = ConfigLoader::resolve(config_path.to_str()).unwrap_err();
    assert_matches!(err, ValidatorError::UnknownFieldPath(path) if path == "samples.colour");
}

#[test]
fn missing_mapping_file_is_a_read_error() {
    let temp = tempfile::tempdir().unwrap();
    let config_path = temp.path().join("song-validator.json");
    fs::write(&config_path, r#"{"mapping_file": "nope.json"}"#).unwrap();

    let err = ConfigLoader::resolve(config_path.to_str()).unwrap_err();
    assert_matches!(err, ValidatorError::ConfigRead(path) if path.ends_with("nope.json"));
}

#[test]
fn donor_file_skips_blank_lines() {
    let temp = tempfile::tempdir().unwrap();
    let file = temp.path().join("donors.txt");
    fs::write(&file, "DO250001\n\nDO250002\nDO250001\n").unwrap();

    let selection = DonorSelection::resolve(&[], Some(&file)).unwrap();
    assert_eq!(
        selection,
        DonorSelection::Explicit(vec!["DO250001".parse().unwrap(), "DO250002".parse().unwrap()])
    );

    let err = DonorSelection::resolve(&[], Some(&temp.path().join("absent.txt"))).unwrap_err();
    assert_matches!(err, ValidatorError::DonorFileRead(_));
}
