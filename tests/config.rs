use assert_matches::assert_matches;

use cordex_drs::config::{Config, ConfigLoader, InstitutionEntry};
use cordex_drs::domain::DrivingModel;
use cordex_drs::error::DrsError;

#[test]
fn parse_config_overrides() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("cordex-drs.json");
    std::fs::write(
        &path,
        r#"{
            "schema_version": 1,
            "extension": ".nc4",
            "recursive": true,
            "driving_model": "ccsm4",
            "institution": {
                "domain": "AUS-44i",
                "fallback_creation_date": "2019-07-01",
                "grid": { "geospatial_lat_min": "-45.0" }
            }
        }"#,
    )
    .unwrap();

    let resolved = ConfigLoader::resolve(path.to_str()).unwrap();
    assert_eq!(resolved.extension, "nc4");
    assert!(resolved.recursive);
    assert_eq!(resolved.driving_model, Some(DrivingModel::Ccsm4));
    assert_eq!(resolved.template.domain, "AUS-44i");
    assert_eq!(resolved.template.institute_id, "CSIRO");
    assert_eq!(resolved.template.fallback_creation_date, "20190701");
    assert_eq!(
        resolved.template.grid.get("geospatial_lat_min").map(String::as_str),
        Some("-45.0")
    );
    assert_eq!(
        resolved.template.grid.get("Conventions").map(String::as_str),
        Some("CF-1.6")
    );
}

#[test]
fn explicit_missing_file_is_an_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("absent.json");
    let err = ConfigLoader::resolve(path.to_str()).unwrap_err();
    assert_matches!(err, DrsError::ConfigRead(_));
}

#[test]
fn rejects_bad_values() {
    let config = Config {
        institution: Some(InstitutionEntry {
            fallback_creation_date: Some("someday".to_string()),
            ..InstitutionEntry::default()
        }),
        ..Config::default()
    };
    let err = ConfigLoader::resolve_config(config).unwrap_err();
    assert_matches!(err, DrsError::ConfigParse(_));

    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("bad.json");
    std::fs::write(&path, r#"{ "driving_model": "hadgem2" }"#).unwrap();
    let err = ConfigLoader::resolve(path.to_str()).unwrap_err();
    assert_matches!(err, DrsError::ConfigParse(_));
}
