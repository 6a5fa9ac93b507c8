use assert_matches::assert_matches;
use camino::Utf8Path;

use cordex_drs::domain::{
    DrivingModel, Experiment, SourceFile, TimeClassification, VariableKind, YearToken,
};
use cordex_drs::error::DrsError;

fn classify(name: &str) -> Option<TimeClassification> {
    SourceFile::from_path(Utf8Path::new(name))
        .unwrap()
        .years
        .map(|years| years.classify())
}

#[test]
fn classification_boundaries() {
    assert_eq!(classify("tas_2005.nc"), Some(TimeClassification::Historical));
    assert_eq!(classify("tas_2006.nc"), Some(TimeClassification::Projected));
    assert_eq!(classify("tas_1990.nc"), Some(TimeClassification::Historical));
    assert_eq!(classify("tas_2050.nc"), Some(TimeClassification::Projected));
    assert_eq!(classify("tas_2000-2009.nc"), Some(TimeClassification::Straddling));
    assert_eq!(
        classify("tas_day_20000101-20091231.nc"),
        Some(TimeClassification::Straddling)
    );
    assert_eq!(classify("tas_2000-2005.nc"), Some(TimeClassification::Historical));
    assert_eq!(classify("tas_1999-2009.nc"), Some(TimeClassification::Historical));
    assert_eq!(classify("orog.nc"), None);
}

#[test]
fn straddling_splits_into_both_experiments() {
    assert_eq!(TimeClassification::Straddling.experiment(), None);
    assert_eq!(
        TimeClassification::Historical.experiment(),
        Some(Experiment::Historical)
    );
    assert_eq!(
        TimeClassification::Projected.experiment(),
        Some(Experiment::Rcp85)
    );
}

#[test]
fn parse_year_token_invalid() {
    let err = "20x0".parse::<YearToken>().unwrap_err();
    assert_matches!(err, DrsError::InvalidDate(_));
    assert!("200".parse::<YearToken>().is_err());
}

#[test]
fn invariant_variables() {
    for name in ["orog", "sftlf", "areacella", "sftgif"] {
        assert_eq!(VariableKind::classify(name), VariableKind::Invariant, "{name}");
    }
    assert_eq!(VariableKind::classify("tas"), VariableKind::TimeVarying);
    assert_eq!(VariableKind::Invariant.frequency(), "fx");
    assert_eq!(VariableKind::TimeVarying.frequency(), "day");
}

#[test]
fn parse_driving_model() {
    let model: DrivingModel = "NorESM1-M".parse().unwrap();
    assert_eq!(model, DrivingModel::Noresm1M);
    assert_eq!(model.driving_model_id(), "NCC-NorESM1-M");

    let model: DrivingModel = "CSIRO-BOM-ACCESS1-0".parse().unwrap();
    assert_eq!(model, DrivingModel::Access10);

    let err = "HadGEM2-ES".parse::<DrivingModel>().unwrap_err();
    assert_matches!(err, DrsError::UnknownDrivingModel(_));
}
