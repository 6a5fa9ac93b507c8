use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use camino::{Utf8Path, Utf8PathBuf};
use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::DrsError;

pub const HEADER_KEYS: [&str; 10] = [
    "domain",
    "driving_model_id",
    "driving_experiment_name",
    "driving_model_ensemble_member",
    "model_id",
    "rcm_version_id",
    "frequency",
    "institute_id",
    "product",
    "project_id",
];

pub const SALVAGE_KEYS: [&str; 2] = ["source", "creation_date"];

pub const VARIABLE_NAME: &str = "variable_name";
pub const START_DATE: &str = "start_date";
pub const END_DATE: &str = "end_date";

pub const QUERY_KEYS: [&str; 3] = [VARIABLE_NAME, START_DATE, END_DATE];

pub const INVARIANT_VARIABLES: [&str; 10] = [
    "grid", "he", "orog", "sftlf", "sigmu", "vegt", "areacella", "sftgif", "mrsofc", "rootd",
];

pub const HISTORICAL_LAST_YEAR: i32 = 2005;
pub const PROJECTED_FIRST_YEAR: i32 = 2006;
pub const STRADDLE_START: i32 = 2000;
pub const STRADDLE_END: i32 = 2009;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableKind {
    Invariant,
    TimeVarying,
}

impl VariableKind {
    pub fn classify(variable: &str) -> Self {
        if INVARIANT_VARIABLES.contains(&variable) {
            VariableKind::Invariant
        } else {
            VariableKind::TimeVarying
        }
    }

    pub fn frequency(&self) -> &'static str {
        match self {
            VariableKind::Invariant => "fx",
            VariableKind::TimeVarying => "day",
        }
    }

    pub fn is_time_varying(&self) -> bool {
        matches!(self, VariableKind::TimeVarying)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearSpan {
    pub start: i32,
    pub end: i32,
}

impl YearSpan {
    pub const HISTORICAL: YearSpan = YearSpan {
        start: STRADDLE_START,
        end: HISTORICAL_LAST_YEAR,
    };
    pub const PROJECTED: YearSpan = YearSpan {
        start: PROJECTED_FIRST_YEAR,
        end: STRADDLE_END,
    };
}

impl fmt::Display for YearSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearToken {
    pub start: i32,
    pub end: Option<i32>,
}

impl YearToken {
    pub fn classify(&self) -> TimeClassification {
        if self.start == STRADDLE_START && self.end == Some(STRADDLE_END) {
            return TimeClassification::Straddling;
        }
        TimeClassification::from_year(self.start)
    }
}

impl FromStr for YearToken {
    type Err = DrsError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (start, end) = match value.split_once('-') {
            Some((start, end)) => (start, Some(end)),
            None => (value, None),
        };
        let start = leading_year(start).ok_or_else(|| DrsError::InvalidDate(value.to_string()))?;
        let end = end
            .map(|end| leading_year(end).ok_or_else(|| DrsError::InvalidDate(value.to_string())))
            .transpose()?;
        Ok(Self { start, end })
    }
}

fn leading_year(part: &str) -> Option<i32> {
    let is_digits = part.chars().all(|ch| ch.is_ascii_digit());
    if !is_digits || !matches!(part.len(), 4 | 6 | 8 | 10 | 12) {
        return None;
    }
    part[..4].parse().ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeClassification {
    Historical,
    Projected,
    Straddling,
}

impl TimeClassification {
    pub fn from_year(year: i32) -> Self {
        if year <= HISTORICAL_LAST_YEAR {
            TimeClassification::Historical
        } else {
            TimeClassification::Projected
        }
    }

    pub fn experiment(&self) -> Option<Experiment> {
        match self {
            TimeClassification::Historical => Some(Experiment::Historical),
            TimeClassification::Projected => Some(Experiment::Rcp85),
            TimeClassification::Straddling => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Experiment {
    Historical,
    Rcp85,
}

impl Experiment {
    pub fn id(&self) -> &'static str {
        match self {
            Experiment::Historical => "historical",
            Experiment::Rcp85 => "rcp85",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Experiment::Historical => "historical",
            Experiment::Rcp85 => "RCP8.5",
        }
    }
}

impl fmt::Display for Experiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum DrivingModel {
    #[value(name = "access1-0")]
    #[serde(rename = "access1-0")]
    Access10,
    #[value(name = "ccsm4")]
    #[serde(rename = "ccsm4")]
    Ccsm4,
    #[value(name = "cnrm-cm5")]
    #[serde(rename = "cnrm-cm5")]
    CnrmCm5,
    #[value(name = "gfdl-cm3")]
    #[serde(rename = "gfdl-cm3")]
    GfdlCm3,
    #[value(name = "mpi-esm-lr")]
    #[serde(rename = "mpi-esm-lr")]
    MpiEsmLr,
    #[value(name = "noresm1-m")]
    #[serde(rename = "noresm1-m")]
    Noresm1M,
}

impl DrivingModel {
    pub const ALL: [DrivingModel; 6] = [
        DrivingModel::Access10,
        DrivingModel::Ccsm4,
        DrivingModel::CnrmCm5,
        DrivingModel::GfdlCm3,
        DrivingModel::MpiEsmLr,
        DrivingModel::Noresm1M,
    ];

    pub fn driving_model_id(&self) -> &'static str {
        match self {
            DrivingModel::Access10 => "CSIRO-BOM-ACCESS1-0",
            DrivingModel::Ccsm4 => "NCAR-CCSM4",
            DrivingModel::CnrmCm5 => "CNRM-CERFACS-CNRM-CM5",
            DrivingModel::GfdlCm3 => "NOAA-GFDL-GFDL-CM3",
            DrivingModel::MpiEsmLr => "MPI-M-MPI-ESM-LR",
            DrivingModel::Noresm1M => "NCC-NorESM1-M",
        }
    }
}

impl fmt::Display for DrivingModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.driving_model_id())
    }
}

impl FromStr for DrivingModel {
    type Err = DrsError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        DrivingModel::ALL
            .into_iter()
            .find(|model| {
                model.driving_model_id().eq_ignore_ascii_case(trimmed)
                    || model
                        .to_possible_value()
                        .map(|pv| pv.matches(trimmed, true))
                        .unwrap_or(false)
            })
            .ok_or_else(|| DrsError::UnknownDrivingModel(value.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: String,
    pub end: String,
}

impl DateRange {
    pub fn from_query(start: &str, end: &str) -> Result<Self, DrsError> {
        Ok(Self {
            start: compact_date(start)?,
            end: compact_date(end)?,
        })
    }

    pub fn start_year(&self) -> Option<i32> {
        self.start.get(..4).and_then(|year| year.parse().ok())
    }
}

pub fn compact_date(value: &str) -> Result<String, DrsError> {
    let trimmed = value.trim();
    let date_part = trimmed.split(['T', ' ']).next().unwrap_or(trimmed);
    let digits: String = date_part.chars().filter(|ch| ch.is_ascii_digit()).collect();
    if digits.len() != 8 {
        return Err(DrsError::InvalidDate(value.to_string()));
    }
    NaiveDate::parse_from_str(&digits, "%Y%m%d")
        .map_err(|_| DrsError::InvalidDate(value.to_string()))?;
    Ok(digits)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: Utf8PathBuf,
    pub variable: String,
    pub years: Option<YearToken>,
}

impl SourceFile {
    pub fn from_path(path: &Utf8Path) -> Result<Self, DrsError> {
        let stem = path
            .file_stem()
            .ok_or_else(|| DrsError::InvalidFileName(path.to_string()))?;
        let variable = stem
            .split('_')
            .next()
            .filter(|token| !token.is_empty())
            .ok_or_else(|| DrsError::InvalidFileName(path.to_string()))?;
        let years = stem.split_once('_').and_then(|(_, rest)| {
            rest.rsplit('_')
                .find_map(|part| part.parse::<YearToken>().ok())
        });
        Ok(Self {
            path: path.to_path_buf(),
            variable: variable.to_string(),
            years,
        })
    }

    pub fn file_name(&self) -> &str {
        self.path.file_name().unwrap_or(self.path.as_str())
    }

    pub fn extension(&self) -> &str {
        self.path.extension().unwrap_or("nc")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AttributeSet(BTreeMap<String, String>);

impl AttributeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn global_attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.iter().filter(|(key, _)| !QUERY_KEYS.contains(key))
    }

    pub fn differing_keys(&self, other: &AttributeSet) -> Vec<String> {
        let mut keys: Vec<String> = self
            .0
            .keys()
            .chain(other.0.keys())
            .filter(|key| self.get(key) != other.get(key))
            .cloned()
            .collect();
        keys.sort();
        keys.dedup();
        keys
    }
}

impl FromIterator<(String, String)> for AttributeSet {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn classify_invariant_variables() {
        assert_eq!(VariableKind::classify("orog"), VariableKind::Invariant);
        assert_eq!(VariableKind::classify("rootd"), VariableKind::Invariant);
        assert_eq!(VariableKind::classify("tas"), VariableKind::TimeVarying);
        assert_eq!(VariableKind::classify("Orog"), VariableKind::TimeVarying);
    }

    #[test]
    fn year_boundaries() {
        let at = |year: &str| year.parse::<YearToken>().unwrap().classify();
        assert_eq!(at("1990"), TimeClassification::Historical);
        assert_eq!(at("2005"), TimeClassification::Historical);
        assert_eq!(at("2006"), TimeClassification::Projected);
        assert_eq!(at("2050"), TimeClassification::Projected);
        assert_eq!(at("2000-2009"), TimeClassification::Straddling);
        assert_eq!(at("20000101-20091231"), TimeClassification::Straddling);
        assert_eq!(at("2000-2005"), TimeClassification::Historical);
        assert_eq!(at("2006-2009"), TimeClassification::Projected);
    }

    #[test]
    fn year_token_rejects_non_years() {
        assert_matches!("tas".parse::<YearToken>(), Err(DrsError::InvalidDate(_)));
        assert_matches!("200".parse::<YearToken>(), Err(DrsError::InvalidDate(_)));
        assert_matches!("2000-x".parse::<YearToken>(), Err(DrsError::InvalidDate(_)));
    }

    #[test]
    fn source_file_tokens() {
        let file = SourceFile::from_path(Utf8Path::new("/data/tas_ccam_2000-2009.nc")).unwrap();
        assert_eq!(file.variable, "tas");
        assert_eq!(
            file.years,
            Some(YearToken {
                start: 2000,
                end: Some(2009)
            })
        );

        let last = SourceFile::from_path(Utf8Path::new("tas_1990_day_2050.nc")).unwrap();
        assert_eq!(
            last.years,
            Some(YearToken {
                start: 2050,
                end: None
            })
        );

        let leading = SourceFile::from_path(Utf8Path::new("2000_1990.nc")).unwrap();
        assert_eq!(leading.variable, "2000");
        assert_eq!(leading.years.map(|years| years.start), Some(1990));

        let orog = SourceFile::from_path(Utf8Path::new("orog.nc")).unwrap();
        assert_eq!(orog.variable, "orog");
        assert_eq!(orog.years, None);
    }

    #[test]
    fn compact_dates() {
        assert_eq!(compact_date("2000-01-01").unwrap(), "20000101");
        assert_eq!(compact_date("2005-12-31T12:00:00").unwrap(), "20051231");
        assert_eq!(compact_date("20091231").unwrap(), "20091231");
        assert_matches!(compact_date("2009-13-40"), Err(DrsError::InvalidDate(_)));
    }

    #[test]
    fn driving_model_lookup() {
        let model: DrivingModel = "NCC-NorESM1-M".parse().unwrap();
        assert_eq!(model, DrivingModel::Noresm1M);
        let model: DrivingModel = "access1-0".parse().unwrap();
        assert_eq!(model.driving_model_id(), "CSIRO-BOM-ACCESS1-0");
        assert_matches!(
            "HadGEM2-ES".parse::<DrivingModel>(),
            Err(DrsError::UnknownDrivingModel(_))
        );
    }
}
