use std::collections::BTreeMap;

use chrono::{NaiveDate, SecondsFormat};
use serde::Serialize;

use crate::domain::{
    AttributeSet, DateRange, DrivingModel, END_DATE, Experiment, START_DATE, VARIABLE_NAME,
    VariableKind, compact_date,
};
use crate::error::DrsError;

pub const EXPERIMENT_KEYS: [&str; 4] = [
    "experiment_id",
    "experiment",
    "driving_experiment_name",
    "driving_experiment",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstitutionTemplate {
    pub institute_id: String,
    pub institution: String,
    pub model_id: String,
    pub rcm_version_id: String,
    pub domain: String,
    pub ensemble_member: String,
    pub product: String,
    pub project_id: String,
    pub contact: String,
    pub references: String,
    pub source: String,
    pub fallback_creation_date: String,
    pub grid: BTreeMap<String, String>,
}

impl Default for InstitutionTemplate {
    fn default() -> Self {
        let grid = [
            ("Conventions", "CF-1.6"),
            ("geospatial_lat_min", "-90.0"),
            ("geospatial_lat_max", "90.0"),
            ("geospatial_lat_resolution", "0.5 degree"),
            ("geospatial_lon_min", "0.0"),
            ("geospatial_lon_max", "359.5"),
            ("geospatial_lon_resolution", "0.5 degree"),
        ]
        .into_iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();

        Self {
            institute_id: "CSIRO".to_string(),
            institution: "Commonwealth Scientific and Industrial Research Organisation"
                .to_string(),
            model_id: "CSIRO-CCAM".to_string(),
            rcm_version_id: "v1".to_string(),
            domain: "GLB-50i".to_string(),
            ensemble_member: "r1i1p1".to_string(),
            product: "output".to_string(),
            project_id: "CORDEX".to_string(),
            contact: "ccam@csiro.au".to_string(),
            references: "https://research.csiro.au/ccam/".to_string(),
            source: "Conformal Cubic Atmospheric Model (CCAM)".to_string(),
            fallback_creation_date: "20180101".to_string(),
            grid,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedVariants {
    pub historical: AttributeSet,
    pub projected: AttributeSet,
}

impl FixedVariants {
    pub fn into_pairs(self) -> [(Experiment, AttributeSet); 2] {
        [
            (Experiment::Historical, self.historical),
            (Experiment::Rcp85, self.projected),
        ]
    }
}

pub struct ComplianceFixer<'a> {
    template: &'a InstitutionTemplate,
    model: Option<DrivingModel>,
}

impl<'a> ComplianceFixer<'a> {
    pub fn new(template: &'a InstitutionTemplate, model: Option<DrivingModel>) -> Self {
        Self { template, model }
    }

    pub fn synthesize(
        &self,
        salvaged: &AttributeSet,
        variable: &str,
        kind: VariableKind,
        dates: Option<&DateRange>,
    ) -> Result<FixedVariants, DrsError> {
        let model = self.model.ok_or(DrsError::MissingDrivingModel)?;
        if variable.is_empty() {
            return Err(DrsError::MissingAttributes(vec![VARIABLE_NAME.to_string()]));
        }
        let dates = match (kind, dates) {
            (VariableKind::TimeVarying, None) => {
                return Err(DrsError::MissingAttributes(vec![
                    START_DATE.to_string(),
                    END_DATE.to_string(),
                ]));
            }
            (VariableKind::TimeVarying, Some(dates)) => Some(dates),
            (VariableKind::Invariant, _) => None,
        };

        let base = self.base_attributes(model, salvaged, variable, kind, dates);
        let ensemble = self.template.ensemble_member.as_str();
        Ok(FixedVariants {
            historical: with_experiment(&base, model, ensemble, Experiment::Historical),
            projected: with_experiment(&base, model, ensemble, Experiment::Rcp85),
        })
    }

    fn base_attributes(
        &self,
        model: DrivingModel,
        salvaged: &AttributeSet,
        variable: &str,
        kind: VariableKind,
        dates: Option<&DateRange>,
    ) -> AttributeSet {
        let template = self.template;
        let mut attributes = AttributeSet::new();
        for (key, value) in &template.grid {
            attributes.insert(key.as_str(), value.as_str());
        }
        attributes.insert("project_id", template.project_id.as_str());
        attributes.insert("product", template.product.as_str());
        attributes.insert("domain", template.domain.as_str());
        attributes.insert("CORDEX_domain", template.domain.as_str());
        attributes.insert("institute_id", template.institute_id.as_str());
        attributes.insert("institution", template.institution.as_str());
        attributes.insert("model_id", template.model_id.as_str());
        attributes.insert("rcm_version_id", template.rcm_version_id.as_str());
        attributes.insert("driving_model_id", model.driving_model_id());
        attributes.insert(
            "driving_model_ensemble_member",
            template.ensemble_member.as_str(),
        );
        attributes.insert("frequency", kind.frequency());
        attributes.insert("contact", template.contact.as_str());
        attributes.insert("references", template.references.as_str());
        attributes.insert(
            "source",
            salvaged.get("source").unwrap_or(template.source.as_str()),
        );
        attributes.insert(
            "creation_date",
            creation_timestamp(
                salvaged.get("creation_date"),
                &template.fallback_creation_date,
            ),
        );
        attributes.insert(VARIABLE_NAME, variable);
        if let Some(dates) = dates {
            attributes.insert(START_DATE, dates.start.as_str());
            attributes.insert(END_DATE, dates.end.as_str());
        }
        attributes
    }
}

fn with_experiment(
    base: &AttributeSet,
    model: DrivingModel,
    ensemble_member: &str,
    experiment: Experiment,
) -> AttributeSet {
    let mut attributes = base.clone();
    let fields = experiment_attributes(model.driving_model_id(), ensemble_member, experiment);
    for (key, value) in fields {
        attributes.insert(key, value);
    }
    attributes
}

pub fn experiment_attributes(
    driving_model_id: &str,
    ensemble_member: &str,
    experiment: Experiment,
) -> [(&'static str, String); 4] {
    [
        ("experiment_id", experiment.id().to_string()),
        ("experiment", experiment.description().to_string()),
        ("driving_experiment_name", experiment.id().to_string()),
        (
            "driving_experiment",
            format!("{driving_model_id}, {}, {ensemble_member}", experiment.id()),
        ),
    ]
}

pub fn creation_timestamp(raw: Option<&str>, fallback: &str) -> String {
    raw.and_then(|value| compact_date(value).ok())
        .or_else(|| compact_date(fallback).ok())
        .and_then(|digits| NaiveDate::parse_from_str(&digits, "%Y%m%d").ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|datetime| {
            datetime
                .and_utc()
                .to_rfc3339_opts(SecondsFormat::Secs, true)
        })
        .unwrap_or_else(|| fallback.to_string())
}
