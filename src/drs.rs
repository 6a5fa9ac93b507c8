use camino::Utf8PathBuf;
use serde::Serialize;

use crate::domain::{AttributeSet, DateRange, END_DATE, START_DATE, VARIABLE_NAME, VariableKind};
use crate::error::DrsError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DrsIdentity {
    pub project_id: String,
    pub domain: String,
    pub institute_id: String,
    pub driving_model_id: String,
    pub driving_experiment_name: String,
    pub driving_model_ensemble_member: String,
    pub model_id: String,
    pub rcm_version_id: String,
    pub frequency: String,
    pub variable_name: String,
    pub dates: Option<DateRange>,
}

impl DrsIdentity {
    pub fn from_attributes(
        attributes: &AttributeSet,
        kind: VariableKind,
    ) -> Result<Self, DrsError> {
        let mut missing = Vec::new();
        let mut take = |key: &str| match attributes.get(key).filter(|value| !value.is_empty()) {
            Some(value) => value.to_string(),
            None => {
                missing.push(key.to_string());
                String::new()
            }
        };

        let identity = Self {
            project_id: take("project_id"),
            domain: take("domain"),
            institute_id: take("institute_id"),
            driving_model_id: take("driving_model_id"),
            driving_experiment_name: take("driving_experiment_name"),
            driving_model_ensemble_member: take("driving_model_ensemble_member"),
            model_id: take("model_id"),
            rcm_version_id: take("rcm_version_id"),
            frequency: take("frequency"),
            variable_name: take(VARIABLE_NAME),
            dates: kind.is_time_varying().then(|| DateRange {
                start: take(START_DATE),
                end: take(END_DATE),
            }),
        };

        if !missing.is_empty() {
            return Err(DrsError::MissingAttributes(missing));
        }
        identity.validate_components()?;
        Ok(identity)
    }

    fn path_components(&self) -> [(&'static str, &str); 10] {
        [
            ("project_id", self.project_id.as_str()),
            ("domain", self.domain.as_str()),
            ("institute_id", self.institute_id.as_str()),
            ("driving_model_id", self.driving_model_id.as_str()),
            (
                "driving_experiment_name",
                self.driving_experiment_name.as_str(),
            ),
            (
                "driving_model_ensemble_member",
                self.driving_model_ensemble_member.as_str(),
            ),
            ("model_id", self.model_id.as_str()),
            ("rcm_version_id", self.rcm_version_id.as_str()),
            ("frequency", self.frequency.as_str()),
            (VARIABLE_NAME, self.variable_name.as_str()),
        ]
    }

    fn validate_components(&self) -> Result<(), DrsError> {
        for (key, value) in self.path_components() {
            if value == "." || value == ".." || value.contains(['/', '\\']) {
                return Err(DrsError::InvalidFileName(format!(
                    "{key} is not a valid path component: {value}"
                )));
            }
        }
        Ok(())
    }

    pub fn relative_dir(&self) -> Utf8PathBuf {
        self.path_components()
            .into_iter()
            .map(|(_, value)| value)
            .collect()
    }

    pub fn file_name(&self, extension: &str) -> String {
        let mut parts = vec![
            self.variable_name.as_str(),
            self.domain.as_str(),
            self.driving_model_id.as_str(),
            self.driving_experiment_name.as_str(),
            self.driving_model_ensemble_member.as_str(),
            self.model_id.as_str(),
            self.rcm_version_id.as_str(),
            self.frequency.as_str(),
        ];
        let range;
        if let Some(dates) = &self.dates {
            range = format!("{}-{}", dates.start, dates.end);
            parts.push(range.as_str());
        }
        format!("{}.{extension}", parts.join("_"))
    }

    pub fn relative_path(&self, extension: &str) -> Utf8PathBuf {
        self.relative_dir().join(self.file_name(extension))
    }
}
