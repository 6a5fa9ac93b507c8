use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::domain::DrivingModel;
use crate::error::DrsError;
use crate::fixer::InstitutionTemplate;

pub const DEFAULT_CONFIG_FILE: &str = "cordex-drs.json";
pub const DEFAULT_EXTENSION: &str = "nc";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub extension: Option<String>,
    #[serde(default)]
    pub recursive: Option<bool>,
    #[serde(default)]
    pub driving_model: Option<DrivingModel>,
    #[serde(default)]
    pub institution: Option<InstitutionEntry>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct InstitutionEntry {
    #[serde(default)]
    pub institute_id: Option<String>,
    #[serde(default)]
    pub institution: Option<String>,
    #[serde(default)]
    pub model_id: Option<String>,
    #[serde(default)]
    pub rcm_version_id: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub ensemble_member: Option<String>,
    #[serde(default)]
    pub product: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub contact: Option<String>,
    #[serde(default)]
    pub references: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub fallback_creation_date: Option<String>,
    #[serde(default)]
    pub grid: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub extension: String,
    pub recursive: bool,
    pub driving_model: Option<DrivingModel>,
    pub template: InstitutionTemplate,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            schema_version: 1,
            extension: DEFAULT_EXTENSION.to_string(),
            recursive: false,
            driving_model: None,
            template: InstitutionTemplate::default(),
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, DrsError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Ok(ResolvedConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| DrsError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| DrsError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, DrsError> {
        let defaults = ResolvedConfig::default();
        let extension = config
            .extension
            .map(|ext| ext.trim_start_matches('.').to_string())
            .unwrap_or(defaults.extension);
        if extension.is_empty() {
            return Err(DrsError::ConfigParse("extension must not be empty".to_string()));
        }

        let mut template = defaults.template;
        if let Some(entry) = config.institution {
            apply_overrides(&mut template, entry)?;
        }

        Ok(ResolvedConfig {
            schema_version: config.schema_version.unwrap_or(defaults.schema_version),
            extension,
            recursive: config.recursive.unwrap_or(defaults.recursive),
            driving_model: config.driving_model,
            template,
        })
    }
}

fn apply_overrides(
    template: &mut InstitutionTemplate,
    entry: InstitutionEntry,
) -> Result<(), DrsError> {
    let fields = [
        (&mut template.institute_id, entry.institute_id),
        (&mut template.institution, entry.institution),
        (&mut template.model_id, entry.model_id),
        (&mut template.rcm_version_id, entry.rcm_version_id),
        (&mut template.domain, entry.domain),
        (&mut template.ensemble_member, entry.ensemble_member),
        (&mut template.product, entry.product),
        (&mut template.project_id, entry.project_id),
        (&mut template.contact, entry.contact),
        (&mut template.references, entry.references),
        (&mut template.source, entry.source),
    ];
    for (field, value) in fields {
        if let Some(value) = value {
            *field = value;
        }
    }
    if let Some(date) = entry.fallback_creation_date {
        template.fallback_creation_date = crate::domain::compact_date(&date)
            .map_err(|_| DrsError::ConfigParse(format!("invalid fallback_creation_date: {date}")))?;
    }
    template.grid.extend(entry.grid);
    Ok(())
}
