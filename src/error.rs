use std::path::PathBuf;

use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum DrsError {
    #[error("destination directory does not exist: {0}")]
    #[diagnostic(help("create the destination directory before running"))]
    InvalidDestination(Utf8PathBuf),

    #[error("source directory does not exist: {0}")]
    InvalidSource(Utf8PathBuf),

    #[error("missing required DRS attributes: {}", .0.join(", "))]
    MissingAttributes(Vec<String>),

    #[error("driving GCM model not provided; required to synthesize DRS attributes")]
    #[diagnostic(help("pass --model with one of the permitted driving models"))]
    MissingDrivingModel,

    #[error("unknown driving GCM model: {0}")]
    UnknownDrivingModel(String),

    #[error("{tool} failed: {message}")]
    ExternalTool { tool: String, message: String },

    #[error("expected output was not produced: {0}")]
    MissingOutput(Utf8PathBuf),

    #[error("required tool not found: {0}")]
    MissingTool(String),

    #[error("invalid date: {0}")]
    InvalidDate(String),

    #[error("invalid file name: {0}")]
    InvalidFileName(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}

impl DrsError {
    pub fn is_external_tool_failure(&self) -> bool {
        matches!(
            self,
            DrsError::ExternalTool { .. } | DrsError::MissingOutput(_) | DrsError::MissingTool(_)
        )
    }
}
