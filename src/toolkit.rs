use std::path::{Path, PathBuf};
use std::process::Command;

use camino::Utf8Path;
use serde::Serialize;
use tracing::debug;

use crate::domain::YearSpan;
use crate::error::DrsError;

pub trait Toolkit: Send + Sync {
    fn subset(
        &self,
        input: &Utf8Path,
        years: YearSpan,
        output: &Utf8Path,
    ) -> Result<(), DrsError>;
    fn set_attributes(&self, path: &Utf8Path, edits: &[AttributeEdit]) -> Result<(), DrsError>;
    fn dump_header(&self, path: &Utf8Path) -> Result<String, DrsError>;
    fn show_variable(&self, path: &Utf8Path) -> Result<String, DrsError>;
    fn show_date_range(&self, path: &Utf8Path) -> Result<(String, String), DrsError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeEdit {
    pub name: String,
    pub value: String,
}

impl AttributeEdit {
    pub fn overwrite_global(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn to_ncatted_arg(&self) -> String {
        let value = self.value.replace('\\', "\\\\").replace(',', "\\,");
        format!("{},global,o,c,{value}", self.name)
    }
}

pub fn ncatted_args(path: &Utf8Path, edits: &[AttributeEdit]) -> Vec<String> {
    let mut args = vec!["-O".to_string(), "-h".to_string()];
    for edit in edits {
        args.push("-a".to_string());
        args.push(edit.to_ncatted_arg());
    }
    args.push(path.to_string());
    args
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    pub cdo: Option<String>,
    pub ncatted: Option<String>,
    pub ncdump: Option<String>,
}

#[derive(Debug, Clone)]
pub enum ToolStatus {
    Ready,
    Missing { message: String },
}

#[derive(Clone)]
pub struct SystemToolkit {
    cdo: Option<PathBuf>,
    ncatted: Option<PathBuf>,
    ncdump: Option<PathBuf>,
}

impl Default for SystemToolkit {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemToolkit {
    pub fn new() -> Self {
        Self {
            cdo: find_in_path("cdo"),
            ncatted: find_in_path("ncatted"),
            ncdump: find_in_path("ncdump"),
        }
    }

    pub fn tool_status(&self) -> ToolStatus {
        let missing: Vec<&str> = [
            ("cdo", &self.cdo),
            ("ncatted", &self.ncatted),
            ("ncdump", &self.ncdump),
        ]
        .into_iter()
        .filter(|(_, path)| path.is_none())
        .map(|(name, _)| name)
        .collect();
        if missing.is_empty() {
            ToolStatus::Ready
        } else {
            ToolStatus::Missing {
                message: format!("missing {}", missing.join(", ")),
            }
        }
    }

    pub fn tool_info(&self) -> ToolInfo {
        ToolInfo {
            cdo: self
                .cdo
                .as_ref()
                .and_then(|path| tool_version(path, &["--version"])),
            ncatted: self
                .ncatted
                .as_ref()
                .and_then(|path| tool_version(path, &["--version"])),
            ncdump: self.ncdump.as_ref().map(|path| path.display().to_string()),
        }
    }

    fn require<'a>(tool: &'a Option<PathBuf>, name: &str) -> Result<&'a PathBuf, DrsError> {
        tool.as_ref()
            .ok_or_else(|| DrsError::MissingTool(name.to_string()))
    }

    fn run_cmd(&self, program: &Path, args: &[String]) -> Result<String, DrsError> {
        let tool = program
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| program.display().to_string());
        debug!(tool = %tool, args = ?args, "running external tool");
        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|err| DrsError::ExternalTool {
                tool: tool.clone(),
                message: err.to_string(),
            })?;
        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).to_string());
        }
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let message = if stderr.is_empty() {
            format!("exited with {}", output.status)
        } else {
            stderr
        };
        Err(DrsError::ExternalTool { tool, message })
    }
}

impl Toolkit for SystemToolkit {
    fn subset(
        &self,
        input: &Utf8Path,
        years: YearSpan,
        output: &Utf8Path,
    ) -> Result<(), DrsError> {
        let cdo = Self::require(&self.cdo, "cdo")?;
        let args = vec![
            "-s".to_string(),
            format!("selyear,{}/{}", years.start, years.end),
            input.to_string(),
            output.to_string(),
        ];
        self.run_cmd(cdo, &args).map(|_| ())
    }

    fn set_attributes(&self, path: &Utf8Path, edits: &[AttributeEdit]) -> Result<(), DrsError> {
        if edits.is_empty() {
            return Ok(());
        }
        let ncatted = Self::require(&self.ncatted, "ncatted")?;
        self.run_cmd(ncatted, &ncatted_args(path, edits)).map(|_| ())
    }

    fn dump_header(&self, path: &Utf8Path) -> Result<String, DrsError> {
        let ncdump = Self::require(&self.ncdump, "ncdump")?;
        self.run_cmd(ncdump, &["-h".to_string(), path.to_string()])
    }

    fn show_variable(&self, path: &Utf8Path) -> Result<String, DrsError> {
        let cdo = Self::require(&self.cdo, "cdo")?;
        let args = ["-s".to_string(), "showname".to_string(), path.to_string()];
        let stdout = self.run_cmd(cdo, &args)?;
        let hint = path
            .file_stem()
            .and_then(|stem| stem.split('_').next())
            .unwrap_or("");
        pick_variable(&stdout, hint).ok_or_else(|| DrsError::ExternalTool {
            tool: "cdo".to_string(),
            message: format!("showname reported no variables for {path}"),
        })
    }

    fn show_date_range(&self, path: &Utf8Path) -> Result<(String, String), DrsError> {
        let cdo = Self::require(&self.cdo, "cdo")?;
        let args = ["-s".to_string(), "showdate".to_string(), path.to_string()];
        let stdout = self.run_cmd(cdo, &args)?;
        parse_showdate(&stdout).ok_or_else(|| DrsError::ExternalTool {
            tool: "cdo".to_string(),
            message: format!("showdate reported no timestamps for {path}"),
        })
    }
}

pub fn pick_variable(stdout: &str, hint: &str) -> Option<String> {
    let names: Vec<&str> = stdout.split_whitespace().collect();
    names
        .iter()
        .find(|name| **name == hint)
        .or_else(|| names.first())
        .map(|name| name.to_string())
}

pub fn parse_showdate(stdout: &str) -> Option<(String, String)> {
    let mut dates = stdout.split_whitespace();
    let first = dates.next()?;
    let last = dates.last().unwrap_or(first);
    Some((first.to_string(), last.to_string()))
}

fn find_in_path(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    for path in std::env::split_paths(&path_var) {
        let exe = path.join(format!("{name}.exe"));
        if exe.exists() {
            return Some(exe);
        }
        let plain = path.join(name);
        if plain.exists() {
            return Some(plain);
        }
    }
    None
}

fn tool_version(path: &Path, args: &[&str]) -> Option<String> {
    let output = Command::new(path).args(args).output().ok()?;
    let text = if output.stdout.is_empty() {
        &output.stderr
    } else {
        &output.stdout
    };
    String::from_utf8_lossy(text)
        .lines()
        .next()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
}
