use std::fs;
use std::time::{Duration, Instant};

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::{
    AttributeSet, DateRange, DrivingModel, END_DATE, Experiment, HEADER_KEYS, SALVAGE_KEYS,
    START_DATE, SourceFile, TimeClassification, VARIABLE_NAME, VariableKind, YearSpan,
};
use crate::drs::DrsIdentity;
use crate::error::DrsError;
use crate::fixer::{ComplianceFixer, InstitutionTemplate, experiment_attributes};
use crate::fs_util::discover_files;
use crate::header::parse_header;
use crate::store::DrsLayout;
use crate::toolkit::{AttributeEdit, Toolkit};

#[derive(Debug, Clone)]
pub struct RelocateOptions {
    pub extension: String,
    pub recursive: bool,
    pub dry_run: bool,
}

impl Default for RelocateOptions {
    fn default() -> Self {
        Self {
            extension: crate::config::DEFAULT_EXTENSION.to_string(),
            recursive: false,
            dry_run: false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RelocateReport {
    pub items: Vec<FileOutcome>,
}

impl RelocateReport {
    pub fn relocated(&self) -> usize {
        self.items
            .iter()
            .filter(|item| item.status == OutcomeStatus::Relocated)
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.items.len() - self.relocated()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Relocated,
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileOutcome {
    pub source: String,
    pub status: OutcomeStatus,
    pub outputs: Vec<RelocatedFile>,
    pub reason: Option<String>,
    pub external_tool_failure: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelocatedFile {
    pub experiment: String,
    pub repaired: bool,
    pub path: String,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

fn emit(sink: &dyn ProgressSink, message: String) {
    sink.event(ProgressEvent {
        message,
        elapsed: None,
    });
}

pub struct Relocator<T: Toolkit> {
    toolkit: T,
    layout: DrsLayout,
    template: InstitutionTemplate,
    model: Option<DrivingModel>,
}

impl<T: Toolkit> Relocator<T> {
    pub fn new(
        toolkit: T,
        layout: DrsLayout,
        template: InstitutionTemplate,
        model: Option<DrivingModel>,
    ) -> Self {
        Self {
            toolkit,
            layout,
            template,
            model,
        }
    }

    pub fn run(
        &self,
        source_dir: &Utf8Path,
        options: &RelocateOptions,
        sink: &dyn ProgressSink,
    ) -> Result<RelocateReport, DrsError> {
        let paths = discover_files(source_dir, &options.extension, options.recursive)?;
        info!(count = paths.len(), source = %source_dir, "discovered source files");
        emit(
            sink,
            format!("phase=Discover; {} file(s) in {source_dir}", paths.len()),
        );

        let mut items = Vec::with_capacity(paths.len());
        for path in paths {
            let start = Instant::now();
            let result = SourceFile::from_path(&path)
                .and_then(|file| self.relocate_file(&file, options, sink));
            let outcome = match result {
                Ok(outputs) => {
                    for output in &outputs {
                        sink.event(ProgressEvent {
                            message: format!("relocated {path} -> {}", output.path),
                            elapsed: Some(start.elapsed()),
                        });
                    }
                    FileOutcome {
                        source: path.to_string(),
                        status: OutcomeStatus::Relocated,
                        outputs,
                        reason: None,
                        external_tool_failure: false,
                    }
                }
                Err(err) => {
                    warn!(source = %path, error = %err, "skipping file");
                    sink.event(ProgressEvent {
                        message: format!("skipped {path}: {err}"),
                        elapsed: Some(start.elapsed()),
                    });
                    FileOutcome {
                        source: path.to_string(),
                        status: OutcomeStatus::Skipped,
                        outputs: Vec::new(),
                        reason: Some(err.to_string()),
                        external_tool_failure: err.is_external_tool_failure(),
                    }
                }
            };
            items.push(outcome);
        }

        Ok(RelocateReport { items })
    }

    pub fn relocate_file(
        &self,
        file: &SourceFile,
        options: &RelocateOptions,
        sink: &dyn ProgressSink,
    ) -> Result<Vec<RelocatedFile>, DrsError> {
        let scratch = self.layout.scratch_dir()?;
        let scratch_root = Utf8PathBuf::from_path_buf(scratch.path().to_path_buf())
            .map_err(|_| DrsError::Filesystem("non-utf8 scratch directory".to_string()))?;

        let variable = self.toolkit.show_variable(&file.path)?;
        let kind = VariableKind::classify(&variable);
        let classification = match kind {
            VariableKind::Invariant => None,
            VariableKind::TimeVarying => file.years.map(|years| years.classify()),
        };
        debug!(
            source = %file.path,
            variable = %variable,
            kind = ?kind,
            classification = ?classification,
            "classified source file"
        );

        let job = Job {
            variable: &variable,
            kind,
            scratch: &scratch_root,
            options,
            sink,
        };

        if classification == Some(TimeClassification::Straddling) {
            let mut outputs = Vec::new();
            for (span, part_class) in [
                (YearSpan::HISTORICAL, TimeClassification::Historical),
                (YearSpan::PROJECTED, TimeClassification::Projected),
            ] {
                let part = scratch_root.join(format!(
                    "{}_{span}.{}",
                    file.variable,
                    file.extension()
                ));
                emit(sink, format!("phase=Split; {} years {span}", file.file_name()));
                self.toolkit.subset(&file.path, span, &part)?;
                if !part.as_std_path().is_file() {
                    return Err(DrsError::MissingOutput(part));
                }
                outputs.extend(self.reconcile(&part, Some(part_class), &job)?);
            }
            return Ok(outputs);
        }

        self.reconcile(&file.path, classification, &job)
    }

    fn reconcile(
        &self,
        path: &Utf8Path,
        classification: Option<TimeClassification>,
        job: &Job<'_>,
    ) -> Result<Vec<RelocatedFile>, DrsError> {
        let header = self.toolkit.dump_header(path)?;
        let parsed = parse_header(&header, &HEADER_KEYS);

        let dates = if job.kind.is_time_varying() {
            let (start, end) = self.toolkit.show_date_range(path)?;
            Some(DateRange::from_query(&start, &end)?)
        } else {
            None
        };
        let classification = classification.or_else(|| {
            dates
                .as_ref()
                .and_then(DateRange::start_year)
                .map(TimeClassification::from_year)
        });
        let experiment = classification.and_then(|class| class.experiment());

        if parsed.is_complete() {
            emit(job.sink, format!("phase=Reconcile; {path} header complete"));
            let output =
                self.relocate_complete(path, parsed.attributes, dates, experiment, job)?;
            return Ok(vec![output]);
        }

        let missing: Vec<&str> = parsed.unallocated.iter().map(String::as_str).collect();
        info!(source = %path, missing = ?missing, "header incomplete, synthesizing attributes");
        emit(
            job.sink,
            format!("phase=Repair; {path} missing {}", missing.join(", ")),
        );

        let salvaged = parse_header(&header, &SALVAGE_KEYS).attributes;
        let fixer = ComplianceFixer::new(&self.template, self.model);
        let variants = fixer.synthesize(&salvaged, job.variable, job.kind, dates.as_ref())?;

        let mut outputs = Vec::new();
        for (variant, attributes) in variants.into_pairs() {
            let staged = stage_copy(path, job.scratch, variant.id())?;
            let edits: Vec<AttributeEdit> = attributes
                .global_attributes()
                .map(|(key, value)| AttributeEdit::overwrite_global(key, value))
                .collect();
            self.toolkit.set_attributes(&staged, &edits)?;
            outputs.push(self.place(&staged, &attributes, true, job)?);
        }
        Ok(outputs)
    }

    fn relocate_complete(
        &self,
        path: &Utf8Path,
        mut attributes: AttributeSet,
        dates: Option<DateRange>,
        experiment: Option<Experiment>,
        job: &Job<'_>,
    ) -> Result<RelocatedFile, DrsError> {
        attributes.insert(VARIABLE_NAME, job.variable);
        if let Some(dates) = &dates {
            attributes.insert(START_DATE, dates.start.as_str());
            attributes.insert(END_DATE, dates.end.as_str());
        }

        let mut working = path.to_path_buf();
        if let Some(experiment) = experiment {
            if attributes.get("driving_experiment_name") != Some(experiment.id()) {
                debug!(source = %path, experiment = %experiment, "rewriting experiment attributes");
                if !path.starts_with(job.scratch) {
                    working = stage_copy(path, job.scratch, experiment.id())?;
                }
                let rewritten = experiment_attributes(
                    attributes.get("driving_model_id").unwrap_or_default(),
                    attributes
                        .get("driving_model_ensemble_member")
                        .unwrap_or_default(),
                    experiment,
                );
                let edits: Vec<AttributeEdit> = rewritten
                    .iter()
                    .map(|(key, value)| AttributeEdit::overwrite_global(*key, value.as_str()))
                    .collect();
                self.toolkit.set_attributes(&working, &edits)?;
                for (key, value) in rewritten {
                    attributes.insert(key, value);
                }
            }
        }

        self.place(&working, &attributes, false, job)
    }

    fn place(
        &self,
        working: &Utf8Path,
        attributes: &AttributeSet,
        repaired: bool,
        job: &Job<'_>,
    ) -> Result<RelocatedFile, DrsError> {
        let identity = DrsIdentity::from_attributes(attributes, job.kind)?;
        let extension = job.options.extension.as_str();
        let target = if job.options.dry_run {
            self.layout.target_path(&identity, extension)
        } else {
            self.layout.place(working, &identity, extension)?
        };
        info!(source = %working, target = %target, dry_run = job.options.dry_run, "placed file");
        Ok(RelocatedFile {
            experiment: identity.driving_experiment_name,
            repaired,
            path: target.to_string(),
        })
    }
}

struct Job<'a> {
    variable: &'a str,
    kind: VariableKind,
    scratch: &'a Utf8Path,
    options: &'a RelocateOptions,
    sink: &'a dyn ProgressSink,
}

fn stage_copy(path: &Utf8Path, scratch: &Utf8Path, label: &str) -> Result<Utf8PathBuf, DrsError> {
    let file_name = path
        .file_name()
        .ok_or_else(|| DrsError::InvalidFileName(path.to_string()))?;
    let dir = scratch.join(label);
    fs::create_dir_all(dir.as_std_path()).map_err(|err| DrsError::Filesystem(err.to_string()))?;
    let staged = dir.join(file_name);
    fs::copy(path.as_std_path(), staged.as_std_path())
        .map_err(|err| DrsError::Filesystem(format!("stage {path}: {err}")))?;
    Ok(staged)
}
