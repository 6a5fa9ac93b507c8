use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::Parser;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use cordex_drs::config::ConfigLoader;
use cordex_drs::domain::DrivingModel;
use cordex_drs::error::DrsError;
use cordex_drs::output::{ConsoleOutput, JsonOutput, OutputMode};
use cordex_drs::relocate::{RelocateOptions, Relocator};
use cordex_drs::store::DrsLayout;
use cordex_drs::toolkit::{SystemToolkit, ToolStatus};

#[derive(Parser)]
#[command(name = "cordex-drs")]
#[command(about = "Relocate climate-model NetCDF files into a CORDEX DRS directory tree")]
#[command(version, author)]
struct Cli {
    #[arg(long, short = 'd')]
    destination: String,

    #[arg(long, short = 's', default_value = ".")]
    source: String,

    #[arg(long, short = 'm', value_enum)]
    model: Option<DrivingModel>,

    #[arg(long)]
    recursive: bool,

    #[arg(long)]
    dry_run: bool,

    #[arg(long)]
    config: Option<String>,

    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<DrsError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &DrsError) -> u8 {
    match error {
        DrsError::InvalidDestination(_) | DrsError::InvalidSource(_) => 2,
        DrsError::MissingTool(_) => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Human
    };

    let layout = DrsLayout::open(Utf8PathBuf::from(cli.destination))?;
    let config = ConfigLoader::resolve(cli.config.as_deref())?;

    let toolkit = SystemToolkit::new();
    if let ToolStatus::Missing { message } = toolkit.tool_status() {
        return Err(DrsError::MissingTool(message).into());
    }
    tracing::debug!(tools = ?toolkit.tool_info(), "external tools located");

    let options = RelocateOptions {
        extension: config.extension.clone(),
        recursive: cli.recursive || config.recursive,
        dry_run: cli.dry_run,
    };
    let model = cli.model.or(config.driving_model);
    let relocator = Relocator::new(toolkit, layout, config.template, model);
    let source = Utf8PathBuf::from(cli.source);

    match output_mode {
        OutputMode::Json => {
            let report = relocator.run(&source, &options, &JsonOutput)?;
            JsonOutput::print_report(&report).into_diagnostic()?;
        }
        OutputMode::Human => {
            let report = relocator.run(&source, &options, &ConsoleOutput)?;
            ConsoleOutput::print_summary(&report);
        }
    }
    Ok(())
}
