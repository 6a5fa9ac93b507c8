use std::io::{self, Write};

use serde::Serialize;

use crate::relocate::{OutcomeStatus, ProgressEvent, ProgressSink, RelocateReport};

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Human,
    Json,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_report(report: &RelocateReport) -> io::Result<()> {
        Self::print_json(report)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

pub struct ConsoleOutput;

impl ConsoleOutput {
    pub fn print_summary(report: &RelocateReport) {
        println!(
            "cordex-drs: {} relocated, {} skipped",
            report.relocated(),
            report.skipped()
        );
        for item in &report.items {
            if item.status == OutcomeStatus::Skipped {
                let reason = item.reason.as_deref().unwrap_or("unknown error");
                println!("  skipped {}: {reason}", item.source);
            }
        }
    }
}

impl ProgressSink for ConsoleOutput {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => println!("{} ({} ms)", event.message, elapsed.as_millis()),
            None => println!("{}", event.message),
        }
    }
}
