use std::io::{self, Write};

use serde::Serialize;

use crate::app::{HierarchyResult, ProgressEvent, ProgressSink, SearchResult, UsageResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Verbose,
    Quiet,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_usage(result: &UsageResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_search(result: &SearchResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_hierarchy(result: &HierarchyResult) -> io::Result<()> {
        Self::print_json(result)
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

pub struct StderrProgress;

impl ProgressSink for StderrProgress {
    fn event(&self, event: ProgressEvent) {
        let line = match event.elapsed {
            Some(elapsed) => format!("{} elapsed_ms={}", event.message, elapsed.as_millis()),
            None => event.message,
        };
        let _ = writeln!(io::stderr(), "{line}");
    }
}
