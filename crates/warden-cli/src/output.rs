//! Command output rendering.

use std::fmt;
use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use anyhow::Context;
use serde::Serialize;

/// Renders command results either as text or as JSON.
#[derive(Debug, Clone, Copy)]
pub struct Output {
    json: bool,
}

impl Output {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    /// Writes a report to stdout.
    pub fn emit<T>(&self, report: &T) -> anyhow::Result<()>
    where
        T: Serialize + fmt::Display,
    {
        let mut stdout = io::stdout().lock();
        if self.json {
            serde_json::to_writer_pretty(&mut stdout, report)
                .context("failed to serialize output")?;
            writeln!(stdout)?;
        } else {
            writeln!(stdout, "{report}")?;
        }
        Ok(())
    }

    /// Writes a report and maps a negative outcome to a failing exit code.
    pub fn emit_outcome<T>(&self, report: &T, success: bool) -> anyhow::Result<ExitCode>
    where
        T: Serialize + fmt::Display,
    {
        self.emit(report)?;
        Ok(if success {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        })
    }
}

/// Returns the given secret, or reads one line from stdin when absent.
pub fn secret_or_stdin(value: Option<String>, what: &str) -> anyhow::Result<String> {
    if let Some(value) = value {
        return Ok(value);
    }

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .with_context(|| format!("failed to read {what} from stdin"))?;

    Ok(line.trim_end_matches(['\r', '\n']).to_owned())
}
