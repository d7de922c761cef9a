//! Rendering of analysis reports and errors.
//!
//! Text mode follows the apt-get package list convention: stdout carries
//! only package names (`name` to keep, `name-` for a missing recommend), so
//! the output can be fed back to `apt-get install` or `apt-mark`. Everything
//! explanatory goes to stderr.
//!
//! JSON mode writes the whole [`Report`] to stdout as a single document.

use serde::Serialize;
use std::io::{self, Write};
use toplevel_core::ErrorCode;
use toplevel_graph::{AnalysisError, MissingRecommend, Report, TopLevelEntry};

/// Output modes supported by the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Package names on stdout, explanations on stderr.
    Text,
    /// One JSON document on stdout.
    Json,
}

impl OutputMode {
    pub const fn from_json_flag(json: bool) -> Self {
        if json { Self::Json } else { Self::Text }
    }
}

/// A structured error with optional suggestion and error code.
#[derive(Debug, Serialize)]
pub struct CliError {
    /// Human-readable error message.
    pub message: String,
    /// Optional suggestion for how to fix the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    /// Stable error code (e.g. "E2001").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    /// Package names the error is about.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub packages: Vec<String>,
}

impl CliError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestion: None,
            error_code: None,
            packages: Vec::new(),
        }
    }

    /// Build an error carrying the code and hint of `code`.
    pub fn with_code(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestion: code.hint().map(str::to_string),
            error_code: Some(code.code().to_string()),
            packages: Vec::new(),
        }
    }

    pub fn from_analysis(error: &AnalysisError) -> Self {
        let mut cli_error = Self::with_code(error.code(), error.to_string());
        if let AnalysisError::UnresolvedPackages(names) = error {
            cli_error.packages.clone_from(names);
        }
        cli_error
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Reports
// ────────────────────────────────────────────────────────────────────────────

/// Render `report` in text mode.
pub fn render_text(report: &Report, out: &mut dyn Write, diag: &mut dyn Write) -> io::Result<()> {
    for entry in &report.top_level {
        render_top_level(entry, out, diag)?;
    }
    for missing in report.missing_recommends.iter().flatten() {
        render_missing(missing, out, diag)?;
    }
    Ok(())
}

fn render_top_level(
    entry: &TopLevelEntry,
    out: &mut dyn Write,
    diag: &mut dyn Write,
) -> io::Result<()> {
    writeln!(out, "{}", entry.name)?;
    if entry.members.len() > 1 {
        writeln!(diag, "{} consists of ({})", entry.name, entry.members.join(" "))?;
    }
    Ok(())
}

fn render_missing(
    missing: &MissingRecommend,
    out: &mut dyn Write,
    diag: &mut dyn Write,
) -> io::Result<()> {
    writeln!(out, "{}-", missing.name)?;

    let by = if missing.by.is_empty() {
        "nothing".to_string()
    } else {
        format_list(&missing.by)
    };
    write!(diag, "{}- is recommended by {by}", missing.name)?;
    if !missing.via.is_empty() {
        write!(diag, " via {}", format_list(&missing.via))?;
    }
    writeln!(diag)
}

/// A single name bare, several as a parenthesized list.
fn format_list(names: &[String]) -> String {
    match names {
        [single] => single.clone(),
        _ => format!("({})", names.join(" ")),
    }
}

/// Render `report` as JSON.
pub fn render_json(report: &Report, out: &mut dyn Write, pretty: bool) -> anyhow::Result<()> {
    if pretty {
        serde_json::to_writer_pretty(&mut *out, report)?;
    } else {
        serde_json::to_writer(&mut *out, report)?;
    }
    writeln!(out)?;
    Ok(())
}

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

/// Render an error to `diag`, adapting format to the output mode.
///
/// In JSON mode, outputs `{"error": {...}}`. In text mode, unresolved
/// package names get one `could not find in package database: NAME` line
/// each; other errors print `error: <message>` and an optional suggestion.
pub fn render_error(
    mode: OutputMode,
    error: &CliError,
    diag: &mut dyn Write,
) -> anyhow::Result<()> {
    match mode {
        OutputMode::Json => {
            let wrapper = serde_json::json!({
                "error": error,
            });
            serde_json::to_writer_pretty(&mut *diag, &wrapper)?;
            writeln!(diag)?;
        }
        OutputMode::Text if !error.packages.is_empty() => {
            for name in &error.packages {
                writeln!(diag, "could not find in package database: {name}")?;
            }
        }
        OutputMode::Text => {
            writeln!(diag, "error: {}", error.message)?;
            if let Some(ref suggestion) = error.suggestion {
                writeln!(diag, "  suggestion: {suggestion}")?;
            }
        }
    }
    Ok(())
}
