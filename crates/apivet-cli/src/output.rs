//! Output formatting and writing utilities
//!
//! Reports are written either for people (grouped, colored) or as JSON/YAML
//! documents for CI tooling.

use crate::cli::OutputFormat;
use crate::error::Result;
use apivet_core::{Diagnostic, RunOutcome, Severity, Summary, Verdict};
use apivet_schemas::CircularChain;
use chrono::{SecondsFormat, Utc};
use colored::Colorize;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::{self, Write};
use tracing::trace;

/// Everything reported about one file
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub file: String,
    /// `None` when the run stopped before validation
    pub verdict: Option<Verdict>,
    pub summary: Summary,
    pub diagnostics: Vec<Diagnostic>,
    pub circular_references: Vec<CircularChain>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Per-rule counts, when requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statistics: Option<Vec<RuleStatistic>>,
    pub generated_at: String,
}

/// How often one rule was reported in a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleStatistic {
    pub code: String,
    pub severity: Severity,
    pub count: usize,
    /// Share of the diagnostics with the same severity, rounded down
    pub percentage: usize,
}

/// Count `diagnostics` per severity and rule code
///
/// Ordered by severity, then by count (most frequent first), then by code.
pub fn rule_statistics(diagnostics: &[Diagnostic]) -> Vec<RuleStatistic> {
    let mut counts: BTreeMap<(Severity, &str), usize> = BTreeMap::new();
    let mut totals: BTreeMap<Severity, usize> = BTreeMap::new();
    for diagnostic in diagnostics {
        *counts.entry((diagnostic.severity, diagnostic.code.as_str())).or_default() += 1;
        *totals.entry(diagnostic.severity).or_default() += 1;
    }

    let mut statistics: Vec<RuleStatistic> = counts
        .into_iter()
        .map(|((severity, code), count)| RuleStatistic {
            code: code.to_string(),
            severity,
            count,
            percentage: count * 100 / totals.get(&severity).copied().unwrap_or(count).max(1),
        })
        .collect();
    statistics.sort_by(|a, b| {
        a.severity
            .cmp(&b.severity)
            .then(b.count.cmp(&a.count))
            .then_with(|| a.code.cmp(&b.code))
    });
    statistics
}

impl FileReport {
    /// Report for a run that finished, with or without cycles
    pub fn from_outcome(file: impl Into<String>, outcome: RunOutcome, errors_only: bool) -> Self {
        let mut report = Self::empty(file);
        match outcome {
            RunOutcome::Completed { diagnostics, verdict } => {
                report.verdict = Some(verdict);
                report.summary = diagnostics.summary();
                report.diagnostics = diagnostics
                    .iter()
                    .filter(|d| !errors_only || d.is_error())
                    .cloned()
                    .collect();
            }
            RunOutcome::Circular(circular) => {
                report.circular_references = circular.chains;
            }
        }
        report
    }

    /// Attach per-rule counts of the reported diagnostics
    pub fn with_statistics(mut self) -> Self {
        self.statistics = Some(rule_statistics(&self.diagnostics));
        self
    }

    /// Report for a document that could not be loaded or resolved
    pub fn from_error(file: impl Into<String>, error: &impl std::fmt::Display) -> Self {
        let mut report = Self::empty(file);
        report.error = Some(error.to_string());
        report
    }

    fn empty(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            verdict: None,
            summary: Summary::default(),
            diagnostics: Vec::new(),
            circular_references: Vec::new(),
            error: None,
            statistics: None,
            generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }

    pub fn passed(&self) -> bool {
        self.verdict.is_some_and(|verdict| verdict.is_pass())
    }
}

/// Trait for formatting output with specialized support for reports
pub trait OutputFormatter {
    /// Format a serializable value
    fn format<T: Serialize>(&self, value: &T) -> Result<String>;

    /// Format the reports of one invocation
    fn format_reports(&self, reports: &[FileReport], use_color: bool) -> Result<String>;
}

impl OutputFormatter for OutputFormat {
    fn format<T: Serialize>(&self, value: &T) -> Result<String> {
        match self {
            OutputFormat::Json => Ok(serde_json::to_string(value)?),
            OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(value)?),
            OutputFormat::Yaml => Ok(serde_yaml::to_string(value)?),
            OutputFormat::Human => Ok(serde_yaml::to_string(value)?),
        }
    }

    fn format_reports(&self, reports: &[FileReport], use_color: bool) -> Result<String> {
        match (self, reports) {
            (OutputFormat::Human, _) => Ok(reports
                .iter()
                .map(|report| format_report_human(report, reports.len() > 1, use_color))
                .collect::<Vec<_>>()
                .join("\n")),
            (_, [single]) => self.format(single),
            (_, many) => self.format(&many),
        }
    }
}

/// Output writer that handles different output formats and colors
pub struct OutputWriter {
    format: OutputFormat,
    use_color: bool,
    quiet: bool,
    verbose: u8,
    writer: Box<dyn Write>,
}

impl OutputWriter {
    /// Create a new output writer
    pub fn new(format: OutputFormat, use_color: bool, quiet: bool, verbose: u8) -> Self {
        Self::with_writer(format, use_color, quiet, verbose, Box::new(io::stdout()))
    }

    /// Create an output writer with a custom writer
    pub fn with_writer(
        format: OutputFormat,
        use_color: bool,
        quiet: bool,
        verbose: u8,
        writer: Box<dyn Write>,
    ) -> Self {
        Self {
            format,
            use_color,
            quiet,
            verbose,
            writer,
        }
    }

    /// Get the output format
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Write raw output
    pub fn write(&mut self, content: &str) -> Result<()> {
        write!(self.writer, "{}", content)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Write a line of output
    pub fn writeln(&mut self, content: &str) -> Result<()> {
        writeln!(self.writer, "{}", content)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Write an info message
    pub fn info(&mut self, message: &str) -> Result<()> {
        if self.quiet || self.format != OutputFormat::Human {
            return Ok(());
        }
        if self.use_color {
            self.writeln(&format!("{} {}", "ℹ".blue(), message))
        } else {
            self.writeln(&format!("INFO: {}", message))
        }
    }

    /// Write a success message
    pub fn success(&mut self, message: &str) -> Result<()> {
        if self.quiet || self.format != OutputFormat::Human {
            return Ok(());
        }
        if self.use_color {
            self.writeln(&message.green().to_string())
        } else {
            self.writeln(message)
        }
    }

    /// Write a warning message
    ///
    /// Machine formats keep stdout parseable, so warnings go to stderr there.
    pub fn warning(&mut self, message: &str) -> Result<()> {
        if self.format != OutputFormat::Human {
            eprintln!("Warning: {}", message);
            return Ok(());
        }
        if self.use_color {
            self.writeln(&format!("{} {}", "Warning".yellow(), message))
        } else {
            self.writeln(&format!("WARNING: {}", message))
        }
    }

    /// Write an error message
    pub fn error(&mut self, message: &str) -> Result<()> {
        if self.format != OutputFormat::Human {
            eprintln!("Error: {}", message);
            return Ok(());
        }
        if self.use_color {
            self.writeln(&format!("{} {}", "Error".red(), message))
        } else {
            self.writeln(&format!("ERROR: {}", message))
        }
    }

    /// Write a section header
    pub fn section(&mut self, title: &str) -> Result<()> {
        if self.quiet || self.format != OutputFormat::Human {
            return Ok(());
        }
        self.writeln("")?;
        if self.use_color {
            self.writeln(&format!("═══ {} ═══", title).bright_blue().to_string())
        } else {
            self.writeln(&format!("=== {} ===", title))
        }
    }

    /// Write data in the configured format
    pub fn data<T: Serialize>(&mut self, value: &T) -> Result<()> {
        let formatted = self.format.format(value)?;
        trace!(bytes = formatted.len(), "writing data");
        if self.format == OutputFormat::Human || formatted.ends_with('\n') {
            self.write(&formatted)
        } else {
            self.writeln(&formatted)
        }
    }

    /// Write validation reports
    pub fn reports(&mut self, reports: &[FileReport]) -> Result<()> {
        let formatted = self.format.format_reports(reports, self.use_color)?;
        if formatted.ends_with('\n') {
            self.write(&formatted)
        } else {
            self.writeln(&formatted)
        }
    }

    /// Check if verbose output should be shown
    pub fn is_verbose(&self) -> bool {
        self.verbose > 0
    }

    /// Write a table (for human format)
    pub fn table(&mut self, headers: &[&str], rows: Vec<Vec<String>>) -> Result<()> {
        if self.format != OutputFormat::Human {
            return Ok(());
        }

        let mut widths = headers.iter().map(|h| h.len()).collect::<Vec<_>>();
        for row in &rows {
            for (i, cell) in row.iter().enumerate() {
                if i < widths.len() {
                    widths[i] = widths[i].max(cell.chars().count());
                }
            }
        }

        let header_row = headers
            .iter()
            .enumerate()
            .map(|(i, h)| format!("{:width$}", h, width = widths[i]))
            .collect::<Vec<_>>()
            .join(" │ ");
        if self.use_color {
            self.writeln(&header_row.bold().to_string())?;
        } else {
            self.writeln(&header_row)?;
        }

        let separator = widths
            .iter()
            .map(|w| "─".repeat(*w))
            .collect::<Vec<_>>()
            .join("─┼─");
        self.writeln(&separator)?;

        for row in rows {
            let row_str = row
                .iter()
                .enumerate()
                .map(|(i, cell)| match widths.get(i) {
                    Some(width) => format!("{:width$}", cell, width = *width),
                    None => cell.clone(),
                })
                .collect::<Vec<_>>()
                .join(" │ ");
            self.writeln(row_str.trim_end())?;
        }

        Ok(())
    }
}

fn paint(text: &str, severity: Severity, use_color: bool) -> String {
    if !use_color {
        return text.to_string();
    }
    match severity {
        Severity::Error => text.red().bold().to_string(),
        Severity::Warning => text.yellow().to_string(),
        Severity::Info => text.blue().to_string(),
        Severity::Hint => text.dimmed().to_string(),
    }
}

/// Format one file's report for human reading
fn format_report_human(report: &FileReport, with_header: bool, use_color: bool) -> String {
    let mut output = String::new();

    if with_header {
        let header = format!("Validation Results for {}:", report.file);
        if use_color {
            output.push_str(&format!("\n    {}\n", header.underline()));
        } else {
            output.push_str(&format!("\n    {}\n", header));
        }
    }

    if let Some(error) = &report.error {
        output.push_str(&format!(
            "\n{} Invalid input file: {}. See below for details.\n\n",
            paint("Error", Severity::Error, use_color),
            report.file
        ));
        output.push_str(&format!("  {}\n", error));
        return output;
    }

    if !report.circular_references.is_empty() {
        output.push_str(&format!(
            "\n{} Circular references detected. See below for details.\n\n",
            paint("Error", Severity::Error, use_color)
        ));
        for (i, chain) in report.circular_references.iter().enumerate() {
            output.push_str(&format!("  Chain {}:\n", i + 1));
            for pointer in chain.hops() {
                output.push_str(&format!("    {}  $ref: {}\n", pointer.source, pointer.raw));
            }
        }
        return output;
    }

    let mut current: Option<Severity> = None;
    let mut by_severity = report.diagnostics.clone();
    by_severity.sort_by_key(|d| d.severity);
    for diagnostic in &by_severity {
        if current != Some(diagnostic.severity) {
            current = Some(diagnostic.severity);
            let title = match diagnostic.severity {
                Severity::Error => "errors",
                Severity::Warning => "warnings",
                Severity::Info => "infos",
                Severity::Hint => "hints",
            };
            output.push_str(&format!("\n{}\n\n", paint(title, diagnostic.severity, use_color)));
        }
        output.push_str(&format!("  Message :   {}\n", diagnostic.message));
        output.push_str(&format!("  Rule    :   {}\n", diagnostic.code));
        output.push_str(&format!("  Path    :   {}\n", diagnostic.location()));
        if let Some(line) = diagnostic.line {
            output.push_str(&format!("  Line    :   {}\n", line));
        }
        output.push('\n');
    }

    if let Some(statistics) = &report.statistics {
        output.push_str(&format_statistics_human(statistics, use_color));
    }

    let summary = &report.summary;
    output.push_str(&format!(
        "\nSummary: {} error(s), {} warning(s), {} info, {} hint(s)\n",
        summary.error, summary.warning, summary.info, summary.hint
    ));
    let verdict = if report.passed() {
        if use_color { "Passed".green().to_string() } else { "Passed".to_string() }
    } else if use_color {
        "Failed".red().bold().to_string()
    } else {
        "Failed".to_string()
    };
    output.push_str(&format!("Verdict: {}\n", verdict));
    output
}

/// Per-rule counts, grouped like the diagnostics
fn format_statistics_human(statistics: &[RuleStatistic], use_color: bool) -> String {
    let mut output = String::from("\nStatistics:\n");
    if statistics.is_empty() {
        output.push_str("  No diagnostics reported\n");
        return output;
    }
    let mut current: Option<Severity> = None;
    for statistic in statistics {
        if current != Some(statistic.severity) {
            current = Some(statistic.severity);
            output.push_str(&format!("  {}\n", paint(statistic.severity.as_str(), statistic.severity, use_color)));
        }
        output.push_str(&format!(
            "    {:>5} ({:>3}%) : {}\n",
            statistic.count, statistic.percentage, statistic.code
        ));
    }
    output
}

#[cfg(test)]
mod tests {
    include!("output/tests.rs");
}
