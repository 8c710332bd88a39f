//! Output formatting and writing utilities
//!
//! This module provides utilities for formatting and writing output
//! in various formats (JSON, YAML, human-readable) for annotation results,
//! plus progress indicators for slow engine startup.

use crate::cli::OutputFormat;
use crate::error::Result;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use is_terminal::IsTerminal;
use nlpbridge_core::{Analysis, Entity, Token};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::io::{self, Write};
use std::time::Duration;
use tracing::trace;

/// Engine health report produced by `check`
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: String,
    pub model: String,
    pub engine: String,
    pub version: String,
    pub probe_tokens: usize,
    pub probe_entities: usize,
    pub probe_sentences: usize,
    pub elapsed_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Trait for formatting annotation results
pub trait OutputFormatter {
    /// Format a serializable value
    fn format<T: Serialize>(&self, value: &T) -> Result<String>;

    /// Format tokens with all their annotations
    fn format_tokens(&self, tokens: &[Token]) -> Result<String>;

    /// Format entities with labels and offsets
    fn format_entities(&self, entities: &[Entity]) -> Result<String>;

    /// Format sentences in order
    fn format_sentences(&self, sentences: &[String]) -> Result<String>;

    /// Format a token-to-value map, keys sorted
    fn format_map(&self, title: &str, map: &HashMap<String, String>) -> Result<String>;

    /// Format a full analysis
    fn format_analysis(&self, analysis: &Analysis) -> Result<String>;

    /// Format an engine health report
    fn format_health(&self, report: &HealthReport) -> Result<String>;
}

impl OutputFormatter for OutputFormat {
    fn format<T: Serialize>(&self, value: &T) -> Result<String> {
        match self {
            OutputFormat::Json => Ok(serde_json::to_string(value)?),
            OutputFormat::JsonPretty | OutputFormat::Human => Ok(serde_json::to_string_pretty(value)?),
            OutputFormat::Yaml => Ok(serde_yaml::to_string(value)?),
        }
    }

    fn format_tokens(&self, tokens: &[Token]) -> Result<String> {
        match self {
            OutputFormat::Human => Ok(format_tokens_human(tokens)),
            _ => self.format(&tokens),
        }
    }

    fn format_entities(&self, entities: &[Entity]) -> Result<String> {
        match self {
            OutputFormat::Human => Ok(format_entities_human(entities)),
            _ => self.format(&entities),
        }
    }

    fn format_sentences(&self, sentences: &[String]) -> Result<String> {
        match self {
            OutputFormat::Human => Ok(format_sentences_human(sentences)),
            _ => self.format(&sentences),
        }
    }

    fn format_map(&self, title: &str, map: &HashMap<String, String>) -> Result<String> {
        // Sorted so output is stable between runs
        let sorted: BTreeMap<&String, &String> = map.iter().collect();
        match self {
            OutputFormat::Human => {
                let rows = sorted
                    .iter()
                    .map(|(k, v)| vec![k.to_string(), v.to_string()])
                    .collect();
                Ok(render_table(&["TOKEN", title], rows))
            }
            _ => self.format(&sorted),
        }
    }

    fn format_analysis(&self, analysis: &Analysis) -> Result<String> {
        match self {
            OutputFormat::Human => Ok(format_analysis_human(analysis)),
            _ => self.format(analysis),
        }
    }

    fn format_health(&self, report: &HealthReport) -> Result<String> {
        match self {
            OutputFormat::Human => Ok(format_health_human(report)),
            _ => self.format(report),
        }
    }
}

/// Output writer that handles different output formats and colors
pub struct OutputWriter {
    format: OutputFormat,
    use_color: bool,
    show_progress: bool,
    quiet: bool,
    writer: Box<dyn Write + Send>,
}

impl OutputWriter {
    /// Create a new output writer on stdout
    pub fn new(format: OutputFormat, use_color: bool, quiet: bool, progress: bool) -> Self {
        Self {
            format,
            use_color,
            show_progress: progress && !quiet && io::stderr().is_terminal(),
            quiet,
            writer: Box::new(io::stdout()),
        }
    }

    /// Create an output writer with a custom writer
    pub fn with_writer(format: OutputFormat, use_color: bool, quiet: bool, writer: Box<dyn Write + Send>) -> Self {
        Self {
            format,
            use_color,
            show_progress: false, // No progress bars with custom writers
            quiet,
            writer,
        }
    }

    /// Underlying writer, for generators that stream their own output
    pub fn raw(&mut self) -> &mut dyn Write {
        &mut self.writer
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
    pub fn warning(&mut self, message: &str) -> Result<()> {
        if self.format != OutputFormat::Human {
            return Ok(());
        }

        if self.use_color {
            self.writeln(&message.yellow().to_string())
        } else {
            self.writeln(&format!("WARNING: {}", message))
        }
    }

    /// Write formatted content followed by exactly one newline
    pub fn emit(&mut self, formatted: &str) -> Result<()> {
        trace!(bytes = formatted.len(), format = ?self.format, "Writing result");
        if formatted.ends_with('\n') {
            self.write(formatted)
        } else {
            self.writeln(formatted)
        }
    }

    pub fn tokens(&mut self, tokens: &[Token]) -> Result<()> {
        let formatted = self.format.format_tokens(tokens)?;
        self.emit(&formatted)
    }

    pub fn entities(&mut self, entities: &[Entity]) -> Result<()> {
        let formatted = self.format.format_entities(entities)?;
        self.emit(&formatted)
    }

    pub fn sentences(&mut self, sentences: &[String]) -> Result<()> {
        let formatted = self.format.format_sentences(sentences)?;
        self.emit(&formatted)
    }

    pub fn map(&mut self, title: &str, map: &HashMap<String, String>) -> Result<()> {
        let formatted = self.format.format_map(title, map)?;
        self.emit(&formatted)
    }

    pub fn analysis(&mut self, analysis: &Analysis) -> Result<()> {
        let formatted = self.format.format_analysis(analysis)?;
        self.emit(&formatted)
    }

    pub fn health(&mut self, report: &HealthReport) -> Result<()> {
        let formatted = self.format.format_health(report)?;
        self.emit(&formatted)
    }

    /// Create a spinner for indeterminate progress
    pub fn spinner(&self, message: &str) -> Option<ProgressBar> {
        if !self.show_progress {
            return None;
        }

        let pb = ProgressBar::new_spinner();
        pb.set_style(default_spinner_style());
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    }
}

/// Helper function to create a spinner style
pub fn default_spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

/// Render rows as an aligned text table
///
/// Widths are measured in characters so multi-byte text lines up.
pub fn render_table(headers: &[&str], rows: Vec<Vec<String>>) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }
    }

    let pad = |cell: &str, width: usize| {
        let fill = width.saturating_sub(cell.chars().count());
        format!("{}{}", cell, " ".repeat(fill))
    };
    let join = |cells: Vec<String>| cells.join(" │ ").trim_end().to_string();

    let mut output = String::new();
    output.push_str(&join(
        headers.iter().enumerate().map(|(i, h)| pad(*h, widths[i])).collect(),
    ));
    output.push('\n');
    output.push_str(
        &widths
            .iter()
            .map(|w| "─".repeat(*w))
            .collect::<Vec<_>>()
            .join("─┼─"),
    );
    output.push('\n');
    for row in rows {
        output.push_str(&join(
            row.iter()
                .enumerate()
                .map(|(i, cell)| match widths.get(i) {
                    Some(&w) => pad(cell.as_str(), w),
                    None => cell.clone(),
                })
                .collect(),
        ));
        output.push('\n');
    }
    output
}

fn flag(value: bool) -> String {
    let text = if value { "yes" } else { "" };
    text.to_string()
}

fn format_tokens_human(tokens: &[Token]) -> String {
    if tokens.is_empty() {
        return "No tokens\n".to_string();
    }
    let rows = tokens
        .iter()
        .map(|t| {
            vec![
                t.text.clone(),
                t.lemma.clone(),
                t.pos.clone(),
                t.tag.clone(),
                t.dep.clone(),
                flag(t.is_stop),
                flag(t.is_punct),
            ]
        })
        .collect();
    render_table(&["TEXT", "LEMMA", "POS", "TAG", "DEP", "STOP", "PUNCT"], rows)
}

fn format_entities_human(entities: &[Entity]) -> String {
    if entities.is_empty() {
        return "No entities\n".to_string();
    }
    let rows = entities
        .iter()
        .map(|e| {
            vec![
                e.text.clone(),
                e.label.clone(),
                e.start.to_string(),
                e.end.to_string(),
            ]
        })
        .collect();
    render_table(&["TEXT", "LABEL", "START", "END"], rows)
}

fn format_sentences_human(sentences: &[String]) -> String {
    if sentences.is_empty() {
        return "No sentences\n".to_string();
    }
    let mut output = String::new();
    for (i, sentence) in sentences.iter().enumerate() {
        output.push_str(&format!("{:>3}. {}\n", i + 1, sentence));
    }
    output
}

fn format_analysis_human(analysis: &Analysis) -> String {
    let mut output = String::new();

    output.push_str("═══ Analysis ═══\n\n");
    output.push_str(&format!("  Tokens:    {}\n", analysis.token_count));
    output.push_str(&format!("  Entities:  {}\n", analysis.entity_count));
    output.push_str(&format!("  Sentences: {}\n", analysis.sentence_count));
    output.push_str(&format!(
        "  Processed: {}\n\n",
        analysis.processed_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    output.push_str("Sentences:\n");
    output.push_str(&format_sentences_human(&analysis.sentences));
    output.push_str("\nEntities:\n");
    output.push_str(&format_entities_human(&analysis.entities));
    output.push_str("\nTokens:\n");
    output.push_str(&format_tokens_human(&analysis.tokens));

    output
}

fn format_health_human(report: &HealthReport) -> String {
    let mut output = String::new();

    output.push_str(&format!("Status:    {}\n", report.status));
    output.push_str(&format!("Engine:    {}\n", report.engine));
    output.push_str(&format!("Model:     {}\n", report.model));
    output.push_str(&format!("Version:   {}\n", report.version));
    output.push_str(&format!(
        "Probe:     {} tokens, {} entities, {} sentences\n",
        report.probe_tokens, report.probe_entities, report.probe_sentences
    ));
    output.push_str(&format!("Elapsed:   {}ms\n", report.elapsed_ms));

    output
}
