//! Output formatting: table, JSON, plain.
//!
//! Single records render as a two-column field table; structured formats go
//! through serde; plain emits the record's key value.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

/// Determine whether color output should be enabled.
pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

/// Apply `style` only when color is enabled.
pub fn paint(text: &str, color: bool, style: impl Fn(&str) -> String) -> String {
    if color { style(text) } else { text.to_owned() }
}

pub fn accent(text: &str) -> String {
    text.cyan().bold().to_string()
}

pub fn dim(text: &str) -> String {
    text.dimmed().to_string()
}

pub fn alert(text: &str) -> String {
    text.yellow().to_string()
}

// ── Render dispatchers ───────────────────────────────────────────────

#[derive(Tabled)]
struct FieldRow {
    #[tabled(rename = "Field")]
    field: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

/// Render a single serde-serializable record in the chosen format.
///
/// `fields` builds the table view; `key` is the plain-mode value.
pub fn render_single<T>(
    format: OutputFormat,
    data: &T,
    fields: impl Fn(&T) -> Vec<(&'static str, String)>,
    key: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
{
    Ok(match format {
        OutputFormat::Table => render_fields(fields(data)),
        OutputFormat::Json => serde_json::to_string_pretty(data)?,
        OutputFormat::JsonCompact => serde_json::to_string(data)?,
        OutputFormat::Plain => key(data),
    })
}

fn render_fields(fields: Vec<(&'static str, String)>) -> String {
    let rows = fields
        .into_iter()
        .map(|(field, value)| FieldRow { field, value });
    Table::new(rows).with(Style::rounded()).to_string()
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

/// Render an optional string field, `-` when absent or blank.
pub fn or_dash(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.is_empty() => v.to_owned(),
        _ => "-".into(),
    }
}
