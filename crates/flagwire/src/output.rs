//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde, plain emits a bare value for scripts.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use flagwire_core::{ProviderEvent, ProviderEventKind};

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: &ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// A `field | value` row for single-item detail tables.
#[derive(Tabled)]
pub struct DetailRow {
    #[tabled(rename = "Field")]
    pub field: &'static str,
    #[tabled(rename = "Value")]
    pub value: String,
}

/// Render a single serde-serializable item in the chosen format.
///
/// Table rendering uses `detail_fn` to produce `field | value` rows;
/// plain rendering uses `plain_fn`.
pub fn render_single<T>(
    format: &OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> Vec<DetailRow>,
    plain_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
{
    Ok(match format {
        OutputFormat::Table => render_table(&detail_fn(data)),
        OutputFormat::Json => serde_json::to_string_pretty(data)?,
        OutputFormat::JsonCompact => serde_json::to_string(data)?,
        OutputFormat::Yaml => serde_yaml::to_string(data)?,
        OutputFormat::Plain => plain_fn(data),
    })
}

/// One line (or YAML document) per provider event, suitable for streaming.
pub fn render_event(
    format: &OutputFormat,
    event: &ProviderEvent,
    color: bool,
) -> Result<String, CliError> {
    Ok(match format {
        OutputFormat::Table | OutputFormat::Plain => event_line(event, color),
        OutputFormat::Json | OutputFormat::JsonCompact => serde_json::to_string(event)?,
        OutputFormat::Yaml => format!("---\n{}", serde_yaml::to_string(event)?.trim_end()),
    })
}

fn event_line(event: &ProviderEvent, color: bool) -> String {
    let label = event.kind.to_string().to_uppercase();
    let label = if color {
        match event.kind {
            ProviderEventKind::Ready => label.green().bold().to_string(),
            ProviderEventKind::ConfigurationChanged => label.cyan().bold().to_string(),
            ProviderEventKind::Error => label.red().bold().to_string(),
        }
    } else {
        label
    };

    let mut line = format!("{label} {}", event.provider_name);
    if !event.changed_flags.is_empty() {
        let flags: Vec<&str> = event.changed_flags.iter().map(String::as_str).collect();
        line.push_str(&format!(" flags={}", flags.join(",")));
    }
    if let Some(ref message) = event.message {
        line.push_str(&format!(" {message}"));
    }
    line
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}
