//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde, plain emits the grouped text rows.

use std::fmt::Write as _;
use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use emsmon_core::{DeviceGroup, DeviceType, GroupSnapshot, Topology};

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

/// Paint `text` in the device type's colour.
fn paint(kind: Option<DeviceType>, text: &str, color: bool) -> String {
    if !color {
        return text.to_owned();
    }
    match kind {
        Some(DeviceType::Bms) => text.blue().to_string(),
        Some(DeviceType::Pcs) => text.red().to_string(),
        Some(DeviceType::Grid) => text.yellow().to_string(),
        Some(DeviceType::AirCondition) => text.green().to_string(),
        None => text.bold().to_string(),
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a single serde-serializable item in the chosen format.
///
/// `detail_fn` renders the table view and `plain_fn` the plain view.
pub fn render_single<T>(
    format: OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    plain_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize + ?Sized,
{
    match format {
        OutputFormat::Table => Ok(detail_fn(data)),
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => Ok(plain_fn(data)),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Format-specific renderers ────────────────────────────────────────

fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

fn render_json<T: serde::Serialize + ?Sized>(data: &T, compact: bool) -> Result<String, CliError> {
    Ok(if compact {
        serde_json::to_string(data)?
    } else {
        serde_json::to_string_pretty(data)?
    })
}

fn render_yaml<T: serde::Serialize + ?Sized>(data: &T) -> Result<String, CliError> {
    Ok(serde_yaml::to_string(data)?)
}

// ── Topology tree ────────────────────────────────────────────────────

/// Indented group → device → point tree.
///
/// Devices are labelled `<device id> - <name>`, points `<id> - <name>`.
pub fn tree_text(topology: &Topology, color: bool) -> String {
    let mut out = String::new();
    for group in topology.groups() {
        let header = match group.kind {
            Some(kind) => format!("{} ({})", group.type_name, kind.label()),
            None => group.type_name.clone(),
        };
        let _ = writeln!(out, "{}", paint(group.kind, &header, color));

        for device in &group.devices {
            let id = Topology::device_id_for(device)
                .map_or_else(|| "?".to_owned(), |id| id.to_string());
            let _ = writeln!(out, "  {id} - {}", device.display_name);
            for point in &device.points {
                let _ = writeln!(out, "    {} - {}", point.id, point.display_name);
            }
        }
    }
    out.truncate(out.trim_end().len());
    out
}

/// Render the topology in any output format; structured formats carry
/// the full group list.
pub fn render_tree(
    format: OutputFormat,
    topology: &Topology,
    color: bool,
) -> Result<String, CliError> {
    let text = |_: &[DeviceGroup]| tree_text(topology, color);
    render_single(format, topology.groups(), text, text)
}

// ── Readings ─────────────────────────────────────────────────────────

#[derive(Tabled)]
struct ReadingRow {
    #[tabled(rename = "Type")]
    device_type: String,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Device")]
    device: String,
    #[tabled(rename = "Point")]
    point: String,
    #[tabled(rename = "Value")]
    value: String,
}

fn reading_rows(groups: &[GroupSnapshot]) -> Vec<ReadingRow> {
    groups
        .iter()
        .flat_map(|g| {
            g.rows.iter().map(move |r| ReadingRow {
                device_type: g.device_type.label().to_owned(),
                id: r.id.to_string(),
                device: r.metadata.device_name.clone(),
                point: r.metadata.display_name.clone(),
                value: r.value.to_string(),
            })
        })
        .collect()
}

/// `===== <type> =====` sections of `ID: <id>  <name>  <value>` rows.
pub fn grouped_text(groups: &[GroupSnapshot], color: bool) -> String {
    let mut out = String::new();
    for group in groups {
        let kind = Some(group.device_type);
        let header = format!("===== {} =====", group.device_type.as_ref());
        let _ = writeln!(out, "{}", paint(kind, &header, color));
        for row in &group.rows {
            let line = format!(
                "ID: {}  {}  {}",
                row.id, row.metadata.display_name, row.value
            );
            let _ = writeln!(out, "{}", paint(kind, &line, color));
        }
        out.push('\n');
    }
    out.truncate(out.trim_end().len());
    out
}

/// Render readings in any output format.
pub fn render_readings(
    format: OutputFormat,
    groups: &[GroupSnapshot],
    color: bool,
) -> Result<String, CliError> {
    render_single(
        format,
        groups,
        |g| {
            if g.is_empty() {
                String::new()
            } else {
                render_table(&reading_rows(g))
            }
        },
        |g| grouped_text(g, color),
    )
}
