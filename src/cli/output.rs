//! CLI Output Formatting.
//!
//! Renders messages, key-value pairs and tables as styled text or JSON.
//! Everything is rendered to a `String` first and written through a
//! [`console::Term`], so rendering stays testable.

use console::{style, Term};
use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════════════════════════
// OUTPUT FORMAT
// ═══════════════════════════════════════════════════════════════════════════════

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON format
    Json,
    /// Pretty JSON format
    JsonPretty,
}

impl OutputFormat {
    /// Whether this format emits JSON
    pub fn is_json(&self) -> bool {
        matches!(self, OutputFormat::Json | OutputFormat::JsonPretty)
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "json-pretty" | "jsonpretty" => Ok(OutputFormat::JsonPretty),
            _ => Err(format!("Unknown format: {}", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::JsonPretty => write!(f, "json-pretty"),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// OUTPUT FORMATTER
// ═══════════════════════════════════════════════════════════════════════════════

/// Output formatter for CLI
#[derive(Debug, Clone)]
pub struct OutputFormatter {
    format: OutputFormat,
    color: bool,
    term: Term,
}

impl Default for OutputFormatter {
    fn default() -> Self {
        Self::new(OutputFormat::default())
    }
}

impl OutputFormatter {
    /// Create new formatter writing to stdout
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            color: true,
            term: Term::stdout(),
        }
    }

    /// Enable or disable color
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    /// Get format
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Print success message
    pub fn success(&self, message: &str) -> std::io::Result<()> {
        self.write(&self.render_status("success", "✓", message))
    }

    /// Print error message
    pub fn error(&self, message: &str) -> std::io::Result<()> {
        self.write(&self.render_status("error", "✗", message))
    }

    /// Print info message
    pub fn info(&self, message: &str) -> std::io::Result<()> {
        self.write(&self.render_status("info", "ℹ", message))
    }

    /// Print key-value pair
    pub fn kv(&self, key: &str, value: &str) -> std::io::Result<()> {
        self.write(&self.render_kv(key, value))
    }

    /// Print section header; JSON formats skip it
    pub fn section(&self, title: &str) -> std::io::Result<()> {
        if self.format.is_json() {
            return Ok(());
        }
        self.term.write_line("")?;
        self.term.write_line(&self.paint_header(&format!("=== {} ===", title)))
    }

    /// Print table
    pub fn table(&self, headers: &[&str], rows: &[Vec<String>]) -> std::io::Result<()> {
        self.write(&self.render_table(headers, rows))
    }

    /// Print serializable data as JSON regardless of format
    pub fn json<T: Serialize>(&self, data: &T) -> std::io::Result<()> {
        let rendered = if matches!(self.format, OutputFormat::JsonPretty) {
            serde_json::to_string_pretty(data)
        } else {
            serde_json::to_string(data)
        }
        .map_err(std::io::Error::other)?;
        self.term.write_line(&rendered)
    }

    fn write(&self, rendered: &str) -> std::io::Result<()> {
        if rendered.is_empty() {
            return Ok(());
        }
        self.term.write_line(rendered)
    }

    fn render_status(&self, status: &str, symbol: &str, message: &str) -> String {
        if self.format.is_json() {
            return serde_json::json!({ "status": status, "message": message }).to_string();
        }
        if !self.color {
            return format!("{}: {}", status.to_uppercase(), message);
        }
        let symbol = match status {
            "success" => style(symbol).green(),
            "error" => style(symbol).red(),
            _ => style(symbol).blue(),
        };
        format!("{} {}", symbol, message)
    }

    fn render_kv(&self, key: &str, value: &str) -> String {
        if self.format.is_json() {
            return serde_json::json!({ key: value }).to_string();
        }
        if self.color {
            format!("{}: {}", style(key).bold(), value)
        } else {
            format!("{}: {}", key, value)
        }
    }

    fn render_table(&self, headers: &[&str], rows: &[Vec<String>]) -> String {
        if headers.is_empty() {
            return String::new();
        }

        if self.format.is_json() {
            let data: Vec<serde_json::Map<String, serde_json::Value>> = rows
                .iter()
                .map(|row| {
                    headers
                        .iter()
                        .zip(row.iter())
                        .map(|(h, v)| (h.to_string(), serde_json::Value::String(v.clone())))
                        .collect()
                })
                .collect();
            return serde_json::Value::from(data).to_string();
        }

        // Column widths by character count, cells may hold "∞"
        let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
        for row in rows {
            for (i, cell) in row.iter().enumerate() {
                if let Some(width) = widths.get_mut(i) {
                    *width = (*width).max(cell.chars().count());
                }
            }
        }

        let mut lines = Vec::with_capacity(rows.len() + 2);
        let header: Vec<String> = headers
            .iter()
            .zip(&widths)
            .map(|(h, w)| pad(h, *w))
            .collect();
        lines.push(self.paint_header(&header.join(" | ")));

        let separator: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        lines.push(separator.join("-+-"));

        for row in rows {
            let cells: Vec<String> = row
                .iter()
                .enumerate()
                .map(|(i, cell)| pad(cell, widths.get(i).copied().unwrap_or(0)))
                .collect();
            lines.push(cells.join(" | ").trim_end().to_string());
        }

        lines.join("\n")
    }

    fn paint_header(&self, text: &str) -> String {
        if self.color {
            style(text).cyan().bold().to_string()
        } else {
            text.to_string()
        }
    }
}

fn pad(cell: &str, width: usize) -> String {
    let len = cell.chars().count();
    format!("{}{}", cell, " ".repeat(width.saturating_sub(len)))
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_parse() {
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("JSON-PRETTY".parse::<OutputFormat>().unwrap(), OutputFormat::JsonPretty);
        assert!("table".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_format_display_round_trips() {
        for format in [OutputFormat::Text, OutputFormat::Json, OutputFormat::JsonPretty] {
            assert_eq!(format.to_string().parse::<OutputFormat>().unwrap(), format);
        }
    }

    #[test]
    fn test_plain_status() {
        let out = OutputFormatter::new(OutputFormat::Text).with_color(false);
        assert_eq!(out.render_status("error", "✗", "boom"), "ERROR: boom");
    }

    #[test]
    fn test_json_status() {
        let out = OutputFormatter::new(OutputFormat::Json);
        let rendered = out.render_status("success", "✓", "done");
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(value["status"], "success");
        assert_eq!(value["message"], "done");
    }

    #[test]
    fn test_plain_table_alignment() {
        let out = OutputFormatter::new(OutputFormat::Text).with_color(false);
        let rendered = out.render_table(
            &["account", "hf"],
            &[vec!["alice".into(), "∞".into()], vec!["b".into(), "1.5".into()]],
        );
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "account | hf ");
        assert_eq!(lines[1], "--------+----");
        assert_eq!(lines[2], "alice   | ∞");
        assert_eq!(lines[3], "b       | 1.5");
    }

    #[test]
    fn test_json_table() {
        let out = OutputFormatter::new(OutputFormat::Json);
        let rendered = out.render_table(&["k"], &[vec!["v".into()]]);
        assert_eq!(rendered, r#"[{"k":"v"}]"#);
    }
}
