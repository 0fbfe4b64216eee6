//! Display formatting for CLI output
//!
//! Provides:
//! - Column aligned tables with optional cell truncation
//! - JSON / YAML rendering for `-o json|yaml`
//! - Styled warning lines and a spinner on stderr

use clap::ValueEnum;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::time::Duration;

use crate::error::{CliError, Result};

/// Output format selected with `-o/--output`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Yaml,
}

/// Space between two columns
const COLUMN_GAP: usize = 2;

/// Marker appended to truncated cells
const ELLIPSIS: &str = "...";

/// A plain text table
///
/// Rendering never styles the output so it stays stable when piped.
#[derive(Debug, Clone)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    max_col_width: usize,
}

impl Table {
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
            max_col_width: 0,
        }
    }

    /// Truncate cells wider than `width` characters; 0 disables truncation
    pub fn max_col_width(mut self, width: usize) -> Self {
        self.max_col_width = width;
        self
    }

    pub fn add_row<I, S>(&mut self, cells: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rows.push(cells.into_iter().map(Into::into).collect());
    }

    pub fn render(&self) -> String {
        let rows: Vec<Vec<String>> = std::iter::once(&self.headers)
            .chain(self.rows.iter())
            .map(|row| {
                row.iter()
                    .map(|cell| truncate(cell, self.max_col_width))
                    .collect()
            })
            .collect();

        let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
        let widths: Vec<usize> = (0..columns)
            .map(|i| {
                rows.iter()
                    .filter_map(|row| row.get(i))
                    .map(|cell| cell.chars().count())
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let mut out = String::new();
        for row in &rows {
            let mut line = String::new();
            for (i, cell) in row.iter().enumerate() {
                if i + 1 < row.len() {
                    let pad = widths[i] - cell.chars().count() + COLUMN_GAP;
                    line.push_str(cell);
                    line.push_str(&" ".repeat(pad));
                } else {
                    line.push_str(cell);
                }
            }
            out.push_str(line.trim_end());
            out.push('\n');
        }
        out
    }
}

/// Shorten `value` to at most `max` characters, ending with `...`
pub fn truncate(value: &str, max: usize) -> String {
    if max == 0 || value.chars().count() <= max {
        return value.to_string();
    }
    if max <= ELLIPSIS.len() {
        return value.chars().take(max).collect();
    }
    let kept: String = value.chars().take(max - ELLIPSIS.len()).collect();
    format!("{}{}", kept, ELLIPSIS)
}

/// Render a serializable value as JSON or YAML
pub fn render_structured<T: Serialize>(value: &T, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(value)
            .map(|s| s + "\n")
            .map_err(|e| CliError::internal(format!("JSON output failed: {}", e))),
        OutputFormat::Yaml => serde_yaml::to_string(value)
            .map_err(|e| CliError::internal(format!("YAML output failed: {}", e))),
        OutputFormat::Table => Err(CliError::internal("table output is not structured")),
    }
}

/// Print a warning line to stderr
pub fn warn(message: impl std::fmt::Display) {
    eprintln!("{} {}", style("WARNING:").yellow().bold(), message);
}

/// Spinner on stderr; hidden when stderr is not a terminal
pub fn spinner(message: impl Into<String>) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
    );
    pb.set_message(message.into());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("nginx", 0), "nginx");
        assert_eq!(truncate("nginx", 5), "nginx");
        assert_eq!(truncate("nginx-ingress", 8), "nginx...");
        assert_eq!(truncate("nginx", 2), "ng");
        assert_eq!(truncate("héllo wörld", 7), "héll...");
    }

    #[test]
    fn test_table_alignment() {
        let mut table = Table::new(["NAME", "CHART VERSION", "APP VERSION", "DESCRIPTION"]);
        table.add_row(["stable/nginx", "1.2.0", "1.25.3", "NGINX web server"]);
        table.add_row(["bitnami/postgresql", "13.2.24", "16.1.0", ""]);

        assert_snapshot!(table.render(), @r"
        NAME                CHART VERSION  APP VERSION  DESCRIPTION
        stable/nginx        1.2.0          1.25.3       NGINX web server
        bitnami/postgresql  13.2.24        16.1.0
        ");
    }

    #[test]
    fn test_table_truncates_cells() {
        let mut table = Table::new(["NAME", "URL"]).max_col_width(20);
        table.add_row(["stable", "https://charts.example.com/stable/charts"]);

        assert_snapshot!(table.render(), @r"
        NAME    URL
        stable  https://charts.ex...
        ");
    }

    #[test]
    fn test_render_structured() {
        #[derive(Serialize)]
        struct Row {
            name: &'static str,
        }

        let rows = vec![Row { name: "stable" }];
        assert_eq!(
            render_structured(&rows, OutputFormat::Json).unwrap(),
            "[\n  {\n    \"name\": \"stable\"\n  }\n]\n"
        );
        assert_eq!(
            render_structured(&rows, OutputFormat::Yaml).unwrap(),
            "- name: stable\n"
        );
        assert!(render_structured(&rows, OutputFormat::Table).is_err());
    }
}
