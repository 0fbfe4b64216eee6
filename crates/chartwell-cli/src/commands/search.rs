//! Search command

use chartwell_repo::{RepoSettings, SearchOptions, SearchResult, search_repo};
use serde::Serialize;

use crate::display::{self, OutputFormat, Table};
use crate::error::Result;

/// Default column width of the results table
pub const DEFAULT_MAX_COL_WIDTH: usize = 50;

/// One result as printed by `-o json|yaml`
#[derive(Debug, Serialize)]
struct ResultRow<'a> {
    name: String,
    version: &'a str,
    app_version: &'a str,
    description: &'a str,
}

impl<'a> From<&'a SearchResult> for ResultRow<'a> {
    fn from(result: &'a SearchResult) -> Self {
        Self {
            name: result.qualified_name(),
            version: &result.chart_version,
            app_version: result.app_version.as_deref().unwrap_or(""),
            description: result.description.as_deref().unwrap_or(""),
        }
    }
}

/// Search the cached repository indexes
pub fn run(
    settings: &RepoSettings,
    options: &SearchOptions,
    output: OutputFormat,
    max_col_width: usize,
) -> Result<()> {
    let found = search_repo(settings, options)?;

    for warning in &found.warnings {
        display::warn(format!(
            "Repo \"{}\" is corrupt or missing. Try 'chartwell repo update'. ({})",
            warning.repository, warning.message
        ));
    }

    if output != OutputFormat::Table {
        let rows: Vec<ResultRow<'_>> = found.results.iter().map(ResultRow::from).collect();
        print!("{}", display::render_structured(&rows, output)?);
        return Ok(());
    }

    if found.results.is_empty() {
        println!("No results found");
        return Ok(());
    }

    print!("{}", render_table(&found.results, max_col_width));
    Ok(())
}

fn render_table(results: &[SearchResult], max_col_width: usize) -> String {
    let mut table = Table::new(["NAME", "CHART VERSION", "APP VERSION", "DESCRIPTION"])
        .max_col_width(max_col_width);
    for result in results {
        let row = ResultRow::from(result);
        table.add_row([
            row.name.as_str(),
            row.version,
            row.app_version,
            row.description,
        ]);
    }
    table.render()
}
