//! Repository management commands

use chartwell_repo::{
    AddOptions, AddOutcome, HttpIndexDownloader, IndexOptions, PasswordPrompt, RepoError,
    RepoSettings, repo_add, repo_index, repo_list, repo_remove, repo_update,
};
use console::style;
use serde::Serialize;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use crate::display::{self, OutputFormat, Table};
use crate::error::Result;

/// Reads a missing password from the terminal
///
/// Stays silent when stdin is not a terminal so scripted runs never block.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalPrompt;

impl PasswordPrompt for TerminalPrompt {
    fn prompt_password(&self, username: &str, url: &str) -> chartwell_repo::Result<Option<String>> {
        if !std::io::stdin().is_terminal() {
            return Ok(None);
        }
        eprintln!("Credentials for {} at {}", style(username).bold(), url);
        let password = rpassword::prompt_password("Password: ")
            .map_err(|e| RepoError::io(PathBuf::from("/dev/tty"), e))?;
        Ok(Some(password).filter(|p| !p.is_empty()))
    }
}

/// Add a new repository
pub async fn add(settings: &RepoSettings, options: &AddOptions) -> Result<()> {
    let downloader = HttpIndexDownloader::new();

    let outcome = repo_add(settings, options, &downloader, &TerminalPrompt).await?;

    match outcome {
        AddOutcome::Added => {
            println!("\"{}\" has been added to your repositories", options.name)
        }
        AddOutcome::Updated => {
            println!("\"{}\" has been updated in your repositories", options.name)
        }
        AddOutcome::Unchanged => println!(
            "\"{}\" already exists with the same configuration, skipping",
            options.name
        ),
    }
    Ok(())
}

/// Remove one or more repositories
pub async fn remove(settings: &RepoSettings, names: &[String]) -> Result<()> {
    for name in repo_remove(settings, names).await? {
        println!("\"{}\" has been removed from your repositories", name);
    }
    Ok(())
}

#[derive(Serialize)]
struct RepositoryRow<'a> {
    name: &'a str,
    url: &'a str,
}

/// List configured repositories
pub fn list(settings: &RepoSettings, output: OutputFormat) -> Result<()> {
    let repositories = repo_list(settings)?;

    if output != OutputFormat::Table {
        let rows: Vec<RepositoryRow<'_>> = repositories
            .iter()
            .map(|r| RepositoryRow {
                name: &r.name,
                url: &r.url,
            })
            .collect();
        print!("{}", display::render_structured(&rows, output)?);
        return Ok(());
    }

    let mut table = Table::new(["NAME", "URL"]);
    for repo in &repositories {
        table.add_row([repo.name.as_str(), repo.url.as_str()]);
    }
    print!("{}", table.render());
    Ok(())
}

/// Refresh the cached indexes
///
/// Individual failures are reported and do not fail the command.
pub async fn update(settings: &RepoSettings, names: &[String]) -> Result<()> {
    let downloader = HttpIndexDownloader::new();

    println!("Hang tight while we grab the latest from your chart repositories...");
    let spinner = display::spinner("Updating repository indexes");
    let report = repo_update(settings, &downloader, Some(names)).await;
    spinner.finish_and_clear();
    let report = report?;

    for outcome in &report.outcomes {
        match &outcome.result {
            Ok(_) => println!(
                "...Successfully got an update from the \"{}\" chart repository",
                outcome.name
            ),
            Err(e) => println!(
                "...Unable to get an update from the \"{}\" chart repository ({}):\n\t{}",
                outcome.name, outcome.url, e
            ),
        }
    }
    println!("Update Complete. {}", style("Happy charting!").green());
    Ok(())
}

/// Generate `index.yaml` for a directory of chart archives
pub fn index(dir: &Path, url: Option<String>, merge: Option<PathBuf>) -> Result<()> {
    let options = IndexOptions {
        base_url: url,
        merge,
    };
    let index = repo_index(dir, options)?;

    println!(
        "Indexed {} chart version(s) into {}",
        index.len(),
        dir.join(chartwell_repo::local::INDEX_FILE).display()
    );
    Ok(())
}
