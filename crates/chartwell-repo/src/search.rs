//! Search over cached repository indexes
//!
//! [`SearchIndex`] loads every cached index named in the registry into one
//! flat list of chart versions. [`SearchEngine`] scores each version against
//! the query, ranks them and then applies the version constraint.
//!
//! Each chart version is matched against a search line of four fields:
//!
//! ```text
//! name \v repo/name \v description \v keywords
//! ```
//!
//! A literal hit scores the index of the field it landed in, so a hit in
//! the name beats a hit in the description. Queries with no literal hit fall
//! back to fuzzy matching against the name and keywords, which always scores
//! below every literal hit.

use chartwell_core::parse_lenient;
use regex::RegexBuilder;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashSet;
use tracing::debug;

use crate::cache::RepositoryCache;
use crate::config::RegistryFile;
use crate::constraint::VersionConstraint;
use crate::error::{RepoError, Result};
use crate::index::{ChartVersion, IndexFile};

/// Separator between the fields of a search line
const FIELD_SEPARATOR: char = '\u{000B}';

/// Results scoring this or more are dropped
pub const MAX_SCORE: f64 = 25.0;

/// Score of the best possible fuzzy match
const FUZZY_BASE_SCORE: f64 = 4.0;

/// Minimum similarity for a fuzzy match
const FUZZY_THRESHOLD: f64 = 0.75;

/// Score added per unit of dissimilarity
const FUZZY_PENALTY: f64 = 25.0;

/// Constraint applied when none is given
pub const DEFAULT_CONSTRAINT: &str = ">0.0.0";

/// Constraint applied when none is given and prereleases are wanted
pub const DEVEL_CONSTRAINT: &str = ">0.0.0-0";

/// Search parameters
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    /// Query terms, joined with single spaces; empty lists everything
    pub terms: Vec<String>,
    /// Treat the query as a regular expression
    pub regexp: bool,
    /// Include prerelease versions (ignored when `version` is set)
    pub devel: bool,
    /// Explicit version constraint
    pub version: Option<String>,
    /// Return every matching version instead of the newest per chart
    pub versions: bool,
}

impl SearchOptions {
    pub fn new(terms: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            terms: terms.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// The constraint that will filter results
    pub fn effective_constraint(&self) -> &str {
        match self.version.as_deref() {
            Some(version) if !version.trim().is_empty() => version,
            _ if self.devel => DEVEL_CONSTRAINT,
            _ => DEFAULT_CONSTRAINT,
        }
    }
}

/// One matching chart version
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    /// Chart name
    pub name: String,
    pub chart_version: String,
    pub app_version: Option<String>,
    pub description: Option<String>,
    pub repository: String,
    /// Lower is better
    pub score: f64,
}

impl SearchResult {
    /// `repository/name`
    pub fn qualified_name(&self) -> String {
        format!("{}/{}", self.repository, self.name)
    }
}

/// A repository whose cached index could not be used
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheWarning {
    pub repository: String,
    pub message: String,
}

/// Results of a search together with the repositories that were skipped
#[derive(Debug, Clone, Default)]
pub struct SearchOutput {
    pub results: Vec<SearchResult>,
    pub warnings: Vec<CacheWarning>,
}

#[derive(Debug, Clone)]
struct IndexedChart {
    repository: String,
    chart: ChartVersion,
    /// Lowercased search line
    line: String,
}

/// All cached chart versions, ready to be searched
#[derive(Debug, Clone, Default)]
pub struct SearchIndex {
    charts: Vec<IndexedChart>,
    warnings: Vec<CacheWarning>,
}

impl SearchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the cached index of every configured repository
    ///
    /// A missing or corrupt cache excludes that repository with a warning.
    /// Fails only when no repository is configured.
    pub fn build(registry: &RegistryFile, cache: &RepositoryCache) -> Result<Self> {
        if registry.is_empty() {
            return Err(RepoError::NoRepositories);
        }

        let mut search_index = Self::new();
        for entry in &registry.repositories {
            match cache.load(&entry.name) {
                Ok(index) => search_index.add_index(&entry.name, index),
                Err(e) => {
                    debug!("Loading cached index of {} failed: {}", entry.name, e);
                    search_index.warnings.push(CacheWarning {
                        repository: entry.name.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }

        Ok(search_index)
    }

    /// Add every version of every chart in `index` under `repository`
    pub fn add_index(&mut self, repository: &str, index: IndexFile) {
        for chart in index.entries.into_values().flatten() {
            let line = search_line(repository, &chart).to_lowercase();
            self.charts.push(IndexedChart {
                repository: repository.to_string(),
                chart,
                line,
            });
        }
    }

    /// Repositories skipped while building
    pub fn warnings(&self) -> &[CacheWarning] {
        &self.warnings
    }

    /// Number of indexed chart versions
    pub fn len(&self) -> usize {
        self.charts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.charts.is_empty()
    }
}

fn search_line(repository: &str, chart: &ChartVersion) -> String {
    let sep = FIELD_SEPARATOR;
    format!(
        "{name}{sep}{repository}/{name}{sep}{description}{sep}{keywords}",
        name = chart.name,
        description = chart.description.as_deref().unwrap_or_default(),
        keywords = chart.keywords.join(" "),
    )
}

/// Field index of a byte offset into a search line
fn field_at(line: &str, offset: usize) -> f64 {
    line[..offset].matches(FIELD_SEPARATOR).count() as f64
}

/// Executes queries against a [`SearchIndex`]
pub struct SearchEngine<'a> {
    index: &'a SearchIndex,
}

impl<'a> SearchEngine<'a> {
    pub fn new(index: &'a SearchIndex) -> Self {
        Self { index }
    }

    /// Score, rank and version-filter the index
    pub fn search(&self, options: &SearchOptions) -> Result<Vec<SearchResult>> {
        let constraint = VersionConstraint::parse(options.effective_constraint())?;

        let mut scored = self.score(options)?;
        scored.sort_by(|(a, sa), (b, sb)| rank(a, *sa, b, *sb));

        let mut seen = HashSet::new();
        let mut results = Vec::new();
        for (indexed, score) in scored {
            let Some(version) = parse_lenient(&indexed.chart.version) else {
                continue;
            };
            if !constraint.matches(&version) {
                continue;
            }
            if !options.versions
                && !seen.insert((indexed.repository.as_str(), indexed.chart.name.as_str()))
            {
                continue;
            }

            results.push(SearchResult {
                name: indexed.chart.name.clone(),
                chart_version: indexed.chart.version.clone(),
                app_version: indexed.chart.app_version.clone(),
                description: indexed.chart.description.clone(),
                repository: indexed.repository.clone(),
                score,
            });
        }

        Ok(results)
    }

    fn score(&self, options: &SearchOptions) -> Result<Vec<(&'a IndexedChart, f64)>> {
        let charts = self.index.charts.iter();

        if options.terms.is_empty() {
            return Ok(charts.map(|c| (c, 0.0)).collect());
        }

        let query = options.terms.join(" ");

        if options.regexp {
            let re = RegexBuilder::new(&query)
                .case_insensitive(true)
                .build()
                .map_err(|e| RepoError::InvalidQuery {
                    query: query.clone(),
                    message: e.to_string(),
                })?;

            return Ok(charts
                .filter_map(|c| re.find(&c.line).map(|m| (c, field_at(&c.line, m.start()))))
                .collect());
        }

        let needle = query.to_lowercase();
        Ok(charts
            .filter_map(|c| {
                let score = match c.line.find(&needle) {
                    Some(offset) => field_at(&c.line, offset),
                    None => fuzzy_score(&needle, &c.chart)?,
                };
                (score < MAX_SCORE).then_some((c, score))
            })
            .collect())
    }
}

/// Fuzzy score of a query against the chart name and keywords
fn fuzzy_score(needle: &str, chart: &ChartVersion) -> Option<f64> {
    let similarity = std::iter::once(&chart.name)
        .chain(chart.keywords.iter())
        .map(|candidate| strsim::normalized_damerau_levenshtein(needle, &candidate.to_lowercase()))
        .fold(0.0_f64, f64::max);

    (similarity >= FUZZY_THRESHOLD)
        .then(|| FUZZY_BASE_SCORE + (1.0 - similarity) * FUZZY_PENALTY)
}

/// Ascending score, then qualified name, then newest version first
fn rank(a: &IndexedChart, score_a: f64, b: &IndexedChart, score_b: f64) -> Ordering {
    score_a
        .partial_cmp(&score_b)
        .unwrap_or(Ordering::Equal)
        .then_with(|| qualified(a).cmp(qualified(b)))
        .then_with(|| b.chart.parsed_version().cmp(&a.chart.parsed_version()))
}

fn qualified(chart: &IndexedChart) -> impl Iterator<Item = u8> + '_ {
    chart
        .repository
        .bytes()
        .chain(std::iter::once(b'/'))
        .chain(chart.chart.name.bytes())
}
