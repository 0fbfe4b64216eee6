//! Semantic version constraints used to filter search results
//!
//! The accepted syntax is the one chart users type on the command line,
//! which is wider than what [`semver::VersionReq`] parses:
//!
//! - `||` separates alternatives, any of which may match
//! - comparators inside an alternative are separated by commas or spaces
//!   (`>=1.0.0, <2.0.0` or `>= 1.0 < 2`)
//! - a bare version means exactly that version (`1.2.3`), or every version
//!   it prefixes when partial (`1.2` matches `1.2.x`)
//! - hyphen ranges: `1.0 - 2.0` is `>=1.0, <=2.0`
//! - versions may carry a leading `v`
//! - `!=` excludes a version
//!
//! A prerelease version only satisfies an alternative that itself names a
//! prerelease, so `>=1.0.0` never selects `2.0.0-beta.1` while
//! `>0.0.0-0` selects everything.

use semver::{BuildMetadata, Comparator, Op, Prerelease, Version};
use std::fmt;
use std::str::FromStr;

use crate::error::{RepoError, Result};

/// Operators that may be written apart from their version (`>= 1.0`)
const OPERATORS: &[&str] = &["=", ">", ">=", "<", "<=", "~", "^", "!="];

/// A parsed version constraint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionConstraint {
    raw: String,
    alternatives: Vec<Alternative>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Alternative {
    terms: Vec<Term>,
    allows_prerelease: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Term {
    comparator: Comparator,
    negated: bool,
}

impl VersionConstraint {
    /// Parse a constraint expression
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = |message: String| RepoError::InvalidConstraint {
            constraint: input.to_string(),
            message,
        };

        if input.trim().is_empty() {
            return Err(invalid("constraint is empty".to_string()));
        }

        let alternatives = input
            .split("||")
            .map(|alt| parse_alternative(alt).map_err(&invalid))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            raw: input.trim().to_string(),
            alternatives,
        })
    }

    /// The expression as given
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Check whether `version` satisfies any alternative
    pub fn matches(&self, version: &Version) -> bool {
        let mut version = version.clone();
        version.build = BuildMetadata::EMPTY;

        self.alternatives.iter().any(|alt| alt.matches(&version))
    }
}

impl FromStr for VersionConstraint {
    type Err = RepoError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Alternative {
    fn matches(&self, version: &Version) -> bool {
        if !version.pre.is_empty() && !self.allows_prerelease {
            return false;
        }
        self.terms.iter().all(|term| term.matches(version))
    }
}

impl Term {
    fn matches(&self, version: &Version) -> bool {
        comparator_matches(&self.comparator, version) != self.negated
    }
}

fn parse_alternative(input: &str) -> std::result::Result<Alternative, String> {
    let tokens: Vec<&str> = input
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
        .collect();

    if tokens.is_empty() {
        return Err("empty alternative".to_string());
    }

    let mut expressions = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        let token = tokens[i];

        if tokens.get(i + 1) == Some(&"-") {
            let upper = tokens
                .get(i + 2)
                .ok_or_else(|| format!("hyphen range '{} -' has no upper bound", token))?;
            expressions.push(format!(">={}", token));
            expressions.push(format!("<={}", upper));
            i += 3;
            continue;
        }

        if OPERATORS.contains(&token) {
            let version = tokens
                .get(i + 1)
                .ok_or_else(|| format!("operator '{}' has no version", token))?;
            expressions.push(format!("{}{}", token, version));
            i += 2;
            continue;
        }

        expressions.push(token.to_string());
        i += 1;
    }

    let mut terms = Vec::new();
    for expression in &expressions {
        if let Some(term) = parse_term(expression)? {
            terms.push(term);
        }
    }

    let allows_prerelease = terms.iter().any(|t| !t.comparator.pre.is_empty());
    Ok(Alternative {
        terms,
        allows_prerelease,
    })
}

/// Parse one comparator; `None` for a wildcard matching everything
fn parse_term(expression: &str) -> std::result::Result<Option<Term>, String> {
    let split = expression
        .find(|c: char| !matches!(c, '=' | '<' | '>' | '~' | '^' | '!'))
        .unwrap_or(expression.len());
    let (op, rest) = expression.split_at(split);
    let rest = rest
        .strip_prefix('v')
        .or_else(|| rest.strip_prefix('V'))
        .unwrap_or(rest);

    if rest.is_empty() {
        return Err(format!("'{}' has no version", expression));
    }
    if matches!(rest, "*" | "x" | "X") {
        return Ok(None);
    }

    let (op, negated) = match op {
        "!=" => ("=", true),
        "" if is_wildcard(rest) => ("", false),
        "" => ("=", false),
        other => (other, false),
    };

    let comparator =
        Comparator::parse(&format!("{}{}", op, rest)).map_err(|e| format!("'{}': {}", expression, e))?;

    // Range bounds bump the next component, which must stay representable
    let parts = [Some(comparator.major), comparator.minor, comparator.patch];
    if parts.contains(&Some(u64::MAX)) {
        return Err(format!("'{}': version component is too large", expression));
    }

    Ok(Some(Term {
        comparator,
        negated,
    }))
}

fn is_wildcard(version: &str) -> bool {
    version.split('.').any(|part| matches!(part, "*" | "x" | "X"))
}

/// Lowest version of a release line, below all of its prereleases
fn floor(major: u64, minor: u64, patch: u64) -> Version {
    let mut version = Version::new(major, minor, patch);
    version.pre = Prerelease::new("0").unwrap_or(Prerelease::EMPTY);
    version
}

fn comparator_matches(c: &Comparator, v: &Version) -> bool {
    let lower = Version {
        major: c.major,
        minor: c.minor.unwrap_or(0),
        patch: c.patch.unwrap_or(0),
        pre: c.pre.clone(),
        build: BuildMetadata::EMPTY,
    };
    let full = c.minor.is_some() && c.patch.is_some();

    // First release line past the parts that were written down
    let next = match (c.minor, c.patch) {
        (None, _) => floor(c.major + 1, 0, 0),
        (Some(minor), None) => floor(c.major, minor + 1, 0),
        (Some(minor), Some(patch)) => floor(c.major, minor, patch + 1),
    };

    match c.op {
        Op::Exact if full => *v == lower,
        Op::Exact | Op::Wildcard => *v >= lower && *v < next,
        Op::Greater if full => *v > lower,
        Op::Greater => *v >= next,
        Op::GreaterEq => *v >= lower,
        Op::Less => *v < lower,
        Op::LessEq if full => *v <= lower,
        Op::LessEq => *v < next,
        Op::Tilde => {
            let upper = match c.minor {
                Some(minor) => floor(c.major, minor + 1, 0),
                None => floor(c.major + 1, 0, 0),
            };
            *v >= lower && *v < upper
        }
        Op::Caret => {
            let upper = match (c.major, c.minor, c.patch) {
                (major, _, _) if major > 0 => floor(major + 1, 0, 0),
                (_, None, _) => floor(1, 0, 0),
                (_, Some(minor), _) if minor > 0 => floor(0, minor + 1, 0),
                (_, Some(_), None) => floor(0, 1, 0),
                (_, Some(_), Some(patch)) => floor(0, 0, patch + 1),
            };
            *v >= lower && *v < upper
        }
        _ => c.matches(v),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    fn allows(constraint: &str, version: &str) -> bool {
        VersionConstraint::parse(constraint).unwrap().matches(&v(version))
    }

    #[test]
    fn test_bare_version_is_exact() {
        assert!(allows("1.2.3", "1.2.3"));
        assert!(!allows("1.2.3", "1.2.4"));
        assert!(allows("v1.2.3", "1.2.3"));
    }

    #[test]
    fn test_partial_version_is_a_range() {
        assert!(allows("1.2", "1.2.0"));
        assert!(allows("1.2", "1.2.9"));
        assert!(!allows("1.2", "1.3.0"));
        assert!(allows("1.2.x", "1.2.7"));
        assert!(allows("*", "42.0.0"));
    }

    #[test]
    fn test_comparison_operators() {
        assert!(allows(">=1.5.0", "1.5.0"));
        assert!(allows(">=1.5.0", "2.0.0"));
        assert!(!allows(">=1.5.0", "1.4.9"));
        assert!(allows("<2", "1.99.0"));
        assert!(!allows("<2", "2.0.0"));
        assert!(allows("<=1.2", "1.2.5"));
        assert!(!allows("<=1.2", "1.3.0"));
        assert!(!allows(">1.2", "1.2.5"));
        assert!(allows(">1.2", "1.3.0"));
        assert!(!allows("!=1.0.0", "1.0.0"));
        assert!(allows("!=1.0.0", "1.0.1"));
    }

    #[test]
    fn test_separated_operator_and_commas() {
        assert!(allows(">= 1.0, < 2.0", "1.5.0"));
        assert!(allows(">= 1.0 < 2.0", "1.5.0"));
        assert!(!allows(">= 1.0 < 2.0", "2.0.0"));
    }

    #[test]
    fn test_hyphen_range() {
        assert!(allows("1.0.0 - 2.0.0", "1.0.0"));
        assert!(allows("1.0.0 - 2.0.0", "2.0.0"));
        assert!(!allows("1.0.0 - 2.0.0", "2.0.1"));
    }

    #[test]
    fn test_alternatives() {
        assert!(allows("1.0.0 || >=3.0.0", "1.0.0"));
        assert!(allows("1.0.0 || >=3.0.0", "3.1.0"));
        assert!(!allows("1.0.0 || >=3.0.0", "2.0.0"));
    }

    #[test]
    fn test_tilde_and_caret() {
        assert!(allows("~1.2.3", "1.2.9"));
        assert!(!allows("~1.2.3", "1.3.0"));
        assert!(allows("~1", "1.9.0"));
        assert!(allows("^1.2.3", "1.9.0"));
        assert!(!allows("^1.2.3", "2.0.0"));
        assert!(allows("^0.2.3", "0.2.9"));
        assert!(!allows("^0.2.3", "0.3.0"));
        assert!(!allows("^0.0.3", "0.0.4"));
    }

    #[test]
    fn test_prereleases_need_a_prerelease_constraint() {
        assert!(allows(">0.0.0", "1.0.0"));
        assert!(!allows(">0.0.0", "1.0.0-beta.1"));
        assert!(allows(">0.0.0-0", "1.0.0-beta.1"));
        assert!(allows(">0.0.0-0", "1.0.0"));
        assert!(allows(">=1.0.0-alpha", "1.0.0-rc.1"));
        assert!(!allows("<2.0.0", "2.0.0-rc.1"));
    }

    #[test]
    fn test_prerelease_scope_is_per_alternative() {
        let c = VersionConstraint::parse("1.0.0 || >=2.0.0-0").unwrap();
        assert!(c.matches(&v("2.1.0-beta")));
        assert!(!c.matches(&v("1.0.1-beta")));
    }

    #[test]
    fn test_prerelease_in_one_comparator_opens_the_alternative() {
        let c = VersionConstraint::parse(">=1.0.0-0 <2.0.0").unwrap();
        assert!(c.matches(&v("1.5.0-beta")));
        assert!(c.matches(&v("1.0.0-alpha")));
        assert!(!c.matches(&v("0.9.0-beta")));
    }

    #[test]
    fn test_oversized_components_are_rejected() {
        for input in [
            ">=1.2.18446744073709551615",
            "18446744073709551615",
            "~1.18446744073709551615",
            "^18446744073709551615.0.0",
            "<=18446744073709551615.1",
        ] {
            let err = VersionConstraint::parse(input).unwrap_err();
            assert!(
                matches!(err, RepoError::InvalidConstraint { .. }),
                "{input}: {err}"
            );
        }
        assert!(allows(">=1.2.18446744073709551614", "1.2.18446744073709551614"));
    }

    #[test]
    fn test_build_metadata_is_ignored() {
        assert!(allows("1.2.3", "1.2.3+build.7"));
    }

    #[test]
    fn test_invalid_constraints() {
        for input in ["", "   ", ">=", "1.0 -", "not-a-version", "1.0 ||", ">=1.0.0.0"] {
            let err = VersionConstraint::parse(input).unwrap_err();
            assert!(
                matches!(err, RepoError::InvalidConstraint { .. }),
                "{input}: {err}"
            );
        }
    }

    #[test]
    fn test_display_keeps_input() {
        let c: VersionConstraint = " >=1.0 ".parse().unwrap();
        assert_eq!(c.to_string(), ">=1.0");
        assert_eq!(c.as_str(), ">=1.0");
    }
}
