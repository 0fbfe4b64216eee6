//! Lenient semantic version parsing
//!
//! Repository indexes in the wild carry versions such as `v1.2.3` or `1.2`.
//! Strict SemVer rejects both, so index loading and search go through
//! [`parse_lenient`] instead of [`semver::Version::parse`].

use semver::Version;

/// Parse a version string, accepting a leading `v` and missing minor/patch.
///
/// Missing components are padded with zero, so `"1.2"` becomes `1.2.0` and
/// `"v2-rc.1"` becomes `2.0.0-rc.1`. Returns `None` for anything else that
/// SemVer would reject.
pub fn parse_lenient(input: &str) -> Option<Version> {
    let trimmed = input.trim();
    let trimmed = trimmed
        .strip_prefix('v')
        .or_else(|| trimmed.strip_prefix('V'))
        .unwrap_or(trimmed);

    if let Ok(version) = Version::parse(trimmed) {
        return Some(version);
    }

    let (core, suffix) = match trimmed.find(['-', '+']) {
        Some(idx) => trimmed.split_at(idx),
        None => (trimmed, ""),
    };

    let parts: Vec<&str> = core.split('.').collect();
    if parts.is_empty() || parts.len() > 3 {
        return None;
    }

    let numbers = parts
        .iter()
        .map(|p| {
            if p.is_empty() || !p.chars().all(|c| c.is_ascii_digit()) {
                None
            } else {
                p.parse::<u64>().ok()
            }
        })
        .collect::<Option<Vec<u64>>>()?;

    let normalized = format!(
        "{}.{}.{}{}",
        numbers[0],
        numbers.get(1).copied().unwrap_or(0),
        numbers.get(2).copied().unwrap_or(0),
        suffix
    );

    Version::parse(&normalized).ok()
}
