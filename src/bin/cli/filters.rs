//! Filtering logic for checks
//!
//! Filters targets by contract name. Patterns support `*` wildcards and
//! must match the whole name.

use regex::Regex;

use crate::cli::check::CheckTarget;

/// Compile a `*` wildcard pattern into an anchored regex
pub fn name_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    let body = pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    Regex::new(&format!("^{}$", body))
}

/// Keep targets whose contract name matches `name` (all when `None`)
pub fn filter_targets(targets: Vec<CheckTarget>, name: Option<&str>) -> Result<Vec<CheckTarget>, regex::Error> {
    let Some(pattern) = name else {
        return Ok(targets);
    };
    let regex = name_pattern(pattern)?;
    Ok(targets
        .into_iter()
        .filter(|t| regex.is_match(&t.contract))
        .collect())
}
