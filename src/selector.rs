//! Case selection
//!
//! Two filters decide whether a case runs: the configured allow-list
//! ([`should_run`]) and the invocation-time run filter ([`RunFilter`]). A case
//! executes only when both accept it.

use regex::Regex;
use serde::Serialize;
use std::fmt;

/// Returns true if `name` should run given the configured allow-list.
///
/// An empty list selects every case. Otherwise the name must match an entry
/// exactly. Names in the list that are not in the catalog simply never match.
pub fn should_run(name: &str, configured_cases: &[String]) -> bool {
    configured_cases.is_empty() || configured_cases.iter().any(|case| case == name)
}

/// Why a case was not executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Not in the configured allow-list
    NotConfigured,
    /// Rejected by the invocation-time run filter
    FilteredOut,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NotConfigured => write!(f, "not configured"),
            SkipReason::FilteredOut => write!(f, "filtered out by run pattern"),
        }
    }
}

/// Invocation-time name filter, unanchored like a `-run` pattern
#[derive(Debug, Clone, Default)]
pub struct RunFilter {
    pattern: Option<Regex>,
}

impl RunFilter {
    /// Filter that accepts every case
    pub fn all() -> Self {
        Self::default()
    }

    /// Compile a filter; `None` or an empty pattern accepts everything
    pub fn new(pattern: Option<&str>) -> Result<Self, regex::Error> {
        let pattern = match pattern {
            Some(p) if !p.is_empty() => Some(Regex::new(p)?),
            _ => None,
        };
        Ok(Self { pattern })
    }

    pub fn accepts(&self, name: &str) -> bool {
        self.pattern.as_ref().map_or(true, |re| re.is_match(name))
    }
}

/// Combined selection over both filters
pub fn selection(name: &str, configured_cases: &[String], filter: &RunFilter) -> Result<(), SkipReason> {
    if !should_run(name, configured_cases) {
        return Err(SkipReason::NotConfigured);
    }
    if !filter.accepts(name) {
        return Err(SkipReason::FilteredOut);
    }
    Ok(())
}
