use super::component::ComponentPath;
use super::identifier::Identifier;
use crate::shared::error::{FetchError, ResolveError};
use std::fmt;

/// Phases of one orchestrator run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Discovering,
    GroupingByIdentifier,
    Dispatching,
    Merging,
    Done,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunPhase::Idle => "idle",
            RunPhase::Discovering => "discovering",
            RunPhase::GroupingByIdentifier => "grouping",
            RunPhase::Dispatching => "dispatching",
            RunPhase::Merging => "merging",
            RunPhase::Done => "done",
        };
        write!(f, "{}", name)
    }
}

/// A lookup that failed for every component sharing its identifier.
#[derive(Debug, Clone)]
pub struct LookupFailure {
    pub identifier: Identifier,
    pub components: usize,
    pub error: FetchError,
}

/// A component that could not be given an identifier.
#[derive(Debug, Clone)]
pub struct UnresolvedComponent {
    pub path: ComponentPath,
    pub name: String,
    pub reason: ResolveError,
}

/// Outcome of enriching one document from one source.
#[derive(Debug, Clone, Default)]
pub struct EnrichmentReport {
    pub source: String,
    pub discovered: usize,
    pub resolved: usize,
    pub unresolved: Vec<UnresolvedComponent>,
    pub unique_identifiers: usize,
    pub fetched: usize,
    pub cache_hits: usize,
    pub enriched_components: usize,
    pub failures: Vec<LookupFailure>,
    pub cancelled: bool,
}

impl EnrichmentReport {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Self::default()
        }
    }

    /// Count of lookups that ended with no remote record.
    pub fn not_found(&self) -> usize {
        self.failures
            .iter()
            .filter(|f| matches!(f.error, FetchError::NotFound { .. }))
            .count()
    }

    pub fn summary(&self) -> String {
        format!(
            "{}: {} components, {} enriched, {} unique lookups ({} fetched, {} cached), {} unresolved, {} failed{}",
            self.source,
            self.discovered,
            self.enriched_components,
            self.unique_identifiers,
            self.fetched,
            self.cache_hits,
            self.unresolved.len(),
            self.failures.len(),
            if self.cancelled { " (cancelled)" } else { "" }
        )
    }
}
