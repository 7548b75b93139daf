use crate::enrichment::domain::{Identifier, IdentifierKind, SbomComponent, Vulnerability};
use crate::shared::error::FetchError;
use async_trait::async_trait;

/// Maps one field group of a source response onto a component.
///
/// Enrichers are pure: they only touch the component they are given.
pub type Enricher<T> = fn(&mut dyn SbomComponent, &T);

/// SourceAdapter port for one remote metadata service
///
/// Each adapter fetches a typed response for a single identifier. The
/// orchestrator owns deduplication and caching, so an adapter is called at
/// most once per identifier per run.
///
/// # Async Support
/// Implementations must be `Send + Sync`; one adapter instance serves every
/// concurrent lookup of a run.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Typed response schema. Fields the service may omit are `Option`s.
    type Response: Send + Sync + 'static;

    /// Short source name used in logs, reports and property prefixes
    fn name(&self) -> &'static str;

    /// Which identifier namespace this source is keyed on
    fn identifier_kind(&self) -> IdentifierKind;

    /// Fetches the record for `identifier`
    ///
    /// # Errors
    /// Returns a classified [`FetchError`]; `NotFound` means the service has
    /// no record and must not be retried.
    async fn fetch_by_identifier(
        &self,
        identifier: &Identifier,
    ) -> Result<Self::Response, FetchError>;

    /// Findings in `response` to record at document level, once for every
    /// component the response was merged into. Most sources have none.
    fn vulnerabilities(&self, _response: &Self::Response) -> Vec<Vulnerability> {
        Vec::new()
    }
}
