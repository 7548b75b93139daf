use crate::enrichment::domain::{EnrichmentReport, SbomFormat};

/// EnrichResponse - Result of running every configured stage
///
/// `content` is always the re-encoded document, enriched as far as the run
/// got; a cancelled run still yields it.
#[derive(Debug, Clone)]
pub struct EnrichResponse {
    /// The encoded SBOM, in its original format
    pub content: String,
    pub format: SbomFormat,
    /// One report per stage that ran, in order
    pub reports: Vec<EnrichmentReport>,
    /// Whether cancellation cut the run short
    pub cancelled: bool,
}

impl EnrichResponse {
    pub fn new(content: String, format: SbomFormat, reports: Vec<EnrichmentReport>) -> Self {
        let cancelled = reports.iter().any(|r| r.cancelled);
        Self {
            content,
            format,
            reports,
            cancelled,
        }
    }

    /// Total components touched across all stages.
    pub fn enriched_components(&self) -> usize {
        self.reports.iter().map(|r| r.enriched_components).sum()
    }
}
