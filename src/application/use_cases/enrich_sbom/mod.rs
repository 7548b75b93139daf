use crate::application::dto::{EnrichRequest, EnrichResponse};
use crate::application::orchestrator::EnrichmentStage;
use crate::enrichment::domain::{EnrichmentReport, SbomDocument};
use crate::enrichment::services::ComponentDiscovery;
use crate::ports::outbound::{DocumentCodec, ProgressReporter, SbomInput, SbomReader};
use crate::shared::Result;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

/// EnrichSbomUseCase - Core use case for SBOM enrichment
///
/// Reads a document, decodes it, runs every configured enrichment stage
/// over it in order and re-encodes it in its original format.
///
/// # Type Parameters
/// * `R` - SbomReader implementation
/// * `C` - DocumentCodec implementation
/// * `PR` - ProgressReporter implementation
pub struct EnrichSbomUseCase<R, C, PR> {
    reader: R,
    codec: C,
    progress_reporter: PR,
    stages: Vec<Box<dyn EnrichmentStage>>,
}

impl<R, C, PR> EnrichSbomUseCase<R, C, PR>
where
    R: SbomReader,
    C: DocumentCodec,
    PR: ProgressReporter,
{
    /// Creates a new EnrichSbomUseCase with injected dependencies
    pub fn new(reader: R, codec: C, progress_reporter: PR, stages: Vec<Box<dyn EnrichmentStage>>) -> Self {
        Self {
            reader,
            codec,
            progress_reporter,
            stages,
        }
    }

    /// Executes the enrichment use case
    ///
    /// A document that cannot be decoded aborts the run. Anything after
    /// decoding never fails the run: lookup failures are recorded in the
    /// stage reports, and once `cancel` fires the remaining stages are
    /// skipped and the document is encoded as enriched so far.
    pub async fn execute(&self, request: EnrichRequest, cancel: &CancellationToken) -> Result<EnrichResponse> {
        let run_id = Uuid::new_v4();
        self.run(request, cancel)
            .instrument(info_span!("enrich", run_id = %run_id))
            .await
    }

    async fn run(&self, request: EnrichRequest, cancel: &CancellationToken) -> Result<EnrichResponse> {
        // Step 1: Read and decode
        let mut document = self.read_and_decode(&request.input)?;

        // Step 2: Run stages in order
        let reports = self.run_stages(document.as_mut(), cancel).await;

        // Step 3: Stamp and encode
        document.record_tool(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        let content = document.encode()?;

        let mut response = EnrichResponse::new(content, document.format(), reports);
        response.cancelled |= cancel.is_cancelled();
        if !response.cancelled {
            self.progress_reporter.report_completion(&format!(
                "✅ Enriched {} component(s) in {} document",
                response.enriched_components(),
                response.format
            ));
        }
        Ok(response)
    }

    fn read_and_decode(&self, input: &SbomInput) -> Result<Box<dyn SbomDocument>> {
        match input {
            SbomInput::Path(path) => self
                .progress_reporter
                .report(&format!("📖 Loading SBOM from: {}", path.display())),
            SbomInput::Stdin => self.progress_reporter.report("📖 Loading SBOM from stdin"),
        }

        let bytes = self.reader.read_sbom(input)?;
        let document = self.codec.decode(&bytes)?;

        let components = ComponentDiscovery::discover(document.as_ref()).len();
        info!(format = %document.format(), components, "decoded document");
        self.progress_reporter.report(&format!(
            "✅ Detected {} document with {} component(s)",
            document.format(),
            components
        ));
        Ok(document)
    }

    async fn run_stages(
        &self,
        document: &mut dyn SbomDocument,
        cancel: &CancellationToken,
    ) -> Vec<EnrichmentReport> {
        let mut reports = Vec::with_capacity(self.stages.len());

        for stage in &self.stages {
            let name = stage.name();
            if cancel.is_cancelled() {
                warn!(source = name, "cancelled, skipping stage");
                self.progress_reporter
                    .report_error(&format!("⚠️  Cancelled: skipping {}", name));
                continue;
            }

            self.progress_reporter
                .report(&format!("🔍 Enriching from {}...", name));
            let progress = |done: usize, total: usize| {
                self.progress_reporter.report_progress(done, total, Some(name));
            };
            let report = stage.enrich(&mut *document, cancel, &progress).await;

            self.progress_reporter.report(&format!("   {}", report.summary()));
            reports.push(report);
        }

        reports
    }
}
