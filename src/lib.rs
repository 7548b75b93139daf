//! sbom-enricher - Enrich existing SBOMs with remote metadata
//!
//! This library takes a CycloneDX or SPDX 2.x JSON document, finds every
//! component in it, works out which package or repository each one refers to,
//! and fills in descriptions, licenses, references, scores and advisories
//! from public metadata services, following hexagonal architecture.
//!
//! # Architecture
//!
//! The library is organized into the following layers:
//!
//! - **Domain Layer** (`enrichment`): identifiers, discovery, identity resolution and the lookup cache
//! - **Application Layer** (`application`): the orchestrator, use case and stage factory
//! - **Ports** (`ports`): Interface definitions for infrastructure
//! - **Adapters** (`adapters`): codecs, the resilient HTTP client and source adapters
//! - **Shared** (`shared`): Common utilities and error types
//!
//! # Example
//!
//! ```no_run
//! use sbom_enricher::prelude::*;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> Result<()> {
//! let cancel = CancellationToken::new();
//!
//! // Build one stage per source
//! let mut factory = SourceFactory::new(SourceSettings::default(), cancel.clone());
//! let stages = factory.create_stages(&[SourceKind::Ecosystems, SourceKind::Osv])?;
//!
//! // Create use case
//! let use_case = EnrichSbomUseCase::new(
//!     FileSystemReader::new(),
//!     JsonSbomCodec::new(),
//!     StderrProgressReporter::new(),
//!     stages,
//! );
//!
//! // Execute
//! let request = EnrichRequest::new(SbomInput::from_arg("bom.cdx.json"));
//! let response = use_case.execute(request, &cancel).await?;
//!
//! StdoutPresenter::new().present(&response.content)?;
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod application;
pub mod enrichment;
pub mod ports;
pub mod shared;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::adapters::outbound::codecs::JsonSbomCodec;
    pub use crate::adapters::outbound::console::StderrProgressReporter;
    pub use crate::adapters::outbound::filesystem::{
        FileSystemReader, FileSystemWriter, StdoutPresenter,
    };
    pub use crate::application::dto::{EnrichRequest, EnrichResponse};
    pub use crate::application::factories::{SourceFactory, SourceKind, SourceSettings};
    pub use crate::application::orchestrator::{EnrichmentOrchestrator, EnrichmentStage};
    pub use crate::application::use_cases::EnrichSbomUseCase;
    pub use crate::enrichment::domain::{
        EnrichmentReport, Identifier, IdentifierKind, PackageUrl, SbomComponent, SbomDocument,
        SbomFormat,
    };
    pub use crate::ports::outbound::{
        DocumentCodec, OutputPresenter, ProgressReporter, SbomInput, SbomReader, SourceAdapter,
    };
    pub use crate::shared::Result;
}
