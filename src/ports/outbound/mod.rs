/// Outbound ports (Driven ports) - Infrastructure interfaces
///
/// These ports define the interfaces that the application core uses
/// to interact with external systems (file system, network, console, etc.).
pub mod credential_provider;
pub mod document_codec;
pub mod identity_source;
pub mod output_presenter;
pub mod progress_reporter;
pub mod sbom_reader;
pub mod source_adapter;

pub use credential_provider::CredentialProvider;
pub use document_codec::DocumentCodec;
pub use identity_source::IdentitySource;
pub use output_presenter::OutputPresenter;
pub use progress_reporter::ProgressReporter;
pub use sbom_reader::{SbomInput, SbomReader};
pub use source_adapter::{Enricher, SourceAdapter};
