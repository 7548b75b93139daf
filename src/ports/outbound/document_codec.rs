use crate::enrichment::domain::SbomDocument;
use crate::shared::error::EnrichError;

/// DocumentCodec port turning raw bytes into an enrichable document
///
/// Encoding is the document's own responsibility
/// ([`SbomDocument::encode`]) so it always round-trips in its original
/// format.
pub trait DocumentCodec: Send + Sync {
    /// # Errors
    /// Returns [`EnrichError::DecodeFailure`] when the bytes are not a
    /// supported SBOM; this aborts the whole run.
    fn decode(&self, bytes: &[u8]) -> Result<Box<dyn SbomDocument>, EnrichError>;
}
