use crate::ports::outbound::SbomInput;

/// EnrichRequest - Internal request DTO for the enrichment use case
#[derive(Debug, Clone)]
pub struct EnrichRequest {
    /// Where to read the SBOM from
    pub input: SbomInput,
}

impl EnrichRequest {
    pub fn new(input: SbomInput) -> Self {
        Self { input }
    }
}
