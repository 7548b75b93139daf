/// Document codecs for the JSON encodings of CycloneDX and SPDX 2.x
mod cyclonedx;
mod spdx;

pub use cyclonedx::{CycloneDxBom, CycloneDxDocument};
pub use spdx::{SpdxDocument, SpdxDocumentModel};

use crate::enrichment::domain::SbomDocument;
use crate::ports::outbound::DocumentCodec;
use crate::shared::error::EnrichError;
use serde_json::Value;

/// Decodes whichever supported JSON SBOM format the bytes contain.
///
/// CycloneDX is recognised by `"bomFormat": "CycloneDX"`, SPDX by an
/// `spdxVersion` of `SPDX-2.*`. XML encodings are rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSbomCodec;

impl JsonSbomCodec {
    pub fn new() -> Self {
        Self
    }
}

impl DocumentCodec for JsonSbomCodec {
    fn decode(&self, bytes: &[u8]) -> Result<Box<dyn SbomDocument>, EnrichError> {
        let value: Value = serde_json::from_slice(bytes).map_err(|e| EnrichError::DecodeFailure {
            details: format!("input is not a JSON SBOM: {}", e),
        })?;

        if value.get("bomFormat").and_then(Value::as_str) == Some("CycloneDX") {
            return Ok(Box::new(CycloneDxDocument::decode(value)?));
        }

        let spdx_version = value.get("spdxVersion").and_then(Value::as_str);
        if spdx_version.is_some_and(|v| v.starts_with("SPDX-2.")) {
            return Ok(Box::new(SpdxDocument::decode(value)?));
        }

        Err(EnrichError::DecodeFailure {
            details: match spdx_version {
                Some(version) => format!("unsupported SPDX version '{}'", version),
                None => "could not identify SBOM format".to_string(),
            },
        })
    }
}
