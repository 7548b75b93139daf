use super::component::{ComponentPath, ExternalReference, Property, Supplier};
use super::vulnerability::Vulnerability;
use crate::shared::error::EnrichError;
use std::fmt;

/// The SBOM encodings understood by the codecs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SbomFormat {
    CycloneDx,
    Spdx,
}

impl fmt::Display for SbomFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SbomFormat::CycloneDx => write!(f, "CycloneDX"),
            SbomFormat::Spdx => write!(f, "SPDX"),
        }
    }
}

/// A decoded SBOM, seen only through the capabilities enrichment needs.
///
/// Components are addressed by [`ComponentPath`]; `root_count` and
/// `child_count` describe the tree so discovery never has to know the
/// format.
pub trait SbomDocument: Send + Sync {
    fn format(&self) -> SbomFormat;

    fn root_count(&self) -> usize;

    /// Number of direct children of the component at `path` (0 when the
    /// path does not exist or the format is flat).
    fn child_count(&self, path: &ComponentPath) -> usize;

    fn component(&self, path: &ComponentPath) -> Option<&dyn SbomComponent>;

    fn component_mut(&mut self, path: &ComponentPath) -> Option<&mut dyn SbomComponent>;

    /// Records the enriching tool in the document's creation metadata.
    /// Recording the same tool twice is a no-op.
    fn record_tool(&mut self, name: &str, version: &str);

    /// Records a finding at document level. Returns `false` when the format
    /// has no place for it or the same finding is already recorded.
    fn add_vulnerability(&mut self, _vulnerability: Vulnerability) -> bool {
        false
    }

    /// Re-serializes the document in its original format.
    fn encode(&self) -> Result<String, EnrichError>;
}

/// One component inside a document. Setters write straight into the
/// underlying model, so changes show up in [`SbomDocument::encode`].
pub trait SbomComponent: Send + Sync {
    fn name(&self) -> &str;

    /// Raw package URL, if the component declares one.
    fn purl(&self) -> Option<&str>;

    /// The document-local reference other parts of the document use to
    /// point at this component.
    fn bom_ref(&self) -> Option<&str>;

    fn description(&self) -> Option<&str>;

    fn set_description(&mut self, description: &str);

    /// Sets the license as an SPDX expression.
    fn set_license(&mut self, expression: &str);

    fn external_references(&self) -> Vec<ExternalReference>;

    fn add_external_reference(&mut self, reference: ExternalReference);

    fn properties(&self) -> Vec<Property>;

    fn add_property(&mut self, property: Property);

    fn set_supplier(&mut self, supplier: Supplier);

    fn set_author(&mut self, author: &str);
}
