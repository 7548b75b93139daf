pub mod component;
pub mod document;
pub mod identifier;
pub mod report;
pub mod vulnerability;

pub use component::{ComponentPath, ExternalReference, ExternalReferenceKind, Property, Supplier};
pub use document::{SbomComponent, SbomDocument, SbomFormat};
pub use identifier::{Identifier, IdentifierKind, PackageUrl, RepositoryUrl};
pub use report::{EnrichmentReport, LookupFailure, RunPhase, UnresolvedComponent};
pub use vulnerability::{Advisory, Rating, Severity, Vulnerability, VulnerabilityReference};
