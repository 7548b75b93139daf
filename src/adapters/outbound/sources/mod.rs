/// Source adapters: one per remote metadata service
///
/// Each module holds the service's response schema, the adapter that
/// fetches it and the ordered enrichers that map it onto a component.
pub mod deps_dev;
pub mod ecosystems;
pub mod osv;
pub mod scorecard;
pub mod snyk;

pub use deps_dev::{DepsDevAdapter, DepsDevIdentitySource};
pub use ecosystems::EcosystemsAdapter;
pub use osv::OsvAdapter;
pub use scorecard::ScorecardAdapter;
pub use snyk::SnykAdapter;
