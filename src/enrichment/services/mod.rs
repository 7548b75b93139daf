mod discovery;
mod identity;
mod lookup_cache;

pub use discovery::ComponentDiscovery;
pub use identity::{resolve_locally, IdentityHints, LocalResolution};
pub use lookup_cache::LookupCache;
