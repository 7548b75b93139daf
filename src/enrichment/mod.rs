//! Enrichment domain: identifiers, the document capability model, component
//! discovery, identity resolution and the lookup cache.

pub mod domain;
pub mod services;

#[cfg(test)]
pub(crate) mod testing;
