use crate::enrichment::domain::{Identifier, IdentifierKind, PackageUrl, RepositoryUrl};
use crate::enrichment::services::{resolve_locally, IdentityHints, LocalResolution, LookupCache};
use crate::ports::outbound::IdentitySource;
use crate::shared::error::{FetchError, ResolveError};
use futures::stream::{self, StreamExt};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::orchestrator::DEFAULT_CONCURRENCY;

/// Turns component hints into identifiers, asking an [`IdentitySource`]
/// for the repository of packages that do not declare one.
///
/// Remote lookups are deduplicated per package URL and cached; the cache
/// can be shared by several stages that key on repositories.
pub struct IdentityResolver {
    source: Option<Arc<dyn IdentitySource>>,
    cache: Arc<LookupCache<RepositoryUrl, PackageUrl>>,
    concurrency: usize,
}

impl IdentityResolver {
    /// A resolver that only uses what the document itself declares.
    pub fn local() -> Self {
        Self {
            source: None,
            cache: Arc::new(LookupCache::new()),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_source(source: Arc<dyn IdentitySource>) -> Self {
        Self {
            source: Some(source),
            ..Self::local()
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn cached_repositories(&self) -> usize {
        self.cache.len()
    }

    /// Resolves every hint, preserving order.
    pub async fn resolve_all(
        &self,
        hints: Vec<IdentityHints>,
        kind: IdentifierKind,
        cancel: &CancellationToken,
    ) -> Vec<(IdentityHints, Result<Identifier, ResolveError>)> {
        let local: Vec<(IdentityHints, LocalResolution)> = hints
            .into_iter()
            .map(|h| {
                let resolution = resolve_locally(&h, kind);
                (h, resolution)
            })
            .collect();

        let mut seen = HashSet::new();
        let pending: Vec<PackageUrl> = local
            .iter()
            .filter_map(|(_, r)| match r {
                LocalResolution::NeedsLookup(purl) if seen.insert(purl.clone()) => {
                    Some(purl.clone())
                }
                _ => None,
            })
            .collect();

        let remote = self.lookup_repositories(pending, cancel).await;

        local
            .into_iter()
            .map(|(hints, resolution)| {
                let result = match resolution {
                    LocalResolution::Resolved(identifier) => Ok(identifier),
                    LocalResolution::Unresolved(reason) => Err(reason),
                    LocalResolution::NeedsLookup(purl) => remote
                        .get(&purl)
                        .cloned()
                        .unwrap_or_else(|| {
                            Err(ResolveError::NoRepository {
                                purl: purl.to_string(),
                            })
                        })
                        .map(Identifier::Repository),
                };
                (hints, result)
            })
            .collect()
    }

    async fn lookup_repositories(
        &self,
        purls: Vec<PackageUrl>,
        cancel: &CancellationToken,
    ) -> HashMap<PackageUrl, Result<RepositoryUrl, ResolveError>> {
        let Some(source) = self.source.as_ref() else {
            return HashMap::new();
        };
        if purls.is_empty() {
            return HashMap::new();
        }
        debug!(count = purls.len(), "looking up source repositories");

        stream::iter(purls)
            .map(|purl| async move {
                let result = self.lookup_one(source.as_ref(), &purl, cancel).await;
                (purl, result)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await
    }

    async fn lookup_one(
        &self,
        source: &dyn IdentitySource,
        purl: &PackageUrl,
        cancel: &CancellationToken,
    ) -> Result<RepositoryUrl, ResolveError> {
        if let Some(cached) = self.cache.get(purl) {
            return Ok((*cached).clone());
        }
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled {
                target: purl.to_string(),
            }
            .into());
        }

        let raw = source
            .repository_for(purl)
            .await?
            .ok_or_else(|| ResolveError::NoRepository {
                purl: purl.to_string(),
            })?;
        let repository = RepositoryUrl::normalize(&raw)?;
        self.cache.set(purl.clone(), Arc::new(repository.clone()));
        Ok(repository)
    }
}
