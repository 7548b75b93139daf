use crate::enrichment::domain::PackageUrl;
use crate::shared::error::FetchError;
use async_trait::async_trait;

/// IdentitySource port mapping a package version to its source repository
///
/// Used when a source is keyed on repositories but a component only
/// declares a package URL.
#[async_trait]
pub trait IdentitySource: Send + Sync {
    /// Returns the raw repository URL for `purl`, or `None` when the service
    /// knows the package but links no repository.
    async fn repository_for(&self, purl: &PackageUrl) -> Result<Option<String>, FetchError>;
}
