use crate::enrichment::domain::{
    ComponentPath, ExternalReferenceKind, Identifier, IdentifierKind, PackageUrl, RepositoryUrl,
    SbomComponent, SbomDocument,
};
use crate::shared::error::ResolveError;

/// What identity resolution needs from a component, copied out of the
/// document so resolution can run without borrowing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityHints {
    pub path: ComponentPath,
    pub name: String,
    pub purl: Option<String>,
    pub vcs_urls: Vec<String>,
}

impl IdentityHints {
    pub fn from_component(path: ComponentPath, component: &dyn SbomComponent) -> Self {
        let vcs_urls = component
            .external_references()
            .into_iter()
            .filter(|r| r.kind == ExternalReferenceKind::Vcs)
            .map(|r| r.url)
            .collect();

        Self {
            path,
            name: component.name().to_string(),
            purl: component.purl().map(str::to_string),
            vcs_urls,
        }
    }

    pub fn collect(document: &dyn SbomDocument, paths: &[ComponentPath]) -> Vec<Self> {
        paths
            .iter()
            .filter_map(|path| {
                document
                    .component(path)
                    .map(|c| Self::from_component(path.clone(), c))
            })
            .collect()
    }
}

/// Result of the resolution steps that need no network access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalResolution {
    Resolved(Identifier),
    /// A repository is wanted but only a package URL is known.
    NeedsLookup(PackageUrl),
    Unresolved(ResolveError),
}

/// Derives an identifier of `kind` from a component's hints.
///
/// Package kind parses the package URL. Repository kind tries, in order,
/// a VCS external reference, then a forge package URL (`pkg:github/...`),
/// and otherwise asks for a lookup by package URL.
pub fn resolve_locally(hints: &IdentityHints, kind: IdentifierKind) -> LocalResolution {
    let purl = hints.purl.as_deref().map(PackageUrl::parse);

    match kind {
        IdentifierKind::Package => match purl {
            Some(Ok(purl)) => LocalResolution::Resolved(Identifier::Package(purl)),
            Some(Err(e)) => LocalResolution::Unresolved(e),
            None => LocalResolution::Unresolved(ResolveError::NoIdentifier),
        },
        IdentifierKind::Repository => {
            let mut vcs_error = None;
            for url in &hints.vcs_urls {
                match RepositoryUrl::normalize(url) {
                    Ok(repo) => return LocalResolution::Resolved(Identifier::Repository(repo)),
                    Err(e) => vcs_error = vcs_error.or(Some(e)),
                }
            }

            match purl {
                Some(Ok(purl)) => match purl.forge_repository() {
                    Some(repo) => LocalResolution::Resolved(Identifier::Repository(repo)),
                    None => LocalResolution::NeedsLookup(purl),
                },
                Some(Err(e)) => LocalResolution::Unresolved(vcs_error.unwrap_or(e)),
                None => LocalResolution::Unresolved(vcs_error.unwrap_or(ResolveError::NoIdentifier)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hints(purl: Option<&str>, vcs: &[&str]) -> IdentityHints {
        IdentityHints {
            path: ComponentPath::root(0),
            name: "component".to_string(),
            purl: purl.map(str::to_string),
            vcs_urls: vcs.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_package_kind_parses_purl() {
        let result = resolve_locally(&hints(Some("pkg:npm/lodash@4.17.21"), &[]), IdentifierKind::Package);
        match result {
            LocalResolution::Resolved(Identifier::Package(purl)) => assert_eq!(purl.name(), "lodash"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_package_kind_without_purl_is_unresolved() {
        assert_eq!(
            resolve_locally(&hints(None, &["https://github.com/a/b"]), IdentifierKind::Package),
            LocalResolution::Unresolved(ResolveError::NoIdentifier)
        );
    }

    #[test]
    fn test_package_kind_with_malformed_purl() {
        let result = resolve_locally(&hints(Some("lodash"), &[]), IdentifierKind::Package);
        assert!(matches!(
            result,
            LocalResolution::Unresolved(ResolveError::MalformedIdentifier { .. })
        ));
    }

    #[test]
    fn test_repository_kind_prefers_vcs_reference() {
        let result = resolve_locally(
            &hints(Some("pkg:npm/lodash@4.17.21"), &["git@github.com:lodash/lodash.git"]),
            IdentifierKind::Repository,
        );
        assert_eq!(
            result,
            LocalResolution::Resolved(Identifier::Repository(
                RepositoryUrl::normalize("github.com/lodash/lodash").unwrap()
            ))
        );
    }

    #[test]
    fn test_repository_kind_skips_malformed_vcs_reference() {
        let result = resolve_locally(
            &hints(None, &["not a url at all", "https://gitlab.com/group/project"]),
            IdentifierKind::Repository,
        );
        assert!(matches!(result, LocalResolution::Resolved(_)));
    }

    #[test]
    fn test_repository_kind_uses_forge_purl() {
        let result = resolve_locally(&hints(Some("pkg:github/snyk/parlay@v1"), &[]), IdentifierKind::Repository);
        match result {
            LocalResolution::Resolved(Identifier::Repository(repo)) => {
                assert_eq!(repo.to_string(), "github.com/snyk/parlay")
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_repository_kind_needs_lookup_for_registry_purl() {
        let result = resolve_locally(&hints(Some("pkg:cargo/serde@1.0.0"), &[]), IdentifierKind::Repository);
        assert!(matches!(result, LocalResolution::NeedsLookup(_)));
    }

    #[test]
    fn test_hints_keep_only_vcs_references() {
        use crate::enrichment::domain::ExternalReference;
        use crate::enrichment::testing::{FakeComponent, FakeDocument};

        let document = FakeDocument::new(vec![FakeComponent::new("lodash")
            .with_purl("pkg:npm/lodash@4.17.21")
            .with_reference(ExternalReference::new(
                ExternalReferenceKind::Website,
                "https://lodash.com",
            ))
            .with_reference(ExternalReference::new(
                ExternalReferenceKind::Vcs,
                "https://github.com/lodash/lodash",
            ))]);

        let hints = IdentityHints::collect(&document, &[ComponentPath::root(0)]);

        assert_eq!(hints.len(), 1);
        assert_eq!(hints[0].name, "lodash");
        assert_eq!(hints[0].purl.as_deref(), Some("pkg:npm/lodash@4.17.21"));
        assert_eq!(hints[0].vcs_urls, vec!["https://github.com/lodash/lodash"]);
    }
}
