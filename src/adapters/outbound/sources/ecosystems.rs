use crate::adapters::outbound::network::ResilientClient;
use crate::enrichment::domain::{
    ExternalReference, ExternalReferenceKind, Identifier, IdentifierKind, PackageUrl, Property,
    SbomComponent, Supplier,
};
use crate::enrichment::services::LookupCache;
use crate::ports::outbound::{Enricher, SourceAdapter};
use crate::shared::error::FetchError;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://packages.ecosyste.ms/api/v1";

/// Package record from the ecosyste.ms packages API
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EcosystemsPackage {
    pub name: Option<String>,
    pub description: Option<String>,
    pub homepage: Option<String>,
    pub registry_url: Option<String>,
    pub repository_url: Option<String>,
    pub documentation_url: Option<String>,
    #[serde(default)]
    pub normalized_licenses: Vec<String>,
    pub first_release_published_at: Option<DateTime<Utc>>,
    pub latest_release_published_at: Option<DateTime<Utc>>,
    pub repo_metadata: Option<RepoMetadata>,
    /// The requested release, when the purl names a version and the
    /// registry knows it
    #[serde(skip)]
    pub version: Option<EcosystemsVersion>,
}

/// Release record from the package versions endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EcosystemsVersion {
    pub number: Option<String>,
    /// Comma separated license identifiers as published for this release
    pub licenses: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

impl EcosystemsVersion {
    fn licenses(&self) -> Vec<&str> {
        self.licenses
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RepoMetadata {
    pub archived: Option<bool>,
    #[serde(default)]
    pub topics: Vec<String>,
    pub owner_record: Option<OwnerRecord>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OwnerRecord {
    pub name: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
}

impl EcosystemsPackage {
    fn owner(&self) -> Option<&OwnerRecord> {
        self.repo_metadata.as_ref()?.owner_record.as_ref()
    }
}

/// Enrichers applied for this source, in order
pub const ENRICHERS: &[Enricher<EcosystemsPackage>] = &[
    enrich_description,
    enrich_license,
    enrich_homepage,
    enrich_registry_url,
    enrich_repository_url,
    enrich_documentation_url,
    enrich_first_release_published_at,
    enrich_latest_release_published_at,
    enrich_repository_archived,
    enrich_owner_location,
    enrich_topics,
    enrich_author,
    enrich_supplier,
];

/// Package metadata from packages.ecosyste.ms, keyed on package URL
///
/// Each lookup reads the package record and then the release the purl
/// names. Package records are shared by every version of a package, so
/// they are cached here under the package endpoint; the combined record
/// is cached per purl by the orchestrator.
pub struct EcosystemsAdapter {
    client: Arc<ResilientClient>,
    base_url: String,
    packages: LookupCache<EcosystemsPackage, String>,
}

impl EcosystemsAdapter {
    pub fn new(client: Arc<ResilientClient>, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            packages: LookupCache::new(),
        }
    }

    async fn package(&self, url: &str) -> Result<Arc<EcosystemsPackage>, FetchError> {
        if let Some(cached) = self.packages.get(&url.to_string()) {
            return Ok(cached);
        }
        let package: Arc<EcosystemsPackage> = Arc::new(self.client.get_json(url).await?);
        self.packages.set(url.to_string(), Arc::clone(&package));
        Ok(package)
    }

    /// Release data is optional: a failed or missing version lookup keeps
    /// the package record usable.
    async fn version(&self, package_url: &str, purl: &PackageUrl) -> Option<EcosystemsVersion> {
        let version = purl.version()?;
        let url = format!("{}/versions/{}", package_url, urlencoding::encode(version));
        match self.client.get_json(&url).await {
            Ok(version) => Some(version),
            Err(error) => {
                debug!(purl = %purl, %error, "no release record");
                None
            }
        }
    }

    fn package_url(&self, purl: &PackageUrl) -> Option<String> {
        let registry = registry_for(purl.ty())?;
        Some(format!(
            "{}/registries/{}/packages/{}",
            self.base_url,
            registry,
            urlencoding::encode(&package_name(purl))
        ))
    }
}

#[async_trait]
impl SourceAdapter for EcosystemsAdapter {
    type Response = EcosystemsPackage;

    fn name(&self) -> &'static str {
        "ecosystems"
    }

    fn identifier_kind(&self) -> IdentifierKind {
        IdentifierKind::Package
    }

    async fn fetch_by_identifier(
        &self,
        identifier: &Identifier,
    ) -> Result<EcosystemsPackage, FetchError> {
        let not_found = || FetchError::NotFound {
            target: identifier.to_string(),
        };
        let purl = identifier.as_package().ok_or_else(not_found)?;
        // Types with no ecosyste.ms registry are treated as having no record.
        let url = self.package_url(purl).ok_or_else(not_found)?;
        let package = self.package(&url).await?;
        let mut record = EcosystemsPackage::clone(&package);
        record.version = self.version(&url, purl).await;
        Ok(record)
    }
}

/// ecosyste.ms registry name for a purl type.
pub fn registry_for(ty: &str) -> Option<&'static str> {
    let registry = match ty {
        "apk" => "alpine-edge",
        "cargo" => "crates.io",
        "cocoapods" => "cocoapod.org",
        "composer" => "packagist.org",
        "docker" => "hub.docker.com",
        "gem" => "rubygems.org",
        "golang" => "proxy.golang.org",
        "hex" => "hex.pm",
        "maven" => "repo1.maven.org",
        "npm" => "npmjs.org",
        "nuget" => "nuget.org",
        "pypi" => "pypi.org",
        "swift" => "swiftpackageindex.com",
        _ => return None,
    };
    Some(registry)
}

/// Package name as ecosyste.ms spells it: `namespace/name` for most
/// registries, `group:artifact` for Maven, bare name for Alpine.
pub fn package_name(purl: &PackageUrl) -> String {
    match (purl.ty(), purl.namespace()) {
        (_, None) | ("apk", _) => purl.name().to_string(),
        ("maven", Some(namespace)) => format!("{}:{}", namespace, purl.name()),
        (_, Some(namespace)) => format!("{}/{}", namespace, purl.name()),
    }
}

fn add_reference(component: &mut dyn SbomComponent, url: Option<&str>, kind: ExternalReferenceKind) {
    if let Some(url) = url {
        if reqwest::Url::parse(url).is_ok() {
            component.add_external_reference(ExternalReference::new(kind, url));
        }
    }
}

fn add_timestamp(component: &mut dyn SbomComponent, name: &str, at: Option<&DateTime<Utc>>) {
    if let Some(at) = at {
        component.add_property(Property::new(
            name,
            at.to_rfc3339_opts(SecondsFormat::Secs, true),
        ));
    }
}

fn enrich_description(component: &mut dyn SbomComponent, package: &EcosystemsPackage) {
    if let Some(description) = &package.description {
        component.set_description(description);
    }
}

/// Prefers the licenses published for the release over the package-wide
/// normalized licenses.
fn enrich_license(component: &mut dyn SbomComponent, package: &EcosystemsPackage) {
    let release = package
        .version
        .as_ref()
        .map(EcosystemsVersion::licenses)
        .unwrap_or_default();
    let licenses: Vec<&str> = if release.is_empty() {
        package.normalized_licenses.iter().map(String::as_str).collect()
    } else {
        release
    };
    match licenses.as_slice() {
        [] => {}
        [single] => component.set_license(single),
        many => component.set_license(&format!("({})", many.join(" OR "))),
    }
}

fn enrich_homepage(component: &mut dyn SbomComponent, package: &EcosystemsPackage) {
    add_reference(component, package.homepage.as_deref(), ExternalReferenceKind::Website);
}

fn enrich_registry_url(component: &mut dyn SbomComponent, package: &EcosystemsPackage) {
    add_reference(
        component,
        package.registry_url.as_deref(),
        ExternalReferenceKind::Distribution,
    );
}

fn enrich_repository_url(component: &mut dyn SbomComponent, package: &EcosystemsPackage) {
    add_reference(component, package.repository_url.as_deref(), ExternalReferenceKind::Vcs);
}

fn enrich_documentation_url(component: &mut dyn SbomComponent, package: &EcosystemsPackage) {
    add_reference(
        component,
        package.documentation_url.as_deref(),
        ExternalReferenceKind::Documentation,
    );
}

fn enrich_first_release_published_at(component: &mut dyn SbomComponent, package: &EcosystemsPackage) {
    add_timestamp(
        component,
        "ecosystems:first_release_published_at",
        package.first_release_published_at.as_ref(),
    );
}

fn enrich_latest_release_published_at(component: &mut dyn SbomComponent, package: &EcosystemsPackage) {
    add_timestamp(
        component,
        "ecosystems:latest_release_published_at",
        package.latest_release_published_at.as_ref(),
    );
}

fn enrich_repository_archived(component: &mut dyn SbomComponent, package: &EcosystemsPackage) {
    let archived = package
        .repo_metadata
        .as_ref()
        .and_then(|meta| meta.archived)
        .unwrap_or(false);
    if archived {
        component.add_property(Property::new("ecosystems:repository_archived", "true"));
    }
}

fn enrich_owner_location(component: &mut dyn SbomComponent, package: &EcosystemsPackage) {
    if let Some(location) = package.owner().and_then(|o| o.location.as_deref()) {
        component.add_property(Property::new("ecosystems:owner_location", location));
    }
}

fn enrich_topics(component: &mut dyn SbomComponent, package: &EcosystemsPackage) {
    if let Some(meta) = &package.repo_metadata {
        for topic in &meta.topics {
            component.add_property(Property::new("ecosystems:topic", topic.as_str()));
        }
    }
}

fn enrich_author(component: &mut dyn SbomComponent, package: &EcosystemsPackage) {
    if let Some(name) = package.owner().and_then(|o| o.name.as_deref()) {
        component.set_author(name);
    }
}

fn enrich_supplier(component: &mut dyn SbomComponent, package: &EcosystemsPackage) {
    let Some(owner) = package.owner() else {
        return;
    };
    let Some(name) = &owner.name else {
        return;
    };
    let urls = owner
        .website
        .as_deref()
        .map(|w| w.split(", ").map(|u| u.trim().to_string()).collect())
        .unwrap_or_default();
    component.set_supplier(Supplier {
        name: Some(name.clone()),
        urls,
    });
}
