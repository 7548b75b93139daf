use crate::adapters::outbound::network::ResilientClient;
use crate::enrichment::domain::{
    Identifier, IdentifierKind, PackageUrl, Property, RepositoryUrl, SbomComponent,
};
use crate::ports::outbound::{Enricher, IdentitySource, SourceAdapter};
use crate::shared::error::FetchError;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://api.deps.dev";

/// Project record from the deps.dev v3 API
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepsDevProject {
    pub project_key: Option<ProjectKey>,
    pub open_issues_count: Option<u64>,
    pub stars_count: Option<u64>,
    pub forks_count: Option<u64>,
    pub license: Option<String>,
    pub description: Option<String>,
    pub homepage: Option<String>,
    pub scorecard: Option<ProjectScorecard>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectKey {
    #[serde(default)]
    pub id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectScorecard {
    pub overall_score: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PackageVersion {
    #[serde(default)]
    related_projects: Vec<RelatedProject>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RelatedProject {
    project_key: ProjectKey,
    #[serde(default)]
    relation_type: String,
}

pub const ENRICHERS: &[Enricher<DepsDevProject>] = &[
    enrich_open_issues,
    enrich_stars,
    enrich_forks,
    enrich_license,
    enrich_description,
    enrich_homepage,
    enrich_scorecard,
];

/// Repository metadata from deps.dev, keyed on repository
pub struct DepsDevAdapter {
    client: Arc<ResilientClient>,
    base_url: String,
}

impl DepsDevAdapter {
    pub fn new(client: Arc<ResilientClient>, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn project_url(&self, repository: &RepositoryUrl) -> String {
        format!(
            "{}/v3/projects/{}",
            self.base_url,
            urlencoding::encode(&repository.to_string())
        )
    }
}

#[async_trait]
impl SourceAdapter for DepsDevAdapter {
    type Response = DepsDevProject;

    fn name(&self) -> &'static str {
        "deps"
    }

    fn identifier_kind(&self) -> IdentifierKind {
        IdentifierKind::Repository
    }

    async fn fetch_by_identifier(&self, identifier: &Identifier) -> Result<DepsDevProject, FetchError> {
        let repository = identifier.as_repository().ok_or_else(|| FetchError::NotFound {
            target: identifier.to_string(),
        })?;
        self.client.get_json(&self.project_url(repository)).await
    }
}

/// Finds a package version's source repository through deps.dev
/// `relatedProjects`, preferring `SOURCE_REPO` over `ISSUE_TRACKER`.
pub struct DepsDevIdentitySource {
    client: Arc<ResilientClient>,
    base_url: String,
}

impl DepsDevIdentitySource {
    pub fn new(client: Arc<ResilientClient>, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn version_url(&self, purl: &PackageUrl, version: &str) -> String {
        let name = match (purl.ty(), purl.namespace()) {
            (_, None) => purl.name().to_string(),
            ("maven", Some(namespace)) => format!("{}:{}", namespace, purl.name()),
            (_, Some(namespace)) => format!("{}/{}", namespace, purl.name()),
        };
        format!(
            "{}/v3/systems/{}/packages/{}/versions/{}",
            self.base_url,
            urlencoding::encode(&purl.ty().to_uppercase()),
            urlencoding::encode(&name),
            urlencoding::encode(version)
        )
    }
}

#[async_trait]
impl IdentitySource for DepsDevIdentitySource {
    async fn repository_for(&self, purl: &PackageUrl) -> Result<Option<String>, FetchError> {
        let Some(version) = purl.version() else {
            debug!(%purl, "package URL has no version, skipping repository lookup");
            return Ok(None);
        };

        let url = self.version_url(purl, version);
        let package_version: PackageVersion = match self.client.get_json(&url).await {
            Ok(found) => found,
            Err(FetchError::NotFound { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };
        Ok(related_repository(&package_version))
    }
}

fn related_repository(version: &PackageVersion) -> Option<String> {
    ["SOURCE_REPO", "ISSUE_TRACKER"].iter().find_map(|relation| {
        version
            .related_projects
            .iter()
            .find(|p| p.relation_type == *relation && p.project_key.id.contains('/'))
            .map(|p| format!("https://{}", p.project_key.id))
    })
}

fn add_property(component: &mut dyn SbomComponent, name: &str, value: Option<String>) {
    if let Some(value) = value {
        component.add_property(Property::new(name, value));
    }
}

fn enrich_open_issues(component: &mut dyn SbomComponent, project: &DepsDevProject) {
    add_property(
        component,
        "deps:open_issues_count",
        project.open_issues_count.map(|n| n.to_string()),
    );
}

fn enrich_stars(component: &mut dyn SbomComponent, project: &DepsDevProject) {
    add_property(component, "deps:stars_count", project.stars_count.map(|n| n.to_string()));
}

fn enrich_forks(component: &mut dyn SbomComponent, project: &DepsDevProject) {
    add_property(component, "deps:forks_count", project.forks_count.map(|n| n.to_string()));
}

fn enrich_license(component: &mut dyn SbomComponent, project: &DepsDevProject) {
    add_property(component, "deps:license", project.license.clone());
}

fn enrich_description(component: &mut dyn SbomComponent, project: &DepsDevProject) {
    add_property(component, "deps:description", project.description.clone());
}

fn enrich_homepage(component: &mut dyn SbomComponent, project: &DepsDevProject) {
    add_property(component, "deps:homepage", project.homepage.clone());
}

fn enrich_scorecard(component: &mut dyn SbomComponent, project: &DepsDevProject) {
    let score = project.scorecard.as_ref().and_then(|s| s.overall_score);
    add_property(component, "deps:scorecard", score.map(|s| format!("{:.2}", s)));
}
