use crate::adapters::outbound::network::ResilientClient;
use crate::enrichment::domain::{
    Advisory, ExternalReference, ExternalReferenceKind, Identifier, IdentifierKind, PackageUrl,
    Property, Rating, SbomComponent, Severity, Vulnerability, VulnerabilityReference,
};
use crate::ports::outbound::{Enricher, SourceAdapter};
use crate::shared::error::FetchError;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://api.snyk.io";

/// REST API version for the issues endpoint
const API_VERSION: &str = "2023-04-28";
const SELF_API_VERSION: &str = "2023-04-28~experimental";
const VULNERABILITY_DB: &str = "https://security.snyk.io";
const VULNERABILITY_PAGE: &str = "https://security.snyk.io/vuln";
const PACKAGE_PAGE: &str = "https://security.snyk.io/package";
const ADVISOR_PAGE: &str = "https://snyk.io/advisor";

/// purl type to Snyk Advisor ecosystem
const ADVISOR_ECOSYSTEMS: &[(&str, &str)] = &[
    ("npm", "npm-package"),
    ("pypi", "python"),
    ("golang", "golang"),
    ("docker", "docker"),
];

/// purl type to vulnerability database ecosystem
const DATABASE_ECOSYSTEMS: &[(&str, &str)] = &[
    ("cargo", "cargo"),
    ("cocoapods", "cocoapods"),
    ("composer", "composer"),
    ("golang", "golang"),
    ("hex", "hex"),
    ("maven", "maven"),
    ("npm", "npm"),
    ("nuget", "nuget"),
    ("pypi", "pip"),
    ("pub", "pub"),
    ("gem", "rubygems"),
    ("swift", "swift"),
];

/// Issues Snyk knows for one package version
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SnykIssues {
    #[serde(default)]
    pub data: Vec<SnykIssue>,
    /// Public pages for the package, derived from its purl
    #[serde(skip)]
    pub pages: PackagePages,
}

#[derive(Debug, Clone, Default)]
pub struct PackagePages {
    pub advisor: Option<String>,
    pub vulnerability_db: Option<String>,
}

impl PackagePages {
    pub fn for_package(purl: &PackageUrl) -> Self {
        Self {
            advisor: advisor_url(purl),
            vulnerability_db: vulnerability_db_url(purl),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SnykIssue {
    pub id: String,
    #[serde(default)]
    pub attributes: IssueAttributes,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IssueAttributes {
    pub title: Option<String>,
    pub description: Option<String>,
    pub effective_severity_level: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub problems: Vec<Problem>,
    #[serde(default)]
    pub severities: Vec<IssueSeverity>,
    #[serde(default)]
    pub slots: Slots,
}

/// A CWE, CVE or advisory identifier the issue maps to
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Problem {
    pub id: String,
    pub source: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IssueSeverity {
    pub source: Option<String>,
    pub level: Option<String>,
    pub score: Option<f64>,
    pub vector: Option<String>,
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Slots {
    #[serde(default)]
    pub references: Vec<SlotReference>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SlotReference {
    pub title: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SelfResponse {
    data: SelfData,
}

#[derive(Debug, Deserialize)]
struct SelfData {
    attributes: SelfAttributes,
}

#[derive(Debug, Deserialize)]
struct SelfAttributes {
    default_org_context: Option<String>,
}

pub const ENRICHERS: &[Enricher<SnykIssues>] = &[
    enrich_advisor_page,
    enrich_vulnerability_db_page,
    enrich_advisories,
    enrich_vulnerability_count,
];

/// Vulnerability data from the Snyk REST API, keyed on package URL
///
/// The client must carry the account's token. The organization is taken
/// from configuration when given, otherwise discovered once from the
/// account's default organization.
pub struct SnykAdapter {
    client: Arc<ResilientClient>,
    base_url: String,
    org_id: OnceCell<String>,
}

impl SnykAdapter {
    pub fn new(client: Arc<ResilientClient>, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            org_id: OnceCell::new(),
        }
    }

    pub fn with_org_id(self, org_id: Option<String>) -> Self {
        match org_id {
            Some(id) => Self {
                org_id: OnceCell::new_with(Some(id)),
                ..self
            },
            None => self,
        }
    }

    async fn org_id(&self) -> Result<&str, FetchError> {
        let id = self
            .org_id
            .get_or_try_init(|| async {
                let url = format!("{}/rest/self?version={}", self.base_url, SELF_API_VERSION);
                let me: SelfResponse = self.client.get_json(&url).await?;
                let id = me
                    .data
                    .attributes
                    .default_org_context
                    .ok_or_else(|| FetchError::Decode {
                        target: url,
                        details: "account has no default organization".to_string(),
                    })?;
                debug!(org_id = %id, "using default Snyk organization");
                Ok::<String, FetchError>(id)
            })
            .await?;
        Ok(id.as_str())
    }
}

#[async_trait]
impl SourceAdapter for SnykAdapter {
    type Response = SnykIssues;

    fn name(&self) -> &'static str {
        "snyk"
    }

    fn identifier_kind(&self) -> IdentifierKind {
        IdentifierKind::Package
    }

    async fn fetch_by_identifier(&self, identifier: &Identifier) -> Result<SnykIssues, FetchError> {
        let purl = identifier.as_package().ok_or_else(|| FetchError::NotFound {
            target: identifier.to_string(),
        })?;
        let org_id = self.org_id().await?;
        let url = format!(
            "{}/rest/orgs/{}/packages/{}/issues?version={}",
            self.base_url,
            urlencoding::encode(org_id),
            urlencoding::encode(&purl.to_string()),
            API_VERSION
        );
        let mut issues: SnykIssues = self.client.get_json(&url).await?;
        issues.pages = PackagePages::for_package(purl);
        Ok(issues)
    }

    fn vulnerabilities(&self, issues: &SnykIssues) -> Vec<Vulnerability> {
        issues.data.iter().map(issue_to_vulnerability).collect()
    }
}

fn advisor_url(purl: &PackageUrl) -> Option<String> {
    let (_, ecosystem) = ADVISOR_ECOSYSTEMS.iter().find(|(ty, _)| *ty == purl.ty())?;
    let path = match purl.namespace() {
        Some(namespace) => format!("{}/{}", namespace, purl.name()),
        None => purl.name().to_string(),
    };
    Some(format!("{}/{}/{}", ADVISOR_PAGE, ecosystem, path))
}

fn vulnerability_db_url(purl: &PackageUrl) -> Option<String> {
    let (_, ecosystem) = DATABASE_ECOSYSTEMS.iter().find(|(ty, _)| *ty == purl.ty())?;
    let path = match (purl.namespace(), purl.ty()) {
        (Some(group), "maven") => format!("{}%3A{}", group, purl.name()),
        (Some(namespace), _) => format!("{}/{}", namespace, purl.name()),
        (None, _) => purl.name().to_string(),
    };
    Some(format!("{}/{}/{}", PACKAGE_PAGE, ecosystem, path))
}

fn issue_to_vulnerability(issue: &SnykIssue) -> Vulnerability {
    let attributes = &issue.attributes;
    let mut vulnerability = Vulnerability::new(issue.id.as_str());
    vulnerability.description = attributes.title.clone();
    vulnerability.detail = attributes.description.clone();
    vulnerability.created = attributes.created_at.map(rfc3339);
    vulnerability.updated = attributes.updated_at.map(rfc3339);

    for problem in &attributes.problems {
        match problem.source.as_str() {
            "CWE" => {
                if let Some(cwe) = problem.id.strip_prefix("CWE-").and_then(|n| n.parse().ok()) {
                    vulnerability.cwes.push(cwe);
                }
            }
            "CVE" | "GHSA" | "RHSA" => vulnerability.references.push(VulnerabilityReference {
                id: problem.id.clone(),
                source: problem.source.clone(),
            }),
            _ => {}
        }
    }

    vulnerability.advisories = attributes
        .slots
        .references
        .iter()
        .filter_map(|r| {
            Some(Advisory {
                title: r.title.clone(),
                url: r.url.clone()?,
            })
        })
        .collect();

    vulnerability.ratings = attributes
        .severities
        .iter()
        .map(|severity| {
            let source = severity.source.clone().unwrap_or_else(|| "Snyk".to_string());
            let source_url = (source == "Snyk").then(|| VULNERABILITY_DB.to_string());
            Rating {
                source,
                source_url,
                score: severity.score,
                severity: severity
                    .level
                    .as_deref()
                    .map(Severity::parse)
                    .unwrap_or(Severity::Unknown),
                method: severity.version.as_deref().map(cvss_method),
                vector: severity.vector.clone(),
            }
        })
        .collect();

    vulnerability
}

fn cvss_method(version: &str) -> String {
    match version {
        "4.0" => "CVSSv4",
        "3.1" => "CVSSv31",
        "3.0" | "3" => "CVSSv3",
        "2.0" | "2" => "CVSSv2",
        _ => "other",
    }
    .to_string()
}

fn rfc3339(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn enrich_advisor_page(component: &mut dyn SbomComponent, issues: &SnykIssues) {
    if let Some(url) = &issues.pages.advisor {
        component.add_external_reference(
            ExternalReference::new(ExternalReferenceKind::Other, url.as_str())
                .with_comment("Snyk Advisor"),
        );
    }
}

fn enrich_vulnerability_db_page(component: &mut dyn SbomComponent, issues: &SnykIssues) {
    if let Some(url) = &issues.pages.vulnerability_db {
        component.add_external_reference(
            ExternalReference::new(ExternalReferenceKind::Other, url.as_str())
                .with_comment("Snyk Vulnerability DB"),
        );
    }
}

fn enrich_advisories(component: &mut dyn SbomComponent, issues: &SnykIssues) {
    for issue in &issues.data {
        let mut reference = ExternalReference::new(
            ExternalReferenceKind::Advisories,
            format!("{}/{}", VULNERABILITY_PAGE, issue.id),
        );
        if let Some(title) = &issue.attributes.title {
            reference = reference.with_comment(title.as_str());
        }
        component.add_external_reference(reference);
    }
}

fn enrich_vulnerability_count(component: &mut dyn SbomComponent, issues: &SnykIssues) {
    component.add_property(Property::new(
        "snyk:vulnerability_count",
        issues.data.len().to_string(),
    ));
}
