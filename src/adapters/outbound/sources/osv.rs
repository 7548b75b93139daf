use crate::adapters::outbound::network::ResilientClient;
use crate::enrichment::domain::{
    ExternalReference, ExternalReferenceKind, Identifier, IdentifierKind, Property, SbomComponent,
};
use crate::ports::outbound::{Enricher, SourceAdapter};
use crate::shared::error::FetchError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

pub const DEFAULT_BASE_URL: &str = "https://api.osv.dev";

const VULNERABILITY_PAGE: &str = "https://osv.dev/vulnerability";

#[derive(Debug, Serialize)]
struct OsvQuery<'a> {
    package: OsvPackage<'a>,
}

#[derive(Debug, Serialize)]
struct OsvPackage<'a> {
    purl: &'a str,
}

/// Result of an OSV query for one package version
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OsvResult {
    #[serde(default)]
    pub vulns: Vec<OsvVulnerability>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OsvVulnerability {
    pub id: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub database_specific: Option<DatabaseSpecific>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseSpecific {
    /// "CRITICAL", "HIGH", "MODERATE", "MEDIUM" or "LOW"
    #[serde(default)]
    pub severity: Option<String>,
}

/// Severity levels OSV databases report, lowest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().as_str() {
            "CRITICAL" => Some(Severity::Critical),
            "HIGH" => Some(Severity::High),
            "MODERATE" | "MEDIUM" => Some(Severity::Medium),
            "LOW" => Some(Severity::Low),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        };
        write!(f, "{}", label)
    }
}

impl OsvResult {
    /// Highest severity any vulnerability declares.
    pub fn max_severity(&self) -> Option<Severity> {
        self.vulns
            .iter()
            .filter_map(|v| v.database_specific.as_ref()?.severity.as_deref())
            .filter_map(Severity::parse)
            .max()
    }
}

pub const ENRICHERS: &[Enricher<OsvResult>] = &[
    enrich_advisories,
    enrich_vulnerability_ids,
    enrich_max_severity,
];

/// Known vulnerabilities from OSV.dev, keyed on package URL
pub struct OsvAdapter {
    client: Arc<ResilientClient>,
    base_url: String,
}

impl OsvAdapter {
    pub fn new(client: Arc<ResilientClient>, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl SourceAdapter for OsvAdapter {
    type Response = OsvResult;

    fn name(&self) -> &'static str {
        "osv"
    }

    fn identifier_kind(&self) -> IdentifierKind {
        IdentifierKind::Package
    }

    async fn fetch_by_identifier(&self, identifier: &Identifier) -> Result<OsvResult, FetchError> {
        let purl = identifier.as_package().ok_or_else(|| FetchError::NotFound {
            target: identifier.to_string(),
        })?;
        let purl = purl.to_string();
        let query = OsvQuery {
            package: OsvPackage { purl: &purl },
        };
        self.client
            .post_json(&format!("{}/v1/query", self.base_url), &query)
            .await
    }
}

fn enrich_advisories(component: &mut dyn SbomComponent, result: &OsvResult) {
    for vuln in &result.vulns {
        let mut reference = ExternalReference::new(
            ExternalReferenceKind::Advisories,
            format!("{}/{}", VULNERABILITY_PAGE, vuln.id),
        );
        if let Some(summary) = &vuln.summary {
            reference = reference.with_comment(summary.as_str());
        }
        component.add_external_reference(reference);
    }
}

fn enrich_vulnerability_ids(component: &mut dyn SbomComponent, result: &OsvResult) {
    for vuln in &result.vulns {
        component.add_property(Property::new("osv:vulnerability", vuln.id.as_str()));
    }
}

fn enrich_max_severity(component: &mut dyn SbomComponent, result: &OsvResult) {
    if let Some(severity) = result.max_severity() {
        component.add_property(Property::new("osv:max_severity", severity.to_string()));
    }
}
