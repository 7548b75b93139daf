use crate::adapters::outbound::network::ResilientClient;
use crate::enrichment::domain::{
    ExternalReference, ExternalReferenceKind, Identifier, IdentifierKind, Property, SbomComponent,
};
use crate::ports::outbound::{Enricher, SourceAdapter};
use crate::shared::error::FetchError;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

pub const DEFAULT_BASE_URL: &str = "https://api.securityscorecards.dev";

/// OpenSSF Scorecard result for one repository
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScorecardResult {
    pub date: Option<String>,
    pub score: Option<f64>,
    /// API URL the result was read from
    #[serde(skip)]
    pub url: String,
}

pub const ENRICHERS: &[Enricher<ScorecardResult>] = &[enrich_reference, enrich_score];

pub struct ScorecardAdapter {
    client: Arc<ResilientClient>,
    base_url: String,
}

impl ScorecardAdapter {
    pub fn new(client: Arc<ResilientClient>, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl SourceAdapter for ScorecardAdapter {
    type Response = ScorecardResult;

    fn name(&self) -> &'static str {
        "scorecard"
    }

    fn identifier_kind(&self) -> IdentifierKind {
        IdentifierKind::Repository
    }

    async fn fetch_by_identifier(&self, identifier: &Identifier) -> Result<ScorecardResult, FetchError> {
        let repository = identifier.as_repository().ok_or_else(|| FetchError::NotFound {
            target: identifier.to_string(),
        })?;
        let url = format!("{}/projects/{}", self.base_url, repository);
        let mut result: ScorecardResult = self.client.get_json(&url).await?;
        result.url = url;
        Ok(result)
    }
}

fn enrich_reference(component: &mut dyn SbomComponent, result: &ScorecardResult) {
    component.add_external_reference(
        ExternalReference::new(ExternalReferenceKind::Other, result.url.as_str())
            .with_comment("OpenSSF Scorecard"),
    );
}

fn enrich_score(component: &mut dyn SbomComponent, result: &ScorecardResult) {
    if let Some(score) = result.score {
        component.add_property(Property::new("scorecard:score", format!("{:.1}", score)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrichment::testing::FakeComponent;

    #[test]
    fn test_result_adds_reference_and_score() {
        let mut result: ScorecardResult = serde_json::from_str(
            r#"{"date": "2024-03-01", "repo": {"name": "github.com/a/b"}, "score": 6.8, "checks": []}"#,
        )
        .unwrap();
        result.url = "https://api.securityscorecards.dev/projects/github.com/a/b".into();

        let mut component = FakeComponent::new("b");
        for enricher in ENRICHERS {
            enricher(&mut component, &result);
        }

        assert_eq!(component.references.len(), 1);
        assert_eq!(component.references[0].kind, ExternalReferenceKind::Other);
        assert_eq!(component.references[0].url, result.url);
        assert_eq!(component.references[0].comment.as_deref(), Some("OpenSSF Scorecard"));
        assert_eq!(component.properties[0].name, "scorecard:score");
        assert_eq!(component.properties[0].value, "6.8");
    }

    #[test]
    fn test_missing_score_still_links_result() {
        let result = ScorecardResult {
            url: "https://example.test/projects/github.com/a/b".into(),
            ..Default::default()
        };
        let mut component = FakeComponent::new("b");
        for enricher in ENRICHERS {
            enricher(&mut component, &result);
        }
        assert_eq!(component.references.len(), 1);
        assert!(component.properties.is_empty());
    }
}
