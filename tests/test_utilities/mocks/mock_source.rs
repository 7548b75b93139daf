use async_trait::async_trait;
use sbom_enricher::prelude::*;
use sbom_enricher::shared::error::FetchError;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct MockRecord {
    pub description: String,
}

/// Mock SourceAdapter keyed on package URL that counts its calls.
///
/// Packages are looked up by name; unknown names answer `NotFound`.
/// `in_flight` and `max_in_flight` track concurrent fetches.
#[derive(Clone)]
pub struct MockSource {
    pub records: HashMap<String, String>,
    pub failing: Vec<String>,
    pub delay: Option<Duration>,
    pub calls: Arc<AtomicUsize>,
    pub in_flight: Arc<AtomicUsize>,
    pub max_in_flight: Arc<AtomicUsize>,
}

impl MockSource {
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
            failing: Vec::new(),
            delay: None,
            calls: Arc::new(AtomicUsize::new(0)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_record(mut self, package: &str, description: &str) -> Self {
        self.records
            .insert(package.to_string(), description.to_string());
        self
    }

    pub fn with_failure(mut self, package: &str) -> Self {
        self.failing.push(package.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl Default for MockSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SourceAdapter for MockSource {
    type Response = MockRecord;

    fn name(&self) -> &'static str {
        "mock"
    }

    fn identifier_kind(&self) -> IdentifierKind {
        IdentifierKind::Package
    }

    async fn fetch_by_identifier(&self, identifier: &Identifier) -> std::result::Result<MockRecord, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let target = identifier.to_string();
        let name = identifier
            .as_package()
            .map(|p| p.name().to_string())
            .unwrap_or_default();
        if self.failing.contains(&name) {
            return Err(FetchError::Transient {
                target,
                attempts: 5,
                details: "status 503".to_string(),
            });
        }
        match self.records.get(&name) {
            Some(description) => Ok(MockRecord {
                description: description.clone(),
            }),
            None => Err(FetchError::NotFound { target }),
        }
    }
}

/// Enricher writing the record's description.
pub fn describe(component: &mut dyn SbomComponent, record: &MockRecord) {
    component.set_description(&record.description);
}
