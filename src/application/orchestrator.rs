use super::identity_resolver::IdentityResolver;
use crate::enrichment::domain::{
    ComponentPath, EnrichmentReport, Identifier, LookupFailure, RunPhase, SbomDocument,
    UnresolvedComponent,
};
use crate::enrichment::services::{ComponentDiscovery, IdentityHints, LookupCache};
use crate::ports::outbound::{Enricher, SourceAdapter};
use crate::shared::error::{FetchError, ResolveError};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Lookups in flight at once per run
pub const DEFAULT_CONCURRENCY: usize = 20;

/// Progress callback: `(lookups finished, unique lookups)`
pub type ProgressFn<'a> = &'a (dyn Fn(usize, usize) + Sync);

enum LookupOutcome<T> {
    Cached(Arc<T>),
    Fetched(Arc<T>),
    Failed(FetchError),
    Skipped,
}

/// Enriches a document from one source.
///
/// Components are grouped by identifier so each unique identifier is looked
/// up once, through the cache and then the source, with at most
/// `concurrency` lookups in flight. Every component of a group receives the
/// same response, run through the registered enrichers in order.
pub struct EnrichmentOrchestrator<S: SourceAdapter> {
    source: S,
    enrichers: Vec<Enricher<S::Response>>,
    resolver: Arc<IdentityResolver>,
    cache: Arc<LookupCache<S::Response>>,
    concurrency: usize,
}

impl<S: SourceAdapter> EnrichmentOrchestrator<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            enrichers: Vec::new(),
            resolver: Arc::new(IdentityResolver::local()),
            cache: Arc::new(LookupCache::new()),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_enricher(mut self, enricher: Enricher<S::Response>) -> Self {
        self.enrichers.push(enricher);
        self
    }

    pub fn with_enrichers(mut self, enrichers: &[Enricher<S::Response>]) -> Self {
        self.enrichers.extend_from_slice(enrichers);
        self
    }

    /// Shares a cache with other orchestrators of the same source.
    pub fn with_cache(mut self, cache: Arc<LookupCache<S::Response>>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<IdentityResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn cache(&self) -> &Arc<LookupCache<S::Response>> {
        &self.cache
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub async fn run(
        &self,
        document: &mut dyn SbomDocument,
        cancel: &CancellationToken,
    ) -> EnrichmentReport {
        self.run_with_progress(document, cancel, &|_, _| {}).await
    }

    pub async fn run_with_progress(
        &self,
        document: &mut dyn SbomDocument,
        cancel: &CancellationToken,
        progress: ProgressFn<'_>,
    ) -> EnrichmentReport {
        let source = self.source.name();
        let mut report = EnrichmentReport::new(source);
        let mut phase = RunPhase::Idle;

        advance(source, &mut phase, RunPhase::Discovering);
        let paths = ComponentDiscovery::discover(document);
        report.discovered = paths.len();
        let hints = IdentityHints::collect(document, &paths);

        let resolved = self
            .resolver
            .resolve_all(hints, self.source.identifier_kind(), cancel)
            .await;

        advance(source, &mut phase, RunPhase::GroupingByIdentifier);
        let groups = self.group(resolved, &mut report);

        advance(source, &mut phase, RunPhase::Dispatching);
        let total = groups.len();
        let mut finished = 0;
        progress(finished, total);

        let mut outcomes: Vec<(usize, LookupOutcome<S::Response>)> = Vec::with_capacity(total);
        let groups_ref = &groups;
        let mut lookups = stream::iter(0..total)
            .map(|index| async move {
                let identifier = &groups_ref[index].0;
                (index, self.lookup(identifier, cancel).await)
            })
            .buffer_unordered(self.concurrency);

        while let Some(outcome) = lookups.next().await {
            finished += 1;
            progress(finished, total);
            outcomes.push(outcome);
        }
        drop(lookups);

        // Merge in first-seen group order so output does not depend on
        // which lookup finished first.
        advance(source, &mut phase, RunPhase::Merging);
        outcomes.sort_by_key(|(index, _)| *index);
        for (index, outcome) in outcomes {
            let (identifier, paths) = &groups[index];
            match outcome {
                LookupOutcome::Cached(response) => {
                    report.cache_hits += 1;
                    report.enriched_components += self.merge(document, paths, &response);
                }
                LookupOutcome::Fetched(response) => {
                    report.fetched += 1;
                    report.enriched_components += self.merge(document, paths, &response);
                }
                LookupOutcome::Failed(error) => {
                    match &error {
                        FetchError::NotFound { .. } => {
                            debug!(source, identifier = %identifier, "no remote record")
                        }
                        _ => warn!(
                            source,
                            identifier = %identifier,
                            components = paths.len(),
                            error = %error,
                            "lookup failed"
                        ),
                    }
                    report.failures.push(LookupFailure {
                        identifier: identifier.clone(),
                        components: paths.len(),
                        error,
                    });
                }
                LookupOutcome::Skipped => report.cancelled = true,
            }
        }
        report.cancelled |= cancel.is_cancelled();

        advance(source, &mut phase, RunPhase::Done);
        info!(
            source,
            discovered = report.discovered,
            enriched = report.enriched_components,
            fetched = report.fetched,
            cache_hits = report.cache_hits,
            failed = report.failures.len(),
            cancelled = report.cancelled,
            "enrichment finished"
        );
        report
    }

    /// Groups resolved components by identifier, keeping first-seen order.
    fn group(
        &self,
        resolved: Vec<(IdentityHints, Result<Identifier, ResolveError>)>,
        report: &mut EnrichmentReport,
    ) -> Vec<(Identifier, Vec<ComponentPath>)> {
        let mut groups: Vec<(Identifier, Vec<ComponentPath>)> = Vec::new();
        let mut index: HashMap<Identifier, usize> = HashMap::new();

        for (hints, result) in resolved {
            match result {
                Ok(identifier) => {
                    report.resolved += 1;
                    match index.get(&identifier) {
                        Some(&i) => groups[i].1.push(hints.path),
                        None => {
                            index.insert(identifier.clone(), groups.len());
                            groups.push((identifier, vec![hints.path]));
                        }
                    }
                }
                Err(reason) => {
                    debug!(
                        source = self.source.name(),
                        component = %hints.name,
                        %reason,
                        "component skipped"
                    );
                    report.unresolved.push(UnresolvedComponent {
                        path: hints.path,
                        name: hints.name,
                        reason,
                    });
                }
            }
        }

        report.unique_identifiers = groups.len();
        groups
    }

    async fn lookup(
        &self,
        identifier: &Identifier,
        cancel: &CancellationToken,
    ) -> LookupOutcome<S::Response> {
        if let Some(cached) = self.cache.get(identifier) {
            return LookupOutcome::Cached(cached);
        }
        if cancel.is_cancelled() {
            return LookupOutcome::Skipped;
        }

        match self.source.fetch_by_identifier(identifier).await {
            Ok(response) => {
                let response = Arc::new(response);
                self.cache.set(identifier.clone(), Arc::clone(&response));
                LookupOutcome::Fetched(response)
            }
            Err(FetchError::Cancelled { .. }) => LookupOutcome::Skipped,
            Err(error) => LookupOutcome::Failed(error),
        }
    }

    fn merge(
        &self,
        document: &mut dyn SbomDocument,
        paths: &[ComponentPath],
        response: &S::Response,
    ) -> usize {
        let findings = self.source.vulnerabilities(response);
        let mut merged = 0;
        for path in paths {
            let Some(component) = document.component_mut(path) else {
                continue;
            };
            for enricher in &self.enrichers {
                enricher(&mut *component, response);
            }
            merged += 1;

            if findings.is_empty() {
                continue;
            }
            let Some(bom_ref) = component.bom_ref().map(str::to_string) else {
                debug!(source = self.source.name(), %path, "no bom-ref, findings not recorded");
                continue;
            };
            for finding in &findings {
                document.add_vulnerability(finding.affecting(&bom_ref));
            }
        }
        merged
    }
}

fn advance(source: &str, phase: &mut RunPhase, next: RunPhase) {
    debug!(source, from = %phase, to = %next, "phase");
    *phase = next;
}

/// Object-safe view of an orchestrator so stages for different sources can
/// run in sequence.
#[async_trait]
pub trait EnrichmentStage: Send + Sync {
    fn name(&self) -> &'static str;

    async fn enrich(
        &self,
        document: &mut dyn SbomDocument,
        cancel: &CancellationToken,
        progress: ProgressFn<'_>,
    ) -> EnrichmentReport;
}

#[async_trait]
impl<S: SourceAdapter> EnrichmentStage for EnrichmentOrchestrator<S> {
    fn name(&self) -> &'static str {
        self.source.name()
    }

    async fn enrich(
        &self,
        document: &mut dyn SbomDocument,
        cancel: &CancellationToken,
        progress: ProgressFn<'_>,
    ) -> EnrichmentReport {
        self.run_with_progress(document, cancel, progress).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrichment::domain::{IdentifierKind, SbomComponent, Vulnerability};
    use crate::enrichment::testing::{FakeComponent, FakeDocument};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    struct Record {
        description: String,
    }

    struct MockSource {
        calls: AtomicUsize,
        seen: Mutex<Vec<String>>,
        failing: Vec<&'static str>,
        missing: Vec<&'static str>,
        reports_findings: bool,
    }

    impl MockSource {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
                failing: vec![],
                missing: vec![],
                reports_findings: false,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SourceAdapter for MockSource {
        type Response = Record;

        fn name(&self) -> &'static str {
            "mock"
        }

        fn identifier_kind(&self) -> IdentifierKind {
            IdentifierKind::Package
        }

        async fn fetch_by_identifier(&self, identifier: &Identifier) -> Result<Record, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let key = identifier.to_string();
            self.seen.lock().unwrap().push(key.clone());
            let name = identifier.as_package().map(|p| p.name().to_string()).unwrap_or_default();
            if self.failing.contains(&name.as_str()) {
                return Err(FetchError::Transient {
                    target: key,
                    attempts: 5,
                    details: "status 503".into(),
                });
            }
            if self.missing.contains(&name.as_str()) {
                return Err(FetchError::NotFound { target: key });
            }
            Ok(Record {
                description: format!("about {}", name),
            })
        }

        fn vulnerabilities(&self, record: &Record) -> Vec<Vulnerability> {
            if !self.reports_findings {
                return Vec::new();
            }
            vec![Vulnerability::new(record.description.replace(' ', "-"))]
        }
    }

    fn describe(component: &mut dyn SbomComponent, record: &Record) {
        component.set_description(&record.description);
    }

    fn mark(component: &mut dyn SbomComponent, record: &Record) {
        let current = component.description().unwrap_or_default().to_string();
        assert_eq!(current, record.description, "enrichers run in order");
        component.set_license("MIT");
    }

    fn document(purls: &[&str]) -> FakeDocument {
        FakeDocument::new(
            purls
                .iter()
                .enumerate()
                .map(|(i, p)| FakeComponent::new(&format!("c{}", i)).with_purl(p))
                .collect(),
        )
    }

    #[tokio::test]
    async fn test_one_fetch_per_identifier() {
        for n in [1usize, 2, 10] {
            let purls = vec!["pkg:npm/x@1.0.0"; n];
            let mut doc = document(&purls);
            let orchestrator = EnrichmentOrchestrator::new(MockSource::new()).with_enricher(describe);

            let report = orchestrator.run(&mut doc, &CancellationToken::new()).await;

            assert_eq!(orchestrator.source().calls(), 1, "n = {}", n);
            assert_eq!(report.unique_identifiers, 1);
            assert_eq!(report.enriched_components, n);
            assert!(doc
                .roots
                .iter()
                .all(|c| c.description.as_deref() == Some("about x")));
        }
    }

    #[tokio::test]
    async fn test_group_members_receive_identical_data() {
        let mut doc = document(&["pkg:npm/x@1.0.0", "pkg:npm/y@2.0.0", "pkg:npm/x@1.0.0?os=linux"]);
        let orchestrator = EnrichmentOrchestrator::new(MockSource::new()).with_enrichers(&[describe, mark]);

        orchestrator.run(&mut doc, &CancellationToken::new()).await;

        assert_eq!(orchestrator.source().calls(), 2);
        let (first, third) = (&doc.roots[0], &doc.roots[2]);
        assert_eq!(first.description, third.description);
        assert_eq!(first.license, third.license);
        assert_eq!(first.license.as_deref(), Some("MIT"));
    }

    #[tokio::test]
    async fn test_shared_cache_avoids_second_fetch() {
        let cache = Arc::new(LookupCache::new());
        let first = EnrichmentOrchestrator::new(MockSource::new())
            .with_enricher(describe)
            .with_cache(Arc::clone(&cache));
        let second = EnrichmentOrchestrator::new(MockSource::new())
            .with_enricher(describe)
            .with_cache(Arc::clone(&cache));

        let mut doc = document(&["pkg:npm/x@1.0.0"]);
        first.run(&mut doc, &CancellationToken::new()).await;
        let mut doc = document(&["pkg:npm/x@1.0.0"]);
        let report = second.run(&mut doc, &CancellationToken::new()).await;

        assert_eq!(first.source().calls() + second.source().calls(), 1);
        assert_eq!(report.cache_hits, 1);
        assert_eq!(doc.roots[0].description.as_deref(), Some("about x"));
    }

    #[tokio::test]
    async fn test_not_found_leaves_component_untouched() {
        let mut source = MockSource::new();
        source.missing = vec!["gone"];
        let orchestrator = EnrichmentOrchestrator::new(source).with_enricher(describe);
        let mut doc = document(&["pkg:npm/gone@1.0.0"]);
        let before = doc.roots[0].clone();

        let report = orchestrator.run(&mut doc, &CancellationToken::new()).await;

        assert_eq!(doc.roots[0], before);
        assert_eq!(report.not_found(), 1);
        assert_eq!(orchestrator.source().calls(), 1);
        assert!(orchestrator.cache().is_empty());
    }

    #[tokio::test]
    async fn test_failure_does_not_affect_other_components() {
        let mut source = MockSource::new();
        source.failing = vec!["bad"];
        let orchestrator = EnrichmentOrchestrator::new(source).with_enricher(describe);
        let mut doc = document(&["pkg:npm/a@1", "pkg:npm/bad@1", "pkg:npm/c@1"]);

        let report = orchestrator.run(&mut doc, &CancellationToken::new()).await;

        assert_eq!(doc.roots[0].description.as_deref(), Some("about a"));
        assert_eq!(doc.roots[1].description, None);
        assert_eq!(doc.roots[2].description.as_deref(), Some("about c"));
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.enriched_components, 2);
        assert!(!report.cancelled);
    }

    #[tokio::test]
    async fn test_unresolvable_components_are_skipped() {
        let mut doc = FakeDocument::new(vec![
            FakeComponent::new("no-purl"),
            FakeComponent::new("bad-purl").with_purl("not-a-purl"),
            FakeComponent::new("ok").with_purl("pkg:npm/ok@1"),
        ]);
        let orchestrator = EnrichmentOrchestrator::new(MockSource::new()).with_enricher(describe);

        let report = orchestrator.run(&mut doc, &CancellationToken::new()).await;

        assert_eq!(report.discovered, 3);
        assert_eq!(report.resolved, 1);
        assert_eq!(report.unresolved.len(), 2);
        assert_eq!(doc.roots[0].description, None);
        assert_eq!(orchestrator.source().calls(), 1);
    }

    #[tokio::test]
    async fn test_nested_components_are_enriched() {
        let mut doc = FakeDocument::new(vec![FakeComponent::new("app")
            .with_purl("pkg:npm/app@1")
            .with_child(FakeComponent::new("dep").with_purl("pkg:npm/dep@1"))]);
        let orchestrator = EnrichmentOrchestrator::new(MockSource::new()).with_enricher(describe);

        orchestrator.run(&mut doc, &CancellationToken::new()).await;

        assert_eq!(doc.roots[0].children[0].description.as_deref(), Some("about dep"));
    }

    #[tokio::test]
    async fn test_cancelled_run_dispatches_nothing() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let orchestrator = EnrichmentOrchestrator::new(MockSource::new()).with_enricher(describe);
        let mut doc = document(&["pkg:npm/a@1", "pkg:npm/b@1"]);

        let report = orchestrator.run(&mut doc, &cancel).await;

        assert_eq!(orchestrator.source().calls(), 0);
        assert!(report.cancelled);
        assert_eq!(report.enriched_components, 0);
    }

    #[tokio::test]
    async fn test_cached_results_still_merge_after_cancellation() {
        let cache = Arc::new(LookupCache::new());
        let warm = EnrichmentOrchestrator::new(MockSource::new())
            .with_enricher(describe)
            .with_cache(Arc::clone(&cache));
        warm.run(&mut document(&["pkg:npm/a@1"]), &CancellationToken::new())
            .await;

        let cancel = CancellationToken::new();
        cancel.cancel();
        let orchestrator = EnrichmentOrchestrator::new(MockSource::new())
            .with_enricher(describe)
            .with_cache(cache);
        let mut doc = document(&["pkg:npm/a@1", "pkg:npm/b@1"]);

        let report = orchestrator.run(&mut doc, &cancel).await;

        assert_eq!(orchestrator.source().calls(), 0);
        assert_eq!(report.cache_hits, 1);
        assert_eq!(report.enriched_components, 1);
        assert!(report.cancelled);
        assert_eq!(doc.roots[0].description.as_deref(), Some("about a"));
        assert!(doc.roots[1].description.is_none());
    }

    #[tokio::test]
    async fn test_progress_reaches_total() {
        let orchestrator = EnrichmentOrchestrator::new(MockSource::new())
            .with_enricher(describe)
            .with_concurrency(2);
        let mut doc = document(&["pkg:npm/a@1", "pkg:npm/b@1", "pkg:npm/c@1", "pkg:npm/a@1"]);
        let last = Mutex::new((0, 0));

        orchestrator
            .run_with_progress(&mut doc, &CancellationToken::new(), &|done, total| {
                *last.lock().unwrap() = (done, total);
            })
            .await;

        assert_eq!(*last.lock().unwrap(), (3, 3));
    }

    #[tokio::test]
    async fn test_findings_recorded_for_each_referenced_component() {
        let mut source = MockSource::new();
        source.reports_findings = true;
        let orchestrator = EnrichmentOrchestrator::new(source).with_enricher(describe);
        let mut doc = FakeDocument::new(vec![
            FakeComponent::new("first").with_purl("pkg:npm/x@1.0.0").with_bom_ref("x-1"),
            FakeComponent::new("second").with_purl("pkg:npm/x@1.0.0").with_bom_ref("x-2"),
            FakeComponent::new("anonymous").with_purl("pkg:npm/x@1.0.0"),
        ]);

        let report = orchestrator.run(&mut doc, &CancellationToken::new()).await;

        assert_eq!(report.enriched_components, 3);
        let affected: Vec<_> = doc
            .vulnerabilities
            .iter()
            .map(|v| (v.id.as_str(), v.affects.as_deref()))
            .collect();
        assert_eq!(affected, vec![("about-x", Some("x-1")), ("about-x", Some("x-2"))]);
    }
}
