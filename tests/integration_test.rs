/// Integration tests for the application layer
mod test_utilities;

use sbom_enricher::prelude::*;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use test_utilities::mocks::*;
use tokio_util::sync::CancellationToken;

fn cyclonedx(components: Value) -> String {
    json!({
        "bomFormat": "CycloneDX",
        "specVersion": "1.5",
        "serialNumber": "urn:uuid:3e671687-395b-41f5-a30f-a58921a69b79",
        "version": 1,
        "components": components
    })
    .to_string()
}

fn library(name: &str, purl: &str) -> Value {
    json!({"type": "library", "name": name, "purl": purl})
}

fn stage(source: MockSource, concurrency: usize) -> Box<dyn EnrichmentStage> {
    Box::new(
        EnrichmentOrchestrator::new(source)
            .with_enricher(describe)
            .with_concurrency(concurrency),
    )
}

async fn enrich(content: String, stages: Vec<Box<dyn EnrichmentStage>>) -> (EnrichResponse, Value) {
    let use_case = EnrichSbomUseCase::new(
        MockSbomReader::new(content),
        JsonSbomCodec::new(),
        MockProgressReporter::new(),
        stages,
    );
    let request = EnrichRequest::new(SbomInput::from_arg("bom.json"));
    let response = use_case
        .execute(request, &CancellationToken::new())
        .await
        .unwrap();
    let encoded: Value = serde_json::from_str(&response.content).unwrap();
    (response, encoded)
}

#[tokio::test]
async fn test_duplicate_components_share_one_fetch() {
    let components: Vec<Value> = (0..25)
        .map(|i| library(&format!("copy-{}", i), "pkg:npm/left-pad@1.3.0"))
        .collect();
    let source = MockSource::new().with_record("left-pad", "String padding");

    let (response, bom) = enrich(cyclonedx(Value::Array(components)), vec![stage(source.clone(), 8)]).await;

    assert_eq!(source.calls(), 1);
    let report = &response.reports[0];
    assert_eq!(report.discovered, 25);
    assert_eq!(report.unique_identifiers, 1);
    assert_eq!(report.fetched, 1);
    assert_eq!(report.enriched_components, 25);
    for component in bom["components"].as_array().unwrap() {
        assert_eq!(component["description"], "String padding");
    }
}

#[tokio::test]
async fn test_nested_components_are_enriched() {
    let mut parent = library("app", "pkg:npm/app@1.0.0");
    parent["components"] = json!([library("lodash", "pkg:npm/lodash@4.17.21")]);
    let source = MockSource::new()
        .with_record("app", "The application")
        .with_record("lodash", "Utility library");

    let (response, bom) = enrich(cyclonedx(json!([parent])), vec![stage(source.clone(), 4)]).await;

    assert_eq!(source.calls(), 2);
    assert_eq!(response.reports[0].discovered, 2);
    assert_eq!(bom["components"][0]["description"], "The application");
    assert_eq!(
        bom["components"][0]["components"][0]["description"],
        "Utility library"
    );
}

#[tokio::test]
async fn test_failures_and_misses_do_not_abort_the_run() {
    let components = json!([
        library("found", "pkg:npm/found@1.0.0"),
        library("missing", "pkg:npm/missing@1.0.0"),
        library("broken", "pkg:npm/broken@1.0.0"),
        {"type": "library", "name": "no-purl"}
    ]);
    let source = MockSource::new()
        .with_record("found", "Found it")
        .with_failure("broken");

    let (response, bom) = enrich(cyclonedx(components), vec![stage(source.clone(), 4)]).await;

    let report = &response.reports[0];
    assert_eq!(report.discovered, 4);
    assert_eq!(report.resolved, 3);
    assert_eq!(report.unresolved.len(), 1);
    assert_eq!(report.unresolved[0].name, "no-purl");
    assert_eq!(report.failures.len(), 2);
    assert_eq!(report.not_found(), 1);
    assert_eq!(report.enriched_components, 1);
    assert!(!response.cancelled);

    assert_eq!(bom["components"][0]["description"], "Found it");
    assert!(bom["components"][1].get("description").is_none());
    assert!(bom["components"][2].get("description").is_none());
}

#[tokio::test(start_paused = true)]
async fn test_lookups_respect_concurrency_bound() {
    let components: Vec<Value> = (0..30)
        .map(|i| library(&format!("pkg-{}", i), &format!("pkg:npm/pkg-{}@1.0.0", i)))
        .collect();
    let mut source = MockSource::new().with_delay(Duration::from_millis(50));
    for i in 0..30 {
        source = source.with_record(&format!("pkg-{}", i), "described");
    }

    let (response, _) = enrich(cyclonedx(Value::Array(components)), vec![stage(source.clone(), 5)]).await;

    assert_eq!(source.calls(), 30);
    assert!(source.max_in_flight() <= 5);
    assert!(source.max_in_flight() > 1);
    assert_eq!(response.reports[0].enriched_components, 30);
}

#[tokio::test]
async fn test_shared_cache_serves_second_orchestrator() {
    let source = MockSource::new().with_record("serde", "Serialization framework");
    let first = EnrichmentOrchestrator::new(source.clone()).with_enricher(describe);
    let second = EnrichmentOrchestrator::new(source.clone())
        .with_enricher(describe)
        .with_cache(Arc::clone(first.cache()));

    let content = cyclonedx(json!([library("serde", "pkg:cargo/serde@1.0.200")]));
    let (_, _) = enrich(content.clone(), vec![Box::new(first)]).await;
    let (response, bom) = enrich(content, vec![Box::new(second)]).await;

    assert_eq!(source.calls(), 1);
    assert_eq!(response.reports[0].cache_hits, 1);
    assert_eq!(response.reports[0].fetched, 0);
    assert_eq!(bom["components"][0]["description"], "Serialization framework");
}

#[tokio::test]
async fn test_cancelled_run_fetches_nothing_and_still_encodes() {
    let source = MockSource::new().with_record("left-pad", "String padding");
    let use_case = EnrichSbomUseCase::new(
        MockSbomReader::new(cyclonedx(json!([library("left-pad", "pkg:npm/left-pad@1.3.0")]))),
        JsonSbomCodec::new(),
        MockProgressReporter::new(),
        vec![stage(source.clone(), 4)],
    );
    let cancel = CancellationToken::new();
    cancel.cancel();

    let response = use_case
        .execute(EnrichRequest::new(SbomInput::Stdin), &cancel)
        .await
        .unwrap();

    assert_eq!(source.calls(), 0);
    assert!(response.cancelled);
    assert!(response.content.contains("left-pad"));
}

#[tokio::test]
async fn test_unknown_fields_survive_enrichment() {
    let mut component = library("left-pad", "pkg:npm/left-pad@1.3.0");
    component["bom-ref"] = json!("left-pad-ref");
    component["x-vendor"] = json!({"kept": true});
    let mut document: Value = serde_json::from_str(&cyclonedx(json!([component]))).unwrap();
    document["dependencies"] = json!([{"ref": "left-pad-ref", "dependsOn": []}]);
    let source = MockSource::new().with_record("left-pad", "String padding");

    let (_, bom) = enrich(document.to_string(), vec![stage(source, 2)]).await;

    assert_eq!(bom["serialNumber"], "urn:uuid:3e671687-395b-41f5-a30f-a58921a69b79");
    assert_eq!(bom["dependencies"][0]["ref"], "left-pad-ref");
    assert_eq!(bom["components"][0]["bom-ref"], "left-pad-ref");
    assert_eq!(bom["components"][0]["x-vendor"]["kept"], true);
    assert_eq!(bom["components"][0]["description"], "String padding");
}

#[tokio::test]
async fn test_spdx_packages_are_enriched() {
    let content = json!({
        "spdxVersion": "SPDX-2.3",
        "dataLicense": "CC0-1.0",
        "SPDXID": "SPDXRef-DOCUMENT",
        "name": "demo",
        "creationInfo": {"created": "2024-01-01T00:00:00Z", "creators": ["Tool: demo"]},
        "packages": [{
            "SPDXID": "SPDXRef-Package-requests",
            "name": "requests",
            "downloadLocation": "NOASSERTION",
            "externalRefs": [{
                "referenceCategory": "PACKAGE-MANAGER",
                "referenceType": "purl",
                "referenceLocator": "pkg:pypi/requests@2.31.0"
            }]
        }]
    })
    .to_string();
    let source = MockSource::new().with_record("requests", "HTTP for Humans");

    let (response, doc) = enrich(content, vec![stage(source.clone(), 2)]).await;

    assert_eq!(response.format, SbomFormat::Spdx);
    assert_eq!(source.calls(), 1);
    assert_eq!(doc["packages"][0]["description"], "HTTP for Humans");
    assert_eq!(doc["packages"][0]["SPDXID"], "SPDXRef-Package-requests");
    assert_eq!(doc["dataLicense"], "CC0-1.0");
}

#[tokio::test]
async fn test_reader_failure_is_reported() {
    let use_case = EnrichSbomUseCase::new(
        MockSbomReader::with_failure(),
        JsonSbomCodec::new(),
        MockProgressReporter::new(),
        vec![],
    );

    let result = use_case
        .execute(EnrichRequest::new(SbomInput::Stdin), &CancellationToken::new())
        .await;

    assert!(result.is_err());
    assert!(result
        .unwrap_err()
        .to_string()
        .contains("Mock SBOM reader failure"));
}

#[tokio::test]
async fn test_progress_is_reported_per_stage() {
    let reporter = MockProgressReporter::new();
    let source = MockSource::new().with_record("left-pad", "String padding");
    let use_case = EnrichSbomUseCase::new(
        MockSbomReader::new(cyclonedx(json!([library("left-pad", "pkg:npm/left-pad@1.3.0")]))),
        JsonSbomCodec::new(),
        reporter.clone(),
        vec![stage(source, 2)],
    );

    use_case
        .execute(EnrichRequest::new(SbomInput::Stdin), &CancellationToken::new())
        .await
        .unwrap();

    let messages = reporter.get_messages();
    assert!(messages.iter().any(|m| m.contains("Loading SBOM from stdin")));
    assert!(messages.iter().any(|m| m == "Progress: 1/1 - mock"));
    assert!(messages.iter().any(|m| m.contains("mock: 1 components, 1 enriched")));
}
