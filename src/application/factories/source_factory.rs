use crate::adapters::outbound::network::{
    RateLimiter, ResilientClient, ResilientFetcher, RetryPolicy, TokenCredentials,
    DEFAULT_BURST, DEFAULT_REQUESTS_PER_SECOND,
};
use crate::adapters::outbound::sources::{
    deps_dev, ecosystems, osv, scorecard, snyk, DepsDevAdapter, DepsDevIdentitySource,
    EcosystemsAdapter, OsvAdapter, ScorecardAdapter, SnykAdapter,
};
use crate::application::identity_resolver::IdentityResolver;
use crate::application::orchestrator::{EnrichmentOrchestrator, EnrichmentStage, DEFAULT_CONCURRENCY};
use crate::shared::Result;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Default per-request HTTP timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_SNYK_TOKEN_ENV: &str = "SNYK_TOKEN";

/// The metadata sources a run can enrich from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Ecosystems,
    Deps,
    Scorecard,
    Osv,
    Snyk,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Ecosystems => "ecosystems",
            SourceKind::Deps => "deps",
            SourceKind::Scorecard => "scorecard",
            SourceKind::Osv => "osv",
            SourceKind::Snyk => "snyk",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ecosystems" | "ecosyste.ms" => Ok(SourceKind::Ecosystems),
            "deps" | "deps.dev" => Ok(SourceKind::Deps),
            "scorecard" => Ok(SourceKind::Scorecard),
            "osv" => Ok(SourceKind::Osv),
            "snyk" => Ok(SourceKind::Snyk),
            _ => Err(format!(
                "Invalid source: {}. Please specify 'ecosystems', 'deps', 'scorecard', 'osv' or 'snyk'",
                s
            )),
        }
    }
}

/// Base URLs of the remote services
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub ecosystems: String,
    pub deps_dev: String,
    pub scorecard: String,
    pub osv: String,
    pub snyk: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            ecosystems: ecosystems::DEFAULT_BASE_URL.to_string(),
            deps_dev: deps_dev::DEFAULT_BASE_URL.to_string(),
            scorecard: scorecard::DEFAULT_BASE_URL.to_string(),
            osv: osv::DEFAULT_BASE_URL.to_string(),
            snyk: snyk::DEFAULT_BASE_URL.to_string(),
        }
    }
}

/// Everything needed to build enrichment stages
#[derive(Debug, Clone)]
pub struct SourceSettings {
    pub concurrency: usize,
    pub timeout: Duration,
    pub requests_per_second: u32,
    pub burst: u32,
    pub retry: RetryPolicy,
    pub endpoints: Endpoints,
    pub snyk_org_id: Option<String>,
    pub snyk_token_env: String,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            timeout: DEFAULT_TIMEOUT,
            requests_per_second: DEFAULT_REQUESTS_PER_SECOND,
            burst: DEFAULT_BURST,
            retry: RetryPolicy::default(),
            endpoints: Endpoints::default(),
            snyk_org_id: None,
            snyk_token_env: DEFAULT_SNYK_TOKEN_ENV.to_string(),
        }
    }
}

/// Builds one [`EnrichmentStage`] per requested source.
///
/// Every remote service gets exactly one rate limiter, shared by all
/// clients talking to it. The deps.dev and Scorecard stages share one
/// identity resolver, so a package's repository is looked up once per run.
pub struct SourceFactory {
    settings: SourceSettings,
    cancel: CancellationToken,
    limiters: HashMap<&'static str, Arc<RateLimiter>>,
    clients: HashMap<&'static str, Arc<ResilientClient>>,
    repository_resolver: Option<Arc<IdentityResolver>>,
}

impl SourceFactory {
    pub fn new(settings: SourceSettings, cancel: CancellationToken) -> Self {
        Self {
            settings,
            cancel,
            limiters: HashMap::new(),
            clients: HashMap::new(),
            repository_resolver: None,
        }
    }

    /// Creates the stages in the order given.
    ///
    /// # Errors
    /// Fails when the HTTP client cannot be built or Snyk is requested
    /// without a token in the environment.
    pub fn create_stages(&mut self, kinds: &[SourceKind]) -> Result<Vec<Box<dyn EnrichmentStage>>> {
        kinds.iter().map(|kind| self.create(*kind)).collect()
    }

    pub fn create(&mut self, kind: SourceKind) -> Result<Box<dyn EnrichmentStage>> {
        let concurrency = self.settings.concurrency;
        let stage: Box<dyn EnrichmentStage> = match kind {
            SourceKind::Ecosystems => {
                let adapter =
                    EcosystemsAdapter::new(self.client("ecosystems")?, &self.settings.endpoints.ecosystems);
                Box::new(
                    EnrichmentOrchestrator::new(adapter)
                        .with_enrichers(ecosystems::ENRICHERS)
                        .with_concurrency(concurrency),
                )
            }
            SourceKind::Deps => {
                let adapter =
                    DepsDevAdapter::new(self.client("deps.dev")?, &self.settings.endpoints.deps_dev);
                Box::new(
                    EnrichmentOrchestrator::new(adapter)
                        .with_enrichers(deps_dev::ENRICHERS)
                        .with_resolver(self.repository_resolver()?)
                        .with_concurrency(concurrency),
                )
            }
            SourceKind::Scorecard => {
                let adapter =
                    ScorecardAdapter::new(self.client("scorecard")?, &self.settings.endpoints.scorecard);
                Box::new(
                    EnrichmentOrchestrator::new(adapter)
                        .with_enrichers(scorecard::ENRICHERS)
                        .with_resolver(self.repository_resolver()?)
                        .with_concurrency(concurrency),
                )
            }
            SourceKind::Osv => {
                let adapter = OsvAdapter::new(self.client("osv")?, &self.settings.endpoints.osv);
                Box::new(
                    EnrichmentOrchestrator::new(adapter)
                        .with_enrichers(osv::ENRICHERS)
                        .with_concurrency(concurrency),
                )
            }
            SourceKind::Snyk => {
                let credentials = TokenCredentials::from_env(
                    &self.settings.snyk_token_env,
                    "token",
                    SourceKind::Snyk.as_str(),
                )?;
                let client = Arc::new(
                    self.build_client("snyk")?
                        .with_credentials(Arc::new(credentials))
                        .with_rate_limit_reset(),
                );
                let adapter = SnykAdapter::new(client, &self.settings.endpoints.snyk)
                    .with_org_id(self.settings.snyk_org_id.clone());
                Box::new(
                    EnrichmentOrchestrator::new(adapter)
                        .with_enrichers(snyk::ENRICHERS)
                        .with_concurrency(concurrency),
                )
            }
        };
        Ok(stage)
    }

    fn limiter(&mut self, service: &'static str) -> Arc<RateLimiter> {
        let (rps, burst) = (self.settings.requests_per_second, self.settings.burst);
        Arc::clone(
            self.limiters
                .entry(service)
                .or_insert_with(|| Arc::new(RateLimiter::new(rps, burst))),
        )
    }

    fn build_client(&mut self, service: &'static str) -> Result<ResilientClient> {
        let fetcher = ResilientFetcher::new(
            self.limiter(service),
            self.settings.retry,
            self.cancel.clone(),
        );
        ResilientClient::new(self.settings.timeout, fetcher)
    }

    fn client(&mut self, service: &'static str) -> Result<Arc<ResilientClient>> {
        if let Some(client) = self.clients.get(service) {
            return Ok(Arc::clone(client));
        }
        let client = Arc::new(self.build_client(service)?);
        self.clients.insert(service, Arc::clone(&client));
        Ok(client)
    }

    fn repository_resolver(&mut self) -> Result<Arc<IdentityResolver>> {
        if let Some(resolver) = &self.repository_resolver {
            return Ok(Arc::clone(resolver));
        }
        let source = DepsDevIdentitySource::new(self.client("deps.dev")?, &self.settings.endpoints.deps_dev);
        let resolver = Arc::new(
            IdentityResolver::with_source(Arc::new(source)).with_concurrency(self.settings.concurrency),
        );
        self.repository_resolver = Some(Arc::clone(&resolver));
        Ok(resolver)
    }
}
