use crate::shared::error::ResolveError;
use reqwest::Url;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Maximum accepted length of a raw identifier (security limit)
const MAX_IDENTIFIER_LENGTH: usize = 2048;

/// Forge purl types whose namespace/name is the repository path.
const FORGE_TYPES: [(&str, &str); 3] = [
    ("github", "github.com"),
    ("gitlab", "gitlab.com"),
    ("bitbucket", "bitbucket.org"),
];

/// Which identifier namespace a source keys its lookups on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentifierKind {
    Package,
    Repository,
}

impl fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentifierKind::Package => write!(f, "package"),
            IdentifierKind::Repository => write!(f, "repository"),
        }
    }
}

/// The key that caching and deduplication work on.
///
/// Package and repository identifiers live in separate variants, so a purl
/// and a repository URL never collide in a shared cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identifier {
    Package(PackageUrl),
    Repository(RepositoryUrl),
}

impl Identifier {
    pub fn kind(&self) -> IdentifierKind {
        match self {
            Identifier::Package(_) => IdentifierKind::Package,
            Identifier::Repository(_) => IdentifierKind::Repository,
        }
    }

    pub fn as_package(&self) -> Option<&PackageUrl> {
        match self {
            Identifier::Package(purl) => Some(purl),
            Identifier::Repository(_) => None,
        }
    }

    pub fn as_repository(&self) -> Option<&RepositoryUrl> {
        match self {
            Identifier::Repository(repo) => Some(repo),
            Identifier::Package(_) => None,
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Package(purl) => write!(f, "{}", purl),
            Identifier::Repository(repo) => write!(f, "{}", repo),
        }
    }
}

/// A parsed package URL (`pkg:type/namespace/name@version?qualifiers#subpath`).
///
/// Equality and hashing cover type, namespace, name and version only.
/// Qualifiers and subpath are kept for callers that need them but do not
/// split an identifier in two.
#[derive(Debug, Clone)]
pub struct PackageUrl {
    ty: String,
    namespace: Option<String>,
    name: String,
    version: Option<String>,
    qualifiers: Vec<(String, String)>,
    subpath: Option<String>,
}

impl PackageUrl {
    pub fn parse(raw: &str) -> Result<Self, ResolveError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ResolveError::NoIdentifier);
        }
        if raw.len() > MAX_IDENTIFIER_LENGTH {
            return Err(ResolveError::malformed(
                truncate(raw),
                "identifier exceeds maximum length",
            ));
        }

        let rest = match raw.split_once(':') {
            Some((scheme, rest)) if scheme.eq_ignore_ascii_case("pkg") => rest,
            _ => return Err(ResolveError::malformed(raw, "missing 'pkg:' scheme")),
        };

        let (rest, subpath) = match rest.rsplit_once('#') {
            Some((rest, subpath)) => {
                let subpath = subpath.trim_matches('/');
                (rest, (!subpath.is_empty()).then(|| decode(subpath)).transpose()?)
            }
            None => (rest, None),
        };

        let (rest, qualifiers) = match rest.rsplit_once('?') {
            Some((rest, query)) => (rest, parse_qualifiers(query)?),
            None => (rest, Vec::new()),
        };

        let rest = rest.trim_matches('/');
        let (ty, rest) = rest
            .split_once('/')
            .ok_or_else(|| ResolveError::malformed(raw, "missing package type or name"))?;
        let ty = ty.to_ascii_lowercase();
        if ty.is_empty() || !ty.chars().all(|c| c.is_ascii_alphanumeric() || ".+-".contains(c)) {
            return Err(ResolveError::malformed(raw, "invalid package type"));
        }

        // The version separator is the last '@' after the final '/', so an
        // unencoded npm scope such as '@angular/core' is left alone.
        let last_slash = rest.rfind('/').map(|i| i + 1).unwrap_or(0);
        let (path, version) = match rest[last_slash..].rfind('@') {
            Some(0) if last_slash == 0 => {
                return Err(ResolveError::malformed(raw, "missing package name"));
            }
            Some(at) => {
                let at = last_slash + at;
                let version = decode(&rest[at + 1..])?;
                (&rest[..at], (!version.is_empty()).then_some(version))
            }
            None => (rest, None),
        };

        let mut segments = path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(decode)
            .collect::<Result<Vec<_>, _>>()?;
        let name = segments
            .pop()
            .ok_or_else(|| ResolveError::malformed(raw, "missing package name"))?;
        let namespace = (!segments.is_empty()).then(|| segments.join("/"));

        let (namespace, name) = normalize_for_type(&ty, namespace, name);

        Ok(Self {
            ty,
            namespace,
            name,
            version,
            qualifiers,
            subpath,
        })
    }

    pub fn ty(&self) -> &str {
        &self.ty
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn qualifier(&self, key: &str) -> Option<&str> {
        self.qualifiers
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn subpath(&self) -> Option<&str> {
        self.subpath.as_deref()
    }

    /// Repository URL implied by a forge purl (`pkg:github/owner/repo`).
    pub fn forge_repository(&self) -> Option<RepositoryUrl> {
        let (_, host) = FORGE_TYPES.iter().find(|(ty, _)| *ty == self.ty)?;
        let owner = self.namespace.as_deref()?.split('/').next()?;
        Some(RepositoryUrl::from_parts(
            (*host).to_string(),
            owner.to_string(),
            self.name.clone(),
        ))
    }

    fn key(&self) -> (&str, Option<&str>, &str, Option<&str>) {
        (
            &self.ty,
            self.namespace.as_deref(),
            &self.name,
            self.version.as_deref(),
        )
    }
}

impl PartialEq for PackageUrl {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for PackageUrl {}

impl Hash for PackageUrl {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

/// Canonical form without qualifiers or subpath.
impl fmt::Display for PackageUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pkg:{}/", self.ty)?;
        if let Some(namespace) = &self.namespace {
            for segment in namespace.split('/') {
                write!(f, "{}/", urlencoding::encode(segment))?;
            }
        }
        write!(f, "{}", urlencoding::encode(&self.name))?;
        if let Some(version) = &self.version {
            write!(f, "@{}", urlencoding::encode(version))?;
        }
        Ok(())
    }
}

fn normalize_for_type(ty: &str, namespace: Option<String>, name: String) -> (Option<String>, String) {
    match ty {
        "github" | "bitbucket" => (
            namespace.map(|ns| ns.to_lowercase()),
            name.to_lowercase(),
        ),
        "pypi" => (namespace, name.to_lowercase().replace('_', "-")),
        _ => (namespace, name),
    }
}

fn parse_qualifiers(query: &str) -> Result<Vec<(String, String)>, ResolveError> {
    let mut qualifiers = Vec::new();
    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| ResolveError::malformed(query, "qualifier without '='"))?;
        let value = decode(value)?;
        if !value.is_empty() {
            qualifiers.push((key.to_ascii_lowercase(), value));
        }
    }
    qualifiers.sort();
    Ok(qualifiers)
}

fn decode(segment: &str) -> Result<String, ResolveError> {
    urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .map_err(|_| ResolveError::malformed(segment, "invalid percent-encoding"))
}

fn truncate(raw: &str) -> String {
    raw.chars().take(64).collect()
}

/// A source repository reduced to `host/owner/repo`.
///
/// `git@host:owner/repo.git`, `ssh://git@host/owner/repo`,
/// `git+https://host/owner/repo.git` and `https://host/owner/repo/tree/main`
/// all normalize to the same value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositoryUrl {
    host: String,
    owner: String,
    repo: String,
}

impl RepositoryUrl {
    pub fn normalize(raw: &str) -> Result<Self, ResolveError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ResolveError::NoIdentifier);
        }
        if trimmed.len() > MAX_IDENTIFIER_LENGTH {
            return Err(ResolveError::malformed(
                truncate(trimmed),
                "repository URL exceeds maximum length",
            ));
        }

        let mut candidate = trimmed.strip_prefix("git+").unwrap_or(trimmed).to_string();

        // scp-like syntax: git@host:owner/repo.git
        if !candidate.contains("://") {
            if let Some((user_host, path)) = candidate.split_once(':') {
                if user_host.contains('@') || !path.starts_with('/') {
                    let host = user_host.rsplit('@').next().unwrap_or(user_host);
                    candidate = format!("https://{}/{}", host, path.trim_start_matches('/'));
                }
            }
        }
        if !candidate.contains("://") {
            candidate = format!("https://{}", candidate);
        }

        let url = Url::parse(&candidate)
            .map_err(|e| ResolveError::malformed(trimmed, e.to_string()))?;
        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| ResolveError::malformed(trimmed, "repository URL has no host"))?
            .to_ascii_lowercase();

        let mut segments = url.path_segments().into_iter().flatten().filter(|s| !s.is_empty());
        let (owner, repo) = match (segments.next(), segments.next()) {
            (Some(owner), Some(repo)) => (owner, repo),
            _ => {
                return Err(ResolveError::malformed(
                    trimmed,
                    "repository URL needs an owner and a name",
                ))
            }
        };
        let repo = repo.strip_suffix(".git").unwrap_or(repo);
        if repo.is_empty() {
            return Err(ResolveError::malformed(trimmed, "empty repository name"));
        }

        Ok(Self::from_parts(host, decode(owner)?, decode(repo)?))
    }

    /// Owner and name are case-insensitive on the public forges.
    fn from_parts(host: String, owner: String, repo: String) -> Self {
        if FORGE_TYPES.iter().any(|(_, forge)| *forge == host) {
            Self {
                host,
                owner: owner.to_lowercase(),
                repo: repo.to_lowercase(),
            }
        } else {
            Self { host, owner, repo }
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn repo(&self) -> &str {
        &self.repo
    }

    pub fn https_url(&self) -> String {
        format!("https://{}", self)
    }
}

impl fmt::Display for RepositoryUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.host, self.owner, self.repo)
    }
}
