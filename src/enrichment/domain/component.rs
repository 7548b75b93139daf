use std::fmt;

/// Address of one component inside a document tree.
///
/// The first index selects a root slot, each following index selects a
/// child of the previous component. Handles stay valid as long as the
/// document's shape is not changed, which enrichment never does.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentPath(Vec<usize>);

impl ComponentPath {
    pub fn root(index: usize) -> Self {
        Self(vec![index])
    }

    pub fn child(&self, index: usize) -> Self {
        let mut indices = Vec::with_capacity(self.0.len() + 1);
        indices.extend_from_slice(&self.0);
        indices.push(index);
        Self(indices)
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for ComponentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|i| i.to_string()).collect();
        write!(f, "/{}", parts.join("/"))
    }
}

/// Kinds of external reference the enrichers attach.
///
/// Each document format maps these onto its own vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExternalReferenceKind {
    Website,
    Vcs,
    Distribution,
    Documentation,
    IssueTracker,
    Advisories,
    Other,
}

impl ExternalReferenceKind {
    /// CycloneDX `externalReferences[].type` value.
    pub fn as_cyclonedx(&self) -> &'static str {
        match self {
            ExternalReferenceKind::Website => "website",
            ExternalReferenceKind::Vcs => "vcs",
            ExternalReferenceKind::Distribution => "distribution",
            ExternalReferenceKind::Documentation => "documentation",
            ExternalReferenceKind::IssueTracker => "issue-tracker",
            ExternalReferenceKind::Advisories => "advisories",
            ExternalReferenceKind::Other => "other",
        }
    }

    pub fn from_cyclonedx(value: &str) -> Self {
        match value {
            "website" => ExternalReferenceKind::Website,
            "vcs" => ExternalReferenceKind::Vcs,
            "distribution" => ExternalReferenceKind::Distribution,
            "documentation" => ExternalReferenceKind::Documentation,
            "issue-tracker" => ExternalReferenceKind::IssueTracker,
            "advisories" => ExternalReferenceKind::Advisories,
            _ => ExternalReferenceKind::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalReference {
    pub kind: ExternalReferenceKind,
    pub url: String,
    pub comment: Option<String>,
}

impl ExternalReference {
    pub fn new(kind: ExternalReferenceKind, url: impl Into<String>) -> Self {
        Self {
            kind,
            url: url.into(),
            comment: None,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// A free-form `name = value` annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    pub name: String,
    pub value: String,
}

impl Property {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// The organisation that supplies a component.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Supplier {
    pub name: Option<String>,
    pub urls: Vec<String>,
}
