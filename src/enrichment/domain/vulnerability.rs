/// A known vulnerability affecting one component, recorded at document
/// level by formats that have a place for it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Vulnerability {
    pub id: String,
    /// Reference of the affected component inside the document
    pub affects: Option<String>,
    pub description: Option<String>,
    pub detail: Option<String>,
    /// RFC 3339 timestamps
    pub created: Option<String>,
    pub updated: Option<String>,
    pub cwes: Vec<u32>,
    pub references: Vec<VulnerabilityReference>,
    pub advisories: Vec<Advisory>,
    pub ratings: Vec<Rating>,
}

impl Vulnerability {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Copy of this finding attributed to the component `bom_ref`.
    pub fn affecting(&self, bom_ref: &str) -> Self {
        Self {
            affects: Some(bom_ref.to_string()),
            ..self.clone()
        }
    }
}

/// The same issue under another database's identifier (`CVE-2021-1234`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VulnerabilityReference {
    pub id: String,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advisory {
    pub title: Option<String>,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rating {
    pub source: String,
    pub source_url: Option<String>,
    pub score: Option<f64>,
    pub severity: Severity,
    pub method: Option<String>,
    pub vector: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Unknown,
}

impl Severity {
    pub fn parse(level: &str) -> Self {
        match level.to_ascii_lowercase().as_str() {
            "critical" => Severity::Critical,
            "high" => Severity::High,
            "medium" | "moderate" => Severity::Medium,
            "low" => Severity::Low,
            _ => Severity::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
            Severity::Unknown => "unknown",
        }
    }
}
