use crate::enrichment::domain::{
    ComponentPath, ExternalReference, ExternalReferenceKind, Property, Rating, SbomComponent,
    SbomDocument, SbomFormat, Supplier, Vulnerability,
};
use crate::shared::error::EnrichError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// CycloneDX JSON document.
///
/// Only the fields enrichment reads or writes are modelled; everything else
/// is carried through `extra` untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CycloneDxBom {
    pub bom_format: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<CdxMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub components: Option<Vec<CdxComponent>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vulnerabilities: Option<Vec<Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CdxMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<CdxComponent>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CdxComponent {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplier: Option<CdxOrganization>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub licenses: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purl: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_references: Option<Vec<CdxExternalReference>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Vec<CdxProperty>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub components: Option<Vec<CdxComponent>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CdxOrganization {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CdxExternalReference {
    #[serde(rename = "type")]
    pub reference_type: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CdxProperty {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

impl SbomComponent for CdxComponent {
    fn name(&self) -> &str {
        &self.name
    }

    fn purl(&self) -> Option<&str> {
        self.purl.as_deref()
    }

    fn bom_ref(&self) -> Option<&str> {
        self.extra.get("bom-ref").and_then(Value::as_str)
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn set_description(&mut self, description: &str) {
        self.description = Some(description.to_string());
    }

    fn set_license(&mut self, expression: &str) {
        self.licenses = Some(vec![json!({ "expression": expression })]);
    }

    fn external_references(&self) -> Vec<ExternalReference> {
        self.external_references
            .iter()
            .flatten()
            .map(|r| ExternalReference {
                kind: ExternalReferenceKind::from_cyclonedx(&r.reference_type),
                url: r.url.clone(),
                comment: r.comment.clone(),
            })
            .collect()
    }

    fn add_external_reference(&mut self, reference: ExternalReference) {
        self.external_references
            .get_or_insert_with(Vec::new)
            .push(CdxExternalReference {
                reference_type: reference.kind.as_cyclonedx().to_string(),
                url: reference.url,
                comment: reference.comment,
                extra: Map::new(),
            });
    }

    fn properties(&self) -> Vec<Property> {
        self.properties
            .iter()
            .flatten()
            .map(|p| Property::new(p.name.as_str(), p.value.as_str()))
            .collect()
    }

    fn add_property(&mut self, property: Property) {
        self.properties.get_or_insert_with(Vec::new).push(CdxProperty {
            name: property.name,
            value: property.value,
        });
    }

    fn set_supplier(&mut self, supplier: Supplier) {
        self.supplier = Some(CdxOrganization {
            name: supplier.name,
            url: (!supplier.urls.is_empty()).then_some(supplier.urls),
            extra: Map::new(),
        });
    }

    fn set_author(&mut self, author: &str) {
        self.author = Some(author.to_string());
    }
}

/// A decoded CycloneDX document.
///
/// Roots are `metadata.component` (when present) followed by the top-level
/// `components`; nested `components` are children.
#[derive(Debug, Clone)]
pub struct CycloneDxDocument {
    bom: CycloneDxBom,
}

impl CycloneDxDocument {
    pub fn new(bom: CycloneDxBom) -> Self {
        Self { bom }
    }

    pub fn decode(value: Value) -> Result<Self, EnrichError> {
        let bom = serde_json::from_value(value).map_err(|e| EnrichError::DecodeFailure {
            details: format!("invalid CycloneDX document: {}", e),
        })?;
        Ok(Self::new(bom))
    }

    pub fn bom(&self) -> &CycloneDxBom {
        &self.bom
    }

    fn has_metadata_component(&self) -> bool {
        self.bom
            .metadata
            .as_ref()
            .is_some_and(|m| m.component.is_some())
    }

    fn top_level_len(&self) -> usize {
        self.bom.components.as_ref().map_or(0, Vec::len)
    }

    fn root(&self, index: usize) -> Option<&CdxComponent> {
        if self.has_metadata_component() {
            if index == 0 {
                return self.bom.metadata.as_ref()?.component.as_ref();
            }
            return self.bom.components.as_ref()?.get(index - 1);
        }
        self.bom.components.as_ref()?.get(index)
    }

    fn root_mut(&mut self, index: usize) -> Option<&mut CdxComponent> {
        if self.has_metadata_component() {
            if index == 0 {
                return self.bom.metadata.as_mut()?.component.as_mut();
            }
            return self.bom.components.as_mut()?.get_mut(index - 1);
        }
        self.bom.components.as_mut()?.get_mut(index)
    }

    fn find(&self, path: &ComponentPath) -> Option<&CdxComponent> {
        let (first, rest) = path.indices().split_first()?;
        let mut current = self.root(*first)?;
        for index in rest {
            current = current.components.as_ref()?.get(*index)?;
        }
        Some(current)
    }

    fn find_mut(&mut self, path: &ComponentPath) -> Option<&mut CdxComponent> {
        let (first, rest) = path.indices().split_first()?;
        let mut current = self.root_mut(*first)?;
        for index in rest {
            current = current.components.as_mut()?.get_mut(*index)?;
        }
        Some(current)
    }

    /// CycloneDX 1.5 replaced the `tools` array with an object.
    fn uses_tool_object(&self) -> bool {
        let minor = self
            .bom
            .spec_version
            .as_deref()
            .and_then(|v| v.strip_prefix("1."))
            .and_then(|m| m.parse::<u32>().ok());
        minor.is_some_and(|m| m >= 5)
    }
}

impl SbomDocument for CycloneDxDocument {
    fn format(&self) -> SbomFormat {
        SbomFormat::CycloneDx
    }

    fn root_count(&self) -> usize {
        usize::from(self.has_metadata_component()) + self.top_level_len()
    }

    fn child_count(&self, path: &ComponentPath) -> usize {
        self.find(path)
            .and_then(|c| c.components.as_ref())
            .map_or(0, Vec::len)
    }

    fn component(&self, path: &ComponentPath) -> Option<&dyn SbomComponent> {
        self.find(path).map(|c| c as &dyn SbomComponent)
    }

    fn component_mut(&mut self, path: &ComponentPath) -> Option<&mut dyn SbomComponent> {
        self.find_mut(path).map(|c| c as &mut dyn SbomComponent)
    }

    fn record_tool(&mut self, name: &str, version: &str) {
        let object_form = self.uses_tool_object();
        let metadata = self.bom.metadata.get_or_insert_with(CdxMetadata::default);
        let tools = metadata.tools.get_or_insert_with(|| {
            if object_form {
                json!({ "components": [] })
            } else {
                json!([])
            }
        });

        let list = match tools {
            Value::Array(list) => Some(list),
            Value::Object(map) => map
                .entry("components")
                .or_insert_with(|| json!([]))
                .as_array_mut(),
            _ => None,
        };
        let Some(list) = list else {
            return;
        };

        let present = list
            .iter()
            .any(|t| t.get("name").and_then(Value::as_str) == Some(name));
        if !present {
            let entry = if object_form {
                json!({ "type": "application", "name": name, "version": version })
            } else {
                json!({ "name": name, "version": version })
            };
            list.push(entry);
        }
    }

    fn add_vulnerability(&mut self, vulnerability: Vulnerability) -> bool {
        let affects = vulnerability.affects.as_deref();
        let list = self.bom.vulnerabilities.get_or_insert_with(Vec::new);
        let present = list.iter().any(|v| {
            v.get("id").and_then(Value::as_str) == Some(vulnerability.id.as_str())
                && affected_ref(v) == affects
        });
        if present {
            return false;
        }
        match serde_json::to_value(CdxVulnerability::from(&vulnerability)) {
            Ok(entry) => {
                list.push(entry);
                true
            }
            Err(_) => false,
        }
    }

    fn encode(&self) -> Result<String, EnrichError> {
        serde_json::to_string_pretty(&self.bom).map_err(|e| EnrichError::EncodeFailure {
            details: e.to_string(),
        })
    }
}

fn affected_ref(vulnerability: &Value) -> Option<&str> {
    vulnerability
        .get("affects")?
        .as_array()?
        .first()?
        .get("ref")?
        .as_str()
}

/// Entry written to the top-level `vulnerabilities` array.
#[derive(Debug, Serialize)]
struct CdxVulnerability<'a> {
    id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    created: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    updated: Option<&'a str>,
    #[serde(skip_serializing_if = "is_empty")]
    cwes: &'a [u32],
    #[serde(skip_serializing_if = "Vec::is_empty")]
    references: Vec<CdxVulnerabilityReference<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    ratings: Vec<CdxRating<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    advisories: Vec<CdxAdvisory<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    affects: Vec<CdxAffect<'a>>,
}

fn is_empty(values: &&[u32]) -> bool {
    values.is_empty()
}

#[derive(Debug, Serialize)]
struct CdxSource<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct CdxVulnerabilityReference<'a> {
    id: &'a str,
    source: CdxSource<'a>,
}

#[derive(Debug, Serialize)]
struct CdxRating<'a> {
    source: CdxSource<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    score: Option<f64>,
    severity: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    method: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    vector: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct CdxAdvisory<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
    url: &'a str,
}

#[derive(Debug, Serialize)]
struct CdxAffect<'a> {
    #[serde(rename = "ref")]
    bom_ref: &'a str,
}

impl<'a> From<&'a Vulnerability> for CdxVulnerability<'a> {
    fn from(v: &'a Vulnerability) -> Self {
        Self {
            id: &v.id,
            description: v.description.as_deref(),
            detail: v.detail.as_deref(),
            created: v.created.as_deref(),
            updated: v.updated.as_deref(),
            cwes: &v.cwes,
            references: v
                .references
                .iter()
                .map(|r| CdxVulnerabilityReference {
                    id: &r.id,
                    source: CdxSource {
                        name: &r.source,
                        url: None,
                    },
                })
                .collect(),
            ratings: v.ratings.iter().map(CdxRating::from).collect(),
            advisories: v
                .advisories
                .iter()
                .map(|a| CdxAdvisory {
                    title: a.title.as_deref(),
                    url: &a.url,
                })
                .collect(),
            affects: v
                .affects
                .iter()
                .map(|r| CdxAffect { bom_ref: r })
                .collect(),
        }
    }
}

impl<'a> From<&'a Rating> for CdxRating<'a> {
    fn from(rating: &'a Rating) -> Self {
        Self {
            source: CdxSource {
                name: &rating.source,
                url: rating.source_url.as_deref(),
            },
            score: rating.score,
            severity: rating.severity.as_str(),
            method: rating.method.as_deref(),
            vector: rating.vector.as_deref(),
        }
    }
}
