use crate::enrichment::domain::{
    ComponentPath, ExternalReference, ExternalReferenceKind, Property, SbomComponent, SbomDocument,
    SbomFormat, Supplier,
};
use crate::shared::error::EnrichError;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const ANNOTATOR: &str = concat!("Tool: ", env!("CARGO_PKG_NAME"));

/// SPDX 2.x JSON document. Unmodelled fields are kept in `extra`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpdxDocumentModel {
    pub spdx_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_info: Option<SpdxCreationInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packages: Option<Vec<SpdxPackage>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpdxCreationInfo {
    #[serde(default)]
    pub creators: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpdxPackage {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_concluded: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub originator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_refs: Option<Vec<SpdxExternalRef>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<Vec<SpdxAnnotation>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpdxExternalRef {
    pub reference_category: String,
    pub reference_type: String,
    pub reference_locator: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpdxAnnotation {
    pub annotation_date: String,
    pub annotation_type: String,
    pub annotator: String,
    #[serde(default)]
    pub comment: String,
}

impl SpdxPackage {
    fn refs(&self) -> impl Iterator<Item = &SpdxExternalRef> {
        self.external_refs.iter().flatten()
    }
}

fn is_package_manager(category: &str) -> bool {
    matches!(category, "PACKAGE-MANAGER" | "PACKAGE_MANAGER")
}

impl SbomComponent for SpdxPackage {
    fn name(&self) -> &str {
        &self.name
    }

    fn purl(&self) -> Option<&str> {
        self.refs()
            .find(|r| is_package_manager(&r.reference_category) && r.reference_type == "purl")
            .map(|r| r.reference_locator.as_str())
    }

    fn bom_ref(&self) -> Option<&str> {
        self.extra.get("SPDXID").and_then(Value::as_str)
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn set_description(&mut self, description: &str) {
        self.description = Some(description.to_string());
    }

    fn set_license(&mut self, expression: &str) {
        self.license_concluded = Some(expression.to_string());
    }

    /// Homepage, a `git+` download location and non-package-manager
    /// external refs, as the format-neutral reference kinds.
    fn external_references(&self) -> Vec<ExternalReference> {
        let mut references = Vec::new();
        if let Some(homepage) = &self.homepage {
            references.push(ExternalReference::new(
                ExternalReferenceKind::Website,
                homepage.as_str(),
            ));
        }
        if let Some(location) = &self.download_location {
            if location.starts_with("git+") {
                references.push(ExternalReference::new(
                    ExternalReferenceKind::Vcs,
                    location.as_str(),
                ));
            }
        }
        for r in self.refs() {
            if is_package_manager(&r.reference_category) {
                continue;
            }
            let kind = match (r.reference_category.as_str(), r.reference_type.as_str()) {
                ("SECURITY", "advisory") => ExternalReferenceKind::Advisories,
                (_, other) => ExternalReferenceKind::from_cyclonedx(other),
            };
            references.push(ExternalReference {
                kind,
                url: r.reference_locator.clone(),
                comment: r.comment.clone(),
            });
        }
        references
    }

    fn add_external_reference(&mut self, reference: ExternalReference) {
        let (category, reference_type) = match reference.kind {
            ExternalReferenceKind::Website => {
                self.homepage = Some(reference.url);
                return;
            }
            ExternalReferenceKind::Advisories => ("SECURITY", "advisory"),
            kind => ("OTHER", kind.as_cyclonedx()),
        };
        self.external_refs
            .get_or_insert_with(Vec::new)
            .push(SpdxExternalRef {
                reference_category: category.to_string(),
                reference_type: reference_type.to_string(),
                reference_locator: reference.url,
                comment: reference.comment,
                extra: Map::new(),
            });
    }

    /// Properties are stored as `name=value` annotations made by this tool.
    fn properties(&self) -> Vec<Property> {
        self.annotations
            .iter()
            .flatten()
            .filter(|a| a.annotator == ANNOTATOR)
            .filter_map(|a| a.comment.split_once('='))
            .map(|(name, value)| Property::new(name, value))
            .collect()
    }

    fn add_property(&mut self, property: Property) {
        self.annotations
            .get_or_insert_with(Vec::new)
            .push(SpdxAnnotation {
                annotation_date: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
                annotation_type: "OTHER".to_string(),
                annotator: ANNOTATOR.to_string(),
                comment: format!("{}={}", property.name, property.value),
            });
    }

    fn set_supplier(&mut self, supplier: Supplier) {
        if let Some(name) = supplier.name {
            self.supplier = Some(format!("Organization: {}", name));
        }
    }

    fn set_author(&mut self, author: &str) {
        self.originator = Some(format!("Organization: {}", author));
    }
}

/// A decoded SPDX document. Packages are flat roots with no children.
#[derive(Debug, Clone)]
pub struct SpdxDocument {
    model: SpdxDocumentModel,
}

impl SpdxDocument {
    pub fn decode(value: Value) -> Result<Self, EnrichError> {
        let model = serde_json::from_value(value).map_err(|e| EnrichError::DecodeFailure {
            details: format!("invalid SPDX document: {}", e),
        })?;
        Ok(Self { model })
    }

    pub fn model(&self) -> &SpdxDocumentModel {
        &self.model
    }

    fn package(&self, path: &ComponentPath) -> Option<&SpdxPackage> {
        match path.indices() {
            [index] => self.model.packages.as_ref()?.get(*index),
            _ => None,
        }
    }

    fn package_mut(&mut self, path: &ComponentPath) -> Option<&mut SpdxPackage> {
        match path.indices() {
            [index] => self.model.packages.as_mut()?.get_mut(*index),
            _ => None,
        }
    }
}

impl SbomDocument for SpdxDocument {
    fn format(&self) -> SbomFormat {
        SbomFormat::Spdx
    }

    fn root_count(&self) -> usize {
        self.model.packages.as_ref().map_or(0, Vec::len)
    }

    fn child_count(&self, _path: &ComponentPath) -> usize {
        0
    }

    fn component(&self, path: &ComponentPath) -> Option<&dyn SbomComponent> {
        self.package(path).map(|p| p as &dyn SbomComponent)
    }

    fn component_mut(&mut self, path: &ComponentPath) -> Option<&mut dyn SbomComponent> {
        self.package_mut(path).map(|p| p as &mut dyn SbomComponent)
    }

    fn record_tool(&mut self, name: &str, version: &str) {
        let creator = format!("Tool: {}-{}", name, version);
        let info = self
            .model
            .creation_info
            .get_or_insert_with(SpdxCreationInfo::default);
        if !info.creators.contains(&creator) {
            info.creators.push(creator);
        }
    }

    fn encode(&self) -> Result<String, EnrichError> {
        serde_json::to_string_pretty(&self.model).map_err(|e| EnrichError::EncodeFailure {
            details: e.to_string(),
        })
    }
}
