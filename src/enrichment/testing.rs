//! In-memory document used by unit tests.

use crate::enrichment::domain::{
    ComponentPath, ExternalReference, Property, SbomComponent, SbomDocument, SbomFormat, Supplier,
    Vulnerability,
};
use crate::shared::error::EnrichError;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FakeComponent {
    pub name: String,
    pub purl: Option<String>,
    pub bom_ref: Option<String>,
    pub description: Option<String>,
    pub license: Option<String>,
    pub references: Vec<ExternalReference>,
    pub properties: Vec<Property>,
    pub supplier: Option<Supplier>,
    pub author: Option<String>,
    pub children: Vec<FakeComponent>,
}

impl FakeComponent {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn with_purl(mut self, purl: &str) -> Self {
        self.purl = Some(purl.to_string());
        self
    }

    pub fn with_bom_ref(mut self, bom_ref: &str) -> Self {
        self.bom_ref = Some(bom_ref.to_string());
        self
    }

    pub fn with_reference(mut self, reference: ExternalReference) -> Self {
        self.references.push(reference);
        self
    }

    pub fn with_child(mut self, child: FakeComponent) -> Self {
        self.children.push(child);
        self
    }
}

impl SbomComponent for FakeComponent {
    fn name(&self) -> &str {
        &self.name
    }

    fn purl(&self) -> Option<&str> {
        self.purl.as_deref()
    }

    fn bom_ref(&self) -> Option<&str> {
        self.bom_ref.as_deref()
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn set_description(&mut self, description: &str) {
        self.description = Some(description.to_string());
    }

    fn set_license(&mut self, expression: &str) {
        self.license = Some(expression.to_string());
    }

    fn external_references(&self) -> Vec<ExternalReference> {
        self.references.clone()
    }

    fn add_external_reference(&mut self, reference: ExternalReference) {
        self.references.push(reference);
    }

    fn properties(&self) -> Vec<Property> {
        self.properties.clone()
    }

    fn add_property(&mut self, property: Property) {
        self.properties.push(property);
    }

    fn set_supplier(&mut self, supplier: Supplier) {
        self.supplier = Some(supplier);
    }

    fn set_author(&mut self, author: &str) {
        self.author = Some(author.to_string());
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakeDocument {
    pub roots: Vec<FakeComponent>,
    pub tools: Vec<String>,
    pub vulnerabilities: Vec<Vulnerability>,
}

impl FakeDocument {
    pub fn new(roots: Vec<FakeComponent>) -> Self {
        Self {
            roots,
            tools: Vec::new(),
            vulnerabilities: Vec::new(),
        }
    }

    fn find(&self, path: &ComponentPath) -> Option<&FakeComponent> {
        let (first, rest) = path.indices().split_first()?;
        let mut current = self.roots.get(*first)?;
        for index in rest {
            current = current.children.get(*index)?;
        }
        Some(current)
    }

    fn find_mut(&mut self, path: &ComponentPath) -> Option<&mut FakeComponent> {
        let (first, rest) = path.indices().split_first()?;
        let mut current = self.roots.get_mut(*first)?;
        for index in rest {
            current = current.children.get_mut(*index)?;
        }
        Some(current)
    }
}

impl SbomDocument for FakeDocument {
    fn format(&self) -> SbomFormat {
        SbomFormat::CycloneDx
    }

    fn root_count(&self) -> usize {
        self.roots.len()
    }

    fn child_count(&self, path: &ComponentPath) -> usize {
        self.find(path).map(|c| c.children.len()).unwrap_or(0)
    }

    fn component(&self, path: &ComponentPath) -> Option<&dyn SbomComponent> {
        self.find(path).map(|c| c as &dyn SbomComponent)
    }

    fn component_mut(&mut self, path: &ComponentPath) -> Option<&mut dyn SbomComponent> {
        self.find_mut(path).map(|c| c as &mut dyn SbomComponent)
    }

    fn record_tool(&mut self, name: &str, version: &str) {
        let tool = format!("{}-{}", name, version);
        if !self.tools.contains(&tool) {
            self.tools.push(tool);
        }
    }

    fn add_vulnerability(&mut self, vulnerability: Vulnerability) -> bool {
        if self.vulnerabilities.contains(&vulnerability) {
            return false;
        }
        self.vulnerabilities.push(vulnerability);
        true
    }

    fn encode(&self) -> Result<String, EnrichError> {
        Ok(format!("{:?}", self.roots))
    }
}
