use sbom_enricher::prelude::*;

/// Mock SbomReader for testing that serves a fixed document
pub struct MockSbomReader {
    pub content: String,
    pub should_fail: bool,
}

impl MockSbomReader {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            should_fail: false,
        }
    }

    pub fn with_failure() -> Self {
        Self {
            content: String::new(),
            should_fail: true,
        }
    }
}

impl SbomReader for MockSbomReader {
    fn read_sbom(&self, _input: &SbomInput) -> Result<Vec<u8>> {
        if self.should_fail {
            anyhow::bail!("Mock SBOM reader failure");
        }
        Ok(self.content.as_bytes().to_vec())
    }
}
