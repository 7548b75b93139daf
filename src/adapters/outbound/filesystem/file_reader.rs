use crate::ports::outbound::{SbomInput, SbomReader};
use crate::shared::error::EnrichError;
use crate::shared::security::{validate_input_file, MAX_SBOM_SIZE};
use crate::shared::Result;
use std::fs;
use std::io::{self, Read};
use std::path::Path;

/// FileSystemReader adapter reading the input SBOM from a file or stdin
///
/// Files go through the same safety checks as before any read: no
/// symlinks, regular files only, bounded size. Stdin is capped at the same
/// size.
pub struct FileSystemReader {
    max_size: u64,
}

impl FileSystemReader {
    pub fn new() -> Self {
        Self {
            max_size: MAX_SBOM_SIZE,
        }
    }

    pub fn with_max_size(max_size: u64) -> Self {
        Self { max_size }
    }

    fn read_file(&self, path: &Path) -> Result<Vec<u8>> {
        validate_input_file(path, self.max_size)?;
        let bytes = fs::read(path).map_err(|e| EnrichError::FileReadError {
            path: path.to_path_buf(),
            details: e.to_string(),
        })?;
        Ok(bytes)
    }

    fn read_stdin(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        io::stdin()
            .lock()
            .take(self.max_size + 1)
            .read_to_end(&mut bytes)
            .map_err(|e| EnrichError::FileReadError {
                path: "<stdin>".into(),
                details: e.to_string(),
            })?;

        if bytes.len() as u64 > self.max_size {
            return Err(EnrichError::SecurityError {
                path: "<stdin>".into(),
                reason: format!("Input exceeds the maximum of {} bytes", self.max_size),
                hint: "Split the SBOM or enrich a smaller document".to_string(),
            }
            .into());
        }
        Ok(bytes)
    }
}

impl Default for FileSystemReader {
    fn default() -> Self {
        Self::new()
    }
}

impl SbomReader for FileSystemReader {
    fn read_sbom(&self, input: &SbomInput) -> Result<Vec<u8>> {
        match input {
            SbomInput::Path(path) => self.read_file(path),
            SbomInput::Stdin => self.read_stdin(),
        }
    }
}
