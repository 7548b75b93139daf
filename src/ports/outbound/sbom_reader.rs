use crate::shared::Result;
use std::path::PathBuf;

/// Where the input SBOM comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SbomInput {
    Path(PathBuf),
    Stdin,
}

impl SbomInput {
    /// `-` selects stdin, anything else is a file path.
    pub fn from_arg(arg: &str) -> Self {
        if arg == "-" {
            SbomInput::Stdin
        } else {
            SbomInput::Path(PathBuf::from(arg))
        }
    }
}

/// SbomReader port for reading the raw input document
pub trait SbomReader: Send + Sync {
    /// Reads the whole document
    ///
    /// # Errors
    /// Returns an error if the file is missing, unsafe to read (symlink,
    /// too large) or unreadable.
    fn read_sbom(&self, input: &SbomInput) -> Result<Vec<u8>>;
}
