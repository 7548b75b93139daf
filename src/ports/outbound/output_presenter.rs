use crate::shared::Result;

/// OutputPresenter port for presenting final output
///
/// This port abstracts the output destination (stdout, file, etc.)
/// where the enriched SBOM is written.
pub trait OutputPresenter {
    /// Presents the encoded SBOM
    ///
    /// # Errors
    /// Returns an error if:
    /// - Writing to the output destination fails
    /// - The output path is unsafe (symlink, missing parent directory)
    fn present(&self, content: &str) -> Result<()>;
}
