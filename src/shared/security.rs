use crate::shared::error::EnrichError;
use std::fs;
use std::path::Path;

/// Upper bound on the size of an input SBOM (100 MB).
pub const MAX_SBOM_SIZE: u64 = 100 * 1024 * 1024;

/// Checks that `path` is a regular, non-symlinked file no larger than
/// `max_size`, returning its size.
///
/// # Security
/// Uses `symlink_metadata()` so the link itself is inspected rather than
/// its target.
pub fn validate_input_file(path: &Path, max_size: u64) -> Result<u64, EnrichError> {
    let metadata = fs::symlink_metadata(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            EnrichError::InputNotFound {
                path: path.to_path_buf(),
            }
        } else {
            EnrichError::FileReadError {
                path: path.to_path_buf(),
                details: e.to_string(),
            }
        }
    })?;

    if metadata.is_symlink() {
        return Err(EnrichError::SecurityError {
            path: path.to_path_buf(),
            reason: "Input is a symbolic link".to_string(),
            hint: "Pass the path of the SBOM file itself".to_string(),
        });
    }

    if !metadata.is_file() {
        return Err(EnrichError::FileReadError {
            path: path.to_path_buf(),
            details: "not a regular file".to_string(),
        });
    }

    if metadata.len() > max_size {
        return Err(EnrichError::SecurityError {
            path: path.to_path_buf(),
            reason: format!(
                "File is too large ({} bytes). Maximum allowed size is {} bytes",
                metadata.len(),
                max_size
            ),
            hint: "Split the SBOM or enrich a smaller document".to_string(),
        });
    }

    Ok(metadata.len())
}

/// Rejects output paths that are existing symlinks or whose parent directory
/// does not exist.
pub fn validate_output_path(path: &Path) -> Result<(), EnrichError> {
    if let Ok(metadata) = fs::symlink_metadata(path) {
        if metadata.is_symlink() {
            return Err(EnrichError::SecurityError {
                path: path.to_path_buf(),
                reason: "Output path is a symbolic link".to_string(),
                hint: "Write to a regular file path instead".to_string(),
            });
        }
    }

    if let Some(parent) = path.parent() {
        if parent != Path::new("") && !parent.is_dir() {
            return Err(EnrichError::FileWriteError {
                path: path.to_path_buf(),
                details: format!("Parent directory does not exist: {}", parent.display()),
            });
        }
    }

    Ok(())
}
