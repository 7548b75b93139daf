use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the CLI application.
///
/// These codes allow CI systems to distinguish between different
/// types of failures and successes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success - the document was enriched and written (possibly partially)
    Success = 0,
    /// Invalid command-line arguments (clap parsing errors)
    InvalidArguments = 2,
    /// Application error (decode failure, file I/O error, missing credentials, etc.)
    ApplicationError = 3,
    /// The run was cancelled; the partially enriched document was still written
    Cancelled = 4,
}

impl ExitCode {
    /// Convert to i32 for use with std::process::exit
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitCode::Success => write!(f, "Success (0)"),
            ExitCode::InvalidArguments => write!(f, "Invalid Arguments (2)"),
            ExitCode::ApplicationError => write!(f, "Application Error (3)"),
            ExitCode::Cancelled => write!(f, "Cancelled (4)"),
        }
    }
}

/// Classified failure of a single remote lookup.
///
/// `NotFound`, `Rejected`, `Decode` and `Cancelled` are terminal on the first
/// occurrence. `RateLimited` and `Transient` are only returned once the retry
/// budget has been spent.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("no remote record for {target}")]
    NotFound { target: String },

    #[error("rate limited by {target} after {attempts} attempts")]
    RateLimited { target: String, attempts: u32 },

    #[error("transient failure from {target} after {attempts} attempts: {details}")]
    Transient {
        target: String,
        attempts: u32,
        details: String,
    },

    #[error("request to {target} rejected with status {status}")]
    Rejected { target: String, status: u16 },

    #[error("unexpected response body from {target}: {details}")]
    Decode { target: String, details: String },

    #[error("request to {target} cancelled")]
    Cancelled { target: String },
}

impl FetchError {
    /// True for the failures that were retried before giving up.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FetchError::RateLimited { .. } | FetchError::Transient { .. }
        )
    }
}

/// Failure to derive a lookup identifier from a component.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("malformed identifier '{value}': {reason}")]
    MalformedIdentifier { value: String, reason: String },

    #[error("component has no package identifier or repository reference")]
    NoIdentifier,

    #[error("no source repository known for {purl}")]
    NoRepository { purl: String },

    #[error("repository lookup failed: {0}")]
    Lookup(#[from] FetchError),
}

impl ResolveError {
    pub fn malformed(value: impl Into<String>, reason: impl Into<String>) -> Self {
        ResolveError::MalformedIdentifier {
            value: value.into(),
            reason: reason.into(),
        }
    }
}

/// Application-specific errors for SBOM enrichment.
///
/// Uses thiserror to derive Display and Error traits automatically,
/// reducing boilerplate while maintaining user-friendly error messages.
#[derive(Debug, Error)]
pub enum EnrichError {
    #[error("Input SBOM not found: {path}\n\n💡 Hint: Pass the path of a CycloneDX or SPDX JSON document, or '-' to read stdin")]
    InputNotFound { path: PathBuf },

    #[error("Failed to decode SBOM: {details}\n\n💡 Hint: Only CycloneDX JSON and SPDX 2.x JSON documents are supported")]
    DecodeFailure { details: String },

    #[error("Failed to encode SBOM: {details}")]
    EncodeFailure { details: String },

    #[error("Failed to read file: {path}\nDetails: {details}\n\n💡 Hint: Please verify that the file exists and you have read permissions")]
    FileReadError { path: PathBuf, details: String },

    #[error("Failed to write to file: {path}\nDetails: {details}\n\n💡 Hint: Please verify that the directory exists and you have write permissions")]
    FileWriteError { path: PathBuf, details: String },

    #[error("Missing credentials for {source_name}: environment variable {variable} is not set\n\n💡 Hint: Export {variable} before enriching with {source_name}")]
    MissingCredentials {
        source_name: String,
        variable: String,
    },

    #[error("Security violation: {path}\nReason: {reason}\n\n💡 Hint: {hint}")]
    SecurityError {
        path: PathBuf,
        reason: String,
        hint: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_values() {
        assert_eq!(ExitCode::Success.as_i32(), 0);
        assert_eq!(ExitCode::InvalidArguments.as_i32(), 2);
        assert_eq!(ExitCode::ApplicationError.as_i32(), 3);
        assert_eq!(ExitCode::Cancelled.as_i32(), 4);
    }

    #[test]
    fn test_exit_code_display() {
        assert_eq!(format!("{}", ExitCode::Success), "Success (0)");
        assert_eq!(format!("{}", ExitCode::Cancelled), "Cancelled (4)");
    }

    #[test]
    fn test_fetch_error_retryable_classes() {
        let rate_limited = FetchError::RateLimited {
            target: "x".into(),
            attempts: 5,
        };
        let not_found = FetchError::NotFound { target: "x".into() };
        assert!(rate_limited.is_retryable());
        assert!(!not_found.is_retryable());
    }

    #[test]
    fn test_resolve_error_wraps_fetch_error() {
        let err: ResolveError = FetchError::Rejected {
            target: "https://api.deps.dev".into(),
            status: 403,
        }
        .into();
        assert!(err.to_string().contains("403"));
    }

    #[test]
    fn test_decode_failure_display() {
        let error = EnrichError::DecodeFailure {
            details: "expected value at line 1".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("Failed to decode SBOM"));
        assert!(display.contains("💡 Hint:"));
    }

    #[test]
    fn test_missing_credentials_display() {
        let error = EnrichError::MissingCredentials {
            source_name: "snyk".to_string(),
            variable: "SNYK_TOKEN".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("SNYK_TOKEN"));
        assert!(display.contains("snyk"));
    }

    #[test]
    fn test_security_error_display() {
        let error = EnrichError::SecurityError {
            path: PathBuf::from("/test/symlink"),
            reason: "Symbolic links are not allowed".to_string(),
            hint: "Use a regular file instead".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("Security violation"));
        assert!(display.contains("/test/symlink"));
    }
}
