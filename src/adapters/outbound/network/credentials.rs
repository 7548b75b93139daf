use crate::ports::outbound::CredentialProvider;
use crate::shared::error::EnrichError;
use std::fmt;

/// A bearer-style token read from the environment.
///
/// The header value is `"<scheme> <token>"`; `Debug` never prints the token.
#[derive(Clone)]
pub struct TokenCredentials {
    scheme: String,
    token: String,
}

impl TokenCredentials {
    pub fn new(scheme: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            token: token.into(),
        }
    }

    /// Reads the token from `variable`; a missing or blank value is an error
    /// naming `source_name`.
    pub fn from_env(variable: &str, scheme: &str, source_name: &str) -> Result<Self, EnrichError> {
        Self::from_value(std::env::var(variable).ok(), variable, scheme, source_name)
    }

    fn from_value(
        value: Option<String>,
        variable: &str,
        scheme: &str,
        source_name: &str,
    ) -> Result<Self, EnrichError> {
        match value.map(|v| v.trim().to_string()) {
            Some(token) if !token.is_empty() => Ok(Self::new(scheme, token)),
            _ => Err(EnrichError::MissingCredentials {
                source_name: source_name.to_string(),
                variable: variable.to_string(),
            }),
        }
    }
}

impl CredentialProvider for TokenCredentials {
    fn authorization_header(&self) -> String {
        format!("{} {}", self.scheme, self.token)
    }
}

impl fmt::Debug for TokenCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCredentials")
            .field("scheme", &self.scheme)
            .field("token", &"<redacted>")
            .finish()
    }
}
