//! Secure credential handling for the oracle.
//!
//! API keys and bearer tokens are wrapped as soon as they are read so that
//! they cannot be printed by accident:
//!
//! - **No accidental logging**: `Debug`/`Display` show `[REDACTED]`
//! - **Zeroed on drop**: handled by the `secrecy` crate
//! - **Explicit exposure**: `.expose()` at the point of use only
//!
//! ## Usage
//!
//! ```ignore
//! use readiness_runtime::oracle::{Credential, CredentialSource};
//!
//! let key = Credential::from_env("GEMINI_API_KEY", "Gemini API key")?;
//! request.header("x-goog-api-key", key.expose());
//! ```

use secrecy::{ExposeSecret, SecretString};
use std::fmt;

use super::OracleError;

/// Where a credential came from.
///
/// Safe to log; useful when diagnosing configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    /// Configuration file
    Config,
    /// Environment variable
    Environment,
    /// Printed by an external command
    Command,
    /// Provided programmatically
    Programmatic,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::Config => write!(f, "config"),
            CredentialSource::Environment => write!(f, "environment"),
            CredentialSource::Command => write!(f, "command"),
            CredentialSource::Programmatic => write!(f, "programmatic"),
        }
    }
}

/// An API key or bearer token.
pub struct Credential {
    value: SecretString,
    source: CredentialSource,
    name: &'static str,
}

impl Credential {
    /// Wrap a value. It cannot be logged after this point.
    pub fn new(value: impl Into<String>, source: CredentialSource, name: &'static str) -> Self {
        Self {
            value: SecretString::from(value.into()),
            source,
            name,
        }
    }

    /// Load a credential from an environment variable.
    pub fn from_env(env_var: &str, name: &'static str) -> Result<Self, OracleError> {
        std::env::var(env_var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(|v| Self::new(v, CredentialSource::Environment, name))
            .ok_or_else(|| {
                OracleError::Unavailable(format!(
                    "{} not set: configure '{}' environment variable",
                    name, env_var
                ))
            })
    }

    /// Use a configured value, falling back to an environment variable.
    pub fn from_config_or_env(
        configured: Option<&str>,
        env_var: &str,
        name: &'static str,
    ) -> Result<Self, OracleError> {
        match configured.filter(|v| !v.trim().is_empty()) {
            Some(value) => Ok(Self::new(value, CredentialSource::Config, name)),
            None => Self::from_env(env_var, name),
        }
    }

    /// The raw value. Call only where the credential is actually sent.
    pub fn expose(&self) -> &str {
        self.value.expose_secret()
    }

    pub fn is_empty(&self) -> bool {
        self.value.expose_secret().trim().is_empty()
    }

    pub fn source(&self) -> CredentialSource {
        self.source
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("value", &"[REDACTED]")
            .field("source", &self.source)
            .field("name", &self.name)
            .finish()
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} from {} [REDACTED]", self.name, self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_redacted_in_debug() {
        let secret = "ya29.super-secret-token";
        let cred = Credential::new(secret, CredentialSource::Programmatic, "Bearer token");

        let debug = format!("{:?}", cred);
        assert!(!debug.contains(secret), "Secret exposed in Debug!");
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_credential_redacted_in_display() {
        let secret = "AIza-super-secret-key";
        let cred = Credential::new(secret, CredentialSource::Config, "Gemini API key");

        let display = format!("{}", cred);
        assert!(!display.contains(secret), "Secret exposed in Display!");
        assert!(display.contains("Gemini API key"));
        assert!(display.contains("config"));
    }

    #[test]
    fn test_credential_expose() {
        let cred = Credential::new("value", CredentialSource::Command, "token");
        assert_eq!(cred.expose(), "value");
        assert_eq!(cred.source(), CredentialSource::Command);
        assert!(Credential::new("  ", CredentialSource::Command, "token").is_empty());
    }

    #[test]
    fn test_configured_value_wins() {
        let cred =
            Credential::from_config_or_env(Some("config-key"), "READINESS_TEST_UNSET_1", "key")
                .unwrap();
        assert_eq!(cred.expose(), "config-key");
        assert_eq!(cred.source(), CredentialSource::Config);
    }

    #[test]
    fn test_env_fallback() {
        std::env::set_var("READINESS_TEST_KEY_FALLBACK", "env-key");
        let cred =
            Credential::from_config_or_env(Some(""), "READINESS_TEST_KEY_FALLBACK", "key").unwrap();
        assert_eq!(cred.expose(), "env-key");
        assert_eq!(cred.source(), CredentialSource::Environment);
        std::env::remove_var("READINESS_TEST_KEY_FALLBACK");
    }

    #[test]
    fn test_missing_credential_names_variable() {
        let err = Credential::from_config_or_env(None, "READINESS_TEST_UNSET_2", "Gemini API key")
            .unwrap_err();
        assert!(matches!(err, OracleError::Unavailable(_)));
        assert!(err.to_string().contains("READINESS_TEST_UNSET_2"));
    }
}
