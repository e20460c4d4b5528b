//! Bearer token sources for the Vertex transport.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::fmt;

use super::secrets::{Credential, CredentialSource};
use super::OracleError;

const TOKEN_NAME: &str = "OAuth access token";

/// Something that can hand out a bearer token.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn token(&self) -> Result<Credential, OracleError>;

    /// Where tokens come from, without revealing them.
    fn describe(&self) -> String;
}

/// A fixed token from configuration or the environment.
pub struct StaticTokenSource {
    value: SecretString,
    source: CredentialSource,
}

impl StaticTokenSource {
    pub fn new(value: impl Into<String>, source: CredentialSource) -> Self {
        Self {
            value: SecretString::from(value.into()),
            source,
        }
    }
}

impl fmt::Debug for StaticTokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticTokenSource")
            .field("value", &"[REDACTED]")
            .field("source", &self.source)
            .finish()
    }
}

#[async_trait]
impl TokenSource for StaticTokenSource {
    async fn token(&self) -> Result<Credential, OracleError> {
        let credential = Credential::new(self.value.expose_secret(), self.source, TOKEN_NAME);
        if credential.is_empty() {
            return Err(OracleError::Unavailable(format!("{} is empty", TOKEN_NAME)));
        }
        Ok(credential)
    }

    fn describe(&self) -> String {
        format!("static token from {}", self.source)
    }
}

/// Runs a command (by default `gcloud auth print-access-token`) and reads
/// the token from its stdout.
#[derive(Debug, Clone)]
pub struct CommandTokenSource {
    program: String,
    args: Vec<String>,
}

impl CommandTokenSource {
    /// Build from a command line; the first element is the program.
    pub fn new(command: &[String]) -> Result<Self, OracleError> {
        let (program, args) = command.split_first().ok_or_else(|| {
            OracleError::Unavailable("token command is empty".to_string())
        })?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

#[async_trait]
impl TokenSource for CommandTokenSource {
    async fn token(&self) -> Result<Credential, OracleError> {
        let output = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                OracleError::Unavailable(format!("failed to run '{}': {}", self.program, e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OracleError::Unavailable(format!(
                "'{}' exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if token.is_empty() {
            return Err(OracleError::Unavailable(format!(
                "'{}' printed no token",
                self.program
            )));
        }

        Ok(Credential::new(token, CredentialSource::Command, TOKEN_NAME))
    }

    fn describe(&self) -> String {
        format!("command '{} {}'", self.program, self.args.join(" "))
    }
}
