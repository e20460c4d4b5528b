//! The external reasoning oracle.
//!
//! An [`Oracle`] takes one prompt plus typed binary parts and answers with
//! free-form text. Exactly one remote call is made per `submit`; retry is
//! the orchestrator's decision, not the client's.
//!
//! ## Security
//!
//! Credentials go through the [`secrets`] module so they never show up in
//! `Debug` or `Display` output.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use readiness_core::{EvidenceItem, OmissionReason, RawAssessmentText};

use crate::config::OracleConfig;

pub mod secrets;
pub mod token;

#[cfg(feature = "gemini")]
mod gemini;

pub use secrets::{Credential, CredentialSource};
pub use token::{CommandTokenSource, StaticTokenSource, TokenSource};

#[cfg(feature = "gemini")]
pub use gemini::GeminiOracle;

/// Errors from the oracle.
#[derive(Error, Debug)]
pub enum OracleError {
    #[error("Oracle unavailable: {0}")]
    Unavailable(String),

    #[error("Oracle rejected the request: {status} - {message}")]
    Rejected { status: u16, message: String },

    #[error("Oracle timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid oracle response: {0}")]
    InvalidResponse(String),
}

impl OracleError {
    /// Network-class failures worth another attempt. Client-side (4xx)
    /// rejections never are.
    pub fn is_retryable(&self) -> bool {
        match self {
            OracleError::Unavailable(_) | OracleError::Timeout(_) => true,
            OracleError::Rejected { status, .. } => *status >= 500,
            OracleError::InvalidResponse(_) => false,
        }
    }
}

/// One binary part attached to an oracle request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvidencePart<'a> {
    pub name: &'a str,
    pub mime_type: &'a str,
    pub data: &'a [u8],
}

/// An evidence item that was left out of the request.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct OmittedEvidence {
    pub name: String,
    pub reason: OmissionReason,
}

/// Which items go to the oracle and which were dropped.
#[derive(Debug, Default)]
pub struct DispatchPlan<'a> {
    pub parts: Vec<EvidencePart<'a>>,
    pub omitted: Vec<OmittedEvidence>,
}

impl DispatchPlan<'_> {
    /// Names of the items that will be sent, in order.
    pub fn part_names(&self) -> Vec<String> {
        self.parts.iter().map(|p| p.name.to_string()).collect()
    }
}

/// Split evidence into dispatchable parts and omissions.
pub fn plan_dispatch(items: &[EvidenceItem], max_bytes: usize) -> DispatchPlan<'_> {
    let mut plan = DispatchPlan::default();
    for item in items {
        match item.admit(max_bytes) {
            Ok(mime_type) => plan.parts.push(EvidencePart {
                name: &item.name,
                mime_type,
                data: &item.payload,
            }),
            Err(reason) => plan.omitted.push(OmittedEvidence {
                name: item.name.clone(),
                reason,
            }),
        }
    }
    plan
}

/// The reasoning service.
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Send the prompt and parts; return the answer text.
    async fn submit(
        &self,
        prompt: &str,
        parts: &[EvidencePart<'_>],
    ) -> Result<RawAssessmentText, OracleError>;

    /// Provider name for logs.
    fn name(&self) -> &str;

    /// Model identifier, shown in reports.
    fn model(&self) -> &str;
}

/// Build the configured oracle. Credentials are resolved here, once.
pub async fn connect(config: &OracleConfig) -> Result<Arc<dyn Oracle>, OracleError> {
    #[cfg(feature = "gemini")]
    {
        let oracle = GeminiOracle::connect(config).await?;
        Ok(Arc::new(oracle))
    }

    #[cfg(not(feature = "gemini"))]
    {
        let _ = config;
        Err(OracleError::Unavailable(
            "no oracle provider compiled in: enable the 'gemini' feature".to_string(),
        ))
    }
}
