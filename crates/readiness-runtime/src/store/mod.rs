//! Persistent collaborators of an assessment run.
//!
//! Each capability is its own trait so the orchestrator can be wired to a
//! database, to files, or to test doubles independently.

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

use readiness_core::{CriterionRow, EvidenceItem, LevelRow, SubjectId};

mod sqlite;

pub use sqlite::SqliteStore;

/// Errors from the structured store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid stored data: {0}")]
    Corrupt(String),
}

/// Lifecycle status of a subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    Processing,
    Completed,
    NoEvidence,
    Failed(String),
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Processing => "processing",
            RunStatus::Completed => "completed",
            RunStatus::NoEvidence => "no_evidence",
            RunStatus::Failed(_) => "failed",
        }
    }

    /// Decode a stored status column and its message.
    pub fn from_stored(status: &str, message: Option<String>) -> Result<Self, StoreError> {
        match status {
            "processing" => Ok(RunStatus::Processing),
            "completed" => Ok(RunStatus::Completed),
            "no_evidence" => Ok(RunStatus::NoEvidence),
            "failed" => Ok(RunStatus::Failed(message.unwrap_or_default())),
            other => Err(StoreError::Corrupt(format!("unknown assessment status '{}'", other))),
        }
    }

    /// Failure message, if any.
    pub fn message(&self) -> Option<&str> {
        match self {
            RunStatus::Failed(message) => Some(message),
            _ => None,
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Level and criteria rows of the rubric.
#[async_trait]
pub trait RubricStore: Send + Sync {
    async fn rubric_rows(&self) -> Result<(Vec<LevelRow>, Vec<CriterionRow>), StoreError>;
}

/// Evidence files attached to projects.
#[async_trait]
pub trait EvidenceStore: Send + Sync {
    /// All evidence rows of a project, in insertion order.
    async fn project_evidence(&self, project_id: i64) -> Result<Vec<EvidenceItem>, StoreError>;
}

/// Registry handing out ids for uploaded documents.
#[async_trait]
pub trait DocumentRegistry: Send + Sync {
    async fn register_document(&self, file_name: &str) -> Result<i64, StoreError>;
}

/// Records the lifecycle status of each subject.
#[async_trait]
pub trait StatusTracker: Send + Sync {
    async fn mark(&self, subject: SubjectId, status: &RunStatus) -> Result<(), StoreError>;
}
