//! Core types shared across the assessment pipeline.
//!
//! These are the values that flow between the stages: who is being
//! assessed, in which mode, with which evidence, and what the oracle
//! answered.

use serde::{Deserialize, Serialize};
use std::fmt;

/// MIME type the oracle accepts for document evidence.
pub const PDF_MIME: &str = "application/pdf";

/// The subject of an assessment run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum SubjectId {
    /// A single technical document
    Document(i64),

    /// A project aggregating many evidence files
    Project(i64),
}

impl SubjectId {
    /// Numeric identifier of the subject.
    pub fn id(&self) -> i64 {
        match self {
            SubjectId::Document(id) | SubjectId::Project(id) => *id,
        }
    }

    /// Stable lowercase name of the subject kind.
    pub fn kind(&self) -> &'static str {
        match self {
            SubjectId::Document(_) => "document",
            SubjectId::Project(_) => "project",
        }
    }

    /// The assessment mode implied by the subject kind.
    pub fn mode(&self) -> AssessmentMode {
        match self {
            SubjectId::Document(_) => AssessmentMode::SingleDocument,
            SubjectId::Project(_) => AssessmentMode::ProjectAggregate,
        }
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.id())
    }
}

/// Which workflow an assessment follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentMode {
    /// One document, flat text report
    SingleDocument,

    /// Many evidence files, styled paginated report
    ProjectAggregate,
}

impl fmt::Display for AssessmentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssessmentMode::SingleDocument => write!(f, "single_document"),
            AssessmentMode::ProjectAggregate => write!(f, "project_aggregate"),
        }
    }
}

/// One binary artifact supplied for assessment.
#[derive(Clone, PartialEq, Eq)]
pub struct EvidenceItem {
    /// Row identifier in the evidence source, when there is one
    pub id: Option<i64>,

    /// Original file name
    pub name: String,

    /// Declared MIME type
    pub mime_type: String,

    /// Raw bytes
    pub payload: Vec<u8>,
}

impl fmt::Debug for EvidenceItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvidenceItem")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .field("payload_len", &self.payload.len())
            .finish()
    }
}

/// Why an evidence item was left out of oracle dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum OmissionReason {
    /// The declared type is neither a PDF nor an image
    UnsupportedType { mime_type: String },

    /// The payload has no bytes
    EmptyPayload,

    /// The payload exceeds the configured size limit
    TooLarge { size: usize, limit: usize },
}

impl fmt::Display for OmissionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OmissionReason::UnsupportedType { mime_type } => {
                write!(f, "unsupported type '{}'", mime_type)
            }
            OmissionReason::EmptyPayload => write!(f, "empty payload"),
            OmissionReason::TooLarge { size, limit } => {
                write!(f, "payload of {} bytes exceeds limit of {} bytes", size, limit)
            }
        }
    }
}

impl EvidenceItem {
    /// Create an evidence item without a source row id.
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            id: None,
            name: name.into(),
            mime_type: mime_type.into(),
            payload,
        }
    }

    /// Attach the source row id.
    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    /// The MIME type this item is dispatched with, if the oracle accepts it.
    ///
    /// A `.pdf` file name wins over a generic declared type such as
    /// `application/octet-stream`.
    pub fn dispatch_mime(&self) -> Option<&str> {
        let declared = self.mime_type.trim();
        if declared.eq_ignore_ascii_case(PDF_MIME) || self.name.to_lowercase().ends_with(".pdf") {
            Some(PDF_MIME)
        } else if declared.to_ascii_lowercase().starts_with("image/") {
            Some(declared)
        } else {
            None
        }
    }

    /// Decide whether this item may be sent to the oracle.
    pub fn admit(&self, max_bytes: usize) -> Result<&str, OmissionReason> {
        let mime = self.dispatch_mime().ok_or_else(|| OmissionReason::UnsupportedType {
            mime_type: self.mime_type.clone(),
        })?;

        if self.payload.is_empty() {
            return Err(OmissionReason::EmptyPayload);
        }

        if self.payload.len() > max_bytes {
            return Err(OmissionReason::TooLarge {
                size: self.payload.len(),
                limit: max_bytes,
            });
        }

        Ok(mime)
    }
}

/// The oracle's unstructured answer, as received.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RawAssessmentText {
    lines: Vec<String>,
}

impl RawAssessmentText {
    /// Split an answer into lines (`\n` or `\r\n`).
    pub fn new(text: impl AsRef<str>) -> Self {
        Self {
            lines: text.as_ref().lines().map(str::to_string).collect(),
        }
    }

    /// The answer's lines in order.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Re-join the lines with `\n`.
    pub fn to_text(&self) -> String {
        self.lines.join("\n")
    }

    /// True when the answer has no non-blank line.
    pub fn is_blank(&self) -> bool {
        self.lines.iter().all(|l| l.trim().is_empty())
    }
}
