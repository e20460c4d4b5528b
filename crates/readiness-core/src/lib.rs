//! # readiness-core
//!
//! Deterministic pieces of the TRL assessment pipeline.
//!
//! This crate turns a rubric into an evaluation prompt, and turns the
//! oracle's free-form answer into a classified line stream and a report.
//! It never talks to the network or the filesystem (YAML rubric files
//! aside); the runtime crate wires it to the outside world.
//!
//! ## Key Guarantees
//!
//! 1. **Deterministic**: the same rubric and context always produce the
//!    same prompt, and the same answer and metadata the same report bytes
//! 2. **Total classification**: every answer line gets exactly one category
//! 3. **Lossless text reports**: single-document reports are the answer verbatim
//!
//! ## Example
//!
//! ```rust,ignore
//! use readiness_core::{
//!     AssessmentMode, PromptContext, PromptSynthesizer, RawAssessmentText,
//!     ResponseClassifier, Rubric, RubricContent, SubjectId,
//! };
//!
//! let rubric = RubricContent::Structured(Rubric::from_yaml_file("rubric.yaml")?);
//! let context = PromptContext::new(SubjectId::Document(1));
//! let prompt = PromptSynthesizer::new().build_prompt(&rubric, AssessmentMode::SingleDocument, &context);
//!
//! let answer = RawAssessmentText::new(oracle_reply);
//! let classification = ResponseClassifier::default().classify(&answer);
//! println!("{}", classification.global_result);
//! ```

pub mod classifier;
pub mod prompt;
pub mod render;
pub mod rubric;
pub mod text;
pub mod types;

pub use classifier::{
    ClassifiedLine, Classification, ClassifierRules, GlobalResult, LineCategory, Polarity,
    ResponseClassifier,
};
pub use prompt::{PromptContext, PromptSynthesizer};
pub use render::{
    no_evidence_report, ArtifactFormat, Branding, ReportArtifact, ReportRenderer, RunMetadata,
};
pub use rubric::{
    CriterionRow, Importance, LevelRow, MatrixSet, Rubric, RubricContent, RubricCriterion,
    RubricError, RubricLevel,
};
pub use types::{
    AssessmentMode, EvidenceItem, OmissionReason, RawAssessmentText, SubjectId, PDF_MIME,
};
