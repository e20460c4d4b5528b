//! The evaluation rubric: maturity levels, their criteria and thresholds.
//!
//! A rubric reaches the pipeline in one of two shapes. Structured sources
//! (relational rows or a YAML document) are normalized into [`Rubric`];
//! flat-file sources are carried as opaque [`MatrixSet`] text. Both are
//! wrapped in [`RubricContent`], which is what the prompt synthesizer reads.

mod document;
mod matrix;
pub(crate) mod model;
mod schema;

use thiserror::Error;

pub use document::{CriterionEntry, LevelEntry, RubricDocument};
pub use matrix::{MatrixSet, RubricContent, RubricSection};
pub use model::{CriterionRow, Importance, LevelRow, Rubric, RubricCriterion, RubricLevel};
pub use schema::validate_rubric_schema;

/// Errors raised while building or parsing a rubric.
#[derive(Error, Debug)]
pub enum RubricError {
    #[error("Rubric has no levels")]
    Empty,

    #[error("Level ordinal {0} is outside 1..=9")]
    OrdinalOutOfRange(i64),

    #[error("Duplicate level ordinal {0}")]
    DuplicateLevel(u8),

    #[error("Level ordinals are not contiguous: {previous} is followed by {next}")]
    NonContiguous { previous: u8, next: u8 },

    #[error("Criterion '{criterion}' references unknown level {level}")]
    UnknownLevel { criterion: String, level: i64 },

    #[error("Criterion '{0}' appears under more than one level")]
    DuplicateCriterion(String),

    #[error("Negative value for {field}: {value}")]
    NegativeValue { field: String, value: i64 },

    #[error("Invalid importance '{0}'")]
    InvalidImportance(String),

    #[error("Failed to read rubric file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to parse rubric document: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Rubric document failed schema validation: {}", .0.join("; "))]
    SchemaViolation(Vec<String>),
}
