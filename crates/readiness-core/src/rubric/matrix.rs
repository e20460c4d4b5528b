//! Unified rubric content handed to the prompt synthesizer.

use serde::Serialize;

use super::model::Rubric;

pub const EVIDENCE_MATRIX_TITLE: &str = "MATRIZ DE EVIDENCIAS";
pub const SCORE_MATRIX_TITLE: &str = "MATRIZ DE PUNTAJES MÍNIMOS";
pub const GLOBAL_MATRIX_TITLE: &str = "MATRIZ TRL GLOBAL";

/// Three opaque matrix texts read verbatim from flat files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatrixSet {
    pub evidence: String,
    pub scores: String,
    pub global: String,
}

/// A titled block of rubric text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RubricSection {
    pub title: &'static str,
    pub body: String,
}

/// Rubric as delivered by any source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "content", rename_all = "snake_case")]
pub enum RubricContent {
    /// Normalized levels and criteria
    Structured(Rubric),

    /// Pre-rendered matrices passed through untouched
    Matrices(MatrixSet),
}

impl RubricContent {
    /// The normalized rubric, when the source was structured.
    pub fn structured(&self) -> Option<&Rubric> {
        match self {
            RubricContent::Structured(rubric) => Some(rubric),
            RubricContent::Matrices(_) => None,
        }
    }

    /// Rubric text blocks in prompt order.
    ///
    /// Structured rubrics have no global matrix of their own.
    pub fn sections(&self) -> Vec<RubricSection> {
        match self {
            RubricContent::Structured(rubric) => vec![
                RubricSection {
                    title: EVIDENCE_MATRIX_TITLE,
                    body: rubric.evidence_matrix(),
                },
                RubricSection {
                    title: SCORE_MATRIX_TITLE,
                    body: rubric.score_matrix(),
                },
            ],
            RubricContent::Matrices(set) => vec![
                RubricSection {
                    title: EVIDENCE_MATRIX_TITLE,
                    body: set.evidence.clone(),
                },
                RubricSection {
                    title: SCORE_MATRIX_TITLE,
                    body: set.scores.clone(),
                },
                RubricSection {
                    title: GLOBAL_MATRIX_TITLE,
                    body: set.global.clone(),
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rubric::model::tests::sample_rubric;

    #[test]
    fn test_structured_sections() {
        let content = RubricContent::Structured(sample_rubric());
        let sections = content.sections();
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].title, EVIDENCE_MATRIX_TITLE);
        assert!(sections[1].body.starts_with("TRL 1: 50"));
        assert!(content.structured().is_some());
    }

    #[test]
    fn test_matrices_pass_through_verbatim() {
        let set = MatrixSet {
            evidence: "  evidencias \n".to_string(),
            scores: "puntajes".to_string(),
            global: "global".to_string(),
        };
        let content = RubricContent::Matrices(set);
        let sections = content.sections();
        assert_eq!(sections.len(), 3);
        assert_eq!(sections[0].body, "  evidencias \n");
        assert_eq!(sections[2].title, GLOBAL_MATRIX_TITLE);
        assert!(content.structured().is_none());
    }
}
