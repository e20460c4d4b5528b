//! Deterministic prompt synthesis.
//!
//! The prompt is assembled from fixed text blocks plus the rubric sections.
//! Nothing here reads clocks, files or environment, so identical inputs
//! always produce byte-identical prompts.

mod templates;

use crate::rubric::RubricContent;
use crate::types::{AssessmentMode, SubjectId};

pub use templates::{EVALUATION_RULES, RESPONSE_FORMAT};

/// Run-specific facts the prompt may mention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptContext {
    pub subject: SubjectId,

    /// Names of the evidence items that will be attached, in dispatch order
    pub evidence_names: Vec<String>,
}

impl PromptContext {
    pub fn new(subject: SubjectId) -> Self {
        Self {
            subject,
            evidence_names: Vec::new(),
        }
    }

    pub fn with_evidence_names(mut self, names: Vec<String>) -> Self {
        self.evidence_names = names;
        self
    }
}

/// Builds evaluation prompts.
#[derive(Debug, Default, Clone, Copy)]
pub struct PromptSynthesizer;

impl PromptSynthesizer {
    pub fn new() -> Self {
        Self
    }

    /// Render the full prompt for one run.
    pub fn build_prompt(
        &self,
        rubric: &RubricContent,
        mode: AssessmentMode,
        context: &PromptContext,
    ) -> String {
        let mut out = String::new();

        out.push_str(templates::ROLE_FRAMING);
        out.push_str("\n\n");
        match mode {
            AssessmentMode::SingleDocument => out.push_str(templates::DOCUMENT_TASK),
            AssessmentMode::ProjectAggregate => out.push_str(
                &templates::PROJECT_TASK.replace("{project_id}", &context.subject.id().to_string()),
            ),
        }
        out.push_str("\n\n");

        push_banner(&mut out, templates::RULES_TITLE);
        push_numbered(&mut out, templates::EVALUATION_RULES);
        out.push('\n');

        for section in rubric.sections() {
            push_banner(&mut out, section.title);
            out.push_str(&section.body);
            if !section.body.ends_with('\n') {
                out.push('\n');
            }
            out.push('\n');
        }

        push_banner(&mut out, templates::RESPONSE_FORMAT_TITLE);
        out.push_str(templates::RESPONSE_FORMAT);
        out.push_str("\n\n");

        out.push_str(templates::ANALYSIS_TITLE);
        out.push('\n');
        push_numbered(&mut out, templates::ANALYSIS_STEPS);
        out.push('\n');

        if mode == AssessmentMode::ProjectAggregate {
            if !context.evidence_names.is_empty() {
                out.push_str(templates::EVIDENCE_LIST_TITLE);
                out.push('\n');
                for name in &context.evidence_names {
                    out.push_str("- ");
                    out.push_str(name);
                    out.push('\n');
                }
                out.push('\n');
            }

            out.push_str(templates::PROJECT_INSTRUCTIONS_TITLE);
            out.push('\n');
            for line in templates::PROJECT_INSTRUCTIONS {
                out.push_str("- ");
                out.push_str(line);
                out.push('\n');
            }
            out.push('\n');
            out.push_str(templates::PROJECT_CLOSING);
        } else {
            out.push_str(templates::DOCUMENT_CLOSING);
        }
        out.push('\n');

        out
    }
}

fn push_banner(out: &mut String, title: &str) {
    out.push_str(templates::BANNER);
    out.push_str("\n ");
    out.push_str(title);
    out.push('\n');
    out.push_str(templates::BANNER);
    out.push('\n');
}

fn push_numbered(out: &mut String, items: &[&str]) {
    for (i, item) in items.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", i + 1, item));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rubric::model::tests::sample_rubric;
    use crate::rubric::MatrixSet;
    use proptest::prelude::*;

    fn structured() -> RubricContent {
        RubricContent::Structured(sample_rubric())
    }

    #[test]
    fn test_document_prompt_layout() {
        let prompt = PromptSynthesizer::new().build_prompt(
            &structured(),
            AssessmentMode::SingleDocument,
            &PromptContext::new(SubjectId::Document(3)),
        );

        let rules = prompt.find("REGLAS ESTRICTAS").unwrap();
        let evidence = prompt.find("MATRIZ DE EVIDENCIAS\n").unwrap();
        let scores = prompt.find("MATRIZ DE PUNTAJES MÍNIMOS").unwrap();
        let format = prompt.find("FORMATO DE RESPUESTA").unwrap();
        assert!(rules < evidence && evidence < scores && scores < format);

        assert!(prompt.contains("TRL 2: 60 puntos mínimos"));
        assert!(prompt.contains("EL TRL REAL es el último nivel completamente validado."));
        assert!(prompt.ends_with("Analiza el PDF adjunto línea por línea:\n"));
        assert!(!prompt.contains("Instrucciones adicionales"));
    }

    #[test]
    fn test_project_prompt_mentions_aggregation() {
        let context = PromptContext::new(SubjectId::Project(42))
            .with_evidence_names(vec!["informe.pdf".into(), "foto.png".into()]);
        let prompt = PromptSynthesizer::new().build_prompt(
            &structured(),
            AssessmentMode::ProjectAggregate,
            &context,
        );

        assert!(prompt.contains("Proyecto ID: 42"));
        assert!(prompt.contains("se considera válida para el proyecto"));
        assert!(prompt.contains("- informe.pdf\n- foto.png\n"));
    }

    #[test]
    fn test_matrix_rubric_passes_through() {
        let content = RubricContent::Matrices(MatrixSet {
            evidence: "EVID-BLOB".into(),
            scores: "SCORE-BLOB\n".into(),
            global: "GLOBAL-BLOB".into(),
        });
        let prompt = PromptSynthesizer::new().build_prompt(
            &content,
            AssessmentMode::SingleDocument,
            &PromptContext::new(SubjectId::Document(1)),
        );
        assert!(prompt.contains("EVID-BLOB\n"));
        assert!(prompt.contains("MATRIZ TRL GLOBAL"));
        assert!(prompt.contains("GLOBAL-BLOB\n"));
    }

    proptest! {
        #[test]
        fn prop_prompt_is_deterministic(
            id in 1i64..10_000,
            names in proptest::collection::vec("[a-z]{1,8}\\.pdf", 0..5),
            project in any::<bool>(),
        ) {
            let (subject, mode) = if project {
                (SubjectId::Project(id), AssessmentMode::ProjectAggregate)
            } else {
                (SubjectId::Document(id), AssessmentMode::SingleDocument)
            };
            let context = PromptContext::new(subject).with_evidence_names(names);
            let synth = PromptSynthesizer::new();
            let rubric = structured();
            let a = synth.build_prompt(&rubric, mode, &context);
            let b = synth.build_prompt(&rubric.clone(), mode, &context.clone());
            prop_assert_eq!(a, b);
        }
    }
}
