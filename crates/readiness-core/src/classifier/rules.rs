//! The keyword table driving line classification.
//!
//! Rules are plain data so they can be audited, overridden from
//! configuration and tested without touching the classifier itself.
//! Keywords are compared after accent and case folding.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::text::fold_for_matching;

lazy_static! {
    /// "TRL" followed by a digit, on folded text.
    pub static ref GLOBAL_RESULT_PATTERN: Regex = Regex::new(r"TRL\s*(\d)").unwrap();
}

/// Level headers need every `all_of` keyword and at least one `any_of`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelHeaderRule {
    pub all_of: Vec<String>,
    pub any_of: Vec<String>,
}

/// Keyword sets for every category, in priority order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierRules {
    pub level_header: LevelHeaderRule,
    pub criterion: Vec<String>,
    pub evidence: Vec<String>,
    pub verdict: Vec<String>,

    /// Whole-word markers; a negative marker beats a positive one
    pub negative_markers: Vec<String>,
    pub positive_markers: Vec<String>,

    pub real_level_header: Vec<String>,
    pub list_markers: Vec<String>,

    /// A line made only of these characters is a visual separator
    pub separator_chars: String,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for ClassifierRules {
    fn default() -> Self {
        Self {
            level_header: LevelHeaderRule {
                all_of: strings(&["NIVEL TRL"]),
                any_of: strings(&["OBSERVACIONES", "EVALUACION"]),
            },
            criterion: strings(&["CRITERIO:"]),
            evidence: strings(&["EVIDENCIA:"]),
            verdict: strings(&["PUNTAJE", "CONCLUSION", "CUMPLE"]),
            negative_markers: strings(&["NO", "NO VALIDADO", "NO CUMPLE", "INCUMPLE"]),
            positive_markers: strings(&["SI", "VALIDADO", "CUMPLE", "CUMPLIDO", "APROBADO"]),
            real_level_header: strings(&["TRL REAL:", "RECOMENDACIONES"]),
            list_markers: strings(&["- ", "* "]),
            separator_chars: "=-_*#~".to_string(),
        }
    }
}

impl ClassifierRules {
    /// Copy of the rules with every keyword folded for matching.
    pub(crate) fn folded(&self) -> Self {
        let fold = |items: &[String]| -> Vec<String> {
            items
                .iter()
                .map(|k| fold_for_matching(k))
                .filter(|k| !k.trim().is_empty())
                .collect()
        };
        Self {
            level_header: LevelHeaderRule {
                all_of: fold(&self.level_header.all_of),
                any_of: fold(&self.level_header.any_of),
            },
            criterion: fold(&self.criterion),
            evidence: fold(&self.evidence),
            verdict: fold(&self.verdict),
            negative_markers: fold(&self.negative_markers),
            positive_markers: fold(&self.positive_markers),
            real_level_header: fold(&self.real_level_header),
            list_markers: self.list_markers.clone(),
            separator_chars: self.separator_chars.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rules_load_from_partial_yaml() {
        let yaml = r#"
level_header:
  all_of: ["NIVEL TRL"]
  any_of: ["OBSERVACIONES", "EVALUACION", "ANALISIS"]
"#;
        let rules: ClassifierRules = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(rules.level_header.any_of.len(), 3);
        assert_eq!(rules.criterion, vec!["CRITERIO:".to_string()]);
    }

    #[test]
    fn test_folding_drops_blank_keywords() {
        let mut rules = ClassifierRules::default();
        rules.verdict.push("  ".into());
        rules.verdict.push("conclusión".into());
        let folded = rules.folded();
        assert_eq!(folded.verdict.last().unwrap(), "CONCLUSION");
        assert_eq!(folded.verdict.len(), 4);
    }

    #[test]
    fn test_global_pattern() {
        let caps = GLOBAL_RESULT_PATTERN.captures("TRL REAL: TRL4").unwrap();
        assert_eq!(&caps[1], "4");
        assert!(GLOBAL_RESULT_PATTERN.captures("TRL REAL: pendiente").is_none());
    }
}
