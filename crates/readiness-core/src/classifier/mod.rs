//! Line classification of oracle answers.
//!
//! The oracle's answer has no guaranteed grammar, so each line is tagged on
//! its own by walking an ordered rule table; the first matching rule wins.
//! Lines no rule recognizes become [`LineCategory::Plain`], which makes the
//! classifier total: it never fails.

mod rules;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::text::{contains_phrase, fold_for_matching};
use crate::types::RawAssessmentText;

pub use rules::{ClassifierRules, LevelHeaderRule, GLOBAL_RESULT_PATTERN};

/// Semantic category of one answer line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LineCategory {
    LevelSectionHeader,
    GlobalResult,
    Criterion,
    EvidenceCitation,
    ScoreOrVerdict,
    RealLevelOrRecommendationsHeader,
    ListItem,
    Plain,
}

/// Verdict polarity, only meaningful for score/verdict lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Polarity {
    Negative,
    Positive,
    Neutral,
}

/// A tagged answer line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifiedLine {
    pub category: LineCategory,

    /// Set for `ScoreOrVerdict` lines only
    pub polarity: Option<Polarity>,

    /// Trimmed text, list marker removed for list items
    pub text: String,

    /// The line as received
    pub raw: String,

    /// Most recent section header seen above this line
    pub section: Option<String>,
}

/// The headline maturity level extracted from the answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GlobalResult {
    Level(u8),
    Undetermined,
}

impl fmt::Display for GlobalResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GlobalResult::Level(n) => write!(f, "TRL {}", n),
            GlobalResult::Undetermined => write!(f, "No determinado"),
        }
    }
}

/// The classified answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub lines: Vec<ClassifiedLine>,
    pub global_result: GlobalResult,
}

impl Classification {
    /// Categories in line order.
    pub fn categories(&self) -> Vec<LineCategory> {
        self.lines.iter().map(|l| l.category).collect()
    }
}

/// Classifies answers against a keyword table.
#[derive(Debug, Clone)]
pub struct ResponseClassifier {
    rules: ClassifierRules,
}

impl Default for ResponseClassifier {
    fn default() -> Self {
        Self::new(ClassifierRules::default())
    }
}

impl ResponseClassifier {
    pub fn new(rules: ClassifierRules) -> Self {
        Self {
            rules: rules.folded(),
        }
    }

    /// Classify every line of an answer in a single pass.
    pub fn classify(&self, raw: &RawAssessmentText) -> Classification {
        let mut section: Option<String> = None;
        let mut lines = Vec::new();

        for line in raw.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() || self.is_separator(trimmed) {
                continue;
            }

            let folded = fold_for_matching(trimmed);
            let (category, polarity, text) = self.classify_line(trimmed, &folded);

            if matches!(
                category,
                LineCategory::LevelSectionHeader | LineCategory::RealLevelOrRecommendationsHeader
            ) {
                section = Some(trimmed.to_string());
            }

            lines.push(ClassifiedLine {
                category,
                polarity,
                text,
                raw: line.clone(),
                section: section.clone(),
            });
        }

        let global_result = self.global_result(raw);
        if global_result == GlobalResult::Undetermined {
            tracing::debug!(lines = lines.len(), "No global TRL found in answer");
        }

        Classification {
            lines,
            global_result,
        }
    }

    /// First "TRL <digit>" anywhere in the answer, scanning lines in order.
    pub fn global_result(&self, raw: &RawAssessmentText) -> GlobalResult {
        raw.lines()
            .iter()
            .find_map(|line| {
                let folded = fold_for_matching(line);
                GLOBAL_RESULT_PATTERN
                    .captures(&folded)
                    .and_then(|caps| caps[1].parse::<u8>().ok())
            })
            .map(GlobalResult::Level)
            .unwrap_or(GlobalResult::Undetermined)
    }

    fn is_separator(&self, trimmed: &str) -> bool {
        trimmed.chars().all(|c| self.rules.separator_chars.contains(c))
    }

    fn classify_line(&self, trimmed: &str, folded: &str) -> (LineCategory, Option<Polarity>, String) {
        let rules = &self.rules;
        let has_any = |keywords: &[String]| keywords.iter().any(|k| folded.contains(k.as_str()));

        if !rules.level_header.all_of.is_empty()
            && rules.level_header.all_of.iter().all(|k| folded.contains(k.as_str()))
            && has_any(&rules.level_header.any_of)
        {
            return (LineCategory::LevelSectionHeader, None, trimmed.to_string());
        }
        if has_any(&rules.criterion) {
            return (LineCategory::Criterion, None, trimmed.to_string());
        }
        if has_any(&rules.evidence) {
            return (LineCategory::EvidenceCitation, None, trimmed.to_string());
        }
        if has_any(&rules.verdict) {
            let polarity = self.polarity(folded);
            return (LineCategory::ScoreOrVerdict, Some(polarity), trimmed.to_string());
        }
        if has_any(&rules.real_level_header) {
            return (
                LineCategory::RealLevelOrRecommendationsHeader,
                None,
                trimmed.to_string(),
            );
        }
        if let Some(marker) = rules.list_markers.iter().find(|m| trimmed.starts_with(m.as_str())) {
            let item = trimmed[marker.len()..].trim().to_string();
            return (LineCategory::ListItem, None, item);
        }

        (LineCategory::Plain, None, trimmed.to_string())
    }

    fn polarity(&self, folded: &str) -> Polarity {
        let marked = |markers: &[String]| markers.iter().any(|m| contains_phrase(folded, m));
        if marked(&self.rules.negative_markers) {
            Polarity::Negative
        } else if marked(&self.rules.positive_markers) {
            Polarity::Positive
        } else {
            Polarity::Neutral
        }
    }
}
