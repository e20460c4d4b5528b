//! Normalized rubric model and its construction from source rows.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use super::RubricError;
use crate::text::fold_for_matching;

/// Highest ordinal on the TRL scale.
pub const MAX_LEVEL: u8 = 9;

/// How much a criterion weighs in the evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Importance {
    Low,
    Medium,
    High,
    Critical,
}

impl Importance {
    /// Label used when the rubric is rendered into the prompt.
    pub fn label(&self) -> &'static str {
        match self {
            Importance::Low => "baja",
            Importance::Medium => "media",
            Importance::High => "alta",
            Importance::Critical => "critica",
        }
    }
}

impl fmt::Display for Importance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Importance {
    type Err = RubricError;

    /// Accepts English and Spanish tags, any case, with or without accents.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match fold_for_matching(s.trim()).as_str() {
            "LOW" | "BAJA" | "BAJO" => Ok(Importance::Low),
            "MEDIUM" | "MEDIA" | "MEDIO" => Ok(Importance::Medium),
            "HIGH" | "ALTA" | "ALTO" => Ok(Importance::High),
            "CRITICAL" | "CRITICA" | "CRITICO" => Ok(Importance::Critical),
            _ => Err(RubricError::InvalidImportance(s.to_string())),
        }
    }
}

/// One scoring criterion, owned by a level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RubricCriterion {
    pub name: String,
    pub points: u32,
    pub importance: Importance,
    pub justification: String,
}

/// One maturity level with the criteria that validate it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RubricLevel {
    pub ordinal: u8,
    pub name: String,
    pub min_score: u32,
    pub description: String,
    pub criteria: Vec<RubricCriterion>,
}

impl RubricLevel {
    /// Sum of the points of every criterion in this level.
    pub fn max_points(&self) -> u32 {
        self.criteria.iter().map(|c| c.points).sum()
    }
}

/// Level row as returned by a structured store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelRow {
    pub ordinal: i64,
    pub name: String,
    pub min_score: i64,
    pub description: String,
}

/// Criterion row as returned by a structured store, keyed by level ordinal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CriterionRow {
    pub level: i64,
    pub name: String,
    pub points: i64,
    pub importance: String,
    pub justification: String,
}

/// An ordered, validated rubric snapshot.
///
/// Levels have unique ordinals in `1..=9` forming a contiguous increasing
/// sequence. Every criterion belongs to exactly one level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rubric {
    levels: Vec<RubricLevel>,
}

impl Rubric {
    /// Build a rubric from store rows.
    ///
    /// Level rows may arrive in any order; criteria keep their row order
    /// within each level.
    pub fn from_rows(levels: Vec<LevelRow>, criteria: Vec<CriterionRow>) -> Result<Self, RubricError> {
        if levels.is_empty() {
            return Err(RubricError::Empty);
        }

        let mut built = Vec::with_capacity(levels.len());
        for row in levels {
            let ordinal = u8::try_from(row.ordinal)
                .ok()
                .filter(|n| (1..=MAX_LEVEL).contains(n))
                .ok_or(RubricError::OrdinalOutOfRange(row.ordinal))?;
            built.push(RubricLevel {
                ordinal,
                name: row.name.trim().to_string(),
                min_score: non_negative(&format!("level {} min_score", ordinal), row.min_score)?,
                description: row.description.trim().to_string(),
                criteria: Vec::new(),
            });
        }

        built.sort_by_key(|l| l.ordinal);
        for pair in built.windows(2) {
            let (previous, next) = (pair[0].ordinal, pair[1].ordinal);
            if previous == next {
                return Err(RubricError::DuplicateLevel(next));
            }
            if next != previous + 1 {
                return Err(RubricError::NonContiguous { previous, next });
            }
        }

        let mut seen = HashSet::new();
        for row in criteria {
            let name = row.name.trim().to_string();
            let level = built
                .iter_mut()
                .find(|l| i64::from(l.ordinal) == row.level)
                .ok_or_else(|| RubricError::UnknownLevel {
                    criterion: name.clone(),
                    level: row.level,
                })?;

            if !seen.insert(fold_for_matching(&name)) {
                return Err(RubricError::DuplicateCriterion(name));
            }

            level.criteria.push(RubricCriterion {
                points: non_negative(&format!("criterion '{}' points", name), row.points)?,
                importance: row.importance.parse()?,
                justification: row.justification.trim().to_string(),
                name,
            });
        }

        Ok(Self { levels: built })
    }

    /// Levels in increasing ordinal order.
    pub fn levels(&self) -> &[RubricLevel] {
        &self.levels
    }

    /// Look up a level by ordinal.
    pub fn level(&self, ordinal: u8) -> Option<&RubricLevel> {
        self.levels.iter().find(|l| l.ordinal == ordinal)
    }

    /// Render the evidence matrix: one table of criteria per level.
    pub fn evidence_matrix(&self) -> String {
        let mut out = String::new();
        for level in &self.levels {
            out.push_str(&format!("\nTRL {} - {}\n", level.ordinal, level.name));
            if !level.description.is_empty() {
                out.push_str(&format!("Descripción: {}\n", level.description));
            }
            out.push_str("| Evidencia | Puntaje | Importancia | Justificación |\n");
            for c in &level.criteria {
                out.push_str(&format!(
                    "| {} | {} | {} | {} |\n",
                    c.name, c.points, c.importance, c.justification
                ));
            }
        }
        out
    }

    /// Render the minimum score matrix: one line per level.
    pub fn score_matrix(&self) -> String {
        self.levels
            .iter()
            .map(|l| format!("TRL {}: {} puntos mínimos\n", l.ordinal, l.min_score))
            .collect()
    }
}

fn non_negative(field: &str, value: i64) -> Result<u32, RubricError> {
    u32::try_from(value).map_err(|_| RubricError::NegativeValue {
        field: field.to_string(),
        value,
    })
}
