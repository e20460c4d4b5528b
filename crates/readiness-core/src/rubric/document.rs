//! Rubric authored as a YAML document.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use super::model::{CriterionRow, LevelRow, Rubric};
use super::schema::validate_rubric_schema;
use super::RubricError;

/// A criterion inside a YAML level entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriterionEntry {
    /// Evidence the criterion requires
    pub name: String,

    /// Points awarded when validated
    pub points: i64,

    /// low, medium, high, critical (or baja, media, alta, critica)
    pub importance: String,

    #[serde(default)]
    pub justification: String,
}

/// A level inside a YAML rubric document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelEntry {
    pub level: i64,
    pub name: String,
    pub min_score: i64,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub criteria: Vec<CriterionEntry>,
}

/// The YAML rubric document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RubricDocument {
    /// Version of this rubric document
    pub rubric_version: String,

    /// Human-readable name
    #[serde(default)]
    pub name: Option<String>,

    pub levels: Vec<LevelEntry>,
}

impl RubricDocument {
    /// Parse and schema-check a YAML document without normalizing it.
    pub fn from_yaml(yaml: &str) -> Result<Self, RubricError> {
        let value: serde_json::Value = serde_yaml::from_str(yaml)?;
        validate_rubric_schema(&value).map_err(RubricError::SchemaViolation)?;
        Ok(serde_json::from_value(value)?)
    }

    /// Split the document into store-shaped rows.
    pub fn into_rows(self) -> (Vec<LevelRow>, Vec<CriterionRow>) {
        let mut levels = Vec::with_capacity(self.levels.len());
        let mut criteria = Vec::new();
        for entry in self.levels {
            criteria.extend(entry.criteria.into_iter().map(|c| CriterionRow {
                level: entry.level,
                name: c.name,
                points: c.points,
                importance: c.importance,
                justification: c.justification,
            }));
            levels.push(LevelRow {
                ordinal: entry.level,
                name: entry.name,
                min_score: entry.min_score,
                description: entry.description,
            });
        }
        (levels, criteria)
    }
}

impl Rubric {
    /// Parse a rubric from a YAML document.
    pub fn from_yaml(yaml: &str) -> Result<Self, RubricError> {
        let (levels, criteria) = RubricDocument::from_yaml(yaml)?.into_rows();
        Rubric::from_rows(levels, criteria)
    }

    /// Parse a rubric from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, RubricError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rubric::Importance;

    const RUBRIC_YAML: &str = r#"
rubric_version: "1.0"
name: "TRL base"
levels:
  - level: 2
    name: "Concepto formulado"
    min_score: 60
    criteria:
      - name: "Aplicacion practica descrita"
        points: 60
        importance: alta
  - level: 1
    name: "Principios observados"
    min_score: 50
    description: "Investigacion basica"
    criteria:
      - name: "Documento identifica problema tecnico"
        points: 50
        importance: critical
        justification: "Sin problema no hay tecnologia"
"#;

    #[test]
    fn test_yaml_rubric_normalizes() {
        let rubric = Rubric::from_yaml(RUBRIC_YAML).unwrap();
        assert_eq!(rubric.levels().len(), 2);
        let first = &rubric.levels()[0];
        assert_eq!(first.ordinal, 1);
        assert_eq!(first.description, "Investigacion basica");
        assert_eq!(first.criteria[0].importance, Importance::Critical);
    }

    #[test]
    fn test_schema_violation_reported() {
        let yaml = r#"
rubric_version: "1.0"
levels:
  - level: 1
    name: "Principios"
"#;
        let err = Rubric::from_yaml(yaml).unwrap_err();
        match err {
            RubricError::SchemaViolation(errors) => assert!(!errors.is_empty()),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_model_rules_apply_after_schema() {
        let yaml = r#"
rubric_version: "1.0"
levels:
  - level: 1
    name: "a"
    min_score: 10
  - level: 4
    name: "d"
    min_score: 40
"#;
        assert!(matches!(
            Rubric::from_yaml(yaml),
            Err(RubricError::NonContiguous { previous: 1, next: 4 })
        ));
    }

    #[test]
    fn test_invalid_yaml_is_yaml_error() {
        assert!(matches!(
            Rubric::from_yaml("levels: [unclosed"),
            Err(RubricError::YamlError(_))
        ));
    }
}
