//! Rubric sources.
//!
//! Every source yields a [`RubricContent`]: structured rows from the store
//! or a YAML document are normalized into a [`Rubric`], while flat-file
//! matrices are passed through as opaque text. Loading never writes.

use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use readiness_core::{MatrixSet, Rubric, RubricContent, RubricError};

use crate::config::{ConfigError, MatrixPaths, RubricSourceConfig, RubricSourceKind};
use crate::store::{RubricStore, StoreError};

/// The rubric could not be obtained. Always fatal for the run.
#[derive(Error, Debug)]
pub enum RubricUnavailable {
    #[error("Rubric store unavailable: {0}")]
    Store(#[from] StoreError),

    #[error("Rubric file not found: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("Failed to read rubric file {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("Malformed rubric: {0}")]
    Malformed(#[from] RubricError),
}

/// Anything that can produce the rubric for a run.
#[async_trait]
pub trait RubricSource: Send + Sync {
    async fn load(&self) -> Result<RubricContent, RubricUnavailable>;

    /// Human-readable origin, for logs.
    fn describe(&self) -> String;
}

/// Rubric rows from a [`RubricStore`].
pub struct StoreRubricSource {
    store: Arc<dyn RubricStore>,
}

impl StoreRubricSource {
    pub fn new(store: Arc<dyn RubricStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl RubricSource for StoreRubricSource {
    async fn load(&self) -> Result<RubricContent, RubricUnavailable> {
        let (levels, criteria) = self.store.rubric_rows().await?;
        let rubric = Rubric::from_rows(levels, criteria)?;
        Ok(RubricContent::Structured(rubric))
    }

    fn describe(&self) -> String {
        "rubric store".to_string()
    }
}

/// A YAML rubric document on disk.
#[derive(Debug, Clone)]
pub struct YamlRubricSource {
    path: PathBuf,
}

impl YamlRubricSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl RubricSource for YamlRubricSource {
    async fn load(&self) -> Result<RubricContent, RubricUnavailable> {
        let yaml = read_text(&self.path).await?;
        Ok(RubricContent::Structured(Rubric::from_yaml(&yaml)?))
    }

    fn describe(&self) -> String {
        format!("YAML rubric {}", self.path.display())
    }
}

/// Three matrix files read verbatim.
#[derive(Debug, Clone)]
pub struct MatrixFileSource {
    paths: MatrixPaths,
}

impl MatrixFileSource {
    pub fn new(paths: MatrixPaths) -> Self {
        Self { paths }
    }
}

#[async_trait]
impl RubricSource for MatrixFileSource {
    async fn load(&self) -> Result<RubricContent, RubricUnavailable> {
        Ok(RubricContent::Matrices(MatrixSet {
            evidence: read_text(&self.paths.evidence).await?,
            scores: read_text(&self.paths.scores).await?,
            global: read_text(&self.paths.global).await?,
        }))
    }

    fn describe(&self) -> String {
        format!("matrix files in {}", parent_label(&self.paths.evidence))
    }
}

async fn read_text(path: &Path) -> Result<String, RubricUnavailable> {
    tokio::fs::read_to_string(path).await.map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            RubricUnavailable::MissingFile(path.to_path_buf())
        } else {
            RubricUnavailable::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })
}

fn parent_label(path: &Path) -> String {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| ".".to_string())
}

/// Pick the configured rubric source.
pub fn rubric_source(
    config: &RubricSourceConfig,
    store: Arc<dyn RubricStore>,
) -> Result<Arc<dyn RubricSource>, ConfigError> {
    match config.source {
        RubricSourceKind::Store => Ok(Arc::new(StoreRubricSource::new(store))),
        RubricSourceKind::Yaml => {
            let path = config.path.clone().ok_or_else(|| ConfigError::Invalid {
                field: "rubric.path",
                message: "required when rubric.source is yaml".to_string(),
            })?;
            Ok(Arc::new(YamlRubricSource::new(path)))
        }
        RubricSourceKind::Matrices => {
            let paths = config.matrices.clone().ok_or_else(|| ConfigError::Invalid {
                field: "rubric.matrices",
                message: "required when rubric.source is matrices".to_string(),
            })?;
            Ok(Arc::new(MatrixFileSource::new(paths)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use readiness_core::{
        AssessmentMode, CriterionRow, LevelRow, PromptContext, PromptSynthesizer, SubjectId,
    };

    struct FixedRows {
        levels: Vec<LevelRow>,
        criteria: Vec<CriterionRow>,
    }

    #[async_trait]
    impl RubricStore for FixedRows {
        async fn rubric_rows(&self) -> Result<(Vec<LevelRow>, Vec<CriterionRow>), StoreError> {
            Ok((self.levels.clone(), self.criteria.clone()))
        }
    }

    fn level(ordinal: i64, min_score: i64) -> LevelRow {
        LevelRow {
            ordinal,
            name: format!("Nivel {}", ordinal),
            min_score,
            description: String::new(),
        }
    }

    #[tokio::test]
    async fn test_store_source_normalizes_rows() {
        let source = StoreRubricSource::new(Arc::new(FixedRows {
            levels: vec![level(2, 60), level(1, 50)],
            criteria: vec![],
        }));
        let content = source.load().await.unwrap();
        let rubric = content.structured().unwrap();
        assert_eq!(rubric.levels()[0].ordinal, 1);
    }

    #[tokio::test]
    async fn test_malformed_rows_are_unavailable() {
        let source = StoreRubricSource::new(Arc::new(FixedRows {
            levels: vec![level(1, 50), level(3, 70)],
            criteria: vec![],
        }));
        assert!(matches!(
            source.load().await,
            Err(RubricUnavailable::Malformed(_))
        ));

        let empty = StoreRubricSource::new(Arc::new(FixedRows {
            levels: vec![],
            criteria: vec![],
        }));
        assert!(matches!(
            empty.load().await,
            Err(RubricUnavailable::Malformed(RubricError::Empty))
        ));
    }

    #[tokio::test]
    async fn test_missing_yaml_file() {
        let source = YamlRubricSource::new("/definitely/not/here/rubric.yaml");
        let err = source.load().await.unwrap_err();
        assert!(matches!(err, RubricUnavailable::MissingFile(_)));
        assert!(err.to_string().contains("rubric.yaml"));
    }

    #[tokio::test]
    async fn test_yaml_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rubric.yaml");
        std::fs::write(
            &path,
            "rubric_version: \"1.0\"\nlevels:\n  - level: 1\n    name: \"Principios observados\"\n    min_score: 50\n",
        )
        .unwrap();

        let content = YamlRubricSource::new(&path).load().await.unwrap();
        assert_eq!(content.structured().unwrap().levels().len(), 1);
    }

    #[tokio::test]
    async fn test_matrix_source_is_verbatim_and_repeatable() {
        let dir = tempfile::tempdir().unwrap();
        let write = |name: &str, body: &str| {
            let path = dir.path().join(name);
            std::fs::write(&path, body).unwrap();
            path
        };
        let paths = MatrixPaths {
            evidence: write("evidencias.txt", "| TRL 1 | Documento | 40 |\n"),
            scores: write("puntajes.txt", "TRL 1: 50\n"),
            global: write("global.txt", "TRL 1 -> TRL 9\n"),
        };

        let source = MatrixFileSource::new(paths);
        let first = source.load().await.unwrap();
        let second = source.load().await.unwrap();
        assert_eq!(first, second);

        let context = PromptContext::new(SubjectId::Project(1));
        let synthesizer = PromptSynthesizer::new();
        assert_eq!(
            synthesizer.build_prompt(&first, AssessmentMode::ProjectAggregate, &context),
            synthesizer.build_prompt(&second, AssessmentMode::ProjectAggregate, &context)
        );

        match first {
            RubricContent::Matrices(set) => assert_eq!(set.scores, "TRL 1: 50\n"),
            other => panic!("expected matrices, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_matrix_file() {
        let source = MatrixFileSource::new(MatrixPaths {
            evidence: PathBuf::from("/nope/evidencias.txt"),
            scores: PathBuf::from("/nope/puntajes.txt"),
            global: PathBuf::from("/nope/global.txt"),
        });
        assert!(matches!(
            source.load().await,
            Err(RubricUnavailable::MissingFile(_))
        ));
    }

    #[test]
    fn test_source_selection() {
        let store: Arc<dyn RubricStore> = Arc::new(FixedRows {
            levels: vec![],
            criteria: vec![],
        });
        let config = RubricSourceConfig {
            source: RubricSourceKind::Yaml,
            path: Some(PathBuf::from("rubric.yaml")),
            matrices: None,
        };
        let source = rubric_source(&config, store.clone()).unwrap();
        assert_eq!(source.describe(), "YAML rubric rubric.yaml");

        let broken = RubricSourceConfig {
            source: RubricSourceKind::Matrices,
            ..RubricSourceConfig::default()
        };
        assert!(rubric_source(&broken, store).is_err());
    }
}
