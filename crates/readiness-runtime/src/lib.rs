//! # readiness-runtime
//!
//! The I/O half of the TRL assessment pipeline.
//!
//! `readiness-core` builds prompts, classifies answers and renders reports
//! without touching the outside world. This crate supplies everything else:
//! the Gemini oracle and its credentials, rubric and evidence sources, the
//! SQLite store, per-run evidence staging, the report sink and the
//! orchestrator that runs one assessment end to end.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use readiness_runtime::{oracle, rubric_source, AssessmentOrchestrator, RuntimeConfig, SqliteStore};
//!
//! let mut config = RuntimeConfig::from_yaml_file("readiness.yaml")?;
//! config.apply_env_overrides();
//!
//! let store = Arc::new(SqliteStore::connect(&config.storage.database_url).await?);
//! let orchestrator = AssessmentOrchestrator::builder()
//!     .oracle(oracle::connect(&config.oracle).await?)
//!     .rubric_source(rubric_source(&config.rubric, store.clone())?)
//!     .evidence_store(store.clone())
//!     .status_tracker(store)
//!     .config(config)
//!     .build()?;
//!
//! let outcome = orchestrator.assess_project(42).await?;
//! println!("{}", outcome.report().display());
//! ```

pub mod config;
pub mod oracle;
pub mod orchestrator;
pub mod sink;
pub mod sources;
pub mod staging;
pub mod store;

pub use config::{ConfigError, RuntimeConfig};
pub use oracle::{plan_dispatch, EvidencePart, OmittedEvidence, Oracle, OracleError};
pub use orchestrator::{
    AssessmentError, AssessmentOrchestrator, AssessmentOrchestratorBuilder, AssessmentOutcome,
    FailureKind, OrchestratorError, Stage,
};
pub use sink::{artifact_file_name, ArtifactSink, FsArtifactSink};
pub use sources::{
    rubric_source, MatrixFileSource, RubricSource, RubricUnavailable, StoreRubricSource,
    YamlRubricSource,
};
pub use staging::StagingArea;
pub use store::{
    DocumentRegistry, EvidenceStore, RubricStore, RunStatus, SqliteStore, StatusTracker,
    StoreError,
};
