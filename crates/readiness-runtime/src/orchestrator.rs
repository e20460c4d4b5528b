//! Assessment orchestration.
//!
//! The orchestrator runs one assessment end to end:
//! - Evidence admission (unsupported, empty and oversized items are omitted)
//! - Staging of the dispatched evidence in a scoped temporary directory
//! - Rubric load and prompt synthesis
//! - One oracle call per attempt, bounded by a timeout, retried only on
//!   network-class failures
//! - Classification, rendering and a single artifact write
//!
//! Lifecycle status is recorded before and after the run. A project with
//! no usable evidence gets a placeholder report and no oracle call.

use backon::{ExponentialBuilder, Retryable};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use readiness_core::{
    no_evidence_report, EvidenceItem, GlobalResult, OmissionReason, PromptContext,
    PromptSynthesizer, RawAssessmentText, ReportRenderer, ResponseClassifier, RunMetadata,
    SubjectId,
};

use crate::config::RuntimeConfig;
use crate::oracle::{
    plan_dispatch, DispatchPlan, EvidencePart, OmittedEvidence, Oracle, OracleError,
};
use crate::sink::{ArtifactSink, FsArtifactSink};
use crate::sources::{RubricSource, RubricUnavailable};
use crate::staging::StagingArea;
use crate::store::{EvidenceStore, RunStatus, StatusTracker, StoreError};

/// Pipeline stage where a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Evidence,
    Staging,
    Rubric,
    Oracle,
    Persist,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Evidence => "evidence",
            Stage::Staging => "staging",
            Stage::Rubric => "rubric",
            Stage::Oracle => "oracle",
            Stage::Persist => "persist",
        };
        f.write_str(name)
    }
}

/// What went wrong, independent of where.
#[derive(Error, Debug)]
pub enum FailureKind {
    #[error(transparent)]
    Rubric(#[from] RubricUnavailable),

    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Evidence '{name}' cannot be assessed: {reason}")]
    UnusableEvidence { name: String, reason: OmissionReason },

    #[error("No evidence store configured")]
    NoEvidenceStore,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A failed run, tagged with its subject and stage.
#[derive(Error, Debug)]
#[error("{subject} failed during {stage}: {kind}")]
pub struct AssessmentError {
    pub subject: SubjectId,
    pub stage: Stage,
    #[source]
    pub kind: FailureKind,
}

fn failed_at<E: Into<FailureKind>>(
    subject: SubjectId,
    stage: Stage,
) -> impl FnOnce(E) -> AssessmentError {
    move |e| AssessmentError {
        subject,
        stage,
        kind: e.into(),
    }
}

/// Errors while assembling an orchestrator.
#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("{0} not configured")]
    NotConfigured(&'static str),
}

/// Terminal result of a successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AssessmentOutcome {
    /// The oracle answered and the report was written
    Completed {
        subject: SubjectId,
        report: PathBuf,
        global_result: GlobalResult,
        omitted: Vec<OmittedEvidence>,
    },

    /// Nothing to assess; a placeholder report was written
    NoEvidence {
        subject: SubjectId,
        report: PathBuf,
        omitted: Vec<OmittedEvidence>,
    },
}

impl AssessmentOutcome {
    pub fn subject(&self) -> SubjectId {
        match self {
            AssessmentOutcome::Completed { subject, .. }
            | AssessmentOutcome::NoEvidence { subject, .. } => *subject,
        }
    }

    pub fn report(&self) -> &PathBuf {
        match self {
            AssessmentOutcome::Completed { report, .. }
            | AssessmentOutcome::NoEvidence { report, .. } => report,
        }
    }

    fn status(&self) -> RunStatus {
        match self {
            AssessmentOutcome::Completed { .. } => RunStatus::Completed,
            AssessmentOutcome::NoEvidence { .. } => RunStatus::NoEvidence,
        }
    }
}

/// Runs single-document and project assessments.
///
/// # Architecture
/// - One oracle client, built once and shared by every run
/// - Runs are sequential internally and share no mutable state
/// - Deterministic stages (prompt, classification, rendering) live in
///   `readiness-core`
pub struct AssessmentOrchestrator {
    oracle: Arc<dyn Oracle>,
    rubric: Arc<dyn RubricSource>,
    evidence: Option<Arc<dyn EvidenceStore>>,
    status: Option<Arc<dyn StatusTracker>>,
    sink: Arc<dyn ArtifactSink>,
    config: RuntimeConfig,
    synthesizer: PromptSynthesizer,
    classifier: ResponseClassifier,
    renderer: ReportRenderer,
}

impl AssessmentOrchestrator {
    pub fn builder() -> AssessmentOrchestratorBuilder {
        AssessmentOrchestratorBuilder::new()
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Assess one document and write its flat text report.
    pub async fn assess_document(
        &self,
        document_id: i64,
        document: EvidenceItem,
    ) -> Result<AssessmentOutcome, AssessmentError> {
        let subject = SubjectId::Document(document_id);
        self.mark(subject, RunStatus::Processing).await;
        let result = self.run_document(subject, document).await;
        self.finish(subject, result).await
    }

    /// Assess every evidence file of a project and write the styled report.
    pub async fn assess_project(
        &self,
        project_id: i64,
    ) -> Result<AssessmentOutcome, AssessmentError> {
        let subject = SubjectId::Project(project_id);
        self.mark(subject, RunStatus::Processing).await;
        let result = self.run_project(subject).await;
        self.finish(subject, result).await
    }

    async fn run_document(
        &self,
        subject: SubjectId,
        document: EvidenceItem,
    ) -> Result<AssessmentOutcome, AssessmentError> {
        let items = [document];
        let plan = plan_dispatch(&items, self.config.evidence.max_bytes);
        if let Some(omitted) = plan.omitted.first() {
            return Err(failed_at(subject, Stage::Evidence)(FailureKind::UnusableEvidence {
                name: omitted.name.clone(),
                reason: omitted.reason.clone(),
            }));
        }
        self.execute(subject, plan).await
    }

    async fn run_project(&self, subject: SubjectId) -> Result<AssessmentOutcome, AssessmentError> {
        let store = self
            .evidence
            .as_ref()
            .ok_or_else(|| failed_at(subject, Stage::Evidence)(FailureKind::NoEvidenceStore))?;
        let items = store
            .project_evidence(subject.id())
            .await
            .map_err(failed_at(subject, Stage::Evidence))?;

        let plan = plan_dispatch(&items, self.config.evidence.max_bytes);
        for omitted in &plan.omitted {
            tracing::warn!(
                subject = %subject,
                file = %omitted.name,
                reason = %omitted.reason,
                "Evidence omitted from dispatch"
            );
        }

        if plan.parts.is_empty() {
            tracing::info!(
                subject = %subject,
                items = items.len(),
                "No usable evidence, writing placeholder"
            );
            let report = self
                .sink
                .write(subject, &no_evidence_report(subject.id()))
                .await
                .map_err(failed_at(subject, Stage::Persist))?;
            return Ok(AssessmentOutcome::NoEvidence {
                subject,
                report,
                omitted: plan.omitted,
            });
        }

        self.execute(subject, plan).await
    }

    /// Shared tail of both workflows. The staging area lives until this
    /// returns, whatever the exit path.
    async fn execute(
        &self,
        subject: SubjectId,
        plan: DispatchPlan<'_>,
    ) -> Result<AssessmentOutcome, AssessmentError> {
        let mut staging = StagingArea::create(self.config.storage.staging_dir.as_deref(), subject)
            .map_err(failed_at(subject, Stage::Staging))?;
        for part in &plan.parts {
            staging
                .stage(part.name, part.data)
                .map_err(failed_at(subject, Stage::Staging))?;
        }
        tracing::debug!(
            subject = %subject,
            path = %staging.path().display(),
            files = staging.files().len(),
            "Evidence staged"
        );

        let rubric = self
            .rubric
            .load()
            .await
            .map_err(failed_at(subject, Stage::Rubric))?;
        tracing::debug!(subject = %subject, source = %self.rubric.describe(), "Rubric loaded");

        let mode = subject.mode();
        let context = PromptContext::new(subject).with_evidence_names(plan.part_names());
        let prompt = self.synthesizer.build_prompt(&rubric, mode, &context);

        let raw = self
            .consult(subject, &prompt, &plan.parts)
            .await
            .map_err(failed_at(subject, Stage::Oracle))?;
        if raw.is_blank() {
            tracing::warn!(
                subject = %subject,
                oracle = %self.oracle.name(),
                "Oracle returned a blank answer"
            );
        }

        let classification = self.classifier.classify(&raw);
        let metadata = RunMetadata {
            subject,
            generated_at: self.config.report.timestamp(),
            model: self.oracle.model().to_string(),
        };
        let artifact = self.renderer.render(&raw, &classification, mode, &metadata);
        let report = self
            .sink
            .write(subject, &artifact)
            .await
            .map_err(failed_at(subject, Stage::Persist))?;

        if let Err(e) = staging.close() {
            tracing::warn!(subject = %subject, error = %e, "Failed to remove staging directory");
        }

        Ok(AssessmentOutcome::Completed {
            subject,
            report,
            global_result: classification.global_result,
            omitted: plan.omitted,
        })
    }

    /// Call the oracle with the configured timeout and retry policy.
    async fn consult(
        &self,
        subject: SubjectId,
        prompt: &str,
        parts: &[EvidencePart<'_>],
    ) -> Result<RawAssessmentText, OracleError> {
        let timeout = self.config.oracle.timeout;
        let attempt = || async move {
            match tokio::time::timeout(timeout, self.oracle.submit(prompt, parts)).await {
                Ok(result) => result,
                Err(_) => Err(OracleError::Timeout(timeout)),
            }
        };

        attempt
            .retry(self.backoff())
            .sleep(tokio::time::sleep)
            .when(|e: &OracleError| e.is_retryable())
            .notify(|e: &OracleError, delay: Duration| {
                tracing::warn!(
                    subject = %subject,
                    error = %e,
                    delay = ?delay,
                    "Oracle call failed, retrying"
                );
            })
            .await
    }

    fn backoff(&self) -> ExponentialBuilder {
        let retry = &self.config.retry;
        ExponentialBuilder::default()
            .with_min_delay(retry.initial_backoff)
            .with_max_delay(retry.max_backoff)
            .with_max_times(retry.max_retries)
    }

    async fn finish(
        &self,
        subject: SubjectId,
        result: Result<AssessmentOutcome, AssessmentError>,
    ) -> Result<AssessmentOutcome, AssessmentError> {
        match &result {
            Ok(outcome) => {
                tracing::info!(
                    subject = %subject,
                    report = %outcome.report().display(),
                    "Assessment finished"
                );
                self.mark(subject, outcome.status()).await;
            }
            Err(e) => {
                tracing::error!(
                    subject = %subject,
                    stage = %e.stage,
                    error = %e.kind,
                    "Assessment failed"
                );
                self.mark(subject, RunStatus::Failed(e.to_string())).await;
            }
        }
        result
    }

    /// Status writes never change the outcome of a run.
    async fn mark(&self, subject: SubjectId, status: RunStatus) {
        if let Some(tracker) = &self.status {
            if let Err(e) = tracker.mark(subject, &status).await {
                tracing::warn!(
                    subject = %subject,
                    status = %status,
                    error = %e,
                    "Failed to record status"
                );
            }
        }
    }
}

/// Builder for AssessmentOrchestrator.
pub struct AssessmentOrchestratorBuilder {
    oracle: Option<Arc<dyn Oracle>>,
    rubric: Option<Arc<dyn RubricSource>>,
    evidence: Option<Arc<dyn EvidenceStore>>,
    status: Option<Arc<dyn StatusTracker>>,
    sink: Option<Arc<dyn ArtifactSink>>,
    config: RuntimeConfig,
}

impl AssessmentOrchestratorBuilder {
    pub fn new() -> Self {
        Self {
            oracle: None,
            rubric: None,
            evidence: None,
            status: None,
            sink: None,
            config: RuntimeConfig::default(),
        }
    }

    pub fn oracle(mut self, oracle: Arc<dyn Oracle>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    pub fn rubric_source(mut self, source: Arc<dyn RubricSource>) -> Self {
        self.rubric = Some(source);
        self
    }

    pub fn evidence_store(mut self, store: Arc<dyn EvidenceStore>) -> Self {
        self.evidence = Some(store);
        self
    }

    pub fn status_tracker(mut self, tracker: Arc<dyn StatusTracker>) -> Self {
        self.status = Some(tracker);
        self
    }

    /// Defaults to a [`FsArtifactSink`] on `storage.output_dir`.
    pub fn sink(mut self, sink: Arc<dyn ArtifactSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<AssessmentOrchestrator, OrchestratorError> {
        let oracle = self.oracle.ok_or(OrchestratorError::NotConfigured("oracle"))?;
        let rubric = self
            .rubric
            .ok_or(OrchestratorError::NotConfigured("rubric source"))?;
        let sink = self.sink.unwrap_or_else(|| {
            Arc::new(FsArtifactSink::new(self.config.storage.output_dir.clone()))
        });

        Ok(AssessmentOrchestrator {
            oracle,
            rubric,
            evidence: self.evidence,
            status: self.status,
            sink,
            classifier: ResponseClassifier::new(self.config.classifier.clone()),
            renderer: ReportRenderer::new(self.config.report.branding.clone()),
            synthesizer: PromptSynthesizer::new(),
            config: self.config,
        })
    }
}

impl Default for AssessmentOrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use readiness_core::{CriterionRow, LevelRow, PDF_MIME};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tempfile::TempDir;

    use crate::sources::{StoreRubricSource, YamlRubricSource};
    use crate::store::SqliteStore;

    const ANSWER: &str = "NIVEL TRL 1 - EVALUACION\n\
                          CRITERIO: Documento identifica problema tecnico\n\
                          EVIDENCIA: Seccion 2 describe el problema\n\
                          PUNTAJE: 80 CUMPLE\n\
                          TRL REAL: TRL 1\n\
                          RECOMENDACIONES\n\
                          - Agregar pruebas de campo";

    // Oracle double replaying scripted replies
    #[derive(Default)]
    struct ScriptedOracle {
        replies: Mutex<VecDeque<Result<String, OracleError>>>,
        calls: AtomicUsize,
        last_prompt: Mutex<Option<String>>,
        last_part_count: AtomicUsize,
        delay: Option<Duration>,
        staging_root: Option<PathBuf>,
        staged_during_call: Mutex<Vec<PathBuf>>,
    }

    impl ScriptedOracle {
        fn replying(replies: Vec<Result<String, OracleError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                ..Self::default()
            }
        }

        /// Record the files under `root`'s run directories while answering.
        fn watching(mut self, root: &std::path::Path) -> Self {
            self.staging_root = Some(root.to_path_buf());
            self
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn staged_during_call(&self) -> Vec<PathBuf> {
            self.staged_during_call.lock().unwrap().clone()
        }
    }

    fn files_in_run_dirs(root: &std::path::Path) -> Vec<PathBuf> {
        let mut files = Vec::new();
        for run_dir in std::fs::read_dir(root).unwrap() {
            let run_dir = run_dir.unwrap().path();
            if run_dir.is_dir() {
                for file in std::fs::read_dir(&run_dir).unwrap() {
                    files.push(file.unwrap().path());
                }
            }
        }
        files.sort();
        files
    }

    #[async_trait]
    impl Oracle for ScriptedOracle {
        async fn submit(
            &self,
            prompt: &str,
            parts: &[EvidencePart<'_>],
        ) -> Result<RawAssessmentText, OracleError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_prompt.lock().unwrap() = Some(prompt.to_string());
            self.last_part_count.store(parts.len(), Ordering::SeqCst);
            if let Some(root) = &self.staging_root {
                *self.staged_during_call.lock().unwrap() = files_in_run_dirs(root);
            }
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let reply = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(ANSWER.to_string()));
            reply.map(RawAssessmentText::new)
        }

        fn name(&self) -> &str {
            "scripted"
        }

        fn model(&self) -> &str {
            "gemini-2.0-flash"
        }
    }

    struct Harness {
        store: Arc<SqliteStore>,
        output: TempDir,
        staging: TempDir,
        config: RuntimeConfig,
    }

    impl Harness {
        async fn new() -> Self {
            let store = SqliteStore::in_memory().await.unwrap();
            for (ordinal, name, min_score) in [
                (1, "Principios observados", 50),
                (2, "Concepto formulado", 60),
                (3, "Prueba de concepto", 70),
            ] {
                store
                    .insert_level(&LevelRow {
                        ordinal,
                        name: name.to_string(),
                        min_score,
                        description: String::new(),
                    })
                    .await
                    .unwrap();
            }
            store
                .insert_criterion(&CriterionRow {
                    level: 1,
                    name: "Documento identifica problema tecnico".to_string(),
                    points: 80,
                    importance: "alta".to_string(),
                    justification: String::new(),
                })
                .await
                .unwrap();

            let output = tempfile::tempdir().unwrap();
            let staging = tempfile::tempdir().unwrap();
            let mut config = RuntimeConfig::default();
            config.storage.output_dir = output.path().to_path_buf();
            config.storage.staging_dir = Some(staging.path().to_path_buf());
            config.report.generated_at = Some(Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap());
            config.retry.initial_backoff = Duration::from_millis(1);
            config.retry.max_backoff = Duration::from_millis(5);

            Self {
                store: Arc::new(store),
                output,
                staging,
                config,
            }
        }

        fn orchestrator(&self, oracle: Arc<ScriptedOracle>) -> AssessmentOrchestrator {
            AssessmentOrchestrator::builder()
                .oracle(oracle)
                .rubric_source(Arc::new(StoreRubricSource::new(self.store.clone())))
                .evidence_store(self.store.clone())
                .status_tracker(self.store.clone())
                .config(self.config.clone())
                .build()
                .unwrap()
        }

        fn staging_is_empty(&self) -> bool {
            std::fs::read_dir(self.staging.path()).unwrap().count() == 0
        }

        fn output_files(&self) -> usize {
            std::fs::read_dir(self.output.path()).unwrap().count()
        }

        async fn status(&self, subject: SubjectId) -> Option<RunStatus> {
            self.store.status(subject).await.unwrap()
        }
    }

    fn pdf(name: &str) -> EvidenceItem {
        EvidenceItem::new(name, PDF_MIME, b"%PDF-1.4 evidence".to_vec())
    }

    #[tokio::test]
    async fn test_project_without_evidence_makes_no_oracle_call() {
        let harness = Harness::new().await;
        let oracle = Arc::new(ScriptedOracle::default());
        let orchestrator = harness.orchestrator(oracle.clone());

        let outcome = orchestrator.assess_project(9).await.unwrap();

        assert!(matches!(outcome, AssessmentOutcome::NoEvidence { .. }));
        assert_eq!(oracle.calls(), 0);
        assert!(outcome.report().ends_with("analisis_proyecto_9.txt"));
        assert_eq!(
            std::fs::read_to_string(outcome.report()).unwrap(),
            "El proyecto 9 no tiene evidencias cargadas para analizar."
        );
        assert_eq!(
            harness.status(SubjectId::Project(9)).await,
            Some(RunStatus::NoEvidence)
        );
    }

    #[tokio::test]
    async fn test_project_with_only_unsupported_evidence_is_no_evidence() {
        let harness = Harness::new().await;
        harness
            .store
            .add_evidence(
                4,
                &EvidenceItem::new("datos.xlsx", "application/vnd.ms-excel", vec![1, 2]),
            )
            .await
            .unwrap();
        let oracle = Arc::new(ScriptedOracle::default());

        let outcome = harness.orchestrator(oracle.clone()).assess_project(4).await.unwrap();

        match outcome {
            AssessmentOutcome::NoEvidence { omitted, .. } => {
                assert_eq!(omitted.len(), 1);
                assert_eq!(omitted[0].name, "datos.xlsx");
            }
            other => panic!("expected NoEvidence, got {:?}", other),
        }
        assert_eq!(oracle.calls(), 0);
    }

    #[tokio::test]
    async fn test_project_end_to_end() {
        let harness = Harness::new().await;
        harness.store.add_evidence(1, &pdf("informe.pdf")).await.unwrap();
        harness
            .store
            .add_evidence(1, &EvidenceItem::new("foto.png", "image/png", vec![9]))
            .await
            .unwrap();
        harness
            .store
            .add_evidence(1, &EvidenceItem::new("notas.txt", "text/plain", vec![1]))
            .await
            .unwrap();
        let oracle = Arc::new(ScriptedOracle::default());

        let outcome = harness.orchestrator(oracle.clone()).assess_project(1).await.unwrap();

        match &outcome {
            AssessmentOutcome::Completed {
                global_result,
                omitted,
                report,
                ..
            } => {
                assert_eq!(*global_result, GlobalResult::Level(1));
                assert_eq!(omitted.len(), 1);
                assert!(report.ends_with("analisis_proyecto_1.pdf"));
                let bytes = std::fs::read(report).unwrap();
                assert!(bytes.starts_with(b"%PDF-1.4"));
            }
            other => panic!("expected Completed, got {:?}", other),
        }

        assert_eq!(oracle.calls(), 1);
        assert_eq!(oracle.last_part_count.load(Ordering::SeqCst), 2);
        let prompt = oracle.last_prompt.lock().unwrap().clone().unwrap();
        assert!(prompt.contains("informe.pdf"));
        assert!(prompt.contains("foto.png"));
        assert!(!prompt.contains("notas.txt"));
        assert!(prompt.contains("TRL 3: 70 puntos mínimos"));

        assert!(harness.staging_is_empty());
        assert_eq!(
            harness.status(SubjectId::Project(1)).await,
            Some(RunStatus::Completed)
        );
    }

    #[tokio::test]
    async fn test_document_report_is_the_answer_verbatim() {
        let harness = Harness::new().await;
        let oracle = Arc::new(ScriptedOracle::default());

        let outcome = harness
            .orchestrator(oracle.clone())
            .assess_document(12, pdf("tesis.pdf"))
            .await
            .unwrap();

        assert!(outcome.report().ends_with("analisis_12.txt"));
        assert_eq!(std::fs::read_to_string(outcome.report()).unwrap(), ANSWER);
        assert_eq!(oracle.last_part_count.load(Ordering::SeqCst), 1);
        assert!(harness.staging_is_empty());
    }

    #[tokio::test]
    async fn test_oracle_rejection_cleans_up_and_is_not_retried() {
        let mut harness = Harness::new().await;
        harness.config.retry.max_retries = 3;
        let oracle = Arc::new(
            ScriptedOracle::replying(vec![Err(OracleError::Rejected {
                status: 400,
                message: "Request payload size exceeds the limit".to_string(),
            })])
            .watching(harness.staging.path()),
        );

        let err = harness
            .orchestrator(oracle.clone())
            .assess_document(5, pdf("grande.pdf"))
            .await
            .unwrap_err();

        assert_eq!(err.stage, Stage::Oracle);
        assert_eq!(err.subject, SubjectId::Document(5));
        assert!(matches!(
            err.kind,
            FailureKind::Oracle(OracleError::Rejected { status: 400, .. })
        ));
        assert_eq!(oracle.calls(), 1);

        let staged = oracle.staged_during_call();
        assert_eq!(staged.len(), 1);
        assert!(staged[0].ends_with("001_grande.pdf"));
        assert!(!staged[0].exists());
        assert!(harness.staging_is_empty());
        assert_eq!(harness.output_files(), 0);

        match harness.status(SubjectId::Document(5)).await {
            Some(RunStatus::Failed(message)) => assert!(message.contains("payload size")),
            other => panic!("expected failed status, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_network_failure_is_retried() {
        let mut harness = Harness::new().await;
        harness.config.retry.max_retries = 2;
        let oracle = Arc::new(ScriptedOracle::replying(vec![
            Err(OracleError::Unavailable("connection reset".to_string())),
            Err(OracleError::Rejected {
                status: 503,
                message: "overloaded".to_string(),
            }),
        ]));

        let outcome = harness
            .orchestrator(oracle.clone())
            .assess_document(2, pdf("a.pdf"))
            .await
            .unwrap();

        assert!(matches!(outcome, AssessmentOutcome::Completed { .. }));
        assert_eq!(oracle.calls(), 3);
    }

    #[tokio::test]
    async fn test_retry_disabled_by_default() {
        let harness = Harness::new().await;
        let oracle = Arc::new(ScriptedOracle::replying(vec![Err(OracleError::Unavailable(
            "dns".to_string(),
        ))]));

        let err = harness
            .orchestrator(oracle.clone())
            .assess_document(2, pdf("a.pdf"))
            .await
            .unwrap_err();
        assert_eq!(err.stage, Stage::Oracle);
        assert_eq!(oracle.calls(), 1);
    }

    #[tokio::test]
    async fn test_oracle_timeout() {
        let mut harness = Harness::new().await;
        harness.config.oracle.timeout = Duration::from_millis(50);
        let oracle = Arc::new(
            ScriptedOracle {
                delay: Some(Duration::from_secs(5)),
                ..ScriptedOracle::default()
            }
            .watching(harness.staging.path()),
        );

        let err = harness
            .orchestrator(oracle.clone())
            .assess_document(8, pdf("a.pdf"))
            .await
            .unwrap_err();

        assert!(matches!(err.kind, FailureKind::Oracle(OracleError::Timeout(_))));
        let staged = oracle.staged_during_call();
        assert_eq!(staged.len(), 1);
        assert!(staged[0].ends_with("001_a.pdf"));
        assert!(!staged[0].exists());
        assert!(harness.staging_is_empty());
        assert_eq!(harness.output_files(), 0);
    }

    #[tokio::test]
    async fn test_missing_rubric_stops_before_oracle() {
        let harness = Harness::new().await;
        let oracle = Arc::new(ScriptedOracle::default());
        let orchestrator = AssessmentOrchestrator::builder()
            .oracle(oracle.clone())
            .rubric_source(Arc::new(YamlRubricSource::new("/missing/rubric.yaml")))
            .config(harness.config.clone())
            .build()
            .unwrap();

        let err = orchestrator
            .assess_document(3, pdf("a.pdf"))
            .await
            .unwrap_err();

        assert_eq!(err.stage, Stage::Rubric);
        assert!(matches!(
            err.kind,
            FailureKind::Rubric(RubricUnavailable::MissingFile(_))
        ));
        assert_eq!(oracle.calls(), 0);
        assert!(harness.staging_is_empty());
    }

    #[tokio::test]
    async fn test_unusable_document_fails_at_evidence() {
        let harness = Harness::new().await;
        let oracle = Arc::new(ScriptedOracle::default());

        let err = harness
            .orchestrator(oracle.clone())
            .assess_document(4, EvidenceItem::new("notas.docx", "application/msword", vec![1]))
            .await
            .unwrap_err();

        assert_eq!(err.stage, Stage::Evidence);
        assert!(err.to_string().contains("notas.docx"));
        assert_eq!(oracle.calls(), 0);
    }

    #[test]
    fn test_builder_requires_oracle_and_rubric() {
        let err = AssessmentOrchestrator::builder().build().err().unwrap();
        assert_eq!(err.to_string(), "oracle not configured");

        let err = AssessmentOrchestrator::builder()
            .oracle(Arc::new(ScriptedOracle::default()))
            .build()
            .err()
            .unwrap();
        assert_eq!(err.to_string(), "rubric source not configured");
    }
}
