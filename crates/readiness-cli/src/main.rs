//! Readiness CLI
//!
//! Command-line interface for TRL assessment of documents and projects.
//!
//! ## Usage
//!
//! ```bash
//! # Assess one document (registers it when no id is given)
//! readiness document --file tesis.pdf
//!
//! # Assess every evidence file of a project
//! readiness project --project-id 42
//!
//! # Inspect the prompt a run would send
//! readiness prompt --mode project --subject 42 --evidence informe.pdf
//!
//! # Classify a saved oracle answer
//! cat answer.txt | readiness classify
//!
//! # Validate or import a YAML rubric
//! readiness rubric validate rubric.yaml
//! readiness rubric import rubric.yaml
//! ```
//!
//! ## Exit Codes
//!
//! - 0: Success
//! - 1: Assessment failed, or the rubric is invalid
//! - 2: Usage or configuration error
//!
//! Logs go to stderr. On success the assessment commands print
//! `DOC_ID:<id>` or `PROJECT_ID:<id>` on stdout.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use readiness_core::rubric::RubricDocument;
use readiness_core::{
    AssessmentMode, EvidenceItem, PromptContext, PromptSynthesizer, RawAssessmentText,
    ResponseClassifier, Rubric, SubjectId, PDF_MIME,
};
use readiness_runtime::{
    oracle, rubric_source, AssessmentOrchestrator, AssessmentOutcome, DocumentRegistry,
    RuntimeConfig, SqliteStore,
};

/// Readiness: TRL assessment of research documents and projects
#[derive(Parser)]
#[command(name = "readiness")]
#[command(version)]
#[command(about = "Assess technology readiness levels with an LLM oracle", long_about = None)]
struct Cli {
    /// Runtime configuration file (YAML)
    #[arg(short, long, global = true, env = "READINESS_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assess a single document
    Document {
        /// Path to the document (PDF)
        #[arg(short, long)]
        file: PathBuf,

        /// Document id; a new one is registered when omitted
        #[arg(long)]
        doc_id: Option<i64>,

        /// Fixed report timestamp (RFC 3339), for reproducible reports
        #[arg(long, value_parser = parse_datetime)]
        generated_at: Option<DateTime<Utc>>,
    },

    /// Assess all evidence of a project
    Project {
        /// Project id
        #[arg(short, long)]
        project_id: i64,

        /// Fixed report timestamp (RFC 3339), for reproducible reports
        #[arg(long, value_parser = parse_datetime)]
        generated_at: Option<DateTime<Utc>>,
    },

    /// Print the prompt an assessment would send
    Prompt {
        /// Assessment mode
        #[arg(short, long, default_value = "document")]
        mode: ModeArg,

        /// Subject id
        #[arg(short, long, default_value_t = 0)]
        subject: i64,

        /// Evidence file names to list (project mode, repeatable)
        #[arg(long)]
        evidence: Vec<String>,
    },

    /// Classify an oracle answer and print the result as JSON
    Classify {
        /// Answer file (reads from stdin if not provided)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Rubric management commands
    Rubric {
        #[command(subcommand)]
        action: RubricAction,
    },

    /// Evidence management commands
    Evidence {
        #[command(subcommand)]
        action: EvidenceAction,
    },
}

#[derive(Subcommand)]
enum RubricAction {
    /// Validate a YAML rubric file
    Validate {
        /// Path to the rubric file
        path: PathBuf,
    },

    /// Replace the stored rubric with a YAML rubric file
    Import {
        /// Path to the rubric file
        path: PathBuf,
    },
}

#[derive(Subcommand)]
enum EvidenceAction {
    /// Attach files to a project
    Add {
        /// Project id
        #[arg(short, long)]
        project_id: i64,

        /// Files to attach
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Document,
    Project,
}

/// Parse an RFC 3339 timestamp such as `2025-01-02T03:04:05Z`.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            format!(
                "Invalid timestamp: {}. Expected RFC 3339 (e.g., 2025-01-02T03:04:05Z)",
                e
            )
        })
}

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Warning: failed to load .env: {}", e);
        }
    }

    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(log_filter(std::env::var("RUST_LOG").ok().as_deref()))
        .init();

    match run().await {
        Ok(exit_code) => exit_code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

/// `RUST_LOG` when set and valid, INFO otherwise.
fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

async fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Document {
            file,
            doc_id,
            generated_at,
        } => document_command(config, file, doc_id, generated_at).await,

        Commands::Project {
            project_id,
            generated_at,
        } => project_command(config, project_id, generated_at).await,

        Commands::Prompt {
            mode,
            subject,
            evidence,
        } => prompt_command(config, mode, subject, evidence).await,

        Commands::Classify { input } => classify_command(config, input),

        Commands::Rubric { action } => match action {
            RubricAction::Validate { path } => validate_rubric(path),
            RubricAction::Import { path } => import_rubric(config, path).await,
        },

        Commands::Evidence { action } => match action {
            EvidenceAction::Add { project_id, files } => {
                add_evidence(config, project_id, files).await
            }
        },
    }
}

fn load_config(path: Option<&Path>) -> Result<RuntimeConfig> {
    let mut config = match path {
        Some(path) => RuntimeConfig::from_yaml_file(path)
            .with_context(|| format!("Failed to load config from {:?}", path))?,
        None => RuntimeConfig::default(),
    };
    config.apply_env_overrides();
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

async fn open_store(config: &RuntimeConfig) -> Result<Arc<SqliteStore>> {
    let store = SqliteStore::connect(&config.storage.database_url)
        .await
        .with_context(|| format!("Failed to open database {}", config.storage.database_url))?;
    Ok(Arc::new(store))
}

async fn build_orchestrator(
    config: RuntimeConfig,
    store: Arc<SqliteStore>,
) -> Result<AssessmentOrchestrator> {
    let oracle = oracle::connect(&config.oracle)
        .await
        .context("Failed to set up the oracle client")?;
    tracing::info!(oracle = %oracle.name(), model = %oracle.model(), "Oracle ready");

    let rubric = rubric_source(&config.rubric, store.clone())?;
    let orchestrator = AssessmentOrchestrator::builder()
        .oracle(oracle)
        .rubric_source(rubric)
        .evidence_store(store.clone())
        .status_tracker(store)
        .config(config)
        .build()?;
    Ok(orchestrator)
}

async fn document_command(
    mut config: RuntimeConfig,
    file: PathBuf,
    doc_id: Option<i64>,
    generated_at: Option<DateTime<Utc>>,
) -> Result<ExitCode> {
    if generated_at.is_some() {
        config.report.generated_at = generated_at;
    }

    let payload = tokio::fs::read(&file)
        .await
        .with_context(|| format!("Failed to read document {:?}", file))?;
    let name = display_name(&file);

    let store = open_store(&config).await?;
    let doc_id = match doc_id {
        Some(id) => id,
        None => store
            .register_document(&name)
            .await
            .context("Failed to register document")?,
    };

    let document = EvidenceItem::new(name, guess_mime(&file), payload);
    let orchestrator = build_orchestrator(config, store).await?;

    match orchestrator.assess_document(doc_id, document).await {
        Ok(outcome) => {
            report_outcome(&outcome);
            println!("DOC_ID:{}", doc_id);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("Assessment failed: {}", e);
            Ok(ExitCode::from(1))
        }
    }
}

async fn project_command(
    mut config: RuntimeConfig,
    project_id: i64,
    generated_at: Option<DateTime<Utc>>,
) -> Result<ExitCode> {
    if generated_at.is_some() {
        config.report.generated_at = generated_at;
    }

    let store = open_store(&config).await?;
    let orchestrator = build_orchestrator(config, store).await?;

    match orchestrator.assess_project(project_id).await {
        Ok(outcome) => {
            report_outcome(&outcome);
            println!("PROJECT_ID:{}", project_id);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("Assessment failed: {}", e);
            Ok(ExitCode::from(1))
        }
    }
}

fn report_outcome(outcome: &AssessmentOutcome) {
    match outcome {
        AssessmentOutcome::Completed {
            report,
            global_result,
            omitted,
            ..
        } => {
            eprintln!("Result: {}", global_result);
            eprintln!("Report: {}", report.display());
            for item in omitted {
                eprintln!("Omitted: {} ({})", item.name, item.reason);
            }
        }
        AssessmentOutcome::NoEvidence { report, .. } => {
            eprintln!("No usable evidence");
            eprintln!("Report: {}", report.display());
        }
    }
}

async fn prompt_command(
    config: RuntimeConfig,
    mode: ModeArg,
    subject: i64,
    evidence: Vec<String>,
) -> Result<ExitCode> {
    let (subject, mode) = match mode {
        ModeArg::Document => (SubjectId::Document(subject), AssessmentMode::SingleDocument),
        ModeArg::Project => (SubjectId::Project(subject), AssessmentMode::ProjectAggregate),
    };

    let store = open_store(&config).await?;
    let source = rubric_source(&config.rubric, store)?;
    let rubric = source
        .load()
        .await
        .with_context(|| format!("Failed to load rubric from {}", source.describe()))?;

    let context = PromptContext::new(subject).with_evidence_names(evidence);
    println!("{}", PromptSynthesizer::new().build_prompt(&rubric, mode, &context));
    Ok(ExitCode::SUCCESS)
}

fn classify_command(config: RuntimeConfig, input: Option<PathBuf>) -> Result<ExitCode> {
    let content = match input {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read answer from {:?}", path))?,
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read from stdin")?;
            buffer
        }
    };

    let classification =
        ResponseClassifier::new(config.classifier).classify(&RawAssessmentText::new(content));
    println!("{}", serde_json::to_string_pretty(&classification)?);
    Ok(ExitCode::SUCCESS)
}

fn validate_rubric(path: PathBuf) -> Result<ExitCode> {
    match Rubric::from_yaml_file(&path) {
        Ok(rubric) => {
            println!("Rubric is valid: {} levels", rubric.levels().len());
            println!();
            for level in rubric.levels() {
                println!(
                    "TRL {}: {} (min {} points, {} criteria)",
                    level.ordinal,
                    level.name,
                    level.min_score,
                    level.criteria.len()
                );
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("Rubric validation failed: {}", e);
            Ok(ExitCode::from(1))
        }
    }
}

async fn import_rubric(config: RuntimeConfig, path: PathBuf) -> Result<ExitCode> {
    let yaml = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read rubric from {:?}", path))?;

    let rows = RubricDocument::from_yaml(&yaml).map(RubricDocument::into_rows);
    let (levels, criteria) = match rows {
        Ok(rows) => rows,
        Err(e) => {
            eprintln!("Rubric validation failed: {}", e);
            return Ok(ExitCode::from(1));
        }
    };
    if let Err(e) = Rubric::from_rows(levels.clone(), criteria.clone()) {
        eprintln!("Rubric validation failed: {}", e);
        return Ok(ExitCode::from(1));
    }

    let store = open_store(&config).await?;
    store
        .replace_rubric(&levels, &criteria)
        .await
        .context("Failed to store rubric")?;
    println!("Imported {} levels, {} criteria", levels.len(), criteria.len());
    Ok(ExitCode::SUCCESS)
}

async fn add_evidence(
    config: RuntimeConfig,
    project_id: i64,
    files: Vec<PathBuf>,
) -> Result<ExitCode> {
    let store = open_store(&config).await?;
    for file in files {
        let payload = tokio::fs::read(&file)
            .await
            .with_context(|| format!("Failed to read evidence {:?}", file))?;
        let item = EvidenceItem::new(display_name(&file), guess_mime(&file), payload);
        let id = store
            .add_evidence(project_id, &item)
            .await
            .with_context(|| format!("Failed to store evidence {:?}", file))?;
        println!("EVIDENCE_ID:{} {}", id, item.name);
    }
    Ok(ExitCode::SUCCESS)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Declared type from the file extension; unknown types are left for
/// evidence admission to reject.
fn guess_mime(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "pdf" => PDF_MIME,
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_document_command() {
        let cli = Cli::try_parse_from([
            "readiness",
            "--config",
            "readiness.yaml",
            "document",
            "--file",
            "tesis.pdf",
            "--generated-at",
            "2025-01-02T03:04:05Z",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("readiness.yaml")));
        match cli.command {
            Commands::Document {
                file,
                doc_id,
                generated_at,
            } => {
                assert_eq!(file, PathBuf::from("tesis.pdf"));
                assert_eq!(doc_id, None);
                assert!(generated_at.is_some());
            }
            _ => panic!("expected document command"),
        }
    }

    #[test]
    fn test_bad_timestamp_is_rejected() {
        assert!(parse_datetime("yesterday").is_err());
        assert!(parse_datetime("2025-01-02T03:04:05+00:00").is_ok());
    }

    #[test]
    fn test_log_filter_honours_rust_log() {
        assert_eq!(
            log_filter(Some("debug")).max_level_hint(),
            Some(tracing::Level::DEBUG.into())
        );
        assert_eq!(
            log_filter(None).max_level_hint(),
            Some(tracing::Level::INFO.into())
        );
        assert_eq!(
            log_filter(Some("readiness_runtime=trace")).max_level_hint(),
            Some(tracing::Level::TRACE.into())
        );
    }

    #[test]
    fn test_guess_mime() {
        assert_eq!(guess_mime(Path::new("a/Informe.PDF")), PDF_MIME);
        assert_eq!(guess_mime(Path::new("foto.jpeg")), "image/jpeg");
        assert_eq!(guess_mime(Path::new("datos.xlsx")), "application/octet-stream");
        assert_eq!(guess_mime(Path::new("sin_extension")), "application/octet-stream");
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name(Path::new("/tmp/docs/tesis.pdf")), "tesis.pdf");
    }
}
