//! Where finished reports go.

use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};

use readiness_core::{ArtifactFormat, ReportArtifact, SubjectId};

/// Report file name for a subject: `analisis_<id>` for documents,
/// `analisis_proyecto_<id>` for projects.
pub fn artifact_file_name(subject: SubjectId, format: ArtifactFormat) -> String {
    let extension = format.extension();
    match subject {
        SubjectId::Document(id) => format!("analisis_{}.{}", id, extension),
        SubjectId::Project(id) => format!("analisis_proyecto_{}.{}", id, extension),
    }
}

/// Receives each run's report exactly once.
#[async_trait]
pub trait ArtifactSink: Send + Sync {
    /// Persist the artifact; returns where it ended up.
    async fn write(&self, subject: SubjectId, artifact: &ReportArtifact) -> io::Result<PathBuf>;
}

/// Writes reports into a directory.
///
/// Bytes go to a `.partial` file that is renamed into place, so a reader
/// never sees a half-written report.
#[derive(Debug, Clone)]
pub struct FsArtifactSink {
    dir: PathBuf,
}

impl FsArtifactSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl ArtifactSink for FsArtifactSink {
    async fn write(&self, subject: SubjectId, artifact: &ReportArtifact) -> io::Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let name = artifact_file_name(subject, artifact.format);
        let target = self.dir.join(&name);
        let partial = self.dir.join(format!("{}.partial", name));

        tokio::fs::write(&partial, &artifact.bytes).await?;
        if let Err(e) = tokio::fs::rename(&partial, &target).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(e);
        }

        tracing::debug!(path = %target.display(), bytes = artifact.bytes.len(), "Report written");
        Ok(target)
    }
}
