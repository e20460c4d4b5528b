//! Scoped on-disk snapshot of the evidence sent in one run.
//!
//! The directory is removed when the [`StagingArea`] is dropped, so every
//! exit path of a run (success, oracle failure, render failure) cleans up.

use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use readiness_core::SubjectId;

/// A per-run temporary directory holding staged evidence files.
#[derive(Debug)]
pub struct StagingArea {
    dir: TempDir,
    files: Vec<PathBuf>,
}

impl StagingArea {
    /// Create `<parent>/<kind>_<id>_XXXX`, or under the system temp dir.
    pub fn create(parent: Option<&Path>, subject: SubjectId) -> io::Result<Self> {
        let prefix = format!("{}_{}_", subject.kind(), subject.id());
        let mut builder = tempfile::Builder::new();
        builder.prefix(&prefix);
        let dir = match parent {
            Some(parent) => {
                std::fs::create_dir_all(parent)?;
                builder.tempdir_in(parent)?
            }
            None => builder.tempdir()?,
        };
        Ok(Self {
            dir,
            files: Vec::new(),
        })
    }

    /// Write one payload; files are numbered in staging order.
    pub fn stage(&mut self, name: &str, payload: &[u8]) -> io::Result<PathBuf> {
        let file_name = format!("{:03}_{}", self.files.len() + 1, safe_file_name(name));
        let path = self.dir.path().join(file_name);
        std::fs::write(&path, payload)?;
        self.files.push(path.clone());
        Ok(path)
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Remove the directory now and report failures.
    pub fn close(self) -> io::Result<()> {
        self.dir.close()
    }
}

/// Keep only characters that are safe in a file name on every platform.
fn safe_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = cleaned.trim_matches('.');
    if trimmed.is_empty() {
        "evidencia".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_stage_and_close() {
        let parent = tempfile::tempdir().unwrap();
        let mut area = StagingArea::create(Some(parent.path()), SubjectId::Project(4)).unwrap();

        let dir_name = area.path().file_name().unwrap().to_string_lossy().to_string();
        assert!(dir_name.starts_with("project_4_"));

        let first = area.stage("informe final.pdf", b"%PDF").unwrap();
        let second = area.stage("foto.png", b"PNG").unwrap();
        assert!(first.ends_with("001_informe_final.pdf"));
        assert!(second.ends_with("002_foto.png"));
        assert_eq!(std::fs::read(&first).unwrap(), b"%PDF");
        assert_eq!(area.files().len(), 2);

        area.close().unwrap();
        assert_eq!(std::fs::read_dir(parent.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_drop_removes_directory() {
        let parent = tempfile::tempdir().unwrap();
        let path = {
            let mut area =
                StagingArea::create(Some(parent.path()), SubjectId::Document(1)).unwrap();
            area.stage("a.pdf", b"x").unwrap();
            area.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn test_safe_file_name() {
        assert_eq!(safe_file_name("../../etc/passwd"), "passwd");
        assert_eq!(safe_file_name("C:\\docs\\plan v2.pdf"), "plan_v2.pdf");
        assert_eq!(safe_file_name("año.pdf"), "año.pdf");
        assert_eq!(safe_file_name(".."), "evidencia");
    }

    proptest! {
        #[test]
        fn prop_safe_name_is_a_plain_file_name(name in any::<String>()) {
            let cleaned = safe_file_name(&name);
            prop_assert!(!cleaned.is_empty());
            prop_assert!(!cleaned.contains('/') && !cleaned.contains('\\'));
            prop_assert!(!cleaned.starts_with('.'));
        }
    }
}
