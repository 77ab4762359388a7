//! Disposable per-invocation working area.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, info};

use cvmaker_shared::{CvMakerError, Result};

const WORKDIR_PREFIX: &str = "cvmaker-";

/// A uniquely named temporary directory owned by one pipeline run.
///
/// Dropping it removes the directory and everything in it, unless
/// [`WorkingArea::keep`] was called.
#[derive(Debug)]
pub struct WorkingArea {
    dir: Option<TempDir>,
    path: PathBuf,
}

impl WorkingArea {
    /// Create a fresh working area in the system temp directory.
    pub fn create() -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(WORKDIR_PREFIX)
            .tempdir()
            .map_err(|e| CvMakerError::io(std::env::temp_dir(), e))?;
        let path = dir.path().to_path_buf();
        debug!(path = %path.display(), "working area created");
        Ok(Self {
            dir: Some(dir),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of `name` inside the working area.
    pub fn join(&self, name: impl AsRef<Path>) -> PathBuf {
        self.path.join(name)
    }

    /// Copy `file` into the working area, optionally under a different name.
    pub fn stage_file(&self, file: &Path, name: Option<&str>) -> Result<PathBuf> {
        let target = match name {
            Some(name) => self.join(name),
            None => self.join(file.file_name().ok_or_else(|| {
                CvMakerError::validation(format!("'{}' is not a file path", file.display()))
            })?),
        };
        std::fs::copy(file, &target).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => CvMakerError::InputNotFound {
                path: file.to_path_buf(),
            },
            _ => CvMakerError::io(file, e),
        })?;
        debug!(from = %file.display(), to = %target.display(), "staged");
        Ok(target)
    }

    /// Copy every regular file directly inside `dir` into the working area.
    ///
    /// A missing directory stages nothing. Returns the number of files copied.
    pub fn stage_dir(&self, dir: &Path) -> Result<usize> {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(dir = %dir.display(), "nothing to stage");
                return Ok(0);
            }
            Err(e) => return Err(CvMakerError::io(dir, e)),
        };

        let mut staged = 0;
        for entry in entries {
            let path = entry.map_err(|e| CvMakerError::io(dir, e))?.path();
            if path.is_file() {
                self.stage_file(&path, None)?;
                staged += 1;
            }
        }
        Ok(staged)
    }

    /// Keep the directory on disk after this value is dropped.
    pub fn keep(mut self) -> PathBuf {
        if let Some(dir) = self.dir.take() {
            let _ = dir.keep();
        }
        info!(path = %self.path.display(), "working area kept");
        self.path.clone()
    }

    /// Remove the directory now, reporting failures.
    pub fn remove(mut self) -> Result<()> {
        match self.dir.take() {
            Some(dir) => dir.close().map_err(|e| CvMakerError::io(&self.path, e)),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removed_on_drop() {
        let area = WorkingArea::create().unwrap();
        let path = area.path().to_path_buf();
        assert!(path.is_dir());
        assert!(path.file_name().unwrap().to_str().unwrap().starts_with("cvmaker-"));
        drop(area);
        assert!(!path.exists());
    }

    #[test]
    fn keep_retains_directory() {
        let area = WorkingArea::create().unwrap();
        let path = area.keep();
        assert!(path.is_dir());
        std::fs::remove_dir_all(path).unwrap();
    }

    #[test]
    fn stages_files_and_directories() {
        let src = tempfile::tempdir().unwrap();
        std::fs::write(src.path().join("a.pdf"), b"a").unwrap();
        std::fs::write(src.path().join("b.sty"), b"b").unwrap();
        std::fs::create_dir(src.path().join("nested")).unwrap();

        let area = WorkingArea::create().unwrap();
        assert_eq!(area.stage_dir(src.path()).unwrap(), 2);
        assert!(area.join("a.pdf").is_file());
        assert!(!area.join("nested").exists());

        area.stage_file(&src.path().join("b.sty"), Some("renamed.sty")).unwrap();
        assert!(area.join("renamed.sty").is_file());

        assert_eq!(area.stage_dir(&src.path().join("missing")).unwrap(), 0);
        let err = area.stage_file(&src.path().join("missing.txt"), None).unwrap_err();
        assert!(matches!(err, CvMakerError::InputNotFound { .. }));
    }
}
