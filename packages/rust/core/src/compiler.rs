//! External typesetter driver.
//!
//! Writes an assembled document into the working area as `<stem>.tex` and
//! runs the typesetter on it there, non-interactively and with its output
//! discarded. A run only counts as successful when the process exits with
//! status zero *and* `<stem>.pdf` exists afterwards.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

use cvmaker_shared::{CvMakerError, DocumentVariant, Result, TypesetterConfig};

/// Flags putting the typesetter into batch mode, stopping at the first error.
const BATCH_FLAGS: [&str; 2] = ["-interaction=nonstopmode", "-halt-on-error"];

/// A configured typesetting executable.
#[derive(Debug, Clone)]
pub struct Typesetter {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl Typesetter {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    pub fn from_config(config: &TypesetterConfig) -> Self {
        Self::new(config.program.clone(), config.args.clone(), config.timeout())
    }

    /// Find the executable, or fail with [`CvMakerError::ToolchainMissing`].
    pub fn locate(&self) -> Result<PathBuf> {
        find_executable(&self.program).ok_or_else(|| CvMakerError::ToolchainMissing {
            program: self.program.clone(),
        })
    }

    /// Write `source` as `<variant>.tex` into `workdir` and typeset it.
    ///
    /// Returns the path of the produced PDF.
    #[instrument(skip_all, fields(%variant, workdir = %workdir.display()))]
    pub async fn compile(
        &self,
        workdir: &Path,
        variant: DocumentVariant,
        source: &str,
    ) -> Result<PathBuf> {
        let executable = self.locate()?;

        let stem = variant.file_stem();
        let tex = workdir.join(format!("{stem}.tex"));
        let pdf = workdir.join(format!("{stem}.pdf"));
        let log = workdir.join(format!("{stem}.log"));

        std::fs::write(&tex, source).map_err(|e| CvMakerError::io(&tex, e))?;
        debug!(path = %tex.display(), "source written");

        if pdf.exists() {
            std::fs::remove_file(&pdf).map_err(|e| CvMakerError::io(&pdf, e))?;
        }

        let failure = |reason: String| CvMakerError::Compilation {
            source_file: tex.clone(),
            log: log.clone(),
            reason,
        };

        let mut child = Command::new(&executable)
            .args(&self.args)
            .args(BATCH_FLAGS)
            .arg(format!("{stem}.tex"))
            .current_dir(workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => CvMakerError::ToolchainMissing {
                    program: self.program.clone(),
                },
                _ => CvMakerError::io(&executable, e),
            })?;

        let waited = tokio::time::timeout(self.timeout, child.wait()).await;
        let status = match waited {
            Ok(status) => status.map_err(|e| CvMakerError::io(&executable, e))?,
            Err(_) => {
                warn!(timeout_secs = self.timeout.as_secs(), "typesetter timed out, killing it");
                let _ = child.kill().await;
                return Err(failure(format!(
                    "typesetter did not finish within {}s",
                    self.timeout.as_secs()
                )));
            }
        };

        if !status.success() {
            return Err(failure(match status.code() {
                Some(code) => format!("typesetter exited with status {code}"),
                None => "typesetter was terminated by a signal".into(),
            }));
        }
        if !pdf.is_file() {
            return Err(failure("typesetter reported success but wrote no PDF".into()));
        }

        info!(path = %pdf.display(), "PDF written");
        Ok(pdf)
    }
}

/// Look up `program` on `PATH`, or check it directly when it is a path.
pub fn find_executable(program: &str) -> Option<PathBuf> {
    let candidate = Path::new(program);
    if candidate.components().count() > 1 {
        return is_executable(candidate).then(|| candidate.to_path_buf());
    }

    let extensions: Vec<String> = match std::env::var("PATHEXT") {
        Ok(exts) if cfg!(windows) => exts.split(';').map(str::to_string).collect(),
        _ => vec![String::new()],
    };

    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path).find_map(|dir| {
        extensions
            .iter()
            .map(|ext| dir.join(format!("{program}{ext}")))
            .find(|exe| is_executable(exe))
    })
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
