//! End-to-end `make` pipeline: parameter file → working area → PDFs.
//!
//! Stages run strictly in order:
//!
//! 1. **Staging inputs**: copy the parameter file, style assets, attachment
//!    files and the resolved templates into a fresh working area.
//! 2. **Assembling**: extract variables, resolve attachments and build the
//!    three document variants.
//! 3. **Compiling**: typeset each variant, stopping at the first failure.
//! 4. **Collecting**: copy the PDFs the typesetter produced to the
//!    destination and publish the parameter file.
//! 5. **Cleanup**: remove the working area, whatever the outcome.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{debug, info, instrument, warn};

use cvmaker_params::ParameterFile;
use cvmaker_shared::{
    AppConfig, CvMakerError, DocumentVariant, LanguageTag, Result, TemplateRole,
};
use cvmaker_templates::TemplateResolver;

use crate::assembler::{DocumentTemplates, assemble};
use crate::attachments::{directives, resolve_attachments};
use crate::compiler::Typesetter;
use crate::documents::destination_dir;
use crate::workspace::WorkingArea;

/// Pipeline stage, reported to [`ProgressReporter::stage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    StagingInputs,
    Assembling,
    Compiling,
    Collecting,
    Cleanup,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::StagingInputs => "Staging inputs",
            Self::Assembling => "Assembling documents",
            Self::Compiling => "Compiling",
            Self::Collecting => "Collecting PDFs",
            Self::Cleanup => "Cleaning up",
        })
    }
}

/// Everything one `make` run needs, fixed before the run starts.
#[derive(Debug, Clone)]
pub struct MakeRequest {
    /// Parameter file to build.
    pub params_file: PathBuf,
    /// Language given on the command line; wins over the file's `LANG`.
    pub language: Option<LanguageTag>,
    /// Language used when neither the flag nor the file picks one.
    pub default_language: LanguageTag,
    /// Default document storage directory.
    pub documents_dir: PathBuf,
    /// Directory whose files are staged as attachments.
    pub attachments_dir: PathBuf,
    /// Style assets staged into every working area.
    pub style_dir: PathBuf,
    pub resolver: TemplateResolver,
    pub typesetter: Typesetter,
    /// Keep the working area instead of removing it.
    pub keep_workdir: bool,
}

impl MakeRequest {
    /// Build a request for `params_file` from the loaded configuration.
    pub fn from_config(
        config: &AppConfig,
        params_file: PathBuf,
        language: Option<LanguageTag>,
        keep_workdir: bool,
    ) -> Result<Self> {
        Ok(Self {
            params_file,
            language,
            default_language: config.defaults.language.clone(),
            documents_dir: config.documents_dir()?,
            attachments_dir: config.attachments_dir()?,
            style_dir: config.style_dir()?,
            resolver: TemplateResolver::from_config(config)?,
            typesetter: Typesetter::from_config(&config.typesetter),
            keep_workdir,
        })
    }

    /// `--lang` flag, then the file's `LANG` binding, then the default.
    fn language_for(&self, file: &ParameterFile) -> Result<LanguageTag> {
        if let Some(lang) = &self.language {
            return Ok(lang.clone());
        }
        match file.language() {
            Some(tag) => tag.parse(),
            None => Ok(self.default_language.clone()),
        }
    }
}

/// Result of a successful `make` run.
#[derive(Debug)]
pub struct MakeResult {
    /// Directory the PDFs were copied to.
    pub destination: PathBuf,
    /// Copied PDFs, sorted by name.
    pub pdfs: Vec<PathBuf>,
    /// New location of the parameter file, if it was published.
    pub published: Option<PathBuf>,
    /// Language the documents were built in.
    pub language: LanguageTag,
    /// Working area left on disk (`--keep-workdir`).
    pub working_area: Option<PathBuf>,
    /// Total elapsed time.
    pub elapsed: Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new stage.
    fn stage(&self, stage: Stage);
    /// Called after each document variant is typeset.
    fn compiled(&self, variant: DocumentVariant, current: usize, total: usize);
    /// Called when the pipeline completes.
    fn done(&self, result: &MakeResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn stage(&self, _stage: Stage) {}
    fn compiled(&self, _variant: DocumentVariant, _current: usize, _total: usize) {}
    fn done(&self, _result: &MakeResult) {}
}

/// What the stages inside the working area produce.
struct Built {
    destination: PathBuf,
    pdfs: Vec<PathBuf>,
    published: Option<PathBuf>,
    language: LanguageTag,
}

/// Run the full `make` pipeline for `request`.
///
/// The working area is removed on every path unless
/// [`MakeRequest::keep_workdir`] is set. Failures outside the named error
/// kinds come back as [`CvMakerError::Unexpected`].
#[instrument(skip_all, fields(params = %request.params_file.display()))]
pub async fn make_documents(
    request: &MakeRequest,
    progress: &dyn ProgressReporter,
) -> Result<MakeResult> {
    let start = Instant::now();

    if !request.params_file.is_file() {
        return Err(CvMakerError::InputNotFound {
            path: request.params_file.clone(),
        });
    }

    progress.stage(Stage::StagingInputs);
    let area = WorkingArea::create()?;
    let area_path = area.path().to_path_buf();
    info!(workdir = %area_path.display(), "starting make pipeline");

    let outcome = build(request, &area, progress).await;

    progress.stage(Stage::Cleanup);
    let working_area = if request.keep_workdir {
        Some(area.keep())
    } else {
        if let Err(e) = area.remove() {
            warn!(error = %e, "could not remove working area");
        }
        None
    };

    let built = outcome.map_err(|e| {
        if e.is_classified() {
            e
        } else {
            CvMakerError::Unexpected {
                message: e.to_string(),
                working_area: area_path.clone(),
            }
        }
    })?;

    let result = MakeResult {
        destination: built.destination,
        pdfs: built.pdfs,
        published: built.published,
        language: built.language,
        working_area,
        elapsed: start.elapsed(),
    };

    progress.done(&result);
    info!(
        destination = %result.destination.display(),
        pdfs = result.pdfs.len(),
        elapsed_ms = result.elapsed.as_millis() as u64,
        "make pipeline complete"
    );
    Ok(result)
}

async fn build(
    request: &MakeRequest,
    area: &WorkingArea,
    progress: &dyn ProgressReporter,
) -> Result<Built> {
    // --- Staging inputs ---
    let staged_params = area.stage_file(&request.params_file, None)?;
    let styles = area.stage_dir(&request.style_dir)?;
    let resources = area.stage_dir(&request.attachments_dir)?;
    debug!(styles, resources, "staged style and attachment files");

    let content =
        std::fs::read_to_string(&staged_params).map_err(|e| CvMakerError::io(&staged_params, e))?;
    let file = ParameterFile::parse(&content)?;
    let language = request.language_for(&file)?;
    info!(%language, "document language");

    for role in TemplateRole::DOCUMENT {
        let resolved = request.resolver.resolve(role, &language)?;
        area.stage_file(&resolved.path, Some(role.staged_name().as_str()))?;
    }

    // --- Assembling ---
    progress.stage(Stage::Assembling);
    let variables = file.variables();
    let attachments = resolve_attachments(&variables, area.path());
    let templates = DocumentTemplates::load(area.path())?;
    let documents = assemble(&templates, &directives(&attachments), &variables);

    // --- Compiling ---
    progress.stage(Stage::Compiling);
    let total = documents.len();
    let mut produced = Vec::with_capacity(total);
    for (i, (variant, source)) in documents.iter().enumerate() {
        produced.push(request.typesetter.compile(area.path(), *variant, source).await?);
        progress.compiled(*variant, i + 1, total);
    }

    // --- Collecting ---
    progress.stage(Stage::Collecting);
    let destination = destination_dir(&request.params_file)?;
    let pdfs = collect(&produced, &destination)?;
    let published = publish(&request.params_file, &request.documents_dir, &destination)?;

    Ok(Built {
        destination,
        pdfs,
        published,
        language,
    })
}

/// Copy the PDFs in `produced` into `destination`, creating it if needed.
///
/// Staged inputs are never collected, even when named like output. A
/// destination created here and left empty is removed again.
fn collect(produced: &[PathBuf], destination: &Path) -> Result<Vec<PathBuf>> {
    let created = !destination.is_dir();
    if created {
        std::fs::create_dir_all(destination).map_err(|e| CvMakerError::io(destination, e))?;
    }

    let mut copied = Vec::new();
    for artifact in produced {
        let Some(name) = artifact.file_name() else {
            continue;
        };
        let target = destination.join(name);
        std::fs::copy(artifact, &target).map_err(|e| CvMakerError::io(artifact, e))?;
        debug!(path = %target.display(), "PDF collected");
        copied.push(target);
    }

    if copied.is_empty() && created {
        std::fs::remove_dir(destination).map_err(|e| CvMakerError::io(destination, e))?;
    }
    copied.sort();
    Ok(copied)
}

/// Move `params_file` into `destination` when it sits directly in the
/// document storage directory. Returns the new path if it was moved.
fn publish(params_file: &Path, documents_dir: &Path, destination: &Path) -> Result<Option<PathBuf>> {
    let (Some(parent), Ok(storage)) = (params_file.parent(), documents_dir.canonicalize()) else {
        return Ok(None);
    };
    let parent = if parent.as_os_str().is_empty() {
        Path::new(".")
    } else {
        parent
    };
    if parent.canonicalize().ok().as_deref() != Some(storage.as_path()) {
        return Ok(None);
    }
    let Some(name) = params_file.file_name() else {
        return Ok(None);
    };
    let target = destination.join(name);
    if target == params_file {
        return Ok(None);
    }

    if std::fs::rename(params_file, &target).is_err() {
        std::fs::copy(params_file, &target).map_err(|e| CvMakerError::io(params_file, e))?;
        std::fs::remove_file(params_file).map_err(|e| CvMakerError::io(params_file, e))?;
    }
    info!(to = %target.display(), "parameter file published");
    Ok(Some(target))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(all(test, unix))]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::compiler::testing::{FAILS, WRITES_PDF, fake};

    struct Fixture {
        root: tempfile::TempDir,
        documents_dir: PathBuf,
        packaged_dir: PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let root = tempfile::tempdir().unwrap();
            let documents_dir = root.path().join("docs");
            let packaged_dir = root.path().join("resources").join("templates");
            let style_dir = root.path().join("resources").join("style");
            for dir in [&documents_dir, &packaged_dir, &style_dir] {
                std::fs::create_dir_all(dir).unwrap();
            }
            std::fs::write(packaged_dir.join("preamble-en.tex.tpl"), "\\documentclass{article}")
                .unwrap();
            std::fs::write(packaged_dir.join("cl-en.tex.tpl"), "Dear VAR_ADDRESSEE_NAME,").unwrap();
            std::fs::write(packaged_dir.join("cv-en.tex.tpl"), "VAR_OWN_NAME").unwrap();
            std::fs::write(style_dir.join("cvmaker.sty"), "% style").unwrap();
            std::fs::write(
                documents_dir.join("Jane.txt"),
                "OWN_NAME = 'Jane Doe'\nADDRESSEE_NAME = 'Mr. Quaid'\n",
            )
            .unwrap();
            Self {
                root,
                documents_dir,
                packaged_dir,
            }
        }

        fn request(&self, script: &str) -> MakeRequest {
            let scripts = self.root.path().join("bin");
            std::fs::create_dir_all(&scripts).unwrap();
            MakeRequest {
                params_file: self.documents_dir.join("Jane.txt"),
                language: None,
                default_language: "en".parse().unwrap(),
                documents_dir: self.documents_dir.clone(),
                attachments_dir: self.documents_dir.join("attachments"),
                style_dir: self.root.path().join("resources").join("style"),
                resolver: TemplateResolver::new(
                    self.root.path().join("user"),
                    self.root.path().join("cvmaker.toml"),
                    &self.packaged_dir,
                    "en".parse().unwrap(),
                ),
                typesetter: fake(&scripts, script),
                keep_workdir: false,
            }
        }
    }

    /// Records stages and the working area seen while compiling.
    #[derive(Default)]
    struct Recorder {
        stages: Mutex<Vec<Stage>>,
        compiled: Mutex<Vec<DocumentVariant>>,
    }

    impl ProgressReporter for Recorder {
        fn stage(&self, stage: Stage) {
            self.stages.lock().unwrap().push(stage);
        }
        fn compiled(&self, variant: DocumentVariant, _current: usize, _total: usize) {
            self.compiled.lock().unwrap().push(variant);
        }
        fn done(&self, _result: &MakeResult) {}
    }

    /// Writes a PDF and records the working area it ran in.
    fn recording_script(log: &Path) -> String {
        format!("pwd >> '{}'\n{WRITES_PDF}", log.display())
    }

    #[tokio::test]
    async fn builds_and_publishes() {
        let fx = Fixture::new();
        let cwd_log = fx.root.path().join("cwd.log");
        let request = fx.request(&recording_script(&cwd_log));
        let recorder = Recorder::default();

        let result = make_documents(&request, &recorder).await.unwrap();

        let jane = fx.documents_dir.join("Jane");
        assert_eq!(result.destination, jane);
        let names: Vec<_> = result
            .pdfs
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["CL_CV_attachments.pdf", "CL_only.pdf", "CV_only.pdf"]);
        assert!(jane.join("CV_only.pdf").is_file());

        assert_eq!(result.published, Some(jane.join("Jane.txt")));
        assert!(jane.join("Jane.txt").is_file());
        assert!(!fx.documents_dir.join("Jane.txt").exists());

        assert_eq!(result.language.as_str(), "en");
        assert!(result.working_area.is_none());
        let workdirs = std::fs::read_to_string(&cwd_log).unwrap();
        let workdir = PathBuf::from(workdirs.lines().next().unwrap());
        assert!(!workdir.exists());

        assert_eq!(
            *recorder.stages.lock().unwrap(),
            vec![
                Stage::StagingInputs,
                Stage::Assembling,
                Stage::Compiling,
                Stage::Collecting,
                Stage::Cleanup,
            ]
        );
        assert_eq!(*recorder.compiled.lock().unwrap(), DocumentVariant::ALL.to_vec());
    }

    #[tokio::test]
    async fn staged_attachments_are_not_collected() {
        let fx = Fixture::new();
        let attachments = fx.documents_dir.join("attachments");
        std::fs::create_dir_all(&attachments).unwrap();
        std::fs::write(attachments.join("CV_2019_old.pdf"), b"%PDF old").unwrap();
        let request = fx.request(WRITES_PDF);

        let result = make_documents(&request, &SilentProgress).await.unwrap();

        assert_eq!(result.pdfs.len(), 3);
        assert!(
            result
                .pdfs
                .iter()
                .all(|p| p.file_name().unwrap() != "CV_2019_old.pdf")
        );
        assert!(!fx.documents_dir.join("Jane").join("CV_2019_old.pdf").exists());
        assert!(attachments.join("CV_2019_old.pdf").is_file());
    }

    #[tokio::test]
    async fn compile_failure_leaves_inputs_alone() {
        let fx = Fixture::new();
        let cwd_log = fx.root.path().join("cwd.log");
        let request = fx.request(&format!("pwd >> '{}'\n{FAILS}", cwd_log.display()));
        let recorder = Recorder::default();

        let err = make_documents(&request, &recorder).await.unwrap_err();
        match &err {
            CvMakerError::Compilation { log, .. } => assert!(log.ends_with("CL_only.log")),
            other => panic!("expected compilation error, got {other}"),
        }

        assert!(!fx.documents_dir.join("Jane").exists());
        assert!(fx.documents_dir.join("Jane.txt").is_file());

        let workdirs = std::fs::read_to_string(&cwd_log).unwrap();
        assert_eq!(workdirs.lines().count(), 1, "aborts after the first failure");
        assert!(!Path::new(workdirs.trim()).exists());
        assert_eq!(recorder.stages.lock().unwrap().last(), Some(&Stage::Cleanup));
    }

    #[tokio::test]
    async fn files_outside_storage_are_not_moved() {
        let fx = Fixture::new();
        let elsewhere = fx.root.path().join("elsewhere");
        std::fs::create_dir_all(&elsewhere).unwrap();
        let params = elsewhere.join("Jane.txt");
        std::fs::copy(fx.documents_dir.join("Jane.txt"), &params).unwrap();

        let mut request = fx.request(WRITES_PDF);
        request.params_file = params.clone();
        let result = make_documents(&request, &SilentProgress).await.unwrap();

        assert_eq!(result.destination, elsewhere.join("Jane"));
        assert_eq!(result.published, None);
        assert!(params.is_file());
    }

    #[tokio::test]
    async fn substitutes_and_embeds_attachments() {
        let fx = Fixture::new();
        let attachments = fx.documents_dir.join("attachments");
        std::fs::create_dir_all(&attachments).unwrap();
        std::fs::write(attachments.join("DiplomaScan.pdf"), b"%PDF").unwrap();
        std::fs::write(
            fx.documents_dir.join("Jane.txt"),
            "OWN_NAME = 'Jane Doe'\nADDRESSEE_NAME = 'Mr. Quaid'\nCL_ATTACHMENTS = \"1, 'diploma.scan'\"\n",
        )
        .unwrap();

        let mut request = fx.request(WRITES_PDF);
        request.keep_workdir = true;
        let result = make_documents(&request, &SilentProgress).await.unwrap();

        let workdir = result.working_area.expect("working area kept");
        let combined = std::fs::read_to_string(workdir.join("CL_CV_attachments.tex")).unwrap();
        assert!(combined.contains("Dear Mr. Quaid,"));
        assert!(combined.contains("Jane Doe"));
        assert!(combined.contains("\\includepdf[pages=-]{DiplomaScan.pdf}"));
        assert!(workdir.join("DiplomaScan.pdf").is_file());
        assert!(workdir.join("cvmaker.sty").is_file());
        assert!(workdir.join("cv.tex.tpl").is_file());
        std::fs::remove_dir_all(workdir).unwrap();
    }

    #[tokio::test]
    async fn language_comes_from_flag_then_file() {
        let fx = Fixture::new();
        std::fs::write(fx.packaged_dir.join("cv-de.tex.tpl"), "Lebenslauf").unwrap();
        std::fs::write(
            fx.documents_dir.join("Jane.txt"),
            "LANG = 'de'\nOWN_NAME = 'Jane'\n",
        )
        .unwrap();

        // Only the résumé exists in German.
        let request = fx.request(WRITES_PDF);
        let err = make_documents(&request, &SilentProgress).await.unwrap_err();
        assert!(matches!(
            err,
            CvMakerError::TemplateNotFound {
                role: TemplateRole::Preamble,
                ..
            }
        ));
        assert!(fx.documents_dir.join("Jane.txt").is_file());

        let mut request = fx.request(WRITES_PDF);
        request.language = Some("en".parse().unwrap());
        let result = make_documents(&request, &SilentProgress).await.unwrap();
        assert_eq!(result.language.as_str(), "en");
    }

    #[tokio::test]
    async fn syntax_errors_are_reported_as_such() {
        let fx = Fixture::new();
        std::fs::write(fx.documents_dir.join("Jane.txt"), "OWN_NAME 'Jane'\n").unwrap();
        let err = make_documents(&fx.request(WRITES_PDF), &SilentProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, CvMakerError::TemplateSyntax { line: 1, .. }));
    }

    #[tokio::test]
    async fn missing_parameter_file() {
        let fx = Fixture::new();
        let mut request = fx.request(WRITES_PDF);
        request.params_file = fx.documents_dir.join("Nobody.txt");
        let err = make_documents(&request, &SilentProgress).await.unwrap_err();
        assert!(matches!(err, CvMakerError::InputNotFound { .. }));
    }
}
