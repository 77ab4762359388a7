//! CLI command definitions, routing, and tracing setup.

use std::path::Path;

use clap::{Parser, Subcommand};
use color_eyre::Section;
use color_eyre::eyre::{Report, Result, eyre};
use cvmaker_core::documents::{list_documents, locate_document, new_document};
use cvmaker_core::pipeline::{self, MakeRequest, MakeResult, ProgressReporter, Stage};
use cvmaker_shared::{
    AppConfig, CvMakerError, DocumentVariant, LanguageTag, TemplateRole, config_file_path,
    init_config, load_config,
};
use cvmaker_templates::TemplateResolver;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// cvmaker: build résumé and cover-letter PDFs from parameter files.
#[derive(Parser)]
#[command(
    name = "cv",
    version,
    about = "Build résumé and cover-letter PDFs from plain-text parameter files.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Typeset the documents described by a parameter file.
    Make {
        /// Parameter file name (looked up in the documents directory) or path.
        name: String,

        /// Document language; overrides the file's LANG binding.
        #[arg(short, long)]
        lang: Option<LanguageTag>,

        /// Keep the working area for inspection instead of removing it.
        #[arg(long)]
        keep_workdir: bool,
    },

    /// Open a template (newdoc, cv, cl, preamble, config) or a parameter file
    /// in the editor.
    Edit {
        /// Template role or parameter file.
        target: String,

        /// Template language (defaults to the configured language).
        #[arg(short, long)]
        lang: Option<LanguageTag>,
    },

    /// Create a new parameter file from the boilerplate template.
    Newdoc {
        /// Name (created in the documents directory) or path of the new file.
        name: String,
    },

    /// List parameter files in the documents directory.
    Ls,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "cvmaker=info",
        1 => "cvmaker=debug",
        _ => "cvmaker=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Make {
            name,
            lang,
            keep_workdir,
        } => cmd_make(&name, lang, keep_workdir).await,
        Command::Edit { target, lang } => cmd_edit(&target, lang).await,
        Command::Newdoc { name } => cmd_newdoc(&name).await,
        Command::Ls => cmd_ls().await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

/// Turn a library error into a report carrying its hint as a suggestion.
fn report(err: CvMakerError) -> Report {
    let hint = err.hint();
    let report = Report::new(err);
    match hint {
        Some(hint) => report.suggestion(hint),
        None => report,
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_make(name: &str, lang: Option<LanguageTag>, keep_workdir: bool) -> Result<()> {
    let config = load_config().map_err(report)?;
    let documents_dir = config.documents_dir().map_err(report)?;
    let params_file = locate_document(name, &documents_dir);

    let request =
        MakeRequest::from_config(&config, params_file, lang, keep_workdir).map_err(report)?;

    info!(params = %request.params_file.display(), "making documents");

    let reporter = CliProgress::new();
    let outcome = pipeline::make_documents(&request, &reporter).await;
    reporter.finish();
    let result = outcome.map_err(report)?;

    println!();
    println!("  Documents built successfully!");
    println!("  Language:    {}", result.language);
    println!("  Destination: {}", result.destination.display());
    for pdf in &result.pdfs {
        if let Some(name) = pdf.file_name() {
            println!("    {}", name.to_string_lossy());
        }
    }
    if let Some(published) = &result.published {
        println!("  Moved parameter file to {}", published.display());
    }
    if let Some(workdir) = &result.working_area {
        println!("  Working area kept at {}", workdir.display());
    }
    println!("  Time:        {:.1}s", result.elapsed.as_secs_f64());
    println!();

    Ok(())
}

async fn cmd_edit(target: &str, lang: Option<LanguageTag>) -> Result<()> {
    let config = load_config().map_err(report)?;

    let path = match target.parse::<TemplateRole>() {
        Ok(role) => {
            let language = lang.unwrap_or_else(|| config.defaults.language.clone());
            let resolver = TemplateResolver::from_config(&config).map_err(report)?;
            info!(%role, %language, "editing template");
            resolver.customize(role, &language).map_err(report)?
        }
        Err(_) => {
            let documents_dir = config.documents_dir().map_err(report)?;
            let path = locate_document(target, &documents_dir);
            if !path.is_file() {
                return Err(report(CvMakerError::InputNotFound { path })
                    .suggestion("Create it first with `cv newdoc <name>`."));
            }
            path
        }
    };

    open_in_editor(&config, &path)
}

async fn cmd_newdoc(name: &str) -> Result<()> {
    let config = load_config().map_err(report)?;
    let documents_dir = config.documents_dir().map_err(report)?;
    let target = locate_document(name, &documents_dir);

    let resolver = TemplateResolver::from_config(&config).map_err(report)?;
    let boilerplate = resolver
        .resolve(TemplateRole::NewDocument, &config.defaults.language)
        .map_err(report)?;

    new_document(&target, &boilerplate.path).map_err(report)?;
    println!("Created {}", target.display());
    println!("Edit it with `cv edit {name}`, then run `cv make {name}`.");
    Ok(())
}

async fn cmd_ls() -> Result<()> {
    let config = load_config().map_err(report)?;
    let documents_dir = config.documents_dir().map_err(report)?;
    let documents = list_documents(&documents_dir).map_err(report)?;

    if documents.is_empty() {
        println!("No parameter files in {}", documents_dir.display());
        return Ok(());
    }
    for doc in documents {
        if let Some(stem) = doc.file_stem() {
            println!("{}", stem.to_string_lossy());
        }
    }
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config().map_err(report)?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config().map_err(report)?;
    let path = config_file_path().map_err(report)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("# {}", path.display());
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Editor pass-through
// ---------------------------------------------------------------------------

/// Editor command: `[defaults] editor`, then `$VISUAL`, `$EDITOR`, `vi`.
fn editor_command(config: &AppConfig) -> String {
    config
        .defaults
        .editor
        .clone()
        .filter(|e| !e.trim().is_empty())
        .or_else(|| std::env::var("VISUAL").ok().filter(|e| !e.trim().is_empty()))
        .or_else(|| std::env::var("EDITOR").ok().filter(|e| !e.trim().is_empty()))
        .unwrap_or_else(|| "vi".to_string())
}

fn open_in_editor(config: &AppConfig, path: &Path) -> Result<()> {
    let command = editor_command(config);
    let mut parts = command.split_whitespace();
    let program = parts
        .next()
        .ok_or_else(|| eyre!("editor command is empty"))?;
    let args: Vec<&str> = parts.collect();

    debug!(editor = program, path = %path.display(), "launching editor");
    let status = std::process::Command::new(program)
        .args(&args)
        .arg(path)
        .stdin(std::process::Stdio::inherit())
        .stdout(std::process::Stdio::inherit())
        .stderr(std::process::Stdio::inherit())
        .status()
        .map_err(|e| eyre!("failed to launch editor '{program}': {e}"))
        .suggestion("Set `editor` under [defaults] in the config, or $EDITOR.")?;

    if !status.success() {
        return Err(eyre!(
            "editor exited with status: {}",
            status.code().unwrap_or(-1)
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}

impl ProgressReporter for CliProgress {
    fn stage(&self, stage: Stage) {
        self.spinner.set_message(stage.to_string());
    }

    fn compiled(&self, variant: DocumentVariant, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Compiled [{current}/{total}] {variant}"));
    }

    fn done(&self, _result: &MakeResult) {
        self.spinner.finish_and_clear();
    }
}
