// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, info, warn};
use std::io::Write;
use std::path::{Path, PathBuf};

use locflow::app_config::{Config, LogLevel, TranslationMode};
use locflow::app_controller::{Controller, TerminalReviewer};
use locflow::translation::pipeline::Reviewer;
use locflow::xliff::DocumentVersion;

/// CLI Wrapper for TranslationMode to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliTranslationMode {
    Automatic,
    Interactive,
}

impl From<CliTranslationMode> for TranslationMode {
    fn from(cli_mode: CliTranslationMode) -> Self {
        match cli_mode {
            CliTranslationMode::Automatic => TranslationMode::Automatic,
            CliTranslationMode::Interactive => TranslationMode::Interactive,
        }
    }
}

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => LogLevel::Error,
            CliLogLevel::Warn => LogLevel::Warn,
            CliLogLevel::Info => LogLevel::Info,
            CliLogLevel::Debug => LogLevel::Debug,
            CliLogLevel::Trace => LogLevel::Trace,
        }
    }
}

/// Target dialect of a conversion
#[derive(Debug, Clone, ValueEnum)]
enum CliDocumentVersion {
    /// XLIFF 2.0
    Current,
    /// XLIFF 1.2
    Legacy,
}

impl From<CliDocumentVersion> for DocumentVersion {
    fn from(cli_version: CliDocumentVersion) -> Self {
        match cli_version {
            CliDocumentVersion::Current => DocumentVersion::Current,
            CliDocumentVersion::Legacy => DocumentVersion::Legacy,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate every document of a bundle
    Translate {
        /// Bundle directory holding .xliff documents
        #[arg(value_name = "BUNDLE")]
        bundle: PathBuf,

        /// Review mode
        #[arg(short, long, value_enum)]
        mode: Option<CliTranslationMode>,

        /// Translation service root URL
        #[arg(short, long)]
        base_url: Option<String>,
    },

    /// Carry translations forward from a previous bundle
    Merge {
        /// Bundle directory to update
        #[arg(value_name = "BUNDLE")]
        bundle: PathBuf,

        /// Bundle holding the previous translations
        #[arg(value_name = "PREVIOUS_BUNDLE")]
        previous: PathBuf,
    },

    /// Convert a document between XLIFF 1.2 and 2.0
    Convert {
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        #[arg(value_name = "OUTPUT")]
        output: PathBuf,

        /// Dialect to produce
        #[arg(long, value_enum)]
        to: CliDocumentVersion,

        /// Source language when the document declares none
        #[arg(short, long)]
        source_language: Option<String>,

        /// Target language when the document declares none
        #[arg(short, long)]
        target_language: Option<String>,
    },

    /// Generate shell completions for locflow
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// locflow - localization bundle translation
///
/// Extracts translatable units from XLIFF bundles, translates them through a
/// remote translation service and writes the results back.
#[derive(Parser, Debug)]
#[command(name = "locflow")]
#[command(version)]
#[command(about = "Localization pipeline for XLIFF bundles")]
#[command(long_about = "locflow translates XLIFF 2.0 bundles through a remote translation service.

EXAMPLES:
    locflow translate ./Localizations                      # Translate using default config
    locflow translate -m interactive ./Localizations       # Review every translation
    locflow merge ./Localizations ./Previous               # Carry previous translations forward
    locflow convert old.xliff new.xliff --to current -s en # Convert XLIFF 1.2 to 2.0
    locflow completions bash > locflow.bash                # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json", global = true)]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI colour for log level
    fn colour_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "{}{} {:<5} {}\x1B[0m",
                Self::colour_for_level(record.level()),
                now,
                record.level(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // The logger accepts everything; the max level filters until the config is read
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(*shell, &mut cmd, "locflow", &mut std::io::stdout());
        return Ok(());
    }

    if let Some(level) = &cli.log_level {
        log::set_max_level(LogLevel::from(level.clone()).to_level_filter());
    }

    let mut config = Config::load_or_create(Path::new(&cli.config_path))?;
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone().into();
    } else {
        log::set_max_level(config.log_level.to_level_filter());
    }

    match cli.command {
        Commands::Translate { bundle, mode, base_url } => {
            if let Some(mode) = mode {
                config.translator.mode = mode.into();
            }
            if let Some(base_url) = base_url {
                config.translator.base_url = base_url;
            }
            run_translate(config, &bundle).await
        }
        Commands::Merge { bundle, previous } => {
            let controller = Controller::with_config(config)?;
            let summary = controller.merge_bundles(&bundle, &previous)?;
            info!(
                "Merged {} documents: {} carried forward, {} forfeited",
                summary.merged_documents, summary.carried, summary.forfeited
            );
            Ok(())
        }
        Commands::Convert { input, output, to, source_language, target_language } => {
            let controller = Controller::with_config(config)?;
            controller.convert_file(
                &input,
                &output,
                to.into(),
                source_language.as_deref(),
                target_language.as_deref(),
            )
        }
        Commands::Completions { .. } => Ok(()),
    }
}

async fn run_translate(config: Config, bundle: &Path) -> Result<()> {
    if !bundle.is_dir() {
        return Err(anyhow!("Bundle directory does not exist: {:?}", bundle));
    }

    let interactive = config.translator.mode == TranslationMode::Interactive;
    let controller = Controller::with_config(config)?;
    let translator = controller.api_translator()?;

    let terminal_reviewer = TerminalReviewer::new();
    let reviewer: Option<&dyn Reviewer> = if interactive { Some(&terminal_reviewer) } else { None };

    let report = controller.translate_bundle(bundle, translator, reviewer).await?;
    info!(
        "{} documents, {} written, {} strings translated",
        report.documents, report.written, report.translated_units
    );
    if report.failed_batches > 0 {
        warn!("{} batches failed after every retry", report.failed_batches);
    }
    if report.untranslated > 0 {
        warn!("{} strings are still untranslated", report.untranslated);
    }

    Ok(())
}
