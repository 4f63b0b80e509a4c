use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;

use crate::app_config::{Config, TranslationMode};
use crate::entity::{extract_entities, merge_previous_document, write_back};
use crate::errors::TranslationError;
use crate::file_utils::FileManager;
use crate::providers::Translator;
use crate::providers::api::ApiTranslator;
use crate::translation::pipeline::{ReviewDecision, ReviewRequest, Reviewer};
use crate::translation::{PipelineConfig, ProgressCallback, TokenCounter, TranslationPipeline};
use crate::xliff::convert::{to_current, to_legacy};
use crate::xliff::{DocumentVersion, Xliff, detect_version, parse_legacy_xliff, parse_xliff};

// @module: Application controller for bundle workflows

/// Resolution of the progress bar
const PROGRESS_STEPS: u64 = 1000;

/// Outcome of translating a bundle
#[derive(Debug, Clone, Default)]
pub struct BundleReport {
    /// Documents read from the bundle
    pub documents: usize,
    /// Documents rewritten on disk
    pub written: usize,
    /// (entity, language) slots translated
    pub translated_units: usize,
    /// Entities still missing a translation
    pub untranslated: usize,
    /// Batches abandoned after their last attempt
    pub failed_batches: usize,
}

/// Outcome of merging a previous bundle
#[derive(Debug, Clone, Default)]
pub struct MergeSummary {
    /// Documents that had a previous counterpart
    pub merged_documents: usize,
    /// Slots carried forward
    pub carried: usize,
    /// Slots whose carry-forward was refused
    pub forfeited: usize,
}

/// Main application controller for bundle translation
pub struct Controller {
    // @field: App configuration
    config: Config,
    // @field: Counter overriding the service's tokenizer
    token_counter: Option<Arc<dyn TokenCounter>>,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate().context("Configuration validation failed")?;
        Ok(Self { config, token_counter: None })
    }

    /// Use a fixed token counter instead of the service's tokenizer
    pub fn with_token_counter(mut self, counter: Arc<dyn TokenCounter>) -> Self {
        self.token_counter = Some(counter);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// HTTP client for the configured translation service
    pub fn api_translator(&self) -> Result<Arc<dyn Translator>> {
        let translator = ApiTranslator::new(&self.config.translator.base_url, self.config.translator.timeout_secs)
            .context("Failed to create translation service client")?;
        Ok(Arc::new(translator))
    }

    /// Read every current-dialect document of a bundle, skipping legacy ones
    fn read_bundle(&self, bundle: &Path) -> Result<Vec<(PathBuf, Xliff)>> {
        let mut documents = Vec::new();
        for path in FileManager::find_bundle_documents(bundle)? {
            match FileManager::read_document(&path)? {
                Some(doc) => documents.push((path, doc)),
                None => warn!("Skipping legacy document {:?}, convert it first", path),
            }
        }
        Ok(documents)
    }

    /// Translate every document of a bundle and write the results back.
    pub async fn translate_bundle(
        &self,
        bundle: &Path,
        translator: Arc<dyn Translator>,
        reviewer: Option<&dyn Reviewer>,
    ) -> Result<BundleReport> {
        let start_time = std::time::Instant::now();
        let mut documents = self.read_bundle(bundle)?;
        let mut report = BundleReport { documents: documents.len(), ..Default::default() };
        if documents.is_empty() {
            warn!("No documents found in {:?}", bundle);
            return Ok(report);
        }

        let docs: Vec<Xliff> = documents.iter().map(|(_, doc)| doc.clone()).collect();
        let entities = extract_entities(&docs).context("Failed to extract entities")?;
        let pending = entities.untranslated_count();
        info!("{} documents, {} entities, {} to translate", documents.len(), entities.len(), pending);
        if pending == 0 {
            info!("Nothing to translate");
            return Ok(report);
        }

        let interactive = self.config.translator.mode == TranslationMode::Interactive;
        let progress_bar = if interactive { ProgressBar::hidden() } else { ProgressBar::new(PROGRESS_STEPS) };
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {percent}% {msg}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {percent}% {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(style.progress_chars("█▓▒░"));
        progress_bar.set_message("Translating");

        let bar = progress_bar.clone();
        let callback: ProgressCallback = Box::new(move |value: f64| bar.set_position((value * PROGRESS_STEPS as f64) as u64));

        let mut pipeline = TranslationPipeline::new(translator, PipelineConfig::from_config(&self.config));
        if let Some(counter) = &self.token_counter {
            pipeline = pipeline.with_token_counter(Arc::clone(counter));
        }
        let result = pipeline
            .run(entities, reviewer, Some(callback))
            .await
            .context("Translation failed")?;
        progress_bar.finish_with_message("Done");

        for (path, doc) in documents.iter_mut() {
            let written = write_back(&result.entities, doc);
            debug!("{:?}: {} units updated, {} skipped", path, written.updated, written.skipped);
            if FileManager::write_document(&*path, doc)? {
                report.written += 1;
            }
        }

        report.translated_units = result.stats.translated_units;
        report.untranslated = result.untranslated_count;
        report.failed_batches = result.failed_batches.len();

        info!("{}", result.summary());
        info!("{}", result.usage.summary());
        info!("Translation completed in {}.", Self::format_duration(start_time.elapsed()));
        Ok(report)
    }

    /// Carry translations forward from `previous`, matching documents by relative path.
    pub fn merge_bundles(&self, bundle: &Path, previous: &Path) -> Result<MergeSummary> {
        if !FileManager::dir_exists(previous) {
            return Err(anyhow!("Previous bundle does not exist: {:?}", previous));
        }

        let mut summary = MergeSummary::default();
        for (path, mut doc) in self.read_bundle(bundle)? {
            let previous_path = previous.join(FileManager::relative_path(bundle, &path));
            if !FileManager::file_exists(&previous_path) {
                debug!("No previous version of {:?}", path);
                continue;
            }
            let Some(previous_doc) = FileManager::read_document(&previous_path)? else {
                warn!("Skipping legacy previous document {:?}", previous_path);
                continue;
            };

            let report = merge_previous_document(&mut doc, &previous_doc)
                .with_context(|| format!("Failed to merge {:?}", path))?;
            info!("{:?}: {}", path, report.summary());
            summary.merged_documents += 1;
            summary.carried += report.carried;
            summary.forfeited += report.forfeited;

            if report.carried > 0 {
                FileManager::write_document(&path, &doc)?;
            }
        }

        Ok(summary)
    }

    /// Convert a document between dialects.
    ///
    /// Languages are only used when converting a legacy document that does
    /// not declare them.
    pub fn convert_file(
        &self,
        input: &Path,
        output: &Path,
        to: DocumentVersion,
        source_language: Option<&str>,
        target_language: Option<&str>,
    ) -> Result<()> {
        let text = FileManager::read_to_string(input)?;
        let from = detect_version(&text).with_context(|| format!("Failed to read {:?}", input))?;

        let converted = match (from, to) {
            (DocumentVersion::Legacy, DocumentVersion::Current) => {
                let legacy = parse_legacy_xliff(&text).with_context(|| format!("Failed to parse {:?}", input))?;
                let source_language = source_language.unwrap_or_else(|| {
                    warn!("No source language given, assuming en where the document has none");
                    "en"
                });
                to_current(&legacy, source_language, target_language).to_xml_string()
            }
            (DocumentVersion::Current, DocumentVersion::Legacy) => {
                let doc = parse_xliff(&text).with_context(|| format!("Failed to parse {:?}", input))?;
                to_legacy(&doc).to_xml_string()
            }
            (DocumentVersion::Legacy, DocumentVersion::Legacy) => {
                warn!("{:?} is already a legacy document, rewriting it as is", input);
                parse_legacy_xliff(&text)?.to_xml_string()
            }
            (DocumentVersion::Current, DocumentVersion::Current) => {
                warn!("{:?} is already a current document, rewriting it as is", input);
                parse_xliff(&text)?.to_xml_string()
            }
        };

        FileManager::write_to_file(output, &converted)?;
        info!("Success: {}", output.display());
        Ok(())
    }

    // Format duration in a human-readable format
    fn format_duration(duration: std::time::Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}

/// Reviewer answering from the terminal
pub struct TerminalReviewer {
    lines: Mutex<Lines<BufReader<Stdin>>>,
}

impl Default for TerminalReviewer {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalReviewer {
    pub fn new() -> Self {
        Self { lines: Mutex::new(BufReader::new(tokio::io::stdin()).lines()) }
    }

    /// Parse an answer: `a`, `d`, or `r <note>`
    pub fn parse_decision(line: &str) -> Option<ReviewDecision> {
        let line = line.trim();
        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (line, ""),
        };
        match command.to_lowercase().as_str() {
            "a" | "approve" => Some(ReviewDecision::Approve),
            "d" | "decline" => Some(ReviewDecision::Decline),
            "r" | "refine" => Some(ReviewDecision::Refine(rest.to_string())),
            _ => None,
        }
    }

    fn prompt(request: &ReviewRequest) {
        let mut stdout = std::io::stdout();
        let _ = writeln!(stdout, "\n{} ({})", request.key_path.join("/"), request.key);
        if let Some(context) = &request.context {
            let _ = writeln!(stdout, "  context: {}", context);
        }
        let _ = writeln!(stdout, "  {}: {}", request.source.code, request.source.value);
        for note in &request.notes {
            let _ = writeln!(stdout, "  // {}", note);
        }
        for (language, text) in &request.translations {
            let _ = writeln!(stdout, "  {}: {}", language, text);
        }
        let _ = write!(stdout, "[a]pprove, [d]ecline, [r]efine <note>: ");
        let _ = stdout.flush();
    }
}

#[async_trait]
impl Reviewer for TerminalReviewer {
    async fn review(&self, request: &ReviewRequest) -> Result<ReviewDecision, TranslationError> {
        let mut lines = self.lines.lock().await;
        loop {
            Self::prompt(request);
            let line = lines
                .next_line()
                .await
                .map_err(|e| TranslationError::Review(e.to_string()))?
                .ok_or_else(|| TranslationError::Review("Standard input closed".to_string()))?;
            match Self::parse_decision(&line) {
                Some(decision) => return Ok(decision),
                None => println!("Unrecognized answer: {}", line.trim()),
            }
        }
    }
}
