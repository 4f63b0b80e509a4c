/*!
 * Pipeline orchestrator for coordinating translation passes.
 *
 * A run works through a queue of entity keys:
 * 1. Planning: batches under the model's token budget
 * 2. Translation Pass: one streamed request per batch, with retry
 * 3. Review Pass: interactive mode only; entities sent back for
 *    refinement form the next queue
 */

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{error, info, warn};

use crate::app_config::{Config, TranslationMode};
use crate::entity::{EntityDictionary, LocalizationEntity};
use crate::errors::TranslationError;
use crate::providers::Translator;
use crate::translation::batch::{PlannerConfig, TranslationBatch, plan_batches};
use crate::translation::core::TokenUsageStats;
use crate::translation::progress::{ProgressCallback, ProgressTracker};
use crate::translation::tokens::{TiktokenCounter, TokenCounter};

use super::review_pass::{ReviewSummary, Reviewer, review_entities};
use super::translation_pass::{TranslationPass, TranslationPassConfig, TranslationStats, apply_translations};

/// Configuration for the translation pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Automatic or interactive review
    pub mode: TranslationMode,

    /// Attempts per batch; the service's value when unset
    pub max_retry: Option<usize>,

    /// Backoff before the second attempt
    pub retry_backoff_ms: u64,

    /// Free-form context sent with every request
    pub global_context: Option<String>,

    /// Model provider forwarded to the service
    pub provider: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            mode: TranslationMode::Automatic,
            max_retry: None,
            retry_backoff_ms: 500,
            global_context: None,
            provider: "openai".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Pipeline settings from the application configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            mode: config.translator.mode,
            max_retry: config.translator.max_retry,
            retry_backoff_ms: config.translator.retry_backoff_ms,
            global_context: config.global_context.clone(),
            provider: config.translator.provider.clone(),
        }
    }

    pub fn with_mode(mut self, mode: TranslationMode) -> Self {
        self.mode = mode;
        self
    }

    /// Override the service's retry count.
    pub fn with_max_retry(mut self, max_retry: usize) -> Self {
        self.max_retry = Some(max_retry);
        self
    }

    pub fn with_retry_backoff_ms(mut self, retry_backoff_ms: u64) -> Self {
        self.retry_backoff_ms = retry_backoff_ms;
        self
    }

    pub fn with_global_context(mut self, context: &str) -> Self {
        self.global_context = Some(context.to_string());
        self
    }

    pub fn with_provider(mut self, provider: &str) -> Self {
        self.provider = provider.to_string();
        self
    }
}

/// Result of the complete pipeline execution.
#[derive(Debug)]
pub struct PipelineResult {
    /// Entities with every translation and review applied
    pub entities: EntityDictionary,

    /// Usage of the successful batches
    pub usage: TokenUsageStats,

    /// Batches abandoned after their last attempt
    pub failed_batches: Vec<TranslationBatch>,

    /// Entities with at least one language still untranslated
    pub untranslated_count: usize,

    /// Review decisions over all passes
    pub review: ReviewSummary,

    /// Number of planning rounds
    pub passes: usize,

    /// Batch statistics
    pub stats: TranslationStats,

    /// Total duration of pipeline execution
    pub duration: Duration,
}

impl PipelineResult {
    /// Get a summary of the pipeline result.
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();

        parts.push(format!("Duration: {:.2}s", self.duration.as_secs_f32()));
        parts.push(format!(
            "Translation: {} strings in {}/{} batches",
            self.stats.translated_units, self.stats.completed_batches, self.stats.total_batches
        ));

        if self.review.total() > 0 {
            parts.push(format!(
                "Review: {} approved, {} declined, {} refined",
                self.review.approved, self.review.declined, self.review.refined
            ));
        }

        if !self.failed_batches.is_empty() {
            parts.push(format!("Failed batches: {}", self.failed_batches.len()));
        }

        parts.push(format!("Untranslated: {}", self.untranslated_count));
        parts.join(" | ")
    }
}

/// The main translation pipeline orchestrator.
pub struct TranslationPipeline {
    translator: Arc<dyn Translator>,
    config: PipelineConfig,
    counter: Option<Arc<dyn TokenCounter>>,
}

impl TranslationPipeline {
    /// Create a new pipeline with the given configuration.
    pub fn new(translator: Arc<dyn Translator>, config: PipelineConfig) -> Self {
        Self { translator, config, counter: None }
    }

    /// Use this counter instead of the service's tokenizer
    pub fn with_token_counter(mut self, counter: Arc<dyn TokenCounter>) -> Self {
        self.counter = Some(counter);
        self
    }

    /// Get the pipeline configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Translate every untranslated slot of `entities`.
    ///
    /// The reviewer is consulted in interactive mode only. Planning and
    /// configuration errors abort the run; failed batches do not.
    pub async fn run(
        &self,
        mut entities: EntityDictionary,
        reviewer: Option<&dyn Reviewer>,
        progress_callback: Option<ProgressCallback>,
    ) -> Result<PipelineResult, TranslationError> {
        let start_time = Instant::now();

        let remote = self.translator.fetch_config().await?;
        remote.validate()?;

        let counter: Arc<dyn TokenCounter> = match &self.counter {
            Some(counter) => Arc::clone(counter),
            None => Arc::new(TiktokenCounter::for_model(&remote.tokenizer, &remote.tokenizer_model)?),
        };

        let pass = TranslationPass::new(TranslationPassConfig {
            max_retry: self.config.max_retry.unwrap_or(remote.max_retry),
            retry_backoff_ms: self.config.retry_backoff_ms,
            provider: self.config.provider.clone(),
            context: self.config.global_context.clone(),
        });
        let planner = PlannerConfig::new(remote.max_output_tokens, remote.buffer);

        let reviewer = match (self.config.mode, reviewer) {
            (TranslationMode::Interactive, Some(reviewer)) => Some(reviewer),
            (TranslationMode::Interactive, None) => {
                warn!("Interactive mode without a reviewer, translations are kept as translated");
                None
            }
            (TranslationMode::Automatic, _) => None,
        };

        let mut usage = TokenUsageStats::with_provider_info(self.config.provider.clone(), remote.tokenizer_model.clone());
        let mut stats = TranslationStats::new();
        let mut review = ReviewSummary::default();
        let mut failed_batches = Vec::new();
        let mut progress = ProgressTracker::new(0, remote.buffer);
        if let Some(callback) = progress_callback {
            progress = progress.with_callback(callback);
        }

        let mut queue = entities.keys();
        let mut passes = 0;

        while !queue.is_empty() {
            passes += 1;

            let batches = {
                let queued: Vec<&LocalizationEntity> = queue.iter().filter_map(|key| entities.get(key)).collect();
                plan_batches(&queued, &planner, counter.as_ref())?
            };
            let units: usize = batches.iter().map(TranslationBatch::units).sum();
            progress.extend_total(units);
            info!("Pass {}: {} strings in {} batches", passes, units, batches.len());

            let mut translated_keys: Vec<String> = Vec::new();
            for batch in batches {
                stats.total_batches += 1;
                match pass.translate_batch(self.translator.as_ref(), counter.as_ref(), &batch, &mut progress).await {
                    Ok(success) => {
                        usage.add(&success.usage, success.duration);
                        stats.completed_batches += 1;
                        stats.total_retries += success.retries_used;
                        let (keys, slots) = apply_translations(&mut entities, &batch, &success.translations);
                        stats.translated_units += slots;
                        for key in keys {
                            if !translated_keys.contains(&key) {
                                translated_keys.push(key);
                            }
                        }
                    }
                    Err(e) => {
                        error!("Giving up on batch {:?}: {}", batch.keys().collect::<Vec<_>>(), e);
                        stats.failed_batches += 1;
                        stats.total_retries += pass.config().max_retry.saturating_sub(1);
                        failed_batches.push(batch.clone());
                    }
                }
                progress.on_batch_done(batch.units());
            }

            queue = match reviewer {
                Some(reviewer) => {
                    let context = self.config.global_context.as_deref();
                    let (summary, requeued) =
                        review_entities(&mut entities, &translated_keys, reviewer, context).await;
                    review.merge(summary);
                    requeued
                }
                None => Vec::new(),
            };
        }

        progress.finish();

        let untranslated_count = entities.untranslated_count();
        if untranslated_count > 0 {
            warn!("{} strings are still untranslated", untranslated_count);
        }

        Ok(PipelineResult {
            entities,
            usage,
            failed_batches,
            untranslated_count,
            review,
            passes,
            stats,
            duration: start_time.elapsed(),
        })
    }
}
