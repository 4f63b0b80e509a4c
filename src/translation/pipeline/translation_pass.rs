/*!
 * Translation pass: one request per batch, with retry.
 *
 * Each attempt streams snapshots of the result. A snapshot counts only when
 * it matches the batch schema, and the last matching one wins. An attempt
 * fails on a transport error, an error envelope, or a stream that never
 * produced a matching snapshot.
 */

use std::collections::{BTreeMap, BTreeSet};
use std::time::{Duration, Instant};

use futures::StreamExt;
use log::{debug, error, warn};
use serde_json::Value;

use crate::entity::EntityDictionary;
use crate::errors::ProviderError;
use crate::providers::{LocalizeRequest, StreamEnvelope, StreamUsage, Translator};
use crate::translation::batch::TranslationBatch;
use crate::translation::progress::ProgressTracker;
use crate::translation::tokens::TokenCounter;
use crate::xliff::SegmentState;

/// Translations by key, then by language
pub type BatchTranslations = BTreeMap<String, BTreeMap<String, String>>;

/// Configuration for the translation pass.
#[derive(Debug, Clone)]
pub struct TranslationPassConfig {
    /// Attempts per batch
    pub max_retry: usize,

    /// Backoff before the second attempt, doubled after each failure
    pub retry_backoff_ms: u64,

    /// Model provider forwarded to the service
    pub provider: String,

    /// Free-form context sent with every request
    pub context: Option<String>,
}

impl Default for TranslationPassConfig {
    fn default() -> Self {
        Self {
            max_retry: 1,
            retry_backoff_ms: 500,
            provider: "openai".to_string(),
            context: None,
        }
    }
}

/// Result of a successful batch.
#[derive(Debug, Clone)]
pub struct BatchSuccess {
    /// Last valid snapshot
    pub translations: BatchTranslations,

    /// Usage reported by the finish envelope
    pub usage: StreamUsage,

    /// Time spent on the successful attempt
    pub duration: Duration,

    /// Failed attempts before the successful one
    pub retries_used: usize,
}

/// Translation pass for translating planned batches.
pub struct TranslationPass {
    config: TranslationPassConfig,
}

impl TranslationPass {
    /// Create a new translation pass with the given configuration.
    pub fn new(config: TranslationPassConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TranslationPassConfig {
        &self.config
    }

    /// Request body for a batch
    pub fn request_for(&self, batch: &TranslationBatch) -> LocalizeRequest {
        LocalizeRequest {
            provider: self.config.provider.clone(),
            context: self.config.context.clone(),
            source_language: batch.source_language.clone(),
            target_languages: batch.target_languages.clone(),
            contents: batch.contents.clone(),
        }
    }

    /// Translate one batch, retrying with exponential backoff.
    ///
    /// Returns the last error once every attempt has failed.
    pub async fn translate_batch(
        &self,
        translator: &dyn Translator,
        counter: &dyn TokenCounter,
        batch: &TranslationBatch,
        progress: &mut ProgressTracker,
    ) -> Result<BatchSuccess, ProviderError> {
        let request = self.request_for(batch);
        let max_retry = self.config.max_retry.max(1);
        let mut attempt = 0;
        let mut last_error = None;

        while attempt < max_retry {
            match self.attempt(translator, counter, batch, &request, progress).await {
                Ok(mut success) => {
                    success.retries_used = attempt;
                    return Ok(success);
                }
                Err(e) => {
                    error!(
                        "Batch of {} entries into {:?} failed: {} - attempt {}/{}",
                        batch.contents.len(),
                        batch.target_languages,
                        e,
                        attempt + 1,
                        max_retry
                    );
                    last_error = Some(e);
                }
            }

            attempt += 1;

            if attempt < max_retry {
                tokio::time::sleep(backoff_delay(self.config.retry_backoff_ms, attempt)).await;
            }
        }

        Err(last_error.unwrap_or_else(|| {
            ProviderError::StreamError(format!("Batch failed after {} attempts", max_retry))
        }))
    }

    /// One request and its stream
    async fn attempt(
        &self,
        translator: &dyn Translator,
        counter: &dyn TokenCounter,
        batch: &TranslationBatch,
        request: &LocalizeRequest,
        progress: &mut ProgressTracker,
    ) -> Result<BatchSuccess, ProviderError> {
        let started = Instant::now();
        let mut stream = translator.localize(request).await?;
        let mut latest = None;
        let mut usage = StreamUsage::default();

        while let Some(envelope) = stream.next().await {
            match envelope? {
                StreamEnvelope::Object { object } => match validate_snapshot(&object, batch) {
                    Some(translations) => {
                        let received = counter.count(&object.to_string());
                        progress.on_partial(received, batch.expected_tokens, batch.units());
                        latest = Some(translations);
                    }
                    None => debug!("Snapshot does not match the batch schema yet"),
                },
                StreamEnvelope::Finish { usage: reported } => {
                    usage = reported;
                    break;
                }
                StreamEnvelope::Error { error } => {
                    return Err(ProviderError::StreamError(error.to_string()));
                }
            }
        }

        let translations = latest.ok_or_else(|| {
            ProviderError::StreamError("Stream ended without a valid translation object".to_string())
        })?;

        Ok(BatchSuccess { translations, usage, duration: started.elapsed(), retries_used: 0 })
    }
}

/// Delay before the retry that follows `attempt` failed attempts
pub fn backoff_delay(base_ms: u64, attempt: usize) -> Duration {
    let factor = 1u64 << attempt.saturating_sub(1).min(16);
    Duration::from_millis(base_ms.saturating_mul(factor))
}

/// Check a snapshot against the batch schema.
///
/// Every value must be an object whose keys are exactly the batch languages,
/// each mapped to a string.
pub fn validate_snapshot(object: &Value, batch: &TranslationBatch) -> Option<BatchTranslations> {
    let languages: BTreeSet<&str> = batch.target_languages.iter().map(String::as_str).collect();
    let mut translations = BatchTranslations::new();

    for (key, entry) in object.as_object()? {
        let entry = entry.as_object()?;
        if entry.len() != languages.len() {
            return None;
        }
        let mut texts = BTreeMap::new();
        for (language, text) in entry {
            if !languages.contains(language.as_str()) {
                return None;
            }
            texts.insert(language.clone(), text.as_str()?.to_string());
        }
        translations.insert(key.clone(), texts);
    }

    Some(translations)
}

/// Write a batch result into the entities.
///
/// Only keys and languages of the batch are applied. Returns the keys that
/// received at least one translation, in batch order, and the number of
/// slots written.
pub fn apply_translations(
    entities: &mut EntityDictionary,
    batch: &TranslationBatch,
    translations: &BatchTranslations,
) -> (Vec<String>, usize) {
    let mut touched = Vec::new();
    let mut slots = 0;

    for key in batch.keys() {
        let Some(texts) = translations.get(key) else {
            warn!("No translation returned for {}", key);
            continue;
        };
        let Some(entity) = entities.get_mut(key) else {
            continue;
        };
        let mut wrote = false;
        for language in &batch.target_languages {
            let (Some(text), Some(target)) = (texts.get(language), entity.target.get_mut(language)) else {
                continue;
            };
            target.value = Some(text.clone());
            target.state = Some(SegmentState::Translated);
            target.sub_state = None;
            slots += 1;
            wrote = true;
        }
        if wrote {
            touched.push(key.to_string());
        }
    }

    (touched, slots)
}

/// Statistics from the translation pass.
#[derive(Debug, Clone, Default)]
pub struct TranslationStats {
    /// Total number of batches processed
    pub total_batches: usize,

    /// Number of batches successfully completed
    pub completed_batches: usize,

    /// Batches abandoned after their last attempt
    pub failed_batches: usize,

    /// Total retries across all batches
    pub total_retries: usize,

    /// (entity, language) slots written
    pub translated_units: usize,
}

impl TranslationStats {
    /// Create new empty stats.
    pub fn new() -> Self {
        Self::default()
    }

    /// Calculate success rate.
    pub fn success_rate(&self) -> f32 {
        if self.total_batches == 0 {
            return 100.0;
        }
        (self.completed_batches as f32 / self.total_batches as f32) * 100.0
    }
}
