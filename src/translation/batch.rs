/*!
 * Batch planning under a token budget.
 *
 * Entities waiting for a translation are packed into requests that fit the
 * model's output budget. An entity whose languages do not fit one request is
 * split by language; entities sharing the same source language and the same
 * language list are grouped until the budget is reached.
 */

use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::tokens::TokenCounter;
use crate::entity::LocalizationEntity;
use crate::errors::PlanningError;

/// Characters of the source shown in a too-long error
const PREVIEW_CHARS: usize = 20;

/// Budget parameters of the planner
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlannerConfig {
    /// Maximum output tokens of one request
    pub max_tokens: usize,

    /// Share of the budget kept in reserve, in `[0, 1)`
    pub buffer_ratio: f64,
}

impl PlannerConfig {
    pub fn new(max_tokens: usize, buffer_ratio: f64) -> Self {
        Self { max_tokens, buffer_ratio }
    }

    /// Usable budget: `floor(max_tokens * (1 - buffer_ratio))`
    pub fn max_safe_tokens(&self) -> usize {
        (self.max_tokens as f64 * (1.0 - self.buffer_ratio)).floor() as usize
    }
}

/// One entity inside a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchContent {
    pub key: String,
    pub source: String,
    pub notes: Vec<String>,
}

/// A request-sized group of entities
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationBatch {
    pub source_language: String,

    /// Sorted target languages shared by every content
    pub target_languages: Vec<String>,

    pub contents: Vec<BatchContent>,

    /// Tokens of the request payload, notes included
    pub source_tokens: usize,

    /// Tokens the response is expected to take
    pub expected_tokens: usize,
}

impl TranslationBatch {
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.contents.iter().map(|content| content.key.as_str())
    }

    /// Number of (entity, language) slots covered
    pub fn units(&self) -> usize {
        self.contents.len() * self.target_languages.len()
    }
}

/// Line the model produces for one entity and one language
fn expected_line(key: &str, source: &str) -> String {
    format!("\"{}\" = \"{}\"\n", key, source)
}

/// Request payload for one entity: its notes as comments, then the entry
fn source_payload(key: &str, source: &str, notes: &[String]) -> String {
    let mut payload = String::new();
    for note in notes {
        payload.push_str("// ");
        payload.push_str(note);
        payload.push('\n');
    }
    payload.push_str(&format!("\"{}\" = \"{}\"\n\n", key, source));
    payload
}

/// Plan batches for `entities`, in input order.
///
/// Fails when a single entity does not fit the budget for even one language;
/// no batches are returned in that case.
pub fn plan_batches(
    entities: &[&LocalizationEntity],
    config: &PlannerConfig,
    counter: &dyn TokenCounter,
) -> Result<Vec<TranslationBatch>, PlanningError> {
    let max_safe = config.max_safe_tokens();
    let mut consumed = vec![false; entities.len()];
    let mut batches = Vec::new();

    for index in 0..entities.len() {
        if consumed[index] {
            continue;
        }
        consumed[index] = true;

        let entity = entities[index];
        let languages = entity.untranslated_languages();
        if languages.is_empty() {
            info!("Skipping {}: nothing to translate", entity.key);
            continue;
        }

        let expected = counter.count(&expected_line(&entity.key, &entity.source.value));
        if expected > max_safe {
            return Err(PlanningError::TooLong {
                key: entity.key.clone(),
                preview: entity.source.value.chars().take(PREVIEW_CHARS).collect(),
            });
        }

        if expected * languages.len() > max_safe {
            // max_safe >= expected here, so at least one language fits
            let per_batch = (max_safe / expected).max(1);
            for slice in languages.chunks(per_batch) {
                let notes = entity.notes_for(slice.iter().map(String::as_str));
                batches.push(TranslationBatch {
                    source_language: entity.source.code.clone(),
                    target_languages: slice.to_vec(),
                    source_tokens: counter.count(&source_payload(&entity.key, &entity.source.value, &notes)),
                    contents: vec![BatchContent {
                        key: entity.key.clone(),
                        source: entity.source.value.clone(),
                        notes,
                    }],
                    expected_tokens: expected * slice.len(),
                });
            }
            debug!("Split {} into {} batches", entity.key, languages.len().div_ceil(per_batch));
            continue;
        }

        let mut current = expected;
        let mut contents = vec![content_for(entity, &languages)];
        for candidate_index in index + 1..entities.len() {
            if consumed[candidate_index] {
                continue;
            }
            let candidate = entities[candidate_index];
            if candidate.source.code != entity.source.code || candidate.untranslated_languages() != languages {
                continue;
            }
            let cost = counter.count(&expected_line(&candidate.key, &candidate.source.value)) * languages.len();
            if current + cost > max_safe {
                break;
            }
            current += cost;
            consumed[candidate_index] = true;
            contents.push(content_for(candidate, &languages));
        }

        let source_tokens = contents
            .iter()
            .map(|content| counter.count(&source_payload(&content.key, &content.source, &content.notes)))
            .sum();
        debug!("Grouped {} entities for {:?}", contents.len(), languages);
        batches.push(TranslationBatch {
            source_language: entity.source.code.clone(),
            target_languages: languages,
            contents,
            source_tokens,
            expected_tokens: current,
        });
    }

    Ok(batches)
}

fn content_for(entity: &LocalizationEntity, languages: &[String]) -> BatchContent {
    BatchContent {
        key: entity.key.clone(),
        source: entity.source.value.clone(),
        notes: entity.notes_for(languages.iter().map(String::as_str)),
    }
}
