/*!
 * Mock translator for testing.
 *
 * The mock answers every request locally with a scripted behavior:
 * - `MockTranslator::working()` streams a partial, then a full snapshot
 * - `MockTranslator::failing()` rejects every request
 * - `MockTranslator::intermittent(n)` rejects every nth request
 * - other behaviors produce streams the pipeline must reject
 */

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream;
use parking_lot::Mutex;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{EnvelopeStream, LocalizeRequest, StreamEnvelope, StreamUsage, Translator};
use crate::app_config::LlmTranslatorConfig;
use crate::errors::ProviderError;

/// Behavior mode for the mock translator
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds
    Working,
    /// Fails intermittently (every Nth request)
    Intermittent { fail_every: usize },
    /// Always fails with an API error
    Failing,
    /// Streams only a finish envelope
    EndsWithoutObject,
    /// Streams a snapshot, then an error envelope
    ErrorEnvelope,
    /// Streams snapshots lacking the last requested language
    MissingLanguage,
}

/// Mock translator for testing pipeline behavior
#[derive(Debug)]
pub struct MockTranslator {
    /// Behavior mode
    behavior: MockBehavior,
    /// Configuration returned by `fetch_config`
    config: LlmTranslatorConfig,
    /// Request counter for intermittent failures
    request_count: Arc<AtomicUsize>,
    /// Every request received, in order
    requests: Arc<Mutex<Vec<LocalizeRequest>>>,
    /// Custom translation (language, source) -> text
    translate_fn: Option<fn(&str, &str) -> String>,
}

impl MockTranslator {
    /// Create a new mock translator with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            config: LlmTranslatorConfig::default(),
            request_count: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
            translate_fn: None,
        }
    }

    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent { fail_every })
    }

    /// Set the configuration served to the pipeline
    pub fn with_config(mut self, config: LlmTranslatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Set a custom translation function
    pub fn with_translation(mut self, translate: fn(&str, &str) -> String) -> Self {
        self.translate_fn = Some(translate);
        self
    }

    /// Number of localize calls so far
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Copy of the recorded requests
    pub fn requests(&self) -> Vec<LocalizeRequest> {
        self.requests.lock().clone()
    }

    /// Default translation: `[lang] source`
    pub fn default_translation(language: &str, source: &str) -> String {
        format!("[{}] {}", language, source)
    }

    fn snapshot(&self, request: &LocalizeRequest, languages: &[String], contents: usize) -> Value {
        let translate = self.translate_fn.unwrap_or(Self::default_translation);
        let mut object = Map::new();
        for content in request.contents.iter().take(contents) {
            let mut entry = Map::new();
            for language in languages {
                entry.insert(language.clone(), Value::String(translate(language, &content.source)));
            }
            object.insert(content.key.clone(), Value::Object(entry));
        }
        Value::Object(object)
    }

    fn usage(request: &LocalizeRequest) -> StreamUsage {
        let prompt_tokens = request.contents.len() as u64 * 10;
        let completion_tokens = (request.contents.len() * request.target_languages.len()) as u64 * 5;
        StreamUsage { prompt_tokens, completion_tokens, total_tokens: prompt_tokens + completion_tokens }
    }
}

impl Clone for MockTranslator {
    fn clone(&self) -> Self {
        Self {
            behavior: self.behavior,
            config: self.config.clone(),
            request_count: Arc::clone(&self.request_count),
            requests: Arc::clone(&self.requests),
            translate_fn: self.translate_fn,
        }
    }
}

#[async_trait]
impl Translator for MockTranslator {
    async fn fetch_config(&self) -> Result<LlmTranslatorConfig, ProviderError> {
        Ok(self.config.clone())
    }

    async fn localize(&self, request: &LocalizeRequest) -> Result<EnvelopeStream, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request.clone());

        let languages = &request.target_languages;
        let envelopes = match self.behavior {
            MockBehavior::Working => {
                // A partial snapshot first; it never validates on its own
                let first_language = &languages[..languages.len().min(1)];
                vec![
                    StreamEnvelope::Object { object: self.snapshot(request, first_language, 1) },
                    StreamEnvelope::Object { object: self.snapshot(request, languages, request.contents.len()) },
                    StreamEnvelope::Finish { usage: Self::usage(request) },
                ]
            }

            MockBehavior::Intermittent { fail_every } => {
                if fail_every > 0 && count % fail_every == fail_every - 1 {
                    return Err(ProviderError::ApiError {
                        status_code: 503,
                        message: format!("Simulated intermittent failure (request #{})", count + 1),
                    });
                }
                vec![
                    StreamEnvelope::Object { object: self.snapshot(request, languages, request.contents.len()) },
                    StreamEnvelope::Finish { usage: Self::usage(request) },
                ]
            }

            MockBehavior::Failing => {
                return Err(ProviderError::ApiError {
                    status_code: 500,
                    message: "Simulated translator failure".to_string(),
                });
            }

            MockBehavior::EndsWithoutObject => vec![StreamEnvelope::Finish { usage: Self::usage(request) }],

            MockBehavior::ErrorEnvelope => vec![
                StreamEnvelope::Object { object: self.snapshot(request, languages, request.contents.len()) },
                StreamEnvelope::Error { error: json!({ "message": "Simulated stream error" }) },
            ],

            MockBehavior::MissingLanguage => {
                let kept = &languages[..languages.len().saturating_sub(1)];
                vec![
                    StreamEnvelope::Object { object: self.snapshot(request, kept, request.contents.len()) },
                    StreamEnvelope::Finish { usage: Self::usage(request) },
                ]
            }
        };

        Ok(stream::iter(envelopes.into_iter().map(Ok)).boxed())
    }
}
