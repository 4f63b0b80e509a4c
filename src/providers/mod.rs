/*!
 * Translation service clients.
 *
 * Translation itself happens remotely. This module defines the capability
 * the pipeline talks to and its implementations:
 * - `api`: HTTP client for the translation service
 * - `ndjson`: decoder for the streamed response
 * - `mock`: scripted translator for tests
 */

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Debug;

use crate::app_config::LlmTranslatorConfig;
use crate::errors::ProviderError;
use crate::translation::batch::BatchContent;

pub mod api;
pub mod mock;
pub mod ndjson;

/// Body of a localize request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalizeRequest {
    /// Model provider the service should use
    pub provider: String,

    /// Free-form context shared by every request of a run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,

    pub source_language: String,

    pub target_languages: Vec<String>,

    pub contents: Vec<BatchContent>,
}

/// Token usage reported when a stream finishes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamUsage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

/// One line of the streamed response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamEnvelope {
    /// Best-effort snapshot of the result so far
    Object { object: Value },

    /// End of the stream
    Finish {
        #[serde(default)]
        usage: StreamUsage,
    },

    /// Error raised by the service mid-stream
    Error { error: Value },
}

/// Stream of decoded envelopes
pub type EnvelopeStream = BoxStream<'static, Result<StreamEnvelope, ProviderError>>;

/// Remote translation capability
///
/// Implementations must be usable across await points, hence `Send + Sync`.
#[async_trait]
pub trait Translator: Send + Sync + Debug {
    /// Fetch the service's model configuration
    async fn fetch_config(&self) -> Result<LlmTranslatorConfig, ProviderError>;

    /// Start a translation and return its envelope stream
    ///
    /// Transport failures and non-success statuses are reported here; errors
    /// inside the stream arrive as items.
    async fn localize(&self, request: &LocalizeRequest) -> Result<EnvelopeStream, ProviderError>;
}
