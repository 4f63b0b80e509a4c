/*!
 * Token counting.
 *
 * The planner and the progress estimator share one counter, so budgets and
 * progress are measured in the same unit the translation service bills.
 */

use std::fmt;
use std::sync::Arc;

use log::warn;
use tiktoken_rs::CoreBPE;

use crate::errors::TranslationError;

/// Counts tokens in a piece of text
pub trait TokenCounter: Send + Sync {
    fn count(&self, text: &str) -> usize;
}

/// Byte-pair encoding counter backed by tiktoken
#[derive(Clone)]
pub struct TiktokenCounter {
    bpe: Arc<CoreBPE>,
    model: String,
}

impl TiktokenCounter {
    /// Counter for an OpenAI model name, e.g. `gpt-4`.
    ///
    /// Unknown models fall back to `cl100k_base`.
    pub fn for_model(tokenizer: &str, model: &str) -> Result<Self, TranslationError> {
        if tokenizer != "openai" {
            return Err(TranslationError::Config(format!("Unsupported tokenizer: {}", tokenizer)));
        }

        let bpe = match tiktoken_rs::get_bpe_from_model(model) {
            Ok(bpe) => bpe,
            Err(e) => {
                warn!("No tokenizer for model {} ({}), using cl100k_base", model, e);
                tiktoken_rs::cl100k_base()
                    .map_err(|e| TranslationError::Config(format!("Failed to load cl100k_base: {}", e)))?
            }
        };

        Ok(Self { bpe: Arc::new(bpe), model: model.to_string() })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl TokenCounter for TiktokenCounter {
    fn count(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }
}

impl fmt::Debug for TiktokenCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TiktokenCounter").field("model", &self.model).finish()
    }
}
