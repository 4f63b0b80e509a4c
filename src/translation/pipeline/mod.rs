/*!
 * Translation pipeline for queued localization entities.
 *
 * The pipeline repeats two phases until nothing is left to do:
 * 1. **Translation Pass**: planned batches are streamed through the translator
 * 2. **Review Pass**: in interactive mode, a reviewer approves, declines or
 *    sends entities back with a note
 */

pub mod orchestrator;
pub mod review_pass;
pub mod translation_pass;

// Re-export types used externally
pub use orchestrator::{PipelineConfig, PipelineResult, TranslationPipeline};
pub use review_pass::{ReviewDecision, ReviewRequest, ReviewSummary, Reviewer};
pub use translation_pass::{TranslationPass, TranslationPassConfig, TranslationStats};
