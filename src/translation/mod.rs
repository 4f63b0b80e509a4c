/*!
 * Translation of localization entities through a remote service.
 *
 * - `tokens`: token counting shared by planning and progress
 * - `batch`: batch planning under the model's token budget
 * - `progress`: monotonic progress reporting
 * - `core`: token usage accounting
 * - `pipeline`: orchestrator, translation pass and review pass
 */

// Re-export main types for easier usage
pub use self::batch::{PlannerConfig, TranslationBatch, plan_batches};
pub use self::core::TokenUsageStats;
pub use self::pipeline::{PipelineConfig, PipelineResult, TranslationPipeline};
pub use self::progress::{ProgressCallback, ProgressTracker};
pub use self::tokens::{TiktokenCounter, TokenCounter};

// Submodules
pub mod batch;
pub mod core;
pub mod pipeline;
pub mod progress;
pub mod tokens;
