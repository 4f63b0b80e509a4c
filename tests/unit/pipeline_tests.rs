/*!
 * Tests for the translation pipeline: review loop, retries and progress
 */

use parking_lot::Mutex;
use std::sync::Arc;

use locflow::app_config::TranslationMode;
use locflow::entity::{EntityDictionary, SUB_STATE_DECLINED};
use locflow::providers::mock::MockTranslator;
use locflow::translation::pipeline::ReviewDecision;
use locflow::translation::{PipelineConfig, ProgressCallback, TranslationPipeline};
use locflow::xliff::SegmentState;

use crate::common::{FixedTokenCounter, ScriptedReviewer, entity_with_key, init_logging};

const NO_NOTES: &[&str] = &[];

fn entities() -> EntityDictionary {
    let languages: &[(&str, &[&str])] = &[("de", NO_NOTES), ("fr", NO_NOTES)];
    [
        entity_with_key("greeting", "Good morning", languages),
        entity_with_key("farewell", "See you soon", languages),
    ]
    .into_iter()
    .collect()
}

fn pipeline(translator: &MockTranslator, mode: TranslationMode) -> TranslationPipeline {
    TranslationPipeline::new(
        Arc::new(translator.clone()),
        PipelineConfig::default().with_mode(mode).with_retry_backoff_ms(1),
    )
    .with_token_counter(Arc::new(FixedTokenCounter))
}

#[tokio::test]
async fn test_run_interactive_withRefine_shouldRetranslateWithNote() {
    init_logging();
    let translator = MockTranslator::working();
    let reviewer = ScriptedReviewer::new(vec![
        ReviewDecision::Refine("Use the formal tone".to_string()),
        ReviewDecision::Approve,
        ReviewDecision::Approve,
    ]);

    let result = pipeline(&translator, TranslationMode::Interactive)
        .run(entities(), Some(&reviewer), None)
        .await
        .unwrap();

    assert_eq!(result.passes, 2);
    assert_eq!(result.review.refined, 1);
    assert_eq!(result.review.approved, 2);
    assert_eq!(result.untranslated_count, 0);

    let requests = translator.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].contents.len(), 1);
    assert_eq!(requests[1].contents[0].key, "greeting");
    assert_eq!(requests[1].contents[0].notes, vec!["Use the formal tone"]);

    let greeting = result.entities.get("greeting").unwrap();
    for target in greeting.target.values() {
        assert_eq!(target.state, Some(SegmentState::Final));
        assert_eq!(target.sub_state, None);
        assert_eq!(target.notes, vec!["Use the formal tone"]);
    }

    let reviewed: Vec<String> = reviewer.requests().into_iter().map(|r| r.key).collect();
    assert_eq!(reviewed, vec!["greeting", "farewell", "greeting"]);
    assert_eq!(reviewer.requests()[0].translations["de"], "[de] Good morning");
}

#[tokio::test]
async fn test_run_interactive_withDecline_shouldKeepTranslationMarked() {
    let translator = MockTranslator::working();
    let reviewer = ScriptedReviewer::new(vec![ReviewDecision::Decline, ReviewDecision::Approve]);

    let result = pipeline(&translator, TranslationMode::Interactive)
        .run(entities(), Some(&reviewer), None)
        .await
        .unwrap();

    assert_eq!(result.passes, 1);
    assert_eq!(result.review.declined, 1);
    let greeting = result.entities.get("greeting").unwrap();
    assert_eq!(greeting.target["fr"].state, Some(SegmentState::Reviewed));
    assert_eq!(greeting.target["fr"].sub_state.as_deref(), Some(SUB_STATE_DECLINED));
    assert_eq!(greeting.target["fr"].value.as_deref(), Some("[fr] Good morning"));
    assert_eq!(result.untranslated_count, 0);
}

#[tokio::test]
async fn test_run_interactive_withGlobalContext_shouldShowItToReviewer() {
    let translator = MockTranslator::working();
    let reviewer = ScriptedReviewer::approving();
    let config = PipelineConfig::default()
        .with_mode(TranslationMode::Interactive)
        .with_global_context("A weather app");

    TranslationPipeline::new(Arc::new(translator.clone()), config)
        .with_token_counter(Arc::new(FixedTokenCounter))
        .run(entities(), Some(&reviewer), None)
        .await
        .unwrap();

    let requests = reviewer.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests.iter().all(|r| r.context.as_deref() == Some("A weather app")));
    assert_eq!(translator.requests()[0].context.as_deref(), Some("A weather app"));
}

#[tokio::test]
async fn test_run_interactive_whenReviewerFails_shouldSkipEntity() {
    let translator = MockTranslator::working();
    let reviewer = ScriptedReviewer::new(vec![ReviewDecision::Approve]);

    let result = pipeline(&translator, TranslationMode::Interactive)
        .run(entities(), Some(&reviewer), None)
        .await
        .unwrap();

    assert_eq!(result.review.approved, 1);
    assert_eq!(result.review.skipped, 1);
    let farewell = result.entities.get("farewell").unwrap();
    assert_eq!(farewell.target["de"].state, Some(SegmentState::Translated));
}

#[tokio::test]
async fn test_run_automatic_shouldNeverAskReviewer() {
    let translator = MockTranslator::working();
    let reviewer = ScriptedReviewer::approving();

    let result = pipeline(&translator, TranslationMode::Automatic)
        .run(entities(), Some(&reviewer), None)
        .await
        .unwrap();

    assert!(reviewer.requests().is_empty());
    assert_eq!(result.review.total(), 0);
    for entity in result.entities.iter() {
        assert!(entity.target.values().all(|t| t.state == Some(SegmentState::Translated)));
    }
}

#[tokio::test]
async fn test_run_withFailingTranslator_shouldStopAfterMaxRetry() {
    let translator = MockTranslator::failing();
    let pipeline = TranslationPipeline::new(
        Arc::new(translator.clone()),
        PipelineConfig::default().with_max_retry(3).with_retry_backoff_ms(1),
    )
    .with_token_counter(Arc::new(FixedTokenCounter));

    let result = pipeline.run(entities(), None, None).await.unwrap();

    assert_eq!(translator.request_count(), 3);
    assert_eq!(result.stats.failed_batches, 1);
    assert_eq!(result.failed_batches.len(), 1);
    assert_eq!(result.untranslated_count, 2);
    for entity in result.entities.iter() {
        assert!(entity.target.values().all(|t| t.value.is_none() && t.state.is_none()));
    }
}

#[tokio::test]
async fn test_run_withIntermittentTranslator_shouldRecoverOnRetry() {
    let translator = MockTranslator::intermittent(1);
    let pipeline = TranslationPipeline::new(
        Arc::new(translator.clone()),
        PipelineConfig::default().with_max_retry(2).with_retry_backoff_ms(1),
    )
    .with_token_counter(Arc::new(FixedTokenCounter));

    // every request fails with fail_every = 1
    let result = pipeline.run(entities(), None, None).await.unwrap();
    assert_eq!(result.stats.failed_batches, 1);

    let translator = MockTranslator::intermittent(2);
    let pipeline = TranslationPipeline::new(
        Arc::new(translator.clone()),
        PipelineConfig::default().with_max_retry(2).with_retry_backoff_ms(1),
    )
    .with_token_counter(Arc::new(FixedTokenCounter));

    let result = pipeline.run(entities(), None, None).await.unwrap();
    assert_eq!(result.stats.failed_batches, 0);
    assert_eq!(result.untranslated_count, 0);
    assert_eq!(translator.request_count(), 1);
}

#[tokio::test]
async fn test_run_shouldReportMonotonicProgressEndingAtOne() {
    let translator = MockTranslator::working();
    let values = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&values);
    let callback: ProgressCallback = Box::new(move |value| sink.lock().push(value));

    pipeline(&translator, TranslationMode::Automatic)
        .run(entities(), None, Some(callback))
        .await
        .unwrap();

    let values = values.lock();
    assert!(!values.is_empty());
    assert!(values.windows(2).all(|pair| pair[0] <= pair[1]));
    assert!(values.iter().all(|value| (0.0..=1.0).contains(value)));
    assert_eq!(values.last().copied(), Some(1.0));
}
