/*!
 * Interactive review of freshly translated entities.
 *
 * A reviewer sees every entity that received a translation in the current
 * pass and decides for all of its `translated` slots at once.
 */

use std::collections::BTreeMap;

use async_trait::async_trait;
use log::{error, info};

use crate::entity::{EntityDictionary, SUB_STATE_DECLINED, SUB_STATE_REFINE_NEEDED, SourceText};
use crate::errors::TranslationError;
use crate::xliff::SegmentState;

/// What a reviewer is shown
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewRequest {
    pub key: String,

    /// File id, group ids and unit id
    pub key_path: Vec<String>,

    pub source: SourceText,

    /// Translated text by language, for the slots under review
    pub translations: BTreeMap<String, String>,

    /// Notes of the entity
    pub notes: Vec<String>,

    /// Global context of the project, if configured
    pub context: Option<String>,
}

/// Reviewer verdict for one entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewDecision {
    /// Accept as final
    Approve,
    /// Keep the translation but mark it declined
    Decline,
    /// Ask for another translation, with a note for the translator
    Refine(String),
}

/// Decides on translated entities
#[async_trait]
pub trait Reviewer: Send + Sync {
    async fn review(&self, request: &ReviewRequest) -> Result<ReviewDecision, TranslationError>;
}

/// Counts of review decisions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReviewSummary {
    pub approved: usize,
    pub declined: usize,
    pub refined: usize,
    /// Entities left as translated because the reviewer failed
    pub skipped: usize,
}

impl ReviewSummary {
    pub fn merge(&mut self, other: ReviewSummary) {
        self.approved += other.approved;
        self.declined += other.declined;
        self.refined += other.refined;
        self.skipped += other.skipped;
    }

    pub fn total(&self) -> usize {
        self.approved + self.declined + self.refined + self.skipped
    }
}

/// Build the request for an entity, or `None` when nothing is under review
pub fn review_request(entities: &EntityDictionary, key: &str, context: Option<&str>) -> Option<ReviewRequest> {
    let entity = entities.get(key)?;
    let translations: BTreeMap<String, String> = entity
        .target
        .iter()
        .filter(|(_, target)| target.effective_state() == SegmentState::Translated)
        .filter_map(|(language, target)| Some((language.clone(), target.value.clone()?)))
        .collect();
    if translations.is_empty() {
        return None;
    }

    Some(ReviewRequest {
        key: entity.key.clone(),
        key_path: entity.key_path.clone(),
        source: entity.source.clone(),
        translations,
        notes: entity.all_notes(),
        context: context.map(str::to_string),
    })
}

/// Apply a decision to the `translated` slots of an entity.
///
/// Returns true when the entity must be translated again.
pub fn apply_decision(entities: &mut EntityDictionary, key: &str, decision: &ReviewDecision) -> bool {
    let Some(entity) = entities.get_mut(key) else {
        return false;
    };

    let (state, sub_state) = match decision {
        ReviewDecision::Approve => (SegmentState::Final, None),
        ReviewDecision::Decline => (SegmentState::Reviewed, Some(SUB_STATE_DECLINED)),
        ReviewDecision::Refine(_) => (SegmentState::Reviewed, Some(SUB_STATE_REFINE_NEEDED)),
    };

    for target in entity.target.values_mut() {
        if target.effective_state() == SegmentState::Translated {
            target.state = Some(state);
            target.sub_state = sub_state.map(str::to_string);
        }
    }

    match decision {
        ReviewDecision::Refine(note) => {
            let note = note.trim();
            if !note.is_empty() {
                entity.add_note(note);
            }
            true
        }
        _ => false,
    }
}

/// Review `keys` in order and return the decision counts and the keys to requeue
pub async fn review_entities(
    entities: &mut EntityDictionary,
    keys: &[String],
    reviewer: &dyn Reviewer,
    context: Option<&str>,
) -> (ReviewSummary, Vec<String>) {
    let mut summary = ReviewSummary::default();
    let mut requeued = Vec::new();

    for key in keys {
        let Some(request) = review_request(entities, key, context) else {
            continue;
        };

        let decision = match reviewer.review(&request).await {
            Ok(decision) => decision,
            Err(e) => {
                error!("Review of {} failed, keeping it translated: {}", request.key_path.join("/"), e);
                summary.skipped += 1;
                continue;
            }
        };

        match &decision {
            ReviewDecision::Approve => summary.approved += 1,
            ReviewDecision::Decline => summary.declined += 1,
            ReviewDecision::Refine(_) => summary.refined += 1,
        }
        if apply_decision(entities, key, &decision) {
            requeued.push(key.clone());
        }
    }

    info!(
        "Review: {} approved, {} declined, {} sent back",
        summary.approved, summary.declined, summary.refined
    );
    (summary, requeued)
}
