/*!
 * Carry translations forward from a previous run.
 *
 * A prior target is only reused when nothing it was translated from has
 * changed: same source, same notes, in the same order.
 */

use log::{debug, info};

use super::extract::extract_entities;
use super::writeback::write_back;
use super::{EntityDictionary, LocalizationEntity};
use crate::errors::EntityError;
use crate::xliff::{SegmentState, Xliff};

/// Outcome of a merge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Slots copied from the prior dictionary
    pub carried: usize,

    /// Initial slots with a prior entry that could not be reused
    pub forfeited: usize,
}

impl MergeReport {
    pub fn summary(&self) -> String {
        format!("{} translations carried forward, {} forfeited", self.carried, self.forfeited)
    }
}

/// Copy prior targets into the initial slots of `fresh`
pub fn merge_prior(fresh: &mut EntityDictionary, prior: &EntityDictionary) -> MergeReport {
    let mut report = MergeReport::default();

    for entity in fresh.iter_mut() {
        let Some(previous) = prior.get(&entity.key) else {
            continue;
        };
        merge_entity(entity, previous, &mut report);
    }

    info!("Merge complete: {}", report.summary());
    report
}

fn merge_entity(entity: &mut LocalizationEntity, previous: &LocalizationEntity, report: &mut MergeReport) {
    let same_source = entity.source == previous.source;

    for (language, target) in entity.target.iter_mut() {
        if !target.is_initial() {
            continue;
        }

        let carried = previous.target.get(language).filter(|prior| {
            same_source && prior.notes == target.notes && prior.effective_state() != SegmentState::Initial
        });

        match carried {
            Some(prior) => {
                debug!("Carrying {} [{}] forward", entity.key, language);
                *target = prior.clone();
                report.carried += 1;
            }
            None => {
                debug!("Prior translation of {} [{}] forfeited", entity.key, language);
                report.forfeited += 1;
            }
        }
    }
}

/// Merge the translations of `previous` into `current` and write them back.
pub fn merge_previous_document(current: &mut Xliff, previous: &Xliff) -> Result<MergeReport, EntityError> {
    let mut fresh = extract_entities(std::slice::from_ref(current))?;
    let prior = extract_entities(std::slice::from_ref(previous))?;
    let report = merge_prior(&mut fresh, &prior);
    if report.carried > 0 {
        write_back(&fresh, current);
    }
    Ok(report)
}
