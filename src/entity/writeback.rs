/*!
 * Write entity targets back into a document.
 */

use log::debug;

use super::{EntityDictionary, LocalizationTarget, entity_key};
use crate::xliff::{Content, Item, Unit, Xliff};

/// Outcome of a write-back
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteBackReport {
    /// Units whose segment or notes changed
    pub updated: usize,

    /// Units visited without a translated target to write
    pub skipped: usize,
}

/// Put the targets for the document's target language back into its units.
///
/// Units are found by the same key path the extractor uses. Nodes that do
/// not change are left as they are, so writing the same entities twice gives
/// the same document.
pub fn write_back(entities: &EntityDictionary, doc: &mut Xliff) -> WriteBackReport {
    let mut report = WriteBackReport::default();
    let Some(trg_lang) = doc.trg_lang.clone() else {
        return report;
    };

    for file in doc.files_mut() {
        let mut path = vec![file.id.clone()];
        write_items(&mut file.items, &mut path, &mut |path, unit| {
            let target = entities
                .get(&entity_key(path))
                .and_then(|entity| entity.target.get(&trg_lang))
                .filter(|target| target.value.is_some());
            match target {
                Some(target) => {
                    if apply_target(unit, target) {
                        debug!("Wrote {} [{}]", path.join("/"), trg_lang);
                        report.updated += 1;
                    }
                }
                None => report.skipped += 1,
            }
        });
    }
    report
}

fn write_items<F>(items: &mut [Item], path: &mut Vec<String>, visit: &mut F)
where
    F: FnMut(&[String], &mut Unit),
{
    for item in items.iter_mut() {
        match item {
            Item::Group(group) => {
                path.push(group.id.clone());
                write_items(&mut group.items, path, visit);
                path.pop();
            }
            Item::Unit(unit) => {
                path.push(unit.id.clone());
                visit(path.as_slice(), unit);
                path.pop();
            }
            Item::Other(_) => {}
        }
    }
}

// Returns true when anything in the unit changed
fn apply_target(unit: &mut Unit, target: &LocalizationTarget) -> bool {
    let mut changed = false;

    if unit.note_texts() != target.notes {
        unit.set_notes(&target.notes);
        changed = true;
    }

    let Some(segment) = unit.segment_mut() else {
        return changed;
    };
    if let Some(value) = &target.value {
        if segment.target().map(Content::to_text).as_deref() != Some(value.as_str()) {
            segment.set_target(Content::from_text(value));
            changed = true;
        }
    }
    if let Some(state) = target.state {
        if segment.state != Some(state) || segment.sub_state != target.sub_state {
            segment.state = Some(state);
            segment.sub_state = target.sub_state.clone();
            changed = true;
        }
    }
    changed
}
