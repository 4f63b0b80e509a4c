/*!
 * Flatten documents into an entity dictionary.
 */

use log::{debug, warn};

use super::{EntityDictionary, LocalizationEntity, LocalizationTarget, SourceText};
use crate::errors::EntityError;
use crate::xliff::{Item, Unit, Xliff};

/// Extract every unit of `docs` into one dictionary.
///
/// Documents contributing the same key merge their target maps; a later
/// document wins for the same language.
pub fn extract_entities(docs: &[Xliff]) -> Result<EntityDictionary, EntityError> {
    let mut dictionary = EntityDictionary::new();
    for doc in docs {
        extract_into(doc, &mut dictionary)?;
    }
    Ok(dictionary)
}

/// Extract a single document into an existing dictionary
pub fn extract_into(doc: &Xliff, dictionary: &mut EntityDictionary) -> Result<(), EntityError> {
    let Some(trg_lang) = doc.trg_lang.as_deref() else {
        warn!("Skipping document without target language (source {})", doc.src_lang);
        return Ok(());
    };

    for file in doc.files() {
        let mut path = vec![file.id.clone()];
        visit_items(&file.items, &mut path, &mut |path, unit| {
            if let Some(entity) = unit_entity(path, unit, &doc.src_lang, trg_lang) {
                dictionary.insert(entity)?;
            }
            Ok(())
        })?;
    }
    Ok(())
}

/// Walk groups and units depth-first, keeping the key path up to date.
///
/// The callback receives the full path of each unit, its own id included.
pub(crate) fn visit_items<F>(items: &[Item], path: &mut Vec<String>, visit: &mut F) -> Result<(), EntityError>
where
    F: FnMut(&[String], &Unit) -> Result<(), EntityError>,
{
    for item in items {
        match item {
            Item::Group(group) => {
                path.push(group.id.clone());
                let result = visit_items(&group.items, path, visit);
                path.pop();
                result?;
            }
            Item::Unit(unit) => {
                path.push(unit.id.clone());
                let result = visit(path.as_slice(), unit);
                path.pop();
                result?;
            }
            Item::Other(_) => {}
        }
    }
    Ok(())
}

fn unit_entity(path: &[String], unit: &Unit, src_lang: &str, trg_lang: &str) -> Option<LocalizationEntity> {
    let Some(segment) = unit.segment() else {
        warn!("Skipping unit {} without segment", path.join("/"));
        return None;
    };
    let Some(source) = segment.source() else {
        warn!("Skipping unit {} without source", path.join("/"));
        return None;
    };

    let target = LocalizationTarget {
        value: segment.target().map(|content| content.to_text()),
        state: segment.state,
        sub_state: segment.sub_state.clone(),
        notes: unit.note_texts(),
    };
    let entity = LocalizationEntity::new(
        path.to_vec(),
        SourceText { code: src_lang.to_string(), value: source.to_text() },
    )
    .with_target(trg_lang, target);

    debug!("Extracted {} as {}", entity.path_display(), entity.key);
    Some(entity)
}
