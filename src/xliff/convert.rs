/*!
 * Conversion between the legacy and current dialects.
 *
 * Units keep their id, source, target and notes; groups keep their nesting.
 * Anything the other dialect cannot express is dropped with a warning.
 */

use log::warn;

use super::legacy::{LegacyFile, LegacyGroup, LegacyItem, LegacyXliff, TransUnit};
use super::model::{File, Group, Item, Notes, Segment, SegmentState, Unit, UnitPart, Xliff};

/// Convert a legacy document to the current dialect.
///
/// Languages come from the first legacy file; the arguments are used when
/// the document has no files or the attributes are missing.
pub fn to_current(legacy: &LegacyXliff, src_lang: &str, trg_lang: Option<&str>) -> Xliff {
    let first = legacy.files.first();
    let src = first
        .and_then(|file| file.source_language.clone())
        .unwrap_or_else(|| src_lang.to_string());
    let trg = first
        .and_then(|file| file.target_language.clone())
        .or_else(|| trg_lang.map(str::to_string));

    let mut doc = Xliff::new(src, trg);
    for (index, legacy_file) in legacy.files.iter().enumerate() {
        let id = legacy_file.original.clone().unwrap_or_else(|| {
            let generated = format!("f{}", index + 1);
            warn!("Legacy file without original, using id {}", generated);
            generated
        });
        let mut file = File::new(id);
        file.original = legacy_file.original.clone();
        file.items = items_to_current(&legacy_file.body);
        doc = doc.with_file(file);
    }
    doc
}

fn items_to_current(items: &[LegacyItem]) -> Vec<Item> {
    let mut converted = Vec::new();
    for item in items {
        match item {
            LegacyItem::Group(group) => {
                let Some(id) = &group.id else {
                    warn!("Dropping legacy <group> without id");
                    continue;
                };
                let mut current = Group::new(id.clone());
                current.items = items_to_current(&group.items);
                converted.push(Item::Group(current));
            }
            LegacyItem::TransUnit(unit) => {
                if let Some(unit) = unit_to_current(unit) {
                    converted.push(Item::Unit(unit));
                }
            }
            LegacyItem::BinUnit(element) => {
                warn!("Dropping <bin-unit> {}", element.attribute("id").unwrap_or("without id"));
            }
        }
    }
    converted
}

fn unit_to_current(legacy: &TransUnit) -> Option<Unit> {
    let Some(id) = &legacy.id else {
        warn!("Dropping <trans-unit> without id");
        return None;
    };
    let Some(source) = &legacy.source else {
        warn!("Dropping <trans-unit> {} without source", id);
        return None;
    };

    let mut unit = Unit::new(id.clone());
    if !legacy.notes.is_empty() {
        unit.parts.push(UnitPart::Notes(Notes::from_texts(legacy.notes.iter().cloned())));
    }
    let segment = match &legacy.target {
        Some(target) => Segment::new(source.clone()).with_target(target.clone()),
        None => Segment::new(source.clone()).with_state(SegmentState::Initial),
    };
    Some(unit.with_segment(segment))
}

/// Convert a current-dialect document to the legacy dialect
pub fn to_legacy(doc: &Xliff) -> LegacyXliff {
    let mut legacy = LegacyXliff::new();
    for file in doc.files() {
        legacy.files.push(LegacyFile {
            original: Some(file.id.clone()),
            source_language: Some(doc.src_lang.clone()),
            target_language: doc.trg_lang.clone(),
            datatype: Some("plaintext".to_string()),
            attributes: Vec::new(),
            header: None,
            body: items_to_legacy(&file.items),
        });
    }
    legacy
}

fn items_to_legacy(items: &[Item]) -> Vec<LegacyItem> {
    let mut converted = Vec::new();
    for item in items {
        match item {
            Item::Group(group) => converted.push(LegacyItem::Group(LegacyGroup {
                id: Some(group.id.clone()),
                attributes: Vec::new(),
                items: items_to_legacy(&group.items),
            })),
            Item::Unit(unit) => {
                let segments = unit
                    .parts
                    .iter()
                    .filter(|part| matches!(part, UnitPart::Segment(_)))
                    .count();
                let Some(segment) = unit.segment() else {
                    warn!("Dropping unit {} without segment", unit.id);
                    continue;
                };
                let Some(source) = segment.source() else {
                    warn!("Dropping unit {} without source", unit.id);
                    continue;
                };
                if segments > 1 {
                    warn!("Unit {} has {} segments, keeping the first", unit.id, segments);
                }
                converted.push(LegacyItem::TransUnit(TransUnit {
                    id: Some(unit.id.clone()),
                    attributes: Vec::new(),
                    source: Some(source.clone()),
                    target: segment.target().cloned(),
                    notes: unit.note_texts(),
                }));
            }
            Item::Other(_) => {}
        }
    }
    converted
}
