/*!
 * Tests for the document model and dialect conversion
 */

use locflow::xliff::convert::{to_current, to_legacy};
use locflow::xliff::{DocumentVersion, Item, SegmentState, detect_version, parse_legacy_xliff, parse_xliff};

use crate::common::{FR_DOCUMENT, LEGACY_DOCUMENT};

#[test]
fn test_parseXliff_withSampleDocument_shouldRoundTripBytes() {
    let doc = parse_xliff(FR_DOCUMENT).expect("parse");
    assert_eq!(doc.src_lang, "en");
    assert_eq!(doc.trg_lang.as_deref(), Some("fr"));
    assert_eq!(doc.to_xml_string(), FR_DOCUMENT);
}

#[test]
fn test_parseXliff_withUnknownNodes_shouldKeepThem() {
    let text = r#"<?xml version="1.0" encoding="UTF-8"?>
<!-- generated -->
<xliff version="2.0" srcLang="en" trgLang="fr" xmlns="urn:oasis:names:tc:xliff:document:2.0" xmlns:mda="urn:oasis:names:tc:xliff:metadata:2.0">
  <file id="f">
    <mda:metadata><mda:metaGroup><mda:meta type="tool">x</mda:meta></mda:metaGroup></mda:metadata>
    <unit id="u" translate="no">
      <segment id="s1" state="translated" subState="mt:raw">
        <source>A &amp; B</source>
        <target>A &amp; B</target>
      </segment>
      <ignorable>
        <source> </source>
      </ignorable>
    </unit>
  </file>
</xliff>
"#;
    let doc = parse_xliff(text).expect("parse");
    assert_eq!(doc.to_xml_string(), text);

    let file = doc.files().next().expect("file");
    let unit = file
        .items
        .iter()
        .find_map(|item| match item {
            Item::Unit(unit) => Some(unit),
            _ => None,
        })
        .expect("unit");
    let segment = unit.segment().expect("segment");
    assert_eq!(segment.state, Some(SegmentState::Translated));
    assert_eq!(segment.sub_state.as_deref(), Some("mt:raw"));
    assert_eq!(segment.source().expect("source").to_text(), "A & B");
}

#[test]
fn test_detectVersion_withBothDialects_shouldTellThemApart() {
    assert_eq!(detect_version(LEGACY_DOCUMENT).expect("legacy"), DocumentVersion::Legacy);
    assert_eq!(detect_version(FR_DOCUMENT).expect("current"), DocumentVersion::Current);
}

#[test]
fn test_toCurrent_withLegacyDocument_shouldMapUnitsAndDropBinUnits() {
    let legacy = parse_legacy_xliff(LEGACY_DOCUMENT).expect("parse");
    let doc = to_current(&legacy, "de", Some("de"));

    // declared languages win over the arguments
    assert_eq!(doc.src_lang, "en");
    assert_eq!(doc.trg_lang.as_deref(), Some("ja"));

    let file = doc.files().next().expect("file");
    assert_eq!(file.id, "Main.strings");
    assert_eq!(file.items.len(), 2);

    let Item::Group(group) = &file.items[0] else {
        panic!("expected the menu group first");
    };
    assert_eq!(group.id, "menu");
    let Item::Unit(open) = &group.items[0] else {
        panic!("expected the open unit");
    };
    assert_eq!(open.note_texts(), vec!["Menu item"]);
    let segment = open.segment().expect("segment");
    assert_eq!(segment.target().expect("target").to_text(), "開く");
    assert_eq!(segment.state, None);
    assert_eq!(segment.effective_state(), SegmentState::Translated);

    let Item::Unit(quit) = &file.items[1] else {
        panic!("expected the quit unit");
    };
    assert_eq!(quit.segment().expect("segment").state, Some(SegmentState::Initial));
}

#[test]
fn test_toLegacy_thenToCurrent_shouldKeepIdsNotesAndMarkup() {
    let doc = parse_xliff(FR_DOCUMENT).expect("parse");
    let legacy_text = to_legacy(&doc).to_xml_string();
    assert!(legacy_text.contains("version=\"1.2\""));
    assert!(legacy_text.contains("datatype=\"plaintext\""));

    let legacy = parse_legacy_xliff(&legacy_text).expect("reparse");
    let back = to_current(&legacy, "en", Some("fr"));

    let file = back.files().next().expect("file");
    assert_eq!(file.id, "app");
    let Item::Group(group) = &file.items[0] else {
        panic!("group first");
    };
    let Item::Unit(welcome) = &group.items[0] else {
        panic!("welcome unit");
    };
    assert_eq!(welcome.id, "welcome");
    assert_eq!(welcome.note_texts(), vec!["Shown at launch"]);
    assert_eq!(
        welcome.segment().expect("segment").source().expect("source").to_text(),
        r#"Welcome to <ph id="1" disp="app"/>!"#
    );
}
