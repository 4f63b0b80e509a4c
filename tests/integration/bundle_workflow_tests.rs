/*!
 * End-to-end tests for bundle translation, merge and conversion
 */

use std::fs;
use std::sync::Arc;

use locflow::app_config::Config;
use locflow::app_controller::Controller;
use locflow::providers::mock::MockTranslator;
use locflow::xliff::{DocumentVersion, detect_version, parse_legacy_xliff, parse_xliff};

use crate::common::{
    FR_DOCUMENT, FixedTokenCounter, LEGACY_DOCUMENT, create_sample_bundle, create_temp_dir, create_test_file,
    init_logging,
};

fn controller() -> Controller {
    Controller::with_config(Config::default())
        .unwrap()
        .with_token_counter(Arc::new(FixedTokenCounter))
}

#[tokio::test]
async fn test_translateBundle_withWorkingTranslator_shouldWriteTargets() {
    init_logging();
    let dir = create_temp_dir().unwrap();
    let bundle = create_sample_bundle(dir.path()).unwrap();
    let translator = MockTranslator::working();

    let report = controller()
        .translate_bundle(&bundle, Arc::new(translator.clone()), None)
        .await
        .unwrap();

    assert_eq!(report.documents, 2);
    assert_eq!(report.written, 2);
    assert_eq!(report.translated_units, 5);
    assert_eq!(report.untranslated, 0);
    assert_eq!(report.failed_batches, 0);

    let fr = fs::read_to_string(bundle.join("fr.lproj/Localizable.xliff")).unwrap();
    assert!(fr.contains(r#"<target>[fr] Welcome to <ph id="1" disp="app"/>!</target>"#));
    assert!(fr.contains("<target>[fr] Cancel</target>"));
    // the final slot is left alone
    assert!(fr.contains(r#"<segment state="final">"#));
    assert!(fr.contains("<target>Enregistrer</target>"));
    assert!(!fr.contains("[fr] Save"));

    let de = parse_xliff(&fs::read_to_string(bundle.join("de.lproj/Localizable.xliff")).unwrap()).unwrap();
    let text = de.to_xml_string();
    assert_eq!(text.matches(r#"<segment state="translated">"#).count(), 3);
    assert!(text.contains("<target>[de] Save</target>"));
    assert!(text.contains("<note>Shown at launch</note>"));
}

#[tokio::test]
async fn test_translateBundle_whenNothingIsPending_shouldNotCallTranslator() {
    let dir = create_temp_dir().unwrap();
    let bundle = create_sample_bundle(dir.path()).unwrap();
    let translator = MockTranslator::working();
    let controller = controller();

    controller.translate_bundle(&bundle, Arc::new(translator.clone()), None).await.unwrap();
    let requests = translator.request_count();
    let before = fs::read_to_string(bundle.join("fr.lproj/Localizable.xliff")).unwrap();

    let report = controller
        .translate_bundle(&bundle, Arc::new(translator.clone()), None)
        .await
        .unwrap();

    assert_eq!(report.documents, 2);
    assert_eq!(report.written, 0);
    assert_eq!(translator.request_count(), requests);
    assert_eq!(fs::read_to_string(bundle.join("fr.lproj/Localizable.xliff")).unwrap(), before);
}

#[tokio::test]
async fn test_translateBundle_withFailingTranslator_shouldLeaveDocumentsUntouched() {
    let dir = create_temp_dir().unwrap();
    let bundle = create_sample_bundle(dir.path()).unwrap();
    let mut config = Config::default();
    config.translator.max_retry = Some(1);
    config.translator.retry_backoff_ms = 1;
    let controller = Controller::with_config(config)
        .unwrap()
        .with_token_counter(Arc::new(FixedTokenCounter));

    let report = controller
        .translate_bundle(&bundle, Arc::new(MockTranslator::failing()), None)
        .await
        .unwrap();

    assert_eq!(report.failed_batches, 2);
    assert_eq!(report.untranslated, 3);
    assert_eq!(report.written, 0);
    assert_eq!(fs::read_to_string(bundle.join("fr.lproj/Localizable.xliff")).unwrap(), FR_DOCUMENT);
}

#[tokio::test]
async fn test_translateBundle_withLegacyDocument_shouldSkipIt() {
    let dir = create_temp_dir().unwrap();
    let bundle = create_sample_bundle(dir.path()).unwrap();
    create_test_file(&bundle, "ja.lproj/Main.xliff", LEGACY_DOCUMENT).unwrap();

    let report = controller()
        .translate_bundle(&bundle, Arc::new(MockTranslator::working()), None)
        .await
        .unwrap();

    assert_eq!(report.documents, 2);
    assert_eq!(fs::read_to_string(bundle.join("ja.lproj/Main.xliff")).unwrap(), LEGACY_DOCUMENT);
}

#[test]
fn test_mergeBundles_withPreviousBundle_shouldCarryMatchingTranslations() {
    let dir = create_temp_dir().unwrap();
    let bundle = create_sample_bundle(&dir.path().join("current")).unwrap();
    let previous = dir.path().join("previous");
    let previous_fr = FR_DOCUMENT.replace(
        "<source>Cancel</source>",
        "<source>Cancel</source>\n          <target>Annuler</target>",
    );
    create_test_file(&previous, "fr.lproj/Localizable.xliff", &previous_fr).unwrap();

    let summary = controller().merge_bundles(&bundle, &previous).unwrap();

    assert_eq!(summary.merged_documents, 1);
    assert_eq!(summary.carried, 1);
    assert_eq!(summary.forfeited, 1);
    let fr = fs::read_to_string(bundle.join("fr.lproj/Localizable.xliff")).unwrap();
    assert!(fr.contains("<target>Annuler</target>"));
}

#[test]
fn test_mergeBundles_withMissingPreviousBundle_shouldFail() {
    let dir = create_temp_dir().unwrap();
    let bundle = create_sample_bundle(dir.path()).unwrap();
    assert!(controller().merge_bundles(&bundle, &dir.path().join("missing")).is_err());
}

#[test]
fn test_convertFile_betweenDialects_shouldKeepUnits() {
    let dir = create_temp_dir().unwrap();
    let legacy_path = create_test_file(dir.path(), "legacy.xliff", LEGACY_DOCUMENT).unwrap();
    let current_path = dir.path().join("out/current.xliff");
    let back_path = dir.path().join("back.xliff");
    let controller = controller();

    controller
        .convert_file(&legacy_path, &current_path, DocumentVersion::Current, None, None)
        .unwrap();
    let current_text = fs::read_to_string(&current_path).unwrap();
    assert_eq!(detect_version(&current_text).unwrap(), DocumentVersion::Current);
    let current = parse_xliff(&current_text).unwrap();
    assert_eq!(current.trg_lang.as_deref(), Some("ja"));
    assert!(current_text.contains(r#"<unit id="open">"#));
    assert!(!current_text.contains("bin-unit"));

    controller
        .convert_file(&current_path, &back_path, DocumentVersion::Legacy, None, None)
        .unwrap();
    let legacy = parse_legacy_xliff(&fs::read_to_string(&back_path).unwrap()).unwrap();
    assert_eq!(legacy.files.len(), 1);
    assert_eq!(legacy.files[0].target_language.as_deref(), Some("ja"));
}

#[test]
fn test_controller_withInvalidConfig_shouldFail() {
    let mut config = Config::default();
    config.translator.base_url = "localhost:3000".to_string();
    assert!(Controller::with_config(config).is_err());
}

#[test]
fn test_config_saveThenLoad_shouldRoundTrip() {
    let dir = create_temp_dir().unwrap();
    let path = dir.path().join("conf.json");
    let mut config = Config::default();
    config.global_context = Some("A note taking app".to_string());
    config.translator.max_retry = Some(3);

    config.save(&path).unwrap();

    assert_eq!(Config::load_or_create(&path).unwrap(), config);
}
