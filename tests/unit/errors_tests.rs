/*!
 * Tests for error types and conversions
 */

use locflow::errors::{AppError, DocumentError, EntityError, PlanningError, ProviderError, TranslationError};

#[test]
fn test_providerError_apiError_shouldDisplayStatusAndMessage() {
    let error = ProviderError::ApiError { status_code: 429, message: "Too many requests".to_string() };
    let display = format!("{}", error);
    assert!(display.contains("429"));
    assert!(display.contains("Too many requests"));
}

#[test]
fn test_providerError_streamError_shouldDisplayCorrectly() {
    let error = ProviderError::StreamError("no valid object".to_string());
    assert_eq!(error.to_string(), "Stream error: no valid object");
}

#[test]
fn test_planningError_tooLong_shouldShowKeyAndPreview() {
    let error = PlanningError::TooLong { key: "a1b2c3d4e5f6".to_string(), preview: "Hello World Hello Wo".to_string() };
    let display = error.to_string();
    assert!(display.contains("a1b2c3d4e5f6"));
    assert!(display.contains("too long"));
    assert!(display.ends_with("Hello World Hello Wo..."));
}

#[test]
fn test_entityError_keyCollision_shouldNameBothPaths() {
    let error = EntityError::KeyCollision {
        key: "000000000000".to_string(),
        existing: "app/home/title".to_string(),
        incoming: "app/settings/title".to_string(),
    };
    let display = error.to_string();
    assert!(display.contains("app/home/title"));
    assert!(display.contains("app/settings/title"));
}

#[test]
fn test_translationError_fromProviderError_shouldWrap() {
    let error: TranslationError = ProviderError::ConnectionError("refused".to_string()).into();
    assert!(matches!(error, TranslationError::Provider(ProviderError::ConnectionError(_))));
    assert!(error.to_string().contains("refused"));

    let error: TranslationError = PlanningError::TooLong { key: "k".to_string(), preview: "p".to_string() }.into();
    assert!(matches!(error, TranslationError::Planning(_)));
}

#[test]
fn test_appError_conversions_shouldKeepMessages() {
    let error: AppError = DocumentError::Structure("Expected <xliff> root".to_string()).into();
    assert!(matches!(error, AppError::Document(_)));
    assert!(error.to_string().contains("Expected <xliff> root"));

    let error: AppError = EntityError::Document(DocumentError::Xml("unclosed element <unit>".to_string())).into();
    assert!(matches!(error, AppError::Entity(_)));

    let error: AppError = TranslationError::Review("stdin closed".to_string()).into();
    assert!(error.to_string().contains("stdin closed"));

    let error: AppError = std::io::Error::new(std::io::ErrorKind::NotFound, "conf.json").into();
    assert!(matches!(error, AppError::File(_)));

    let error: AppError = anyhow::anyhow!("something else").into();
    assert!(matches!(error, AppError::Unknown(_)));
}
