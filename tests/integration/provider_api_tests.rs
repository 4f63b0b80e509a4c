/*!
 * Tests for the HTTP translation client against a local service stub
 */

use futures::StreamExt;
use parking_lot::Mutex;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use locflow::errors::ProviderError;
use locflow::providers::api::ApiTranslator;
use locflow::providers::{LocalizeRequest, StreamEnvelope, Translator};
use locflow::translation::batch::BatchContent;
use locflow::translation::{PipelineConfig, TranslationPipeline};

use crate::common::{FixedTokenCounter, entity_with_key};

const CONFIG_BODY: &str =
    r#"{"maxOutputTokens":1024,"buffer":0.2,"maxRetry":2,"tokenizer":"openai","tokenizerModel":"gpt-4"}"#;

/// Minimal HTTP/1.1 stub of the translation service
struct ServiceStub {
    base_url: String,
    requests: Arc<Mutex<Vec<(String, String)>>>,
}

impl ServiceStub {
    async fn start(fail_localize: bool) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&requests);

        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                let recorded = Arc::clone(&recorded);
                tokio::spawn(async move { handle(socket, recorded, fail_localize).await });
            }
        });

        Self { base_url: format!("http://{}/api/v1", address), requests }
    }

    fn localize_bodies(&self) -> Vec<String> {
        self.requests
            .lock()
            .iter()
            .filter(|(path, _)| path.ends_with("/localize"))
            .map(|(_, body)| body.clone())
            .collect()
    }
}

async fn handle(mut socket: TcpStream, recorded: Arc<Mutex<Vec<(String, String)>>>, fail_localize: bool) {
    let Some((path, body)) = read_request(&mut socket).await else {
        return;
    };
    recorded.lock().push((path.clone(), body.clone()));

    let (status, content_type, payload) = match path.as_str() {
        "/api/v1/config" => (200, "application/json", CONFIG_BODY.to_string()),
        "/api/v1/localize" if fail_localize => (500, "text/plain", "model overloaded".to_string()),
        "/api/v1/localize" => (200, "application/x-ndjson", localize_stream(&body)),
        _ => (404, "text/plain", "not found".to_string()),
    };

    let response = format!(
        "HTTP/1.1 {} Stub\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        content_type,
        payload.len(),
        payload
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}

async fn read_request(socket: &mut TcpStream) -> Option<(String, String)> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let read = socket.read(&mut chunk).await.ok()?;
        if read == 0 {
            return None;
        }
        buffer.extend_from_slice(&chunk[..read]);
        if let Some(position) = buffer.windows(4).position(|window| window == b"\r\n\r\n") {
            break position;
        }
    };

    let head = String::from_utf8_lossy(&buffer[..header_end]).into_owned();
    let length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    let body_start = header_end + 4;
    while buffer.len() < body_start + length {
        let read = socket.read(&mut chunk).await.ok()?;
        if read == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..read]);
    }

    let path = head.lines().next()?.split_whitespace().nth(1)?.to_string();
    let end = buffer.len().min(body_start + length);
    let body = String::from_utf8_lossy(&buffer[body_start..end]).into_owned();
    Some((path, body))
}

/// Envelopes for a request: an empty snapshot, an unknown envelope, the full
/// snapshot split over two lines, then the usage
fn localize_stream(body: &str) -> String {
    let request: LocalizeRequest = serde_json::from_str(body).unwrap();
    let mut object = Map::new();
    for content in &request.contents {
        let entry: Map<String, Value> = request
            .target_languages
            .iter()
            .map(|language| (language.clone(), Value::String(format!("{}:{}", language, content.source))))
            .collect();
        object.insert(content.key.clone(), Value::Object(entry));
    }

    let full = serde_json::to_string_pretty(&json!({ "type": "object", "object": object })).unwrap();
    let (first, rest) = full.split_once('\n').unwrap();
    let mut stream = String::new();
    stream.push_str(&json!({ "type": "object", "object": {} }).to_string());
    stream.push('\n');
    stream.push_str(&json!({ "type": "heartbeat" }).to_string());
    stream.push('\n');
    stream.push_str(first);
    stream.push('\n');
    stream.push_str(&rest.replace('\n', " "));
    stream.push('\n');
    stream.push_str(
        &json!({ "type": "finish", "usage": { "promptTokens": 12, "completionTokens": 8, "totalTokens": 20 } })
            .to_string(),
    );
    stream.push('\n');
    stream
}

fn request() -> LocalizeRequest {
    LocalizeRequest {
        provider: "openai".to_string(),
        context: Some("A weather app".to_string()),
        source_language: "en".to_string(),
        target_languages: vec!["de".to_string(), "fr".to_string()],
        contents: vec![BatchContent { key: "k1".to_string(), source: "Sunny".to_string(), notes: vec![] }],
    }
}

#[tokio::test]
async fn test_fetchConfig_shouldReadServiceConfiguration() {
    let stub = ServiceStub::start(false).await;
    let translator = ApiTranslator::new(&stub.base_url, 5).unwrap();

    let config = translator.fetch_config().await.unwrap();

    assert_eq!(config.max_output_tokens, 1024);
    assert_eq!(config.max_retry, 2);
    assert_eq!(config.tokenizer_model, "gpt-4");
    assert!(config.validate().is_ok());
}

#[tokio::test]
async fn test_localize_shouldStreamDecodedEnvelopes() {
    let stub = ServiceStub::start(false).await;
    let translator = ApiTranslator::new(&stub.base_url, 5).unwrap();

    let stream = translator.localize(&request()).await.unwrap();
    let envelopes: Vec<StreamEnvelope> = stream.map(|item| item.unwrap()).collect().await;

    assert_eq!(envelopes.len(), 3);
    let StreamEnvelope::Object { object } = &envelopes[1] else {
        panic!("expected the full snapshot second, got {:?}", envelopes[1]);
    };
    assert_eq!(object["k1"]["fr"], "fr:Sunny");
    assert!(matches!(envelopes[2], StreamEnvelope::Finish { usage } if usage.total_tokens == 20));

    let body: Value = serde_json::from_str(&stub.localize_bodies()[0]).unwrap();
    assert_eq!(body["sourceLanguage"], "en");
    assert_eq!(body["targetLanguages"], json!(["de", "fr"]));
    assert_eq!(body["context"], "A weather app");
}

#[tokio::test]
async fn test_localize_withServerError_shouldReturnApiError() {
    let stub = ServiceStub::start(true).await;
    let translator = ApiTranslator::new(&stub.base_url, 5).unwrap();

    let result = translator.localize(&request()).await;

    match result {
        Err(ProviderError::ApiError { status_code, message }) => {
            assert_eq!(status_code, 500);
            assert_eq!(message, "model overloaded");
        }
        Err(other) => panic!("expected an API error, got {}", other),
        Ok(_) => panic!("expected an API error"),
    }
}

#[tokio::test]
async fn test_pipeline_overHttp_shouldTranslateAndRetryPerServiceConfig() {
    let stub = ServiceStub::start(false).await;
    let translator = ApiTranslator::new(&stub.base_url, 5).unwrap();
    let no_notes: &[&str] = &[];
    let entities = [entity_with_key("sky", "Cloudy", &[("de", no_notes), ("fr", no_notes)])]
        .into_iter()
        .collect();

    let result = TranslationPipeline::new(Arc::new(translator), PipelineConfig::default())
        .with_token_counter(Arc::new(FixedTokenCounter))
        .run(entities, None, None)
        .await
        .unwrap();

    let sky = result.entities.get("sky").unwrap();
    assert_eq!(sky.target["de"].value.as_deref(), Some("de:Cloudy"));
    assert_eq!(result.usage.total_tokens, 20);

    let failing = ServiceStub::start(true).await;
    let translator = ApiTranslator::new(&failing.base_url, 5).unwrap();
    let entities = [entity_with_key("sky", "Cloudy", &[("de", no_notes)])].into_iter().collect();

    let result = TranslationPipeline::new(Arc::new(translator), PipelineConfig::default().with_retry_backoff_ms(1))
        .with_token_counter(Arc::new(FixedTokenCounter))
        .run(entities, None, None)
        .await
        .unwrap();

    assert_eq!(result.failed_batches.len(), 1);
    assert_eq!(failing.localize_bodies().len(), 2);
}
