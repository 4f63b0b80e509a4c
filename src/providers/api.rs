/*!
 * HTTP client for the translation service.
 *
 * `GET {base}/config` returns the model configuration and
 * `POST {base}/localize` streams newline-delimited JSON envelopes.
 */

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream;
use log::{debug, error};
use reqwest::Client;
use url::Url;

use super::ndjson::NdjsonDecoder;
use super::{EnvelopeStream, LocalizeRequest, Translator};
use crate::app_config::LlmTranslatorConfig;
use crate::errors::ProviderError;

/// Client for the translation service API
#[derive(Debug, Clone)]
pub struct ApiTranslator {
    /// HTTP client for API requests
    client: Client,
    /// Service root, always ending with a slash
    base_url: Url,
}

impl ApiTranslator {
    /// Create a client for `base_url` with a request timeout
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, ProviderError> {
        let mut base_url = Url::parse(base_url)
            .map_err(|e| ProviderError::RequestFailed(format!("Invalid base URL {}: {}", base_url, e)))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ProviderError::ConnectionError(e.to_string()))?;

        Ok(Self { client, base_url })
    }

    /// Absolute URL of an endpoint below the base
    pub fn endpoint(&self, path: &str) -> Result<Url, ProviderError> {
        self.base_url
            .join(path)
            .map_err(|e| ProviderError::RequestFailed(format!("Invalid endpoint {}: {}", path, e)))
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "Failed to get error response text".to_string());
        error!("Translation service error ({}): {}", status, message);
        Err(ProviderError::ApiError { status_code: status.as_u16(), message })
    }
}

#[async_trait]
impl Translator for ApiTranslator {
    async fn fetch_config(&self) -> Result<LlmTranslatorConfig, ProviderError> {
        let url = self.endpoint("config")?;
        debug!("Fetching translator configuration from {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ProviderError::ConnectionError(e.to_string()))?;
        let response = Self::check_status(response).await?;

        response
            .json::<LlmTranslatorConfig>()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))
    }

    async fn localize(&self, request: &LocalizeRequest) -> Result<EnvelopeStream, ProviderError> {
        let url = self.endpoint("localize")?;
        debug!(
            "Requesting {} entries into {:?} from {}",
            request.contents.len(),
            request.target_languages,
            url
        );

        let response = self
            .client
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|e| ProviderError::ConnectionError(e.to_string()))?;
        let response = Self::check_status(response).await?;

        let body = response.bytes_stream().boxed();
        let envelopes = stream::unfold(Some((body, NdjsonDecoder::new())), |state| async move {
            let Some((mut body, mut decoder)) = state else {
                return None;
            };
            match body.next().await {
                Some(Ok(chunk)) => {
                    let items: Vec<_> = decoder.push(&chunk).into_iter().map(Ok).collect();
                    Some((stream::iter(items), Some((body, decoder))))
                }
                Some(Err(e)) => {
                    let items = vec![Err(ProviderError::ConnectionError(e.to_string()))];
                    Some((stream::iter(items), None))
                }
                None => {
                    let items: Vec<_> = decoder.finish().into_iter().map(Ok).collect();
                    Some((stream::iter(items), None))
                }
            }
        })
        .flatten()
        .boxed();

        Ok(envelopes)
    }
}
