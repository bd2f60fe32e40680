use async_trait::async_trait;
use log::debug;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

use super::{RetryPolicy, TranslationGateway};
use crate::errors::GatewayError;

/// DeepL client for the v2 translate API
#[derive(Debug)]
pub struct DeepL {
    /// HTTP client for API requests
    client: Client,
    /// API key for authentication
    api_key: String,
    /// Full URL of the translate endpoint
    translate_url: String,
    /// Largest accepted request in characters
    max_input_size: usize,
    /// Internal retry policy
    retry: RetryPolicy,
}

/// DeepL translate response
#[derive(Debug, Deserialize)]
pub struct DeepLResponse {
    pub translations: Vec<DeepLTranslation>,
}

/// One translated text in a DeepL response
#[derive(Debug, Deserialize)]
pub struct DeepLTranslation {
    #[serde(default)]
    pub detected_source_language: Option<String>,
    pub text: String,
}

impl DeepL {
    /// Create a new DeepL client
    pub fn new(
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        max_input_size: usize,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> anyhow::Result<Self> {
        let endpoint = endpoint.into();
        let base = url::Url::parse(&endpoint)?;
        let translate_url = base.join("v2/translate")?.to_string();

        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            api_key: api_key.into(),
            translate_url,
            max_input_size,
            retry,
        })
    }

    async fn request(&self, text: &str, source_language: &str, target_language: &str) -> Result<String, GatewayError> {
        let source = source_language.to_uppercase();
        let target = target_language.to_uppercase();
        let params = [
            ("text", text),
            ("source_lang", source.as_str()),
            ("target_lang", target.as_str()),
            ("preserve_formatting", "1"),
        ];

        let response = self
            .client
            .post(&self.translate_url)
            .header("Authorization", format!("DeepL-Auth-Key {}", self.api_key))
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    GatewayError::ConnectionError(e.to_string())
                } else {
                    GatewayError::RequestFailed(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            return Err(Self::map_status(status, message));
        }

        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::RequestFailed(e.to_string()))?;
        Self::extract_text(&body)
    }

    fn map_status(status: StatusCode, message: String) -> GatewayError {
        match status.as_u16() {
            401 | 403 => GatewayError::AuthenticationError(message),
            429 => GatewayError::RateLimitExceeded(message),
            code => GatewayError::ApiError {
                status_code: code,
                message,
            },
        }
    }

    /// Pull the translated text out of a response body
    pub fn extract_text(body: &str) -> Result<String, GatewayError> {
        let response: DeepLResponse =
            serde_json::from_str(body).map_err(|e| GatewayError::ParseError(e.to_string()))?;
        if response.translations.is_empty() {
            return Err(GatewayError::ParseError("response holds no translations".to_string()));
        }
        Ok(response
            .translations
            .into_iter()
            .map(|t| t.text)
            .collect::<Vec<_>>()
            .join(""))
    }
}

#[async_trait]
impl TranslationGateway for DeepL {
    fn name(&self) -> &str {
        "DeepL"
    }

    fn max_input_size(&self) -> usize {
        self.max_input_size
    }

    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<String, GatewayError> {
        debug!("DeepL request: {} characters", text.chars().count());
        self.retry
            .run("DeepL", move || self.request(text, source_language, target_language))
            .await
    }
}
