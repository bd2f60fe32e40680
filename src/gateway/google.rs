use async_trait::async_trait;
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{header, Client};
use std::time::Duration;

use super::{RetryPolicy, TranslationGateway};
use crate::errors::GatewayError;

/// Translated text block of the mobile translator page
static RESULT_CONTAINER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<div[^>]*class="[^"]*result-container[^"]*"[^>]*>(.*?)</div>"#).unwrap()
});

/// Decimal and hex character references
static NUMERIC_ENTITY_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&#(x[0-9a-fA-F]+|[0-9]+);").unwrap()
});

/// Client for the Google web translator (mobile page, no API key)
#[derive(Debug)]
pub struct Google {
    /// HTTP client for requests
    client: Client,
    /// Full URL of the mobile translator page
    page_url: String,
    /// Largest accepted request in characters
    max_input_size: usize,
    /// Internal retry policy
    retry: RetryPolicy,
}

impl Google {
    /// Create a new Google web translator client
    pub fn new(
        endpoint: impl Into<String>,
        max_input_size: usize,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> anyhow::Result<Self> {
        let base = url::Url::parse(&endpoint.into())?;
        let page_url = base.join("m")?.to_string();

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_static("Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko)"),
        );

        Ok(Self {
            client: Client::builder().timeout(timeout).default_headers(headers).build()?,
            page_url,
            max_input_size,
            retry,
        })
    }

    async fn request(&self, text: &str, source_language: &str, target_language: &str) -> Result<String, GatewayError> {
        let response = self
            .client
            .get(&self.page_url)
            .query(&[("sl", source_language), ("tl", target_language), ("q", text)])
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
        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::RequestFailed(e.to_string()))?;

        if status.as_u16() == 429 {
            return Err(GatewayError::RateLimitExceeded("Too many requests".to_string()));
        }
        if !status.is_success() {
            return Err(GatewayError::ApiError {
                status_code: status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }

        Self::extract_text(&body)
    }

    /// Pull the translation out of the translator page
    pub fn extract_text(html: &str) -> Result<String, GatewayError> {
        let captures = RESULT_CONTAINER_REGEX
            .captures(html)
            .ok_or_else(|| GatewayError::ParseError("no result container in page".to_string()))?;
        Ok(decode_entities(&captures[1]))
    }
}

/// Decode the HTML entities the translator page emits
fn decode_entities(text: &str) -> String {
    let named = text
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ");

    let numeric = NUMERIC_ENTITY_REGEX.replace_all(&named, |caps: &regex::Captures| {
        let code = &caps[1];
        let value = match code.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => code.parse::<u32>().ok(),
        };
        value
            .and_then(char::from_u32)
            .map(|c| c.to_string())
            .unwrap_or_else(|| caps[0].to_string())
    });

    // Last, so "&amp;lt;" stays "&lt;"
    numeric.replace("&amp;", "&")
}

#[async_trait]
impl TranslationGateway for Google {
    fn name(&self) -> &str {
        "Google"
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
        debug!("Google request: {} characters", text.chars().count());
        self.retry
            .run("Google", move || self.request(text, source_language, target_language))
            .await
    }
}
