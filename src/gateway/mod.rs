/*!
 * Translation gateways.
 *
 * A gateway is anything that can turn one block of text into its translation.
 * The pipeline only ever talks to the `TranslationGateway` trait, so the
 * backends below are interchangeable:
 * - `deepl`: DeepL HTTP API (small input bound)
 * - `google`: Google web translator (large input bound)
 * - `mock`: scripted gateway for tests
 */

use async_trait::async_trait;
use log::{error, info, warn};
use std::fmt::Debug;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::app_config::{BackendKind, Config, FallbackPolicy, TranslationCommonConfig};
use crate::errors::GatewayError;

pub mod deepl;
pub mod google;
pub mod mock;

/// Common trait for all translation backends
///
/// Implementations may retry internally; an `Err` means the backend gave up
/// on this request.
#[async_trait]
pub trait TranslationGateway: Send + Sync + Debug {
    /// Human readable backend name
    fn name(&self) -> &str;

    /// Largest request, in characters, the backend accepts
    fn max_input_size(&self) -> usize;

    /// Translate a block of text
    ///
    /// # Arguments
    /// * `text` - The text to translate
    /// * `source_language` - Two-letter source language code
    /// * `target_language` - Two-letter target language code
    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<String, GatewayError>;
}

/// Bounded retry with exponential backoff and fixed rate-limit waits
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Base backoff in milliseconds, doubled on each retry
    pub backoff_base_ms: u64,
    /// Wait after a rate-limit response
    pub rate_limit_delay_ms: u64,
    /// Rate-limit waits allowed before giving up
    pub max_rate_limit_waits: u32,
}

impl RetryPolicy {
    pub fn from_config(common: &TranslationCommonConfig) -> Self {
        Self {
            max_retries: common.retry_count,
            backoff_base_ms: common.retry_backoff_ms,
            rate_limit_delay_ms: common.rate_limit_delay_ms,
            max_rate_limit_waits: common.max_rate_limit_waits,
        }
    }

    /// Single attempt, no waiting
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            backoff_base_ms: 0,
            rate_limit_delay_ms: 0,
            max_rate_limit_waits: 0,
        }
    }

    fn backoff(&self, retry: u32) -> Duration {
        let factor = 1u64.checked_shl(retry).unwrap_or(u64::MAX);
        Duration::from_millis(self.backoff_base_ms.saturating_mul(factor))
    }

    /// Run `op` until it succeeds, fails permanently, or the budget is spent
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T, GatewayError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, GatewayError>>,
    {
        let mut retries = 0;
        let mut rate_limit_waits = 0;

        loop {
            let err = match op().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            // Rate limiting does not consume the retry budget
            if err.is_rate_limited() && rate_limit_waits < self.max_rate_limit_waits {
                rate_limit_waits += 1;
                warn!(
                    "Rate limited by {}. Waiting {} ms before retrying.",
                    label, self.rate_limit_delay_ms
                );
                tokio::time::sleep(Duration::from_millis(self.rate_limit_delay_ms)).await;
                continue;
            }

            if !err.is_transient() || retries >= self.max_retries {
                return Err(err);
            }

            error!(
                "{} request failed: {} - attempt {}/{}",
                label,
                err,
                retries + 1,
                self.max_retries + 1
            );
            tokio::time::sleep(self.backoff(retries)).await;
            retries += 1;
        }
    }
}

/// Build the gateway for a configured backend
pub fn build_gateway(config: &Config, kind: BackendKind) -> anyhow::Result<Arc<dyn TranslationGateway>> {
    let translation = &config.translation;
    let retry = RetryPolicy::from_config(&translation.common);
    let timeout = Duration::from_secs(translation.get_timeout_secs(kind));
    let max_input_size = translation.get_max_input_size(kind);

    let gateway: Arc<dyn TranslationGateway> = match kind {
        BackendKind::DeepL => Arc::new(deepl::DeepL::new(
            translation.get_api_key(kind),
            translation.get_endpoint(kind),
            max_input_size,
            timeout,
            retry,
        )?),
        BackendKind::Google => Arc::new(google::Google::new(
            translation.get_endpoint(kind),
            max_input_size,
            timeout,
            retry,
        )?),
    };
    Ok(gateway)
}

/// Tracks which backend is active for the current run
#[derive(Debug, Clone)]
pub struct BackendSelector {
    primary: Arc<dyn TranslationGateway>,
    fallback: Option<Arc<dyn TranslationGateway>>,
    policy: FallbackPolicy,
    on_fallback: bool,
    switches: usize,
}

impl BackendSelector {
    pub fn new(
        primary: Arc<dyn TranslationGateway>,
        fallback: Option<Arc<dyn TranslationGateway>>,
        policy: FallbackPolicy,
    ) -> Self {
        Self {
            primary,
            fallback,
            policy,
            on_fallback: false,
            switches: 0,
        }
    }

    /// Selector without a fallback
    pub fn single(gateway: Arc<dyn TranslationGateway>) -> Self {
        Self::new(gateway, None, FallbackPolicy::Sticky)
    }

    /// Build primary and fallback gateways from the configuration
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let translation = &config.translation;
        let primary = build_gateway(config, translation.backend)?;
        let fallback = match translation.fallback {
            Some(kind) if kind != translation.backend => Some(build_gateway(config, kind)?),
            _ => None,
        };
        Ok(Self::new(primary, fallback, translation.fallback_policy))
    }

    /// Currently active gateway
    pub fn active(&self) -> &Arc<dyn TranslationGateway> {
        match (&self.fallback, self.on_fallback) {
            (Some(fallback), true) => fallback,
            _ => &self.primary,
        }
    }

    /// Input bound of the active gateway
    pub fn max_input_size(&self) -> usize {
        self.active().max_input_size()
    }

    pub fn is_on_fallback(&self) -> bool {
        self.on_fallback
    }

    pub fn has_fallback(&self) -> bool {
        self.fallback.is_some()
    }

    /// Number of switches to the fallback during this run
    pub fn switches(&self) -> usize {
        self.switches
    }

    /// Switch to the fallback; returns false when there is nothing to switch to
    pub fn fail_over(&mut self) -> bool {
        if self.on_fallback || self.fallback.is_none() {
            return false;
        }
        self.on_fallback = true;
        self.switches += 1;
        info!("Switching to {} translator...", self.active().name());
        true
    }

    /// Go back to the primary backend
    pub fn reset(&mut self) {
        if self.on_fallback {
            self.on_fallback = false;
            info!("Returning to {} translator", self.primary.name());
        }
    }

    /// Called after every flushed chunk
    pub fn on_chunk_flushed(&mut self) {
        if self.policy == FallbackPolicy::PerChunk {
            self.reset();
        }
    }
}
