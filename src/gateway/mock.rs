/*!
 * Mock gateway implementations for testing.
 *
 * This module provides a scripted gateway that simulates different backend
 * behaviors without any network access:
 * - `MockGateway::uppercase()` - "Translates" by uppercasing, keeps separators
 * - `MockGateway::echo()` - Returns the input unchanged
 * - `MockGateway::failing()` - Always fails with an error
 * - `MockGateway::fail_first(n)` - Fails the first `n` requests, then uppercases
 * - `MockGateway::injecting(n)` - Breaks the active separator in the first `n` responses
 */

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::app_config::default_separators;
use crate::errors::GatewayError;
use crate::gateway::TranslationGateway;

/// Behavior mode for the mock gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockBehavior {
    /// Uppercase the text
    Uppercase,
    /// Return the text unchanged
    Echo,
    /// Always fail
    Failing,
    /// Fail the first `failures` requests, uppercase afterwards
    FailFirst { failures: usize },
    /// Echo, but inject an extra separator into the first `times` responses
    InjectSeparator { times: usize },
}

/// Mock gateway for testing pipeline behavior
#[derive(Debug)]
pub struct MockGateway {
    /// Behavior mode
    behavior: MockBehavior,
    /// Reported backend name
    name: String,
    /// Reported input bound
    max_input_size: usize,
    /// Separators the injector looks for
    separators: Vec<String>,
    /// Request counter, shared between clones
    request_count: Arc<AtomicUsize>,
    /// Every request text received, shared between clones
    requests: Arc<Mutex<Vec<String>>>,
    /// Custom response generator (optional)
    custom_response: Option<fn(&str) -> String>,
}

impl MockGateway {
    /// Create a new mock gateway with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            name: "Mock".to_string(),
            max_input_size: 1500,
            separators: default_separators(),
            request_count: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
            custom_response: None,
        }
    }

    pub fn uppercase() -> Self {
        Self::new(MockBehavior::Uppercase)
    }

    pub fn echo() -> Self {
        Self::new(MockBehavior::Echo)
    }

    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    pub fn fail_first(failures: usize) -> Self {
        Self::new(MockBehavior::FailFirst { failures })
    }

    /// Inject the active separator into the first `times` responses
    pub fn injecting(times: usize) -> Self {
        Self::new(MockBehavior::InjectSeparator { times })
    }

    /// Inject the active separator into every response
    pub fn always_injecting() -> Self {
        Self::injecting(usize::MAX)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_max_input_size(mut self, max_input_size: usize) -> Self {
        self.max_input_size = max_input_size;
        self
    }

    pub fn with_separators(mut self, separators: Vec<String>) -> Self {
        self.separators = separators;
        self
    }

    /// Set a custom response generator, used on successful requests
    pub fn with_custom_response(mut self, generator: fn(&str) -> String) -> Self {
        self.custom_response = Some(generator);
        self
    }

    /// Number of requests received so far
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Texts of all requests received so far
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Longest candidate separator present in the text
    ///
    /// Longest wins because shorter candidates can be substrings of longer ones.
    pub fn detect_separator(&self, text: &str) -> Option<String> {
        self.separators
            .iter()
            .filter(|sep| text.contains(sep.as_str()))
            .max_by_key(|sep| sep.chars().count())
            .cloned()
    }

    fn respond(&self, text: &str) -> String {
        match self.custom_response {
            Some(generator) => generator(text),
            None => text.to_uppercase(),
        }
    }
}

impl Clone for MockGateway {
    fn clone(&self) -> Self {
        Self {
            behavior: self.behavior,
            name: self.name.clone(),
            max_input_size: self.max_input_size,
            separators: self.separators.clone(),
            request_count: Arc::clone(&self.request_count),
            requests: Arc::clone(&self.requests),
            custom_response: self.custom_response,
        }
    }
}

#[async_trait]
impl TranslationGateway for MockGateway {
    fn name(&self) -> &str {
        &self.name
    }

    fn max_input_size(&self) -> usize {
        self.max_input_size
    }

    async fn translate(
        &self,
        text: &str,
        _source_language: &str,
        _target_language: &str,
    ) -> Result<String, GatewayError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(text.to_string());
        }

        match self.behavior {
            MockBehavior::Uppercase => Ok(self.respond(text)),

            MockBehavior::Echo => Ok(text.to_string()),

            MockBehavior::Failing => Err(GatewayError::ApiError {
                status_code: 500,
                message: "Simulated backend failure".to_string(),
            }),

            MockBehavior::FailFirst { failures } => {
                if count < failures {
                    Err(GatewayError::ConnectionError("Simulated outage".to_string()))
                } else {
                    Ok(self.respond(text))
                }
            }

            MockBehavior::InjectSeparator { times } => {
                if count >= times {
                    return Ok(text.to_string());
                }
                match self.detect_separator(text) {
                    // Double the first separator with a stray piece in between
                    Some(sep) => Ok(text.replacen(&sep, &format!("{sep}*{sep}"), 1)),
                    None => Ok(text.to_string()),
                }
            }
        }
    }
}
