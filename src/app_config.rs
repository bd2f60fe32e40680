use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Source language code (two letters)
    pub source_language: String,

    /// Target language code (two letters)
    pub target_language: String,

    /// Record layout of input and output files
    #[serde(default)]
    pub records: RecordConfig,

    /// Chunk assembly settings
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Translation backend config
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Translation backend type
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    // @backend: DeepL, small input bound
    #[default]
    DeepL,
    // @backend: Google web translator, large input bound
    Google,
}

impl BackendKind {
    // @returns: Capitalized backend name
    pub fn display_name(&self) -> &str {
        match self {
            Self::DeepL => "DeepL",
            Self::Google => "Google",
        }
    }

    // @returns: Lowercase backend identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::DeepL => "deepl".to_string(),
            Self::Google => "google".to_string(),
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

impl std::str::FromStr for BackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "deepl" => Ok(Self::DeepL),
            "google" => Ok(Self::Google),
            _ => Err(anyhow!("Invalid backend type: {}", s)),
        }
    }
}

/// What happens to the backend selection after a failover
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// Stay on the fallback for the rest of the run
    #[default]
    Sticky,
    /// Go back to the primary at the start of every chunk
    PerChunk,
}

/// Backend configuration wrapper
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BackendConfig {
    // @field: Backend type identifier
    #[serde(rename = "type")]
    pub backend_type: String,

    // @field: API key
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Service URL
    #[serde(default = "String::new")]
    pub endpoint: String,

    // @field: Max characters per request
    #[serde(default = "default_deepl_max_input_size")]
    pub max_input_size: usize,

    // @field: Timeout seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl BackendConfig {
    // @param kind: Backend enum
    // @returns: Backend config with defaults
    pub fn new(kind: BackendKind) -> Self {
        match kind {
            BackendKind::DeepL => Self {
                backend_type: "deepl".to_string(),
                api_key: String::new(),
                endpoint: default_deepl_endpoint(),
                max_input_size: default_deepl_max_input_size(),
                timeout_secs: default_timeout_secs(),
            },
            BackendKind::Google => Self {
                backend_type: "google".to_string(),
                api_key: String::new(),
                endpoint: default_google_endpoint(),
                max_input_size: default_google_max_input_size(),
                timeout_secs: default_timeout_secs(),
            },
        }
    }
}

/// Translation service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationConfig {
    /// Primary backend
    #[serde(default)]
    pub backend: BackendKind,

    /// Backend used after the primary fails, if any
    #[serde(default = "default_fallback")]
    pub fallback: Option<BackendKind>,

    /// Whether a failover is permanent for the run
    #[serde(default)]
    pub fallback_policy: FallbackPolicy,

    /// Available translation backends
    #[serde(default)]
    pub available_backends: Vec<BackendConfig>,

    /// Common settings applicable to all backends
    #[serde(default)]
    pub common: TranslationCommonConfig,
}

/// Retry settings shared by every backend
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationCommonConfig {
    /// Retry count for failed requests
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Base backoff in milliseconds, doubled on each retry
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Fixed wait after the backend rate limits us
    #[serde(default = "default_rate_limit_delay_ms")]
    pub rate_limit_delay_ms: u64,

    /// Rate limit waits allowed per request before giving up
    #[serde(default = "default_max_rate_limit_waits")]
    pub max_rate_limit_waits: u32,
}

impl Default for TranslationCommonConfig {
    fn default() -> Self {
        Self {
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
            rate_limit_delay_ms: default_rate_limit_delay_ms(),
            max_rate_limit_waits: default_max_rate_limit_waits(),
        }
    }
}

/// A reserved substring swapped for a placeholder while text is in flight
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct EscapeRule {
    pub reserved: String,
    pub placeholder: String,
}

/// Layout of a record line
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RecordConfig {
    /// Field delimiter
    #[serde(default = "default_field_delimiter")]
    pub field_delimiter: String,

    /// Number of fields every line must split into
    #[serde(default = "default_field_count")]
    pub field_count: usize,

    /// Index of the field that gets translated
    #[serde(default = "default_source_field")]
    pub source_field: usize,

    /// Index of the field that receives the translation
    #[serde(default = "default_target_field")]
    pub target_field: usize,

    /// Reserved substrings escaped before chunking
    #[serde(default = "default_escapes")]
    pub escapes: Vec<EscapeRule>,

    /// Written in place of a field delimiter that shows up in a translation
    #[serde(default = "default_delimiter_replacement")]
    pub delimiter_replacement: String,
}

impl Default for RecordConfig {
    fn default() -> Self {
        Self {
            field_delimiter: default_field_delimiter(),
            field_count: default_field_count(),
            source_field: default_source_field(),
            target_field: default_target_field(),
            escapes: default_escapes(),
            delimiter_replacement: default_delimiter_replacement(),
        }
    }
}

/// Chunk assembly settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChunkingConfig {
    /// Candidate chunk separators, tried in order
    #[serde(default = "default_separators")]
    pub separators: Vec<String>,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            separators: default_separators(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

fn default_fallback() -> Option<BackendKind> {
    Some(BackendKind::Google)
}

fn default_deepl_max_input_size() -> usize {
    1500
}

fn default_google_max_input_size() -> usize {
    5000
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_retry_count() -> u32 {
    5
}

fn default_retry_backoff_ms() -> u64 {
    1000 // doubled on each retry
}

fn default_rate_limit_delay_ms() -> u64 {
    10_000
}

fn default_max_rate_limit_waits() -> u32 {
    6
}

fn default_deepl_endpoint() -> String {
    "https://api-free.deepl.com".to_string()
}

fn default_google_endpoint() -> String {
    "https://translate.google.com".to_string()
}

fn default_field_delimiter() -> String {
    "|".to_string()
}

fn default_field_count() -> usize {
    3
}

fn default_source_field() -> usize {
    1
}

fn default_target_field() -> usize {
    2
}

fn default_escapes() -> Vec<EscapeRule> {
    vec![EscapeRule {
        reserved: "/".to_string(),
        placeholder: "_S_".to_string(),
    }]
}

/// Stand-in for a field delimiter found inside a translation
pub const DEFAULT_DELIMITER_REPLACEMENT: &str = "/";

fn default_delimiter_replacement() -> String {
    DEFAULT_DELIMITER_REPLACEMENT.to_string()
}

pub fn default_separators() -> Vec<String> {
    ["-+ +-", "+ ;", "+;", "+;+", "+; ;+", "---", "+-=-", "; ;"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Config {
    /// Load a configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open config file: {:?}", path))?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Write the configuration as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize config to JSON")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write config to file: {:?}", path))
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        // Validity of the codes themselves is the backend's business
        if self.source_language.trim().is_empty() {
            return Err(anyhow!("Source language is required"));
        }
        if self.target_language.trim().is_empty() {
            return Err(anyhow!("Target language is required"));
        }

        self.validate_layout()?;

        let longest_separator = self
            .chunking
            .separators
            .iter()
            .map(|s| s.chars().count())
            .max()
            .unwrap_or(0);

        let mut used = vec![self.translation.backend];
        if let Some(fallback) = self.translation.fallback {
            if fallback != self.translation.backend {
                used.push(fallback);
            }
        }

        for kind in used {
            let max = self.translation.get_max_input_size(kind);
            if max <= longest_separator {
                return Err(anyhow!(
                    "max_input_size for {} ({}) must exceed the longest separator ({})",
                    kind.display_name(),
                    max,
                    longest_separator
                ));
            }
            if kind == BackendKind::DeepL && self.translation.get_api_key(kind).is_empty() {
                return Err(anyhow!("API key is required for the DeepL backend"));
            }
            url::Url::parse(&self.translation.get_endpoint(kind))
                .with_context(|| format!("Invalid endpoint for {}", kind.display_name()))?;
        }

        // Chunks are sized for the backend that is active when they are built
        if let Some(fallback) = self.translation.fallback {
            let primary_max = self.translation.get_max_input_size(self.translation.backend);
            let fallback_max = self.translation.get_max_input_size(fallback);
            if fallback_max < primary_max {
                return Err(anyhow!(
                    "Fallback {} accepts {} characters per request, less than the {} of primary {}",
                    fallback.display_name(),
                    fallback_max,
                    primary_max,
                    self.translation.backend.display_name()
                ));
            }
        }

        Ok(())
    }

    /// Validate the record layout and separators, the settings a pipeline indexes with
    pub fn validate_layout(&self) -> Result<()> {
        self.validate_records()?;
        self.validate_separators()
    }

    fn validate_records(&self) -> Result<()> {
        let records = &self.records;
        if records.field_delimiter.is_empty() {
            return Err(anyhow!("Field delimiter cannot be empty"));
        }
        if records.source_field == records.target_field {
            return Err(anyhow!("Source and target field must differ"));
        }
        if records.source_field >= records.field_count || records.target_field >= records.field_count {
            return Err(anyhow!(
                "Source field {} and target field {} must be below field count {}",
                records.source_field,
                records.target_field,
                records.field_count
            ));
        }
        for rule in &records.escapes {
            if rule.reserved.is_empty() || rule.placeholder.is_empty() {
                return Err(anyhow!("Escape rules need a reserved text and a placeholder"));
            }
            if rule.placeholder.contains(&rule.reserved) {
                return Err(anyhow!(
                    "Placeholder '{}' cannot contain its reserved text '{}'",
                    rule.placeholder,
                    rule.reserved
                ));
            }
            if rule.placeholder.contains(&records.field_delimiter) {
                return Err(anyhow!("Placeholder '{}' cannot contain the field delimiter", rule.placeholder));
            }
        }
        if records.delimiter_replacement.contains(&records.field_delimiter)
            || records.delimiter_replacement.contains(['\n', '\r'])
        {
            return Err(anyhow!(
                "Delimiter replacement '{}' cannot contain the field delimiter or a line break",
                records.delimiter_replacement
            ));
        }
        Ok(())
    }

    fn validate_separators(&self) -> Result<()> {
        let separators = &self.chunking.separators;
        if separators.is_empty() {
            return Err(anyhow!("At least one chunk separator is required"));
        }
        for (idx, separator) in separators.iter().enumerate() {
            if separator.trim().is_empty() {
                return Err(anyhow!("Chunk separator {} is blank", idx));
            }
            if separator.contains('\n') || separator.contains(&self.records.field_delimiter) {
                return Err(anyhow!(
                    "Chunk separator '{}' cannot contain a newline or the field delimiter",
                    separator
                ));
            }
            if separators[..idx].contains(separator) {
                return Err(anyhow!("Chunk separator '{}' is listed twice", separator));
            }
        }
        Ok(())
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            source_language: "en".to_string(),
            target_language: "ru".to_string(),
            records: RecordConfig::default(),
            chunking: ChunkingConfig::default(),
            translation: TranslationConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}

impl TranslationConfig {
    /// Get a specific backend configuration by type
    pub fn get_backend_config(&self, kind: BackendKind) -> Option<&BackendConfig> {
        let kind_str = kind.to_lowercase_string();
        self.available_backends.iter().find(|b| b.backend_type == kind_str)
    }

    /// Get the max input size of a backend
    pub fn get_max_input_size(&self, kind: BackendKind) -> usize {
        if let Some(backend_config) = self.get_backend_config(kind) {
            if backend_config.max_input_size > 0 {
                return backend_config.max_input_size;
            }
        }

        match kind {
            BackendKind::DeepL => default_deepl_max_input_size(),
            BackendKind::Google => default_google_max_input_size(),
        }
    }

    /// Get the API key of a backend
    pub fn get_api_key(&self, kind: BackendKind) -> String {
        self.get_backend_config(kind)
            .map(|b| b.api_key.clone())
            .unwrap_or_default()
    }

    /// Get the endpoint of a backend
    pub fn get_endpoint(&self, kind: BackendKind) -> String {
        if let Some(backend_config) = self.get_backend_config(kind) {
            if !backend_config.endpoint.is_empty() {
                return backend_config.endpoint.clone();
            }
        }

        match kind {
            BackendKind::DeepL => default_deepl_endpoint(),
            BackendKind::Google => default_google_endpoint(),
        }
    }

    /// Get the request timeout of a backend
    pub fn get_timeout_secs(&self, kind: BackendKind) -> u64 {
        self.get_backend_config(kind)
            .map(|b| b.timeout_secs)
            .filter(|t| *t > 0)
            .unwrap_or_else(default_timeout_secs)
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            fallback: default_fallback(),
            fallback_policy: FallbackPolicy::default(),
            available_backends: vec![
                BackendConfig::new(BackendKind::DeepL),
                BackendConfig::new(BackendKind::Google),
            ],
            common: TranslationCommonConfig::default(),
        }
    }
}
