/*!
 * Error types for the linechunk application.
 *
 * This module contains custom error types for the different layers of the
 * pipeline, using the thiserror crate for ergonomic error definitions.
 */

use thiserror::Error;

/// Errors surfaced by a translation gateway after its own retries are spent
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Error when sending a request fails
    #[error("Translation request failed: {0}")]
    RequestFailed(String),

    /// Error when the backend response cannot be understood
    #[error("Failed to parse translation response: {0}")]
    ParseError(String),

    /// Error returned by the backend itself
    #[error("Backend responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the backend
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Backend kept rate limiting us
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),
}

impl GatewayError {
    /// Whether an internal retry may help
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RequestFailed(_) | Self::ConnectionError(_) | Self::RateLimitExceeded(_) => true,
            Self::ApiError { status_code, .. } => *status_code >= 500,
            Self::ParseError(_) | Self::AuthenticationError(_) => false,
        }
    }

    /// Whether the backend asked us to slow down
    pub fn is_rate_limited(&self) -> bool {
        match self {
            Self::RateLimitExceeded(_) => true,
            Self::ApiError { status_code, message } => {
                *status_code == 429
                    || *status_code == 503
                    || message.contains("Too many requests")
                    || message.contains("Service Temporarily Unavailable")
            }
            _ => false,
        }
    }
}

/// An input line that does not fit the record layout
#[derive(Error, Debug)]
pub enum RecordError {
    /// Wrong number of fields; also what a delimiter inside the text looks like
    #[error("Malformed record at line {line}: expected {expected} fields, found {found}")]
    FieldCount {
        /// 1-based input line number
        line: usize,
        /// Configured field count
        expected: usize,
        /// Field count actually found
        found: usize,
    },

    /// Line is not valid UTF-8
    #[error("Malformed record at line {line}: invalid UTF-8")]
    Encoding {
        /// 1-based input line number
        line: usize,
    },
}

/// Reassembly piece count did not match the record count of a chunk
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Separator '{separator}' collided: expected {expected} pieces, found {found}")]
pub struct SeparatorCollision {
    /// Separator that was active for the failed attempt
    pub separator: String,
    /// Records in the chunk
    pub expected: usize,
    /// Pieces produced by splitting the translation
    pub found: usize,
}

/// Fatal errors of a file translation run
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Gateway failed on both the active and the fallback backend
    #[error("Chunk starting at record {start_record} could not be translated: {source}")]
    Gateway {
        /// 1-based input line of the first record in the chunk
        start_record: usize,
        /// Last gateway failure
        #[source]
        source: GatewayError,
    },

    /// Every candidate separator collided
    #[error("Chunk starting at record {start_record} is untranslatable: all {attempts} separators failed ({last})")]
    SeparatorsExhausted {
        /// 1-based input line of the first record in the chunk
        start_record: usize,
        /// Number of separator attempts made
        attempts: usize,
        /// Collision seen on the last attempt
        last: SeparatorCollision,
    },

    /// Input line could not be parsed
    #[error(transparent)]
    MalformedRecord(#[from] RecordError),

    /// A single source field does not fit under the backend bound
    #[error("Record at line {line} is too large for the active backend: {size} characters, limit {max}")]
    RecordTooLarge {
        /// 1-based input line number
        line: usize,
        /// Size of the record's source text plus separator overhead
        size: usize,
        /// Active backend max input size
        max: usize,
    },

    /// Reading the input or writing the output failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Starting record of the failed chunk, when the failure is chunk-scoped
    pub fn start_record(&self) -> Option<usize> {
        match self {
            Self::Gateway { start_record, .. } | Self::SeparatorsExhausted { start_record, .. } => {
                Some(*start_record)
            }
            Self::RecordTooLarge { line, .. } => Some(*line),
            Self::MalformedRecord(RecordError::FieldCount { line, .. })
            | Self::MalformedRecord(RecordError::Encoding { line }) => Some(*line),
            Self::Io(_) => None,
        }
    }
}

/// Errors surfaced by the application controller
#[derive(Error, Debug)]
pub enum AppError {
    /// Missing or unusable input or output file
    #[error("File error: {0}")]
    File(String),

    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error from the translation pipeline
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
}
