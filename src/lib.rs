/*!
 * # linechunk - resumable translation of line-delimited files
 *
 * A Rust library that translates one field of every line of a delimited
 * text file, packing many lines into each request to a translation backend.
 *
 * ## Features
 *
 * - Records packed into chunks that stay under the backend's input bound
 * - Translation backends:
 *   - DeepL HTTP API (primary, 1500 characters per request)
 *   - Google web translator (fallback, 5000 characters per request)
 * - Automatic switch to the fallback backend when the primary fails
 * - Separator rotation when a chunk separator collides with the text
 * - Output flushed after every chunk; rerunning resumes where it stopped
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `record`: Record layout, escaping and the lazy record reader
 * - `gateway`: Translation backends and backend selection:
 *   - `gateway::deepl`: DeepL API client
 *   - `gateway::google`: Google web translator client
 *   - `gateway::mock`: Scripted gateway for tests
 * - `pipeline`: Checkpoint, chunk assembly, translation and output
 * - `file_utils`: File system operations
 * - `app_controller`: Main application controller
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod file_utils;
pub mod record;
pub mod gateway;
pub mod pipeline;
pub mod app_controller;
pub mod errors;

// Re-export main types for easier usage
pub use app_config::{BackendKind, Config, FallbackPolicy};
pub use errors::{AppError, GatewayError, PipelineError, RecordError, SeparatorCollision};
pub use gateway::{BackendSelector, TranslationGateway};
pub use pipeline::{CancellationFlag, FilePipeline, PipelineSummary};
pub use record::{Escaper, Record, RecordLayout, RecordReader};
