/*!
 * Chunk translation and reassembly.
 *
 * A chunk is sent to the active gateway as one text, joined with a chunk
 * separator. The response is split on the same separator and the pieces are
 * put back into their records. When the piece count does not match the
 * record count the separator collided with the content, and the chunk is
 * retried with the next candidate separator. A field delimiter inside a
 * translation is replaced, so every output line keeps its field count.
 */

use log::{debug, error, info, warn};
use std::sync::Arc;

use super::chunk::{Chunk, SeparatorSet};
use crate::app_config::DEFAULT_DELIMITER_REPLACEMENT;
use crate::errors::{PipelineError, SeparatorCollision};
use crate::gateway::BackendSelector;
use crate::record::Escaper;

/// Reassembled output of one chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatedChunk {
    /// Input line of the first record
    pub start_record: usize,
    /// Output lines in input order, without line endings
    pub lines: Vec<String>,
    /// Separators abandoned before one worked
    pub separator_rotations: usize,
}

/// Separator choice for the attempts on a single chunk
#[derive(Debug, Default)]
struct SeparatorAttempt {
    index: usize,
    last_collision: Option<SeparatorCollision>,
}

/// Translates chunks and rebuilds their records
#[derive(Debug, Clone)]
pub struct ChunkTranslator {
    separators: SeparatorSet,
    escaper: Escaper,
    delimiter: String,
    delimiter_replacement: String,
    source_language: String,
    target_language: String,
}

impl ChunkTranslator {
    pub fn new(
        separators: SeparatorSet,
        escaper: Escaper,
        delimiter: impl Into<String>,
        source_language: impl Into<String>,
        target_language: impl Into<String>,
    ) -> Self {
        Self {
            separators,
            escaper,
            delimiter: delimiter.into(),
            delimiter_replacement: DEFAULT_DELIMITER_REPLACEMENT.to_string(),
            source_language: source_language.into(),
            target_language: target_language.into(),
        }
    }

    /// Text written in place of a field delimiter that a backend put into a translation
    pub fn with_delimiter_replacement(mut self, replacement: impl Into<String>) -> Self {
        self.delimiter_replacement = replacement.into();
        self
    }

    pub fn separators(&self) -> &SeparatorSet {
        &self.separators
    }

    /// Translate a chunk, rotating separators on collision
    ///
    /// Every candidate separator is tried at most once, starting from the
    /// first. Nothing is returned for the chunk unless every record got its
    /// translation.
    pub async fn translate_chunk(
        &self,
        chunk: Chunk,
        selector: &mut BackendSelector,
    ) -> Result<TranslatedChunk, PipelineError> {
        let start_record = chunk.start_record();
        let expected = chunk.len();
        let mut attempt = SeparatorAttempt::default();

        while attempt.index < self.separators.len() {
            let separator = self.separators.get(attempt.index);
            let text = chunk.text(separator);

            // Source text that does not split back into its own records never will once translated
            let outcome = match check_source_split(&chunk, &text, separator) {
                Err(collision) => {
                    debug!("Separator '{}' does not split the source text of chunk at record {}", separator, start_record);
                    Err(collision)
                }
                Ok(()) => {
                    let translated = self.call_gateway(&text, selector, start_record).await?;
                    split_pieces(&translated, separator, expected)
                }
            };

            match outcome {
                Ok(pieces) => {
                    return Ok(TranslatedChunk {
                        start_record,
                        lines: self.reassemble(chunk, pieces),
                        separator_rotations: attempt.index,
                    });
                }
                Err(collision) => {
                    warn!("Chunk at record {}: {}", start_record, collision);
                    attempt.last_collision = Some(collision);
                    attempt.index += 1;
                    if attempt.index < self.separators.len() {
                        info!("Current separator: '{}'", self.separators.get(attempt.index));
                    }
                }
            }
        }

        let last = attempt.last_collision.unwrap_or(SeparatorCollision {
            separator: String::new(),
            expected,
            found: 0,
        });
        Err(PipelineError::SeparatorsExhausted {
            start_record,
            attempts: attempt.index,
            last,
        })
    }

    /// One gateway request; on failure switch to the fallback and retry once
    async fn call_gateway(
        &self,
        text: &str,
        selector: &mut BackendSelector,
        start_record: usize,
    ) -> Result<String, PipelineError> {
        let gateway = Arc::clone(selector.active());
        match gateway.translate(text, &self.source_language, &self.target_language).await {
            Ok(translated) => Ok(translated),
            Err(e) => {
                error!("Translation error on {}: {}", gateway.name(), e);
                if !selector.fail_over() {
                    warn!("No other backend to switch to, retrying {} once", gateway.name());
                }
                let gateway = Arc::clone(selector.active());
                gateway
                    .translate(text, &self.source_language, &self.target_language)
                    .await
                    .map_err(|source| PipelineError::Gateway { start_record, source })
            }
        }
    }

    fn reassemble(&self, chunk: Chunk, pieces: Vec<String>) -> Vec<String> {
        chunk
            .records
            .into_iter()
            .zip(pieces)
            .map(|(mut record, piece)| {
                let source = self.escaper.unescape(record.source_text());
                record.set_source_text(source);
                let translation = single_line(&self.escaper.unescape(&piece));
                record.set_translation(self.replace_delimiter(record.line, translation));
                record.to_line(&self.delimiter)
            })
            .collect()
    }

    fn replace_delimiter(&self, line: usize, translation: String) -> String {
        if !translation.contains(self.delimiter.as_str()) {
            return translation;
        }
        warn!(
            "Translation of record {} contains the field delimiter '{}', writing '{}' instead",
            line, self.delimiter, self.delimiter_replacement
        );
        translation.replace(self.delimiter.as_str(), &self.delimiter_replacement)
    }
}

/// Check that the untranslated chunk text splits back into its own records
///
/// Besides the piece count, every piece must equal its record's text. A record
/// ending in the start of a self-overlapping separator (`wait -` before `---`)
/// splits into the right count at the wrong place. `found` counts the intact pieces.
fn check_source_split(chunk: &Chunk, text: &str, separator: &str) -> Result<(), SeparatorCollision> {
    let pieces = split_pieces(text, separator, chunk.len())?;
    let intact = pieces
        .iter()
        .zip(&chunk.records)
        .filter(|(piece, record)| piece.as_str() == record.source_text().trim())
        .count();
    if intact != chunk.len() {
        return Err(SeparatorCollision {
            separator: separator.to_string(),
            expected: chunk.len(),
            found: intact,
        });
    }
    Ok(())
}

/// Split `text` into exactly `expected` trimmed pieces
///
/// A trailing blank piece left by the final separator is dropped.
pub fn split_pieces(text: &str, separator: &str, expected: usize) -> Result<Vec<String>, SeparatorCollision> {
    let mut pieces: Vec<&str> = text.split(separator).collect();
    if pieces.len() > expected && pieces.last().is_some_and(|p| p.trim().is_empty()) {
        pieces.pop();
    }
    if pieces.len() != expected {
        return Err(SeparatorCollision {
            separator: separator.to_string(),
            expected,
            found: pieces.len(),
        });
    }
    Ok(pieces.into_iter().map(|p| p.trim().to_string()).collect())
}

/// Line breaks inside a translation would break the line-count checkpoint
fn single_line(text: &str) -> String {
    if text.contains(['\n', '\r']) {
        text.split(['\n', '\r'])
            .filter(|part| !part.trim().is_empty())
            .map(str::trim)
            .collect::<Vec<_>>()
            .join(" ")
    } else {
        text.to_string()
    }
}
