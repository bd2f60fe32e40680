/*!
 * Chunk assembly.
 *
 * Records are packed into chunks whose rendered text stays strictly below the
 * active backend's input bound. The rendered text is every record's source
 * field followed by the chunk separator.
 */

use crate::app_config::default_separators;
use crate::errors::PipelineError;
use crate::record::Record;

/// Ordered, fixed list of candidate chunk separators
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeparatorSet {
    candidates: Vec<String>,
    overhead: usize,
}

impl SeparatorSet {
    pub fn new(candidates: Vec<String>) -> Self {
        let overhead = candidates.iter().map(|s| s.chars().count()).max().unwrap_or(0);
        Self { candidates, overhead }
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Candidate at `index`, wrapping around the list
    pub fn get(&self, index: usize) -> &str {
        &self.candidates[index % self.candidates.len()]
    }

    /// Per-record size overhead; the longest candidate, so any rotation fits
    pub fn overhead(&self) -> usize {
        self.overhead
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.candidates.iter().map(String::as_str)
    }
}

impl Default for SeparatorSet {
    fn default() -> Self {
        Self::new(default_separators())
    }
}

/// Records bound for a single gateway request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub records: Vec<Record>,
    size: usize,
}

impl Chunk {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Input line of the first record
    pub fn start_record(&self) -> usize {
        self.records.first().map(|r| r.line).unwrap_or(0)
    }

    /// Accounted size, separator overhead included
    pub fn size(&self) -> usize {
        self.size
    }

    /// Chunk text joined with `separator`
    pub fn text(&self, separator: &str) -> String {
        let mut text = String::new();
        for record in &self.records {
            text.push_str(record.source_text());
            text.push_str(separator);
        }
        text
    }
}

/// Accumulates records until the next one would overflow the bound
#[derive(Debug)]
pub struct ChunkAssembler {
    overhead: usize,
    records: Vec<Record>,
    size: usize,
}

impl ChunkAssembler {
    pub fn new(separators: &SeparatorSet) -> Self {
        Self {
            overhead: separators.overhead(),
            records: Vec::new(),
            size: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Add `record` if the chunk stays under `max_input_size`
    ///
    /// A record that does not fit is handed back; the caller should `take()`
    /// the current chunk and offer it again. A record that cannot fit even in
    /// an empty chunk is an error.
    pub fn offer(&mut self, record: Record, max_input_size: usize) -> Result<Option<Record>, PipelineError> {
        let cost = record.source_text().chars().count() + self.overhead;
        if self.size + cost < max_input_size {
            self.size += cost;
            self.records.push(record);
            return Ok(None);
        }
        if self.records.is_empty() {
            return Err(PipelineError::RecordTooLarge {
                line: record.line,
                size: cost,
                max: max_input_size,
            });
        }
        Ok(Some(record))
    }

    /// Take the current chunk, leaving the assembler empty
    pub fn take(&mut self) -> Option<Chunk> {
        if self.records.is_empty() {
            return None;
        }
        let size = std::mem::take(&mut self.size);
        Some(Chunk {
            records: std::mem::take(&mut self.records),
            size,
        })
    }
}
