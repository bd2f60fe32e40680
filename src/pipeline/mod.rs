/*!
 * File translation pipeline.
 *
 * Reads records after the checkpoint, packs them into chunks, translates
 * each chunk through the active gateway and appends the result to the
 * output file. Chunks are processed strictly one after another, and the
 * output file itself is the only resume state.
 */

use log::{debug, info};
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::app_config::Config;
use crate::errors::PipelineError;
use crate::file_utils::FileManager;
use crate::gateway::BackendSelector;
use crate::record::{Escaper, RecordLayout, RecordReader};

pub mod checkpoint;
pub mod chunk;
pub mod translator;
pub mod writer;

pub use checkpoint::{resolve_checkpoint, Checkpoint};
pub use chunk::{Chunk, ChunkAssembler, SeparatorSet};
pub use translator::{ChunkTranslator, TranslatedChunk};
pub use writer::OutputWriter;

/// Progress callback, called with a percentage between 0 and 100
pub type ProgressCallback = dyn Fn(f64) + Send + Sync;

/// Cooperative stop request, honored after the next flushed chunk
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Outcome of one `translate_file` run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineSummary {
    /// Records found in the output before this run
    pub resumed_from: usize,
    /// Records appended by this run
    pub records_written: usize,
    /// Chunks appended by this run
    pub chunks_written: usize,
    /// Separators abandoned because of collisions
    pub separator_rotations: usize,
    /// Switches to the fallback backend
    pub backend_switches: usize,
    /// Stopped early on request
    pub cancelled: bool,
    pub elapsed: Duration,
}

impl PipelineSummary {
    /// Records in the output file after the run
    pub fn total_records(&self) -> usize {
        self.resumed_from + self.records_written
    }
}

/// Translates one input file into one output file
#[derive(Debug)]
pub struct FilePipeline {
    layout: RecordLayout,
    escaper: Escaper,
    translator: ChunkTranslator,
    selector: BackendSelector,
    cancel: CancellationFlag,
}

impl FilePipeline {
    /// Build a pipeline for `config`, rejecting a record layout it cannot index with
    pub fn new(config: &Config, selector: BackendSelector) -> anyhow::Result<Self> {
        config.validate_layout()?;
        let layout = RecordLayout::from_config(&config.records);
        let escaper = Escaper::new(config.records.escapes.clone());
        let translator = ChunkTranslator::new(
            SeparatorSet::new(config.chunking.separators.clone()),
            escaper.clone(),
            layout.delimiter.clone(),
            config.source_language.clone(),
            config.target_language.clone(),
        )
        .with_delimiter_replacement(config.records.delimiter_replacement.clone());
        Ok(Self {
            layout,
            escaper,
            translator,
            selector,
            cancel: CancellationFlag::new(),
        })
    }

    /// Use an externally owned cancellation flag
    pub fn with_cancellation(mut self, cancel: CancellationFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn selector(&self) -> &BackendSelector {
        &self.selector
    }

    /// Translate `input` into `output`, resuming after the records already in `output`
    ///
    /// Every chunk is flushed before the next one is read, so an error or a
    /// crash leaves `output` valid and resumable. The error names the first
    /// record of the failing chunk.
    pub async fn translate_file<P: AsRef<Path>, Q: AsRef<Path>>(
        &mut self,
        input: P,
        output: Q,
        progress: Option<&ProgressCallback>,
    ) -> Result<PipelineSummary, PipelineError> {
        let started = Instant::now();
        let input = input.as_ref();
        let output = output.as_ref();
        let switches_before = self.selector.switches();

        report(progress, 0.0);

        let checkpoint = resolve_checkpoint(output)?;
        let total_lines = FileManager::count_lines(input).map_err(io::Error::other)?;
        let mut summary = PipelineSummary {
            resumed_from: checkpoint.records,
            ..Default::default()
        };

        if checkpoint.records > 0 {
            info!("Resuming from line {}", checkpoint.records + 1);
        }

        let mut writer = OutputWriter::open(output, &checkpoint)?;

        if checkpoint.records >= total_lines {
            info!("{:?} is already complete ({} lines)", output, checkpoint.records);
            report(progress, 100.0);
            summary.elapsed = started.elapsed();
            return Ok(summary);
        }

        let reader = RecordReader::open(input, self.layout.clone(), self.escaper.clone(), checkpoint.records)?;
        let mut assembler = ChunkAssembler::new(self.translator.separators());

        'records: for record in reader {
            let mut pending = Some(record?);
            while let Some(record) = pending.take() {
                pending = assembler.offer(record, self.selector.max_input_size())?;
                if pending.is_none() {
                    continue;
                }
                if let Some(chunk) = assembler.take() {
                    self.flush_chunk(chunk, &mut writer, &mut summary).await?;
                    report(progress, percent(summary.total_records(), total_lines));
                }
                if self.cancel.is_cancelled() {
                    info!("Stopping after line {} on request", summary.total_records());
                    summary.cancelled = true;
                    break 'records;
                }
            }
        }

        if !summary.cancelled {
            if let Some(chunk) = assembler.take() {
                self.flush_chunk(chunk, &mut writer, &mut summary).await?;
            }
            report(progress, 100.0);
        }

        summary.backend_switches = self.selector.switches() - switches_before;
        summary.elapsed = started.elapsed();
        info!(
            "Translated {} lines in {} chunks, elapsed {}",
            summary.records_written,
            summary.chunks_written,
            format_duration(summary.elapsed)
        );
        Ok(summary)
    }

    async fn flush_chunk(
        &mut self,
        chunk: Chunk,
        writer: &mut OutputWriter,
        summary: &mut PipelineSummary,
    ) -> Result<(), PipelineError> {
        debug!(
            "Translating chunk at record {}: {} records, {} characters",
            chunk.start_record(),
            chunk.len(),
            chunk.size()
        );
        let translated = self.translator.translate_chunk(chunk, &mut self.selector).await?;
        writer.append_chunk(&translated.lines)?;

        summary.records_written += translated.lines.len();
        summary.chunks_written += 1;
        summary.separator_rotations += translated.separator_rotations;
        info!("Checkpoint reached: {} lines translated", summary.total_records());

        self.selector.on_chunk_flushed();
        Ok(())
    }
}

fn report(progress: Option<&ProgressCallback>, value: f64) {
    if let Some(callback) = progress {
        callback(value.clamp(0.0, 100.0));
    }
}

fn percent(done: usize, total: usize) -> f64 {
    if total == 0 {
        return 100.0;
    }
    done as f64 * 100.0 / total as f64
}

/// Format a duration as "1h 2m 3s", "2m 3s" or "3.042s"
pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}.{:03}s", seconds, duration.subsec_millis())
    }
}
