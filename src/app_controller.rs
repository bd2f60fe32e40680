use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::path::{Path, PathBuf};

use crate::app_config::Config;
use crate::errors::AppError;
use crate::file_utils::FileManager;
use crate::gateway::BackendSelector;
use crate::pipeline::{format_duration, CancellationFlag, FilePipeline, PipelineSummary, ProgressCallback};

// @module: Application controller for file translation

/// Main application controller for line-delimited file translation
pub struct Controller {
    // @field: App configuration
    config: Config,
}

impl Controller {
    // @method: Create a new controller, rejecting an invalid configuration
    pub fn with_config(config: Config) -> Result<Self> {
        config
            .validate()
            .map_err(|e| AppError::Config(format!("{:#}", e)))?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Output path used when none is given on the command line
    pub fn default_output_path(&self, input_file: &Path) -> PathBuf {
        FileManager::generate_output_path(input_file, &self.config.target_language)
    }

    /// Translate one file with the configured backends
    pub async fn run(&self, input_file: PathBuf, output_file: Option<PathBuf>) -> Result<PipelineSummary> {
        let selector = BackendSelector::from_config(&self.config)
            .context("Failed to set up translation backends")?;
        self.run_with_selector(input_file, output_file, selector).await
    }

    /// Translate one file with an already built backend selection
    pub async fn run_with_selector(
        &self,
        input_file: PathBuf,
        output_file: Option<PathBuf>,
        selector: BackendSelector,
    ) -> Result<PipelineSummary> {
        if !FileManager::file_exists(&input_file) {
            return Err(AppError::File(format!("Input file does not exist: {:?}", input_file)).into());
        }
        let output_file = output_file.unwrap_or_else(|| self.default_output_path(&input_file));

        info!(
            "Translating {:?} -> {:?} ({} -> {}) with {}",
            input_file,
            output_file,
            self.config.source_language,
            self.config.target_language,
            selector.active().name()
        );

        let cancel = CancellationFlag::new();
        let mut pipeline = FilePipeline::new(&self.config, selector)?.with_cancellation(cancel.clone());
        let signal_flag = cancel;
        let signal_task = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, stopping after the current chunk");
                signal_flag.cancel();
            }
        });

        let progress_bar = ProgressBar::new(100);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}% {msg}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}% {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(style.progress_chars("=>-"));
        progress_bar.set_message("Translating");

        let pb = progress_bar.clone();
        let on_progress = move |percent: f64| pb.set_position(percent.round() as u64);
        let callback: &ProgressCallback = &on_progress;

        let result = pipeline
            .translate_file(&input_file, &output_file, Some(callback))
            .await;

        signal_task.abort();
        progress_bar.finish_and_clear();

        match result {
            Ok(summary) => {
                Self::log_summary(&summary, &output_file);
                Ok(summary)
            }
            Err(e) => {
                error!("Translation of {:?} stopped: {}", input_file, e);
                if let Some(record) = e.start_record() {
                    error!("Rerun the same command to resume; failing chunk starts at line {}", record);
                }
                Err(AppError::Pipeline(e)).with_context(|| format!("Failed to translate {:?}", input_file))
            }
        }
    }

    fn log_summary(summary: &PipelineSummary, output_file: &Path) {
        if summary.cancelled {
            warn!(
                "Stopped early: {} lines in {:?}, rerun to continue",
                summary.total_records(),
                output_file
            );
        } else {
            info!("Success: {:?}", output_file);
        }
        if summary.separator_rotations > 0 {
            info!("Separator rotations: {}", summary.separator_rotations);
        }
        if summary.backend_switches > 0 {
            info!("Backend switches: {}", summary.backend_switches);
        }
        info!(
            "Translation complete: {} new lines, {} chunks, {}",
            summary.records_written,
            summary.chunks_written,
            format_duration(summary.elapsed)
        );
    }
}
