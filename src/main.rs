// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{anyhow, Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{warn, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;
use std::path::{Path, PathBuf};

use linechunk::app_config::{self, BackendConfig, BackendKind, Config, FallbackPolicy};
use linechunk::app_controller::Controller;

/// CLI Wrapper for BackendKind to implement ValueEnum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliBackend {
    Deepl,
    Google,
}

impl From<CliBackend> for BackendKind {
    fn from(cli_backend: CliBackend) -> Self {
        match cli_backend {
            CliBackend::Deepl => BackendKind::DeepL,
            CliBackend::Google => BackendKind::Google,
        }
    }
}

/// Fallback backend choice, `none` disables the fallback
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliFallback {
    Deepl,
    Google,
    None,
}

impl From<CliFallback> for Option<BackendKind> {
    fn from(cli_fallback: CliFallback) -> Self {
        match cli_fallback {
            CliFallback::Deepl => Some(BackendKind::DeepL),
            CliFallback::Google => Some(BackendKind::Google),
            CliFallback::None => None,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliFallbackPolicy {
    Sticky,
    PerChunk,
}

impl From<CliFallbackPolicy> for FallbackPolicy {
    fn from(cli_policy: CliFallbackPolicy) -> Self {
        match cli_policy {
            CliFallbackPolicy::Sticky => FallbackPolicy::Sticky,
            CliFallbackPolicy::PerChunk => FallbackPolicy::PerChunk,
        }
    }
}

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate a line-delimited file (default command)
    Translate(TranslateArgs),

    /// Generate shell completions for linechunk
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug)]
struct TranslateArgs {
    /// Input file to translate
    #[arg(value_name = "INPUT_FILE")]
    input_file: PathBuf,

    #[command(flatten)]
    options: TranslateOptions,
}

#[derive(Args, Debug, Clone)]
struct TranslateOptions {
    /// Output file (default: <stem>.<target>.<ext> next to the input)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Source language code (e.g., 'en', 'de', 'fr')
    #[arg(short, long)]
    source_language: Option<String>,

    /// Target language code (e.g., 'ru', 'es', 'fr')
    #[arg(short, long)]
    target_language: Option<String>,

    /// Primary translation backend
    #[arg(short, long, value_enum)]
    backend: Option<CliBackend>,

    /// Backend used when the primary fails
    #[arg(long, value_enum)]
    fallback: Option<CliFallback>,

    /// Whether a switch to the fallback lasts for the rest of the run
    #[arg(long, value_enum)]
    fallback_policy: Option<CliFallbackPolicy>,

    /// DeepL API key
    #[arg(long, env = "DEEPL_AUTH_KEY", hide_env_values = true)]
    deepl_key: Option<String>,

    /// Configuration file path
    #[arg(short, long, default_value = "linechunk.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

/// linechunk - resumable translation of line-delimited files
///
/// Translates the text field of every line of a delimited file, many lines per
/// request, and appends the results to an output file that doubles as the
/// resume checkpoint.
#[derive(Parser, Debug)]
#[command(name = "linechunk")]
#[command(version)]
#[command(about = "Resumable chunked translation of line-delimited files")]
#[command(long_about = "linechunk translates one field of every line of a delimited file.

EXAMPLES:
    linechunk phrases.txt                          # Translate using default config
    linechunk -s en -t de phrases.txt              # Translate from English to German
    linechunk -b google --fallback none data.txt   # Google only, no fallback
    linechunk -o out/phrases.ru.txt phrases.txt    # Explicit output file
    linechunk completions bash > linechunk.bash    # Generate bash completions

RESUMING:
    The output file is appended to after every chunk. Running the same command
    again skips the lines already present in the output file.

CONFIGURATION:
    Configuration is stored in linechunk.json by default. You can specify a
    different config file with --config-path. If the config file doesn't exist,
    a default one will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Input file to translate
    #[arg(value_name = "INPUT_FILE")]
    input_file: Option<PathBuf>,

    #[command(flatten)]
    options: TranslateOptions,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color code for log level
    fn get_color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "1;31",
            Level::Warn => "1;33",
            Level::Info => "1;32",
            Level::Debug => "1;36",
            Level::Trace => "1;35",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let color = Self::get_color_for_level(record.level());
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "\x1B[{}m{} {:<5} {}\x1B[0m",
                color,
                now,
                record.level(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

fn level_filter(level: &app_config::LogLevel) -> LevelFilter {
    match level {
        app_config::LogLevel::Error => LevelFilter::Error,
        app_config::LogLevel::Warn => LevelFilter::Warn,
        app_config::LogLevel::Info => LevelFilter::Info,
        app_config::LogLevel::Debug => LevelFilter::Debug,
        app_config::LogLevel::Trace => LevelFilter::Trace,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Everything is let through here; the effective level is set once the config is known
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "linechunk", &mut std::io::stdout());
            Ok(())
        }
        Some(Commands::Translate(args)) => run_translate(args).await,
        None => {
            // Default behavior - use top-level args
            let input_file = cli.input_file.ok_or_else(|| {
                anyhow!("INPUT_FILE is required when no subcommand is specified")
            })?;
            run_translate(TranslateArgs {
                input_file,
                options: cli.options,
            })
            .await
        }
    }
}

async fn run_translate(args: TranslateArgs) -> Result<()> {
    let options = &args.options;

    // If log level is set via command line, apply it immediately
    if let Some(cmd_log_level) = &options.log_level {
        let config_log_level: app_config::LogLevel = cmd_log_level.clone().into();
        log::set_max_level(level_filter(&config_log_level));
    }

    let mut config = load_or_create_config(&options.config_path)?;
    apply_overrides(&mut config, options);

    if options.log_level.is_none() {
        log::set_max_level(level_filter(&config.log_level));
    }

    // Validated after the overrides are applied
    let controller = Controller::with_config(config).context("Configuration validation failed")?;
    controller.run(args.input_file, options.output.clone()).await?;
    Ok(())
}

/// Load the configuration, writing a default one when the file is missing
fn load_or_create_config(config_path: &str) -> Result<Config> {
    if Path::new(config_path).exists() {
        return Config::from_file(config_path);
    }

    warn!("Config file not found at '{}', creating default config.", config_path);
    let config = Config::default();
    config
        .save(config_path)
        .with_context(|| format!("Failed to write default config to file: {}", config_path))?;
    Ok(config)
}

/// Override config with CLI options if provided
fn apply_overrides(config: &mut Config, options: &TranslateOptions) {
    if let Some(source_lang) = &options.source_language {
        config.source_language = source_lang.clone();
    }
    if let Some(target_lang) = &options.target_language {
        config.target_language = target_lang.clone();
    }
    if let Some(backend) = options.backend {
        config.translation.backend = backend.into();
    }
    if let Some(fallback) = options.fallback {
        config.translation.fallback = fallback.into();
    }
    if let Some(policy) = options.fallback_policy {
        config.translation.fallback_policy = policy.into();
    }
    if let Some(key) = &options.deepl_key {
        let translation = &mut config.translation;
        let deepl = BackendKind::DeepL.to_lowercase_string();
        match translation.available_backends.iter_mut().find(|b| b.backend_type == deepl) {
            Some(backend_config) => backend_config.api_key = key.clone(),
            None => {
                let mut backend_config = BackendConfig::new(BackendKind::DeepL);
                backend_config.api_key = key.clone();
                translation.available_backends.push(backend_config);
            }
        }
    }
    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    }
}
