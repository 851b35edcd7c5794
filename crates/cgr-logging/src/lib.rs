//! Structured logging for contact graph routing nodes
//!
//! Routing decisions are logged through `tracing`; this crate installs the
//! subscriber that renders them.
//!
//! # Features
//!
//! - **JSONL Output**: Structured JSON lines for log aggregation (default)
//! - **Pretty Output**: Human-readable console logs for development
//! - **Node Context**: Spans are stamped with the local node number, so
//!   several simulated nodes can share one process
//! - **File Rotation**: Daily/hourly log rotation via tracing-appender
//!
//! # Quick Start
//!
//! ```ignore
//! use cgr_logging::{CgrSubscriberBuilder, LogConfig};
//!
//! // JSONL to console
//! CgrSubscriberBuilder::new().init();
//!
//! // Pretty output with every routing step
//! CgrSubscriberBuilder::new()
//!     .with_config(LogConfig::routing_trace())
//!     .init();
//! ```
//!
//! # Node Context
//!
//! ```ignore
//! use cgr_core::NodeNbr;
//! use cgr_logging::NodeContextGuard;
//!
//! let _guard = NodeContextGuard::new(NodeNbr(7));
//! // Spans opened in this scope are attributed to ipn:7
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod layers;

pub use config::{ConsoleConfig, FileConfig, JsonlConfig, LogConfig, RotationStrategy};
pub use context::{NodeContextData, NodeContextGuard};
pub use error::{LoggingError, LoggingResult};
pub use layers::{NodeContextExtension, NodeContextLayer, jsonl_layer};

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry};

/// Builder for configuring and installing the logging subscriber
///
/// By default, console output uses JSONL format. Use
/// [`LogConfig::development()`] for human-readable output.
pub struct CgrSubscriberBuilder {
    config: LogConfig,
}

impl CgrSubscriberBuilder {
    /// Create a builder with the default configuration (JSONL to console)
    pub fn new() -> Self {
        Self {
            config: LogConfig::default(),
        }
    }

    /// Use a specific configuration
    pub fn with_config(mut self, config: LogConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the default log level
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.config.default_level = level.into();
        self
    }

    /// Override the level for one target
    pub fn with_target(mut self, target: impl Into<String>, level: impl Into<String>) -> Self {
        self.config.targets.insert(target.into(), level.into());
        self
    }

    /// Enable or disable console output
    pub fn with_console(mut self, enabled: bool) -> Self {
        self.config.console.enabled = enabled;
        self
    }

    /// Configure file output
    pub fn with_file_output(mut self, config: FileConfig) -> Self {
        self.config.file = Some(config);
        self
    }

    /// Install the subscriber globally
    ///
    /// Returns a guard that must be kept alive while file output is in
    /// use. Setup failures are reported on stderr and leave logging off.
    pub fn init(self) -> Option<WorkerGuard> {
        match self.try_init() {
            Ok(guard) => guard,
            Err(e) => {
                eprintln!("Warning: Failed to initialize logging: {}", e);
                None
            }
        }
    }

    /// Install the subscriber globally, reporting failures
    ///
    /// Fails if a global subscriber has already been set, so test binaries
    /// can call it from every test and ignore the error.
    pub fn try_init(self) -> LoggingResult<Option<WorkerGuard>> {
        let filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::try_new(self.config.directives())?,
        };

        let (file_writer, guard) = match &self.config.file {
            Some(file_config) => {
                let (writer, guard) = file_writer(file_config)?;
                (Some(writer), Some(guard))
            }
            None => (None, None),
        };

        let console = &self.config.console;
        let pretty_console = (console.enabled && console.pretty).then(|| {
            tracing_subscriber::fmt::layer()
                .with_ansi(console.ansi)
                .with_target(true)
                .with_test_writer()
        });
        let jsonl_console = (console.enabled && !console.pretty)
            .then(|| jsonl_layer(&self.config.jsonl, std::io::stdout));
        let jsonl_file = file_writer.map(|writer| jsonl_layer(&self.config.jsonl, writer));

        Registry::default()
            .with(filter)
            .with(NodeContextLayer::new())
            .with(pretty_console)
            .with(jsonl_console)
            .with(jsonl_file)
            .try_init()?;

        Ok(guard)
    }
}

impl Default for CgrSubscriberBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Non-blocking writer for the configured log file
fn file_writer(config: &FileConfig) -> LoggingResult<(NonBlocking, WorkerGuard)> {
    let rotation = match config.rotation {
        RotationStrategy::Daily => Rotation::DAILY,
        RotationStrategy::Hourly => Rotation::HOURLY,
        RotationStrategy::Never => Rotation::NEVER,
    };
    let mut builder = RollingFileAppender::builder()
        .rotation(rotation)
        .filename_prefix(&config.prefix)
        .filename_suffix("log");
    if let Some(max_files) = config.max_files {
        builder = builder.max_log_files(max_files);
    }
    let appender = builder.build(&config.directory)?;
    Ok(tracing_appender::non_blocking(appender))
}

/// Initialize logging with default settings (JSONL to console)
pub fn init_default() {
    CgrSubscriberBuilder::new().init();
}

/// Initialize logging for development (verbose, pretty console output)
pub fn init_development() {
    CgrSubscriberBuilder::new()
        .with_config(LogConfig::development())
        .init();
}

/// Initialize logging for tests; safe to call from every test
pub fn init_testing() {
    let _ = CgrSubscriberBuilder::new()
        .with_config(LogConfig::testing())
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_creation() {
        let builder = CgrSubscriberBuilder::new();
        assert_eq!(builder.config.default_level, "info");
        assert!(!builder.config.console.pretty);
    }

    #[test]
    fn test_builder_with_config() {
        let builder = CgrSubscriberBuilder::new().with_config(LogConfig::development());
        assert_eq!(builder.config.default_level, "debug");
        assert!(builder.config.console.pretty);
    }

    #[test]
    fn test_builder_overrides() {
        let builder = CgrSubscriberBuilder::new()
            .with_level("trace")
            .with_target("cgr_core", "warn")
            .with_console(false);
        assert_eq!(builder.config.directives(), "trace,cgr_core=warn");
        assert!(!builder.config.console.enabled);
    }

    #[test]
    fn test_second_init_is_an_error() {
        init_testing();
        let again = CgrSubscriberBuilder::new()
            .with_config(LogConfig::testing())
            .try_init();
        assert!(matches!(again, Err(LoggingError::AlreadyInitialized(_))));
    }
}
