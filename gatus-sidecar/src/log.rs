//! Configures the global default tracing subscriber

use tracing_subscriber::{filter::ParseError, util::TryInitError, EnvFilter};

/// The filter applied when none is configured
pub const DEFAULT_FILTER: &str = "gatus_sidecar=info,warn";

/// Configures logging
#[derive(Clone, Debug, clap::Args)]
pub struct LogArgs {
    /// The filter that determines which spans and events are logged
    #[clap(long, env = "GATUS_SIDECAR_LOG", default_value = DEFAULT_FILTER)]
    pub log_level: String,

    /// The log format
    #[clap(long, value_enum, default_value = "plain")]
    pub log_format: LogFormat,
}

/// Configures whether logs are emitted as plain text (the default) or as
/// JSON-encoded messages
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    #[default]
    Plain,
    Json,
}

/// Indicates that logging could not be initialized
#[derive(Debug, thiserror::Error)]
pub enum LogInitError {
    #[error("invalid log filter: {0}")]
    Filter(#[from] ParseError),

    #[error(transparent)]
    Init(#[from] TryInitError),
}

// === impl LogArgs ===

impl Default for LogArgs {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_FILTER.to_string(),
            log_format: LogFormat::default(),
        }
    }
}

impl LogArgs {
    /// Sets the global default subscriber, failing if one is already set.
    pub fn try_init(self) -> Result<(), LogInitError> {
        let filter = EnvFilter::try_new(&self.log_level)?;
        self.log_format.try_init(filter)
    }
}

// === impl LogFormat ===

impl LogFormat {
    pub fn try_init(self, filter: EnvFilter) -> Result<(), LogInitError> {
        use tracing_subscriber::prelude::*;

        let registry = tracing_subscriber::registry().with(filter);
        match self {
            LogFormat::Plain => registry.with(tracing_subscriber::fmt::layer()).try_init()?,

            LogFormat::Json => {
                // Spans are emitted as a list, so the current span is omitted.
                let event_fmt = tracing_subscriber::fmt::format()
                    .json()
                    .with_span_list(true)
                    .with_current_span(false);
                let fmt = tracing_subscriber::fmt::layer()
                    .event_format(event_fmt)
                    .fmt_fields(tracing_subscriber::fmt::format::JsonFields::default());
                registry.with(fmt).try_init()?
            }
        };

        Ok(())
    }
}
