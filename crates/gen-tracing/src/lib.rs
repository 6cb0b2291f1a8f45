//! Shared tracing setup for the gen-compute workspace
//!
//! The encoder, constant pool and simulator only emit `tracing` events; this
//! crate is where binaries, tests and benches install a subscriber for them.
//! Configuration is an explicit [`TracingConfig`] value. Reading the
//! environment is opt-in through [`TracingConfig::from_env`].
//!
//! # Environment Variables
//!
//! | Variable                 | Effect                                         |
//! |--------------------------|------------------------------------------------|
//! | `GEN_TRACING_PROFILE`    | preset: `local` (default), `ci`, `performance` |
//! | `GEN_TRACING_DIRECTIVES` | filter directives, e.g. `gen_isa=trace,info`   |
//! | `GEN_TRACING_FORMAT`     | `pretty`, `compact` or `json`                  |
//! | `GEN_PERF_TRACING`       | `true`/`1`/`yes` enables performance spans     |
//! | `GEN_PERF_THRESHOLD_US`  | minimum span duration to log                   |

pub mod performance;

#[macro_use]
pub mod macros;

use std::env;

pub use tracing::{debug, debug_span, error, info, trace, warn};

use tracing::Subscriber;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt as tracing_fmt, EnvFilter, Registry};

/// How the shared subscriber formats and filters events
#[derive(Clone, Debug)]
pub struct TracingConfig {
    /// Filter directives. When absent, `RUST_LOG` and then
    /// `default_directive` are used.
    pub directives: Option<String>,
    pub default_directive: String,
    /// Show event targets (module paths)
    pub include_targets: bool,
    pub ansi: bool,
    /// Span lifecycle events to emit
    pub span_events: FmtSpan,
    pub output: TracingOutput,
    /// When false, [`TracingConfig::perf_span`] hands out no spans
    pub enable_performance_tracing: bool,
    /// Minimum duration in microseconds for a performance span to be logged
    pub performance_threshold_us: Option<u64>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self::for_local()
    }
}

impl TracingConfig {
    /// Pretty, coloured output for development
    pub fn for_local() -> Self {
        Self {
            directives: None,
            default_directive: "info".to_string(),
            include_targets: true,
            ansi: true,
            span_events: FmtSpan::NONE,
            output: TracingOutput::Pretty,
            enable_performance_tracing: cfg!(debug_assertions),
            performance_threshold_us: None,
        }
    }

    /// JSON without colour codes for log collection
    pub fn for_ci() -> Self {
        Self {
            ansi: false,
            output: TracingOutput::Json,
            enable_performance_tracing: false,
            ..Self::for_local()
        }
    }

    /// JSON with span close events and debug output from the core crates
    pub fn for_performance() -> Self {
        Self {
            directives: Some("gen_isa=debug,gen_sim=debug,info".to_string()),
            span_events: FmtSpan::CLOSE,
            enable_performance_tracing: true,
            ..Self::for_ci()
        }
    }

    /// Build a configuration from the `GEN_TRACING_*` and `GEN_PERF_*`
    /// environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from any key lookup, with the same keys as
    /// [`TracingConfig::from_env`]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let profile = lookup("GEN_TRACING_PROFILE")
            .unwrap_or_else(|| "local".to_string())
            .to_ascii_lowercase();
        let mut config = match profile.as_str() {
            "ci" => Self::for_ci(),
            "performance" => Self::for_performance(),
            _ => Self::for_local(),
        };

        if let Some(directives) = lookup("GEN_TRACING_DIRECTIVES").filter(|value| !value.trim().is_empty()) {
            config.directives = Some(directives);
        }

        if let Some(output) = lookup("GEN_TRACING_FORMAT").and_then(|value| TracingOutput::from_env_value(&value)) {
            config.output = output;
            if output == TracingOutput::Json {
                config.ansi = false;
            }
        }

        if let Some(enabled) = lookup("GEN_PERF_TRACING") {
            config.enable_performance_tracing =
                enabled == "1" || enabled.eq_ignore_ascii_case("true") || enabled.eq_ignore_ascii_case("yes");
        }

        if let Some(threshold) = lookup("GEN_PERF_THRESHOLD_US").and_then(|value| value.parse().ok()) {
            config.performance_threshold_us = Some(threshold);
        }

        config
    }

    /// A performance span honouring the enable flag and threshold
    pub fn perf_span(&self, name: impl Into<String>) -> Option<performance::PerformanceSpan> {
        self.enable_performance_tracing
            .then(|| performance::PerformanceSpan::new(name, self.performance_threshold_us))
    }

    fn resolve_filter(&self) -> Result<EnvFilter, TracingSetupError> {
        match &self.directives {
            Some(directives) => {
                EnvFilter::try_new(directives).map_err(|err| TracingSetupError::InvalidFilter(err.to_string()))
            }
            None => Ok(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.default_directive))),
        }
    }
}

/// Formatter layer output
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TracingOutput {
    Compact,
    Pretty,
    Json,
}

impl TracingOutput {
    fn from_env_value(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Some(Self::Compact),
            "pretty" => Some(Self::Pretty),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Errors raised while installing the subscriber
#[derive(Debug, thiserror::Error)]
pub enum TracingSetupError {
    #[error("invalid tracing directive: {0}")]
    InvalidFilter(String),

    /// Usually because a global subscriber is already set
    #[error("failed to install global tracing subscriber: {0}")]
    SubscriberInit(#[from] tracing_subscriber::util::TryInitError),
}

/// Build a subscriber from `config` without installing it
pub fn build_subscriber(config: &TracingConfig) -> Result<impl Subscriber + Send + Sync, TracingSetupError> {
    let filter = config.resolve_filter()?;
    Ok(Registry::default().with(format_layer(config)).with(filter))
}

fn format_layer(config: &TracingConfig) -> Box<dyn Layer<Registry> + Send + Sync> {
    let layer = tracing_fmt::layer()
        .with_target(config.include_targets)
        .with_span_events(config.span_events.clone());
    match config.output {
        TracingOutput::Compact => Box::new(layer.compact().with_ansi(config.ansi)),
        TracingOutput::Pretty => Box::new(layer.pretty().with_ansi(config.ansi)),
        TracingOutput::Json => Box::new(layer.json().with_ansi(false)),
    }
}

/// Install the configured subscriber as the process-wide default
pub fn init_global_tracing(config: &TracingConfig) -> Result<(), TracingSetupError> {
    build_subscriber(config)?.try_init()?;
    Ok(())
}
