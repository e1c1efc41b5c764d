use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Filter directive used when neither `SPIRAL_LAG_LOG` nor `RUST_LOG` is set.
pub const DEFAULT_DIRECTIVE: &str = "info,spiral_lag=info";

const FILTER_VAR: &str = "SPIRAL_LAG_LOG";
const CHROME_VAR: &str = "SPIRAL_TRACE_CHROME";

static INITIALISED: OnceLock<()> = OnceLock::new();
static CHROME_GUARD: OnceLock<Mutex<Option<tracing_chrome::FlushGuard>>> = OnceLock::new();

/// Knobs for the global subscriber installed by [`init_with`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TracingOptions {
    /// `EnvFilter` directive, e.g. `spiral_lag=trace` to see every shift.
    pub directive: String,
    /// When set, a Chrome trace is written to this file as well.
    pub chrome_path: Option<PathBuf>,
    pub ansi: bool,
}

impl Default for TracingOptions {
    fn default() -> Self {
        Self {
            directive: DEFAULT_DIRECTIVE.to_string(),
            chrome_path: None,
            ansi: std::io::stdout().is_terminal(),
        }
    }
}

impl TracingOptions {
    /// Reads `SPIRAL_LAG_LOG` (falling back to `RUST_LOG`) and
    /// `SPIRAL_TRACE_CHROME`.
    pub fn from_env() -> Result<Self, InitError> {
        let mut options = Self::default();
        if let Some(directive) = read_var(FILTER_VAR)?.or(read_var("RUST_LOG")?) {
            options.directive = directive;
        }
        options.chrome_path = read_var(CHROME_VAR)?.map(PathBuf::from);
        Ok(options)
    }
}

/// Configures the global tracing subscriber from the environment.
pub fn init_tracing() -> Result<(), InitError> {
    init_with(TracingOptions::from_env()?)
}

/// Installs the global subscriber once; later calls fail.
///
/// A directive that does not parse is reported without consuming the single
/// initialisation.
pub fn init_with(options: TracingOptions) -> Result<(), InitError> {
    let filter = EnvFilter::try_new(&options.directive).map_err(|err| InitError::Directive {
        directive: options.directive.clone(),
        message: err.to_string(),
    })?;
    INITIALISED
        .set(())
        .map_err(|_| InitError::AlreadyInitialised)?;

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(options.ansi);
    let (chrome_layer, guard) = match options.chrome_path {
        Some(path) => {
            let (layer, guard) = tracing_chrome::ChromeLayerBuilder::new()
                .file(path)
                .include_args(true)
                .build();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    Registry::default()
        .with(filter)
        .with(fmt_layer)
        .with(chrome_layer)
        .try_init()
        .map_err(|err| InitError::Subscriber(err.to_string()))?;

    if let Some(guard) = guard {
        let cell = CHROME_GUARD.get_or_init(|| Mutex::new(None));
        if let Ok(mut slot) = cell.lock() {
            *slot = Some(guard);
        }
    }
    Ok(())
}

/// Flushes and closes the Chrome trace file, if one was opened.
pub fn flush_chrome_trace() {
    if let Some(cell) = CHROME_GUARD.get() {
        if let Ok(mut slot) = cell.lock() {
            slot.take();
        }
    }
}

fn read_var(name: &'static str) -> Result<Option<String>, InitError> {
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => Ok(Some(raw)),
        Ok(_) => Ok(None),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(InitError::Env { var: name, source: err }),
    }
}

/// Errors emitted when configuring the tracing subscriber.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("tracing has already been initialised")]
    AlreadyInitialised,
    #[error("failed to read {var}: {source}")]
    Env {
        var: &'static str,
        #[source]
        source: std::env::VarError,
    },
    #[error("invalid filter directive {directive:?}: {message}")]
    Directive { directive: String, message: String },
    #[error("failed to install subscriber: {0}")]
    Subscriber(String),
}
