use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use paths::PathContext;
use tracing_subscriber::{
    EnvFilter, Layer, filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Application infrastructure context: paths, version and the logging guard.
pub struct AppContext {
    pub path_context: PathContext,
    pub version: &'static str,
    log_file: PathBuf,
    /// Keeps the non-blocking log writer alive so buffered lines get flushed.
    _log_guard: tracing_appender::non_blocking::WorkerGuard,
}

impl AppContext {
    pub fn app_id(&self) -> &str {
        self.path_context.app_id()
    }

    pub fn version(&self) -> &'static str {
        self.version
    }

    pub fn path_context(&self) -> &PathContext {
        &self.path_context
    }

    /// File the current session logs to.
    pub fn log_file(&self) -> &Path {
        &self.log_file
    }
}

/// Application identity.
pub trait Application: Sized + 'static {
    const APP_ID: &'static str;
    const STUDIO: &'static str = "navshell";
    const PROJECT_ID: &'static str = "default";
}

/// Resolves paths and installs logging for an [`Application`].
pub struct AppBuilder<A: Application> {
    path_context: PathContext,
    version: &'static str,
    console: bool,
    default_level: LevelFilter,
    _marker: PhantomData<A>,
}

impl<A: Application> AppBuilder<A> {
    pub fn new(version: &'static str) -> Self {
        let path_context = PathContext::new(A::STUDIO, A::PROJECT_ID, A::APP_ID);

        #[cfg(debug_assertions)]
        let default_level = LevelFilter::INFO;
        #[cfg(not(debug_assertions))]
        let default_level = LevelFilter::WARN;

        Self {
            path_context,
            version,
            console: true,
            default_level,
            _marker: PhantomData,
        }
    }

    pub fn with_base_path(mut self, base: impl Into<PathBuf>) -> Self {
        self.path_context = PathContext::with_base_path(base, A::STUDIO, A::PROJECT_ID, A::APP_ID);
        self
    }

    /// Mirror log lines to stderr in addition to the log file.
    pub fn with_console(mut self, console: bool) -> Self {
        self.console = console;
        self
    }

    /// Level used when `RUST_LOG` is unset.
    pub fn with_default_level(mut self, level: LevelFilter) -> Self {
        self.default_level = level;
        self
    }

    pub fn path_context(&self) -> &PathContext {
        &self.path_context
    }

    /// Create directories and install the global subscriber.
    pub fn build(self) -> Result<AppContext, BoxError> {
        let path_context = self.path_context;
        path_context.ensure_directories()?;

        let log_file_path = path_context.log_file_now();
        let log_filename = log_file_path
            .file_name()
            .ok_or("log file path has no file name")?;
        let file_appender = tracing_appender::rolling::never(path_context.logs_dir(), log_filename);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        let filter = || {
            EnvFilter::builder()
                .with_default_directive(self.default_level.into())
                .from_env_lossy()
        };

        let file_layer = fmt::Layer::default()
            .with_target(false)
            .with_ansi(false)
            .with_writer(non_blocking)
            .with_filter(filter());

        let console_layer = self.console.then(|| {
            fmt::Layer::default()
                .with_target(false)
                .with_writer(std::io::stderr)
                .with_filter(filter())
        });

        tracing_subscriber::registry()
            .with(file_layer)
            .with(console_layer)
            .with(tracing_error::ErrorLayer::default())
            .try_init()?;

        tracing::debug!(log = %log_file_path.display(), app = A::APP_ID, "logging initialised");

        Ok(AppContext {
            path_context,
            version: self.version,
            log_file: log_file_path,
            _log_guard: guard,
        })
    }
}
