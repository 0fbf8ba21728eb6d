//! Report hooks for the `navshell` binary.
//!
//! Panics are written to the session's log file through the regular tracing
//! subscriber, so [`init`] runs after logging is up. The hook returns and lets
//! the panic unwind: dropping the app context on the way out flushes the
//! non-blocking file writer.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use color_eyre::Result;
use tracing::error;

static INIT: OnceLock<()> = OnceLock::new();

/// Where a crash report points the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrashContext {
    app: &'static str,
    version: &'static str,
    log_file: PathBuf,
}

impl CrashContext {
    pub fn new(app: &'static str, version: &'static str, log_file: impl Into<PathBuf>) -> Self {
        Self {
            app,
            version,
            log_file: log_file.into(),
        }
    }

    pub fn app(&self) -> &'static str {
        self.app
    }

    pub fn log_file(&self) -> &Path {
        &self.log_file
    }

    /// Footer printed below every panic and error report.
    pub fn section(&self) -> String {
        format!(
            "{} {} hit a bug. The log at {} holds the events leading up to it.",
            self.app,
            self.version,
            self.log_file.display()
        )
    }

    #[cfg(not(debug_assertions))]
    fn metadata(&self) -> human_panic::Metadata {
        human_panic::Metadata::new(self.app, self.version)
            .support(format!("Attach {} to the report.", self.log_file.display()))
    }
}

/// Install eyre and panic hooks. Calling it again is a no-op.
pub fn init(crash: &CrashContext) -> Result<()> {
    if INIT.get().is_some() {
        return Ok(());
    }

    let (panic_hook, eyre_hook) = color_eyre::config::HookBuilder::default()
        .panic_section(crash.section())
        .capture_span_trace_by_default(true)
        .display_location_section(false)
        .display_env_section(false)
        .try_into_hooks()?;
    eyre_hook.install()?;

    let crash = crash.clone();
    std::panic::set_hook(Box::new(move |panic_info| {
        let report = panic_hook.panic_report(panic_info).to_string();
        error!(app = crash.app(), "panic: {}", strip_ansi_escapes::strip_str(&report));

        #[cfg(not(debug_assertions))]
        {
            use human_panic::{handle_dump, print_msg};
            let metadata = crash.metadata();
            let dump = handle_dump(&metadata, panic_info);
            if let Err(err) = print_msg(dump, &metadata) {
                error!(error = %err, "failed to print crash message");
            }
            eprintln!("{report}");
        }

        #[cfg(debug_assertions)]
        {
            better_panic::Settings::auto()
                .most_recent_first(false)
                .lineno_suffix(true)
                .verbosity(better_panic::Verbosity::Full)
                .create_panic_handler()(panic_info);
        }
    }));

    let _ = INIT.set(());
    Ok(())
}
