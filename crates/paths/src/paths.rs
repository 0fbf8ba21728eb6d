//! Project-aware filesystem locations for the shell and its stores.

use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Where the binary is running from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeEnvironment {
    /// Started through cargo or from a `target/` directory.
    Development,
    /// Installed binary.
    Production,
}

/// Paths below `<base>/<studio>/<project>` for one application.
#[derive(Debug, Clone)]
pub struct PathContext {
    environment: RuntimeEnvironment,
    base_path: Arc<Path>,
    studio: String,
    project_id: String,
    app_id: &'static str,
}

impl PathContext {
    /// Detects the environment and picks a platform base directory.
    pub fn new(studio: impl Into<String>, project_id: impl Into<String>, app_id: &'static str) -> Self {
        let environment = Self::detect_environment();
        let base_path = Self::default_base_path(environment);
        Self::build(environment, base_path, studio, project_id, app_id)
    }

    /// Uses `base_path` verbatim, e.g. from an environment override or a test.
    pub fn with_base_path(
        base_path: impl Into<PathBuf>,
        studio: impl Into<String>,
        project_id: impl Into<String>,
        app_id: &'static str,
    ) -> Self {
        Self::build(
            Self::detect_environment(),
            base_path.into(),
            studio,
            project_id,
            app_id,
        )
    }

    fn build(
        environment: RuntimeEnvironment,
        base_path: PathBuf,
        studio: impl Into<String>,
        project_id: impl Into<String>,
        app_id: &'static str,
    ) -> Self {
        Self {
            environment,
            base_path: base_path.into(),
            studio: studio.into(),
            project_id: project_id.into(),
            app_id,
        }
    }

    fn detect_environment() -> RuntimeEnvironment {
        let in_target_dir = std::env::current_exe()
            .map(|exe| exe.components().any(|c| c.as_os_str() == "target"))
            .unwrap_or(false);
        if in_target_dir || std::env::var_os("CARGO").is_some() {
            RuntimeEnvironment::Development
        } else {
            RuntimeEnvironment::Production
        }
    }

    fn default_base_path(environment: RuntimeEnvironment) -> PathBuf {
        match environment {
            RuntimeEnvironment::Development => std::env::current_dir()
                .unwrap_or_else(|_| PathBuf::from("."))
                .join(".out"),
            // Platform data dir: Application Support, LocalAppData or XDG_DATA_HOME.
            RuntimeEnvironment::Production => dirs::data_local_dir()
                .map(|dir| dir.join("navshell"))
                .unwrap_or_else(|| PathBuf::from(".")),
        }
    }

    pub fn environment(&self) -> RuntimeEnvironment {
        self.environment
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn studio(&self) -> &str {
        &self.studio
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn app_id(&self) -> &str {
        self.app_id
    }

    /// `<base>/<studio>/<project_id>`
    pub fn project_root(&self) -> PathBuf {
        self.base_path.join(&self.studio).join(&self.project_id)
    }

    /// Optional user configuration: `<project>/<app_id>.toml`
    pub fn config_file(&self) -> PathBuf {
        self.project_root().join(format!("{}.toml", self.app_id))
    }

    /// `<project>/data/`
    pub fn data_dir(&self) -> PathBuf {
        self.project_root().join("data")
    }

    /// Key-value store holding the pending navigation action:
    /// `<project>/data/<app_id>.store.ron`
    pub fn store_file(&self) -> PathBuf {
        self.data_dir().join(format!("{}.store.ron", self.app_id))
    }

    /// `<project>/logs/`
    pub fn logs_dir(&self) -> PathBuf {
        self.project_root().join("logs")
    }

    /// `<project>/logs/<app_id>.<timestamp>.log`
    pub fn log_file(&self, timestamp: &str) -> PathBuf {
        self.logs_dir()
            .join(format!("{}.{}.log", self.app_id, timestamp))
    }

    pub fn log_file_now(&self) -> PathBuf {
        let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S").to_string();
        self.log_file(&timestamp)
    }

    pub fn ensure_directories(&self) -> std::io::Result<()> {
        for dir in [self.project_root(), self.data_dir(), self.logs_dir()] {
            if !dir.exists() {
                std::fs::create_dir_all(&dir)?;
            }
        }
        Ok(())
    }
}
