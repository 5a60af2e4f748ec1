//! Configuration management.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::classify::ClassifierConfig;
use crate::models::ScheduleKind;
use crate::repository::CatalogContext;
use crate::services::convert::OfficeConverter;
use crate::services::update::DEFAULT_WORKERS;
use crate::storage::{LocalDiskBackend, RemoteDriveBackend, StorageBackend, StorageFanout};

/// Default database filename.
pub const DEFAULT_DATABASE_FILENAME: &str = "timetable.db";

/// Default stored-files subdirectory name.
const STORAGE_SUBDIR: &str = "files";

/// Name of the backend used when none is configured.
pub const DEFAULT_BACKEND_NAME: &str = "local";

/// A storage backend entry in the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageBackendConfig {
    /// Copy files under a directory (default: the data dir's `files/`).
    Local {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<String>,
    },
    /// Upload files with HTTP `PUT`.
    Remote {
        name: String,
        base_url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        token: Option<String>,
        /// Environment variable holding the token; wins over `token`.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        token_env: Option<String>,
    },
}

impl StorageBackendConfig {
    pub fn name(&self) -> &str {
        match self {
            Self::Local { name, .. } | Self::Remote { name, .. } => name,
        }
    }
}

/// Legacy format conversion settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    pub enabled: bool,
    /// Office suite executable, looked up in PATH.
    pub binary: String,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            binary: "soffice".to_string(),
        }
    }
}

/// Resolved backend, ready to build.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedBackend {
    Local {
        name: String,
        root: PathBuf,
    },
    Remote {
        name: String,
        base_url: String,
        token: Option<String>,
    },
}

/// Application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base data directory.
    pub data_dir: PathBuf,
    /// Database filename.
    pub database_filename: String,
    /// Database URL (overrides data_dir/database_filename if set).
    pub database_url: Option<String>,
    /// Root of the default local storage backend.
    pub storage_dir: PathBuf,
    /// Parent directory for per-file scratch space (None = system temp dir).
    pub scratch_dir: Option<PathBuf>,
    /// User agent for HTTP requests.
    pub user_agent: String,
    /// Request timeout in seconds.
    pub request_timeout: u64,
    /// Concurrent per-file tasks in a pass.
    pub workers: usize,
    /// Configured storage backends (empty = one local backend).
    pub storage: Vec<ResolvedBackend>,
    pub converter: ConverterConfig,
    pub classifier: ClassifierConfig,
    pub kinds: Vec<ScheduleKind>,
}

impl Default for Settings {
    fn default() -> Self {
        // Falls back gracefully: data dir -> home dir -> current dir
        let data_dir = dirs::data_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("timetable-sync");

        Self {
            storage_dir: data_dir.join(STORAGE_SUBDIR),
            data_dir,
            database_filename: DEFAULT_DATABASE_FILENAME.to_string(),
            database_url: None,
            scratch_dir: None,
            user_agent: "timetable-sync/0.1".to_string(),
            request_timeout: 60,
            workers: DEFAULT_WORKERS,
            storage: Vec::new(),
            converter: ConverterConfig::default(),
            classifier: ClassifierConfig::default(),
            kinds: ScheduleKind::defaults(),
        }
    }
}

impl Settings {
    /// Create settings with a custom data directory.
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            storage_dir: data_dir.join(STORAGE_SUBDIR),
            data_dir,
            ..Default::default()
        }
    }

    /// Get the database URL, constructing from path if not explicitly set.
    pub fn database_url(&self) -> String {
        if let Some(ref url) = self.database_url {
            url.clone()
        } else {
            format!("sqlite:{}", self.database_path().display())
        }
    }

    /// Get the full path to the database file.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_filename)
    }

    /// Check if the database appears to be initialized.
    pub fn database_exists(&self) -> bool {
        match self.database_url {
            Some(ref url) => Path::new(url.trim_start_matches("sqlite:")).exists(),
            None => self.database_path().exists(),
        }
    }

    /// Ensure all directories exist.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        for backend in self.storage_backends() {
            if let ResolvedBackend::Local { root, .. } = backend {
                std::fs::create_dir_all(root)?;
            }
        }
        if let Some(ref scratch) = self.scratch_dir {
            std::fs::create_dir_all(scratch)?;
        }
        Ok(())
    }

    /// Create a catalog context for the configured database.
    pub fn create_context(&self) -> CatalogContext {
        CatalogContext::from_url(&self.database_url())
    }

    /// Configured backends, or the default local backend.
    pub fn storage_backends(&self) -> Vec<ResolvedBackend> {
        if self.storage.is_empty() {
            vec![ResolvedBackend::Local {
                name: DEFAULT_BACKEND_NAME.to_string(),
                root: self.storage_dir.clone(),
            }]
        } else {
            self.storage.clone()
        }
    }

    /// Build the storage fan-out in configuration order.
    pub fn storage_fanout(&self, client: &Client) -> StorageFanout {
        let backends = self
            .storage_backends()
            .into_iter()
            .map(|backend| -> Arc<dyn StorageBackend> {
                match backend {
                    ResolvedBackend::Local { name, root } => {
                        Arc::new(LocalDiskBackend::new(name, root))
                    }
                    ResolvedBackend::Remote {
                        name,
                        base_url,
                        token,
                    } => Arc::new(RemoteDriveBackend::new(
                        name,
                        base_url,
                        token,
                        client.clone(),
                    )),
                }
            })
            .collect();
        StorageFanout::new(backends)
    }

    /// The office converter, when enabled and installed.
    pub fn converter(&self) -> Option<OfficeConverter> {
        if !self.converter.enabled {
            return None;
        }
        let converter = OfficeConverter::new(&self.converter.binary);
        if converter.is_available() {
            Some(converter)
        } else {
            tracing::warn!(
                "'{}' not found; legacy spreadsheets will be fingerprinted unconverted",
                self.converter.binary
            );
            None
        }
    }
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Data directory path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,
    /// Database filename.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    /// Root of the default local storage backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_dir: Option<String>,
    /// Scratch directory for downloads.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scratch_dir: Option<String>,
    /// User agent string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// Request timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<u64>,
    /// Concurrent per-file tasks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,
    /// Storage backends, in fan-out order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub storage: Vec<StorageBackendConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub converter: Option<ConverterConfig>,
    /// Classifier vocabularies and thresholds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classifier: Option<ClassifierConfig>,
    /// Schedule kinds, paired with crawl roots by position.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub kinds: Vec<ScheduleKind>,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a specific file path.
    /// Supports JSON, TOML and YAML based on file extension.
    pub async fn load_from_path(path: &Path) -> Result<Self, String> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

        let mut config: Config = match ext {
            "toml" => toml::from_str(&contents)
                .map_err(|e| format!("Failed to parse TOML config: {}", e))?,
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .map_err(|e| format!("Failed to parse YAML config: {}", e))?,
            _ => serde_json::from_str(&contents)
                .map_err(|e| format!("Failed to parse JSON config: {}", e))?,
        };

        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Get the base directory for resolving relative paths.
    /// Returns the config file's parent directory if available, otherwise None.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Resolve a path that may be relative to the config file.
    /// - Absolute paths are returned as-is
    /// - Paths starting with ~ are expanded
    /// - Relative paths are resolved relative to `base_dir`
    pub fn resolve_path(&self, path_str: &str, base_dir: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(path_str);
        let path = Path::new(expanded.as_ref());

        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }

    /// Apply configuration to settings.
    /// `base_dir` is used to resolve relative paths (typically config file dir or CWD).
    pub fn apply_to_settings(&self, settings: &mut Settings, base_dir: &Path) {
        if let Some(ref data_dir) = self.data_dir {
            settings.data_dir = self.resolve_path(data_dir, base_dir);
            settings.storage_dir = settings.data_dir.join(STORAGE_SUBDIR);
        }
        if let Some(ref database) = self.database {
            settings.database_filename = database.clone();
        }
        if let Some(ref storage_dir) = self.storage_dir {
            settings.storage_dir = self.resolve_path(storage_dir, base_dir);
        }
        if let Some(ref scratch_dir) = self.scratch_dir {
            settings.scratch_dir = Some(self.resolve_path(scratch_dir, base_dir));
        }
        if let Some(ref user_agent) = self.user_agent {
            settings.user_agent = user_agent.clone();
        }
        if let Some(timeout) = self.request_timeout {
            settings.request_timeout = timeout;
        }
        if let Some(workers) = self.workers {
            settings.workers = workers.max(1);
        }
        if !self.storage.is_empty() {
            settings.storage = self
                .storage
                .iter()
                .map(|backend| self.resolve_backend(backend, &settings.storage_dir, base_dir))
                .collect();
        }
        if let Some(ref converter) = self.converter {
            settings.converter = converter.clone();
        }
        if let Some(ref classifier) = self.classifier {
            settings.classifier = classifier.clone();
        }
        if !self.kinds.is_empty() {
            settings.kinds = self.kinds.clone();
        }
    }

    fn resolve_backend(
        &self,
        backend: &StorageBackendConfig,
        storage_dir: &Path,
        base_dir: &Path,
    ) -> ResolvedBackend {
        match backend {
            StorageBackendConfig::Local { name, path } => ResolvedBackend::Local {
                name: name.clone(),
                root: path
                    .as_deref()
                    .map(|p| self.resolve_path(p, base_dir))
                    .unwrap_or_else(|| storage_dir.to_path_buf()),
            },
            StorageBackendConfig::Remote {
                name,
                base_url,
                token,
                token_env,
            } => {
                let from_env = token_env
                    .as_deref()
                    .and_then(|var| std::env::var(var).ok())
                    .filter(|t| !t.is_empty());
                ResolvedBackend::Remote {
                    name: name.clone(),
                    base_url: base_url.clone(),
                    token: from_env.or_else(|| token.clone()),
                }
            }
        }
    }
}

/// Options for loading settings.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit config file path (overrides auto-discovery).
    pub config_path: Option<PathBuf>,
    /// Use CWD for relative paths instead of config file directory.
    pub use_cwd: bool,
    /// Data directory or database file (--data flag).
    pub data: Option<PathBuf>,
}

/// Resolved data path: directory plus database filename.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedData {
    pub data_dir: PathBuf,
    pub database_filename: String,
}

impl ResolvedData {
    /// Resolve a data path to a directory and database filename.
    /// - If path is a .db file, its parent is the data directory
    /// - Otherwise the path is the data directory with the default filename
    pub fn from_path(path: &Path) -> Self {
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .unwrap_or_else(|_| PathBuf::from("."))
                .join(path)
        };

        let is_db_file = path
            .extension()
            .is_some_and(|ext| ext == "db" || ext == "sqlite" || ext == "sqlite3")
            || path.is_file();

        if is_db_file {
            Self {
                database_filename: path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or(DEFAULT_DATABASE_FILENAME)
                    .to_string(),
                data_dir: path.parent().unwrap_or(Path::new(".")).to_path_buf(),
            }
        } else {
            Self {
                data_dir: path,
                database_filename: DEFAULT_DATABASE_FILENAME.to_string(),
            }
        }
    }
}

const CONFIG_EXTENSIONS: &[&str] = &["toml", "yaml", "yml", "json"];

/// Look for `ttsync.{ext}` or `config.{ext}` in a directory.
fn find_config_in(dir: &Path) -> Option<PathBuf> {
    for basename in ["ttsync", "config"] {
        for ext in CONFIG_EXTENSIONS {
            let path = dir.join(format!("{}.{}", basename, ext));
            if path.is_file() {
                return Some(path);
            }
        }
    }
    None
}

/// Load config from file sources.
async fn load_file_config(options: &LoadOptions, data_dir: Option<&Path>) -> Config {
    // Priority 1: Explicit --config flag
    if let Some(ref config_path) = options.config_path {
        return match Config::load_from_path(config_path).await {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("{}; using defaults", e);
                Config::default()
            }
        };
    }

    // Priority 2: Config next to the data dir, then the user config dir
    let candidates = [
        data_dir.and_then(find_config_in),
        dirs::config_dir().and_then(|dir| find_config_in(&dir.join("timetable-sync"))),
    ];
    for config_path in candidates.into_iter().flatten() {
        tracing::debug!("Found config: {}", config_path.display());
        match Config::load_from_path(&config_path).await {
            Ok(config) => return config,
            Err(e) => tracing::warn!("{}", e),
        }
    }

    Config::default()
}

/// Load settings with explicit options.
/// Returns (Settings, Config) tuple.
pub async fn load_settings_with_options(options: LoadOptions) -> (Settings, Config) {
    let resolved_data = options.data.as_deref().map(ResolvedData::from_path);

    let config = load_file_config(
        &options,
        resolved_data.as_ref().map(|r| r.data_dir.as_path()),
    )
    .await;

    let mut settings = Settings::default();

    // Determine base directory for resolving relative paths
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let base_dir = if options.use_cwd {
        cwd
    } else {
        config.base_dir().unwrap_or(cwd)
    };

    config.apply_to_settings(&mut settings, &base_dir);

    // --data override takes precedence for data_dir and database filename
    if let Some(resolved) = resolved_data {
        if config.storage_dir.is_none() {
            settings.storage_dir = resolved.data_dir.join(STORAGE_SUBDIR);
        }
        settings.data_dir = resolved.data_dir;
        settings.database_filename = resolved.database_filename;
    }

    // DATABASE_URL environment variable takes highest precedence
    if let Some(database_url) = std::env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()) {
        tracing::debug!("Using DATABASE_URL from environment: {}", database_url);
        settings.database_url = Some(database_url);
    }

    (settings, config)
}
