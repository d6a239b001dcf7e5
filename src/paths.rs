//! Where faq-rag keeps its data, model cache and config file
//!
//! XDG base directories on Linux, the usual `Library` folders on macOS and
//! `%LOCALAPPDATA%` / `%APPDATA%` on Windows. Every lookup falls back to the
//! current directory when the environment gives nothing usable.
use std::path::PathBuf;

const APP_DIR_NAME: &str = "faq-rag";

/// Base directory kinds
#[derive(Debug, Clone, Copy)]
enum BaseDir {
    Data,
    Cache,
    Config,
}

impl BaseDir {
    fn resolve(self) -> PathBuf {
        let env_path = |var: &str| std::env::var(var).ok().map(PathBuf::from);
        let home_join = |suffix: &str| env_path("HOME").map(|home| home.join(suffix));

        let resolved = if cfg!(target_os = "windows") {
            match self {
                BaseDir::Config => env_path("APPDATA"),
                BaseDir::Data | BaseDir::Cache => env_path("LOCALAPPDATA"),
            }
        } else if cfg!(target_os = "macos") {
            match self {
                BaseDir::Cache => home_join("Library/Caches"),
                BaseDir::Data | BaseDir::Config => home_join("Library/Application Support"),
            }
        } else {
            match self {
                BaseDir::Data => env_path("XDG_DATA_HOME").or_else(|| home_join(".local/share")),
                BaseDir::Cache => env_path("XDG_CACHE_HOME").or_else(|| home_join(".cache")),
                BaseDir::Config => env_path("XDG_CONFIG_HOME").or_else(|| home_join(".config")),
            }
        };

        resolved.unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Platform specific locations
pub struct PlatformPaths;

impl PlatformPaths {
    pub fn data_dir() -> PathBuf {
        BaseDir::Data.resolve()
    }

    pub fn cache_dir() -> PathBuf {
        BaseDir::Cache.resolve()
    }

    pub fn config_dir() -> PathBuf {
        BaseDir::Config.resolve()
    }

    /// `{data_dir}/faq-rag`
    pub fn project_data_dir() -> PathBuf {
        Self::data_dir().join(APP_DIR_NAME)
    }

    /// `{cache_dir}/faq-rag`
    pub fn project_cache_dir() -> PathBuf {
        Self::cache_dir().join(APP_DIR_NAME)
    }

    /// `{config_dir}/faq-rag`
    pub fn project_config_dir() -> PathBuf {
        Self::config_dir().join(APP_DIR_NAME)
    }

    /// LanceDB directory holding the documents and chunks tables
    pub fn default_lancedb_path() -> PathBuf {
        Self::project_data_dir().join("lancedb")
    }

    /// Downloaded embedding models
    pub fn default_model_cache_dir() -> PathBuf {
        Self::project_cache_dir().join("models")
    }

    pub fn default_config_path() -> PathBuf {
        Self::project_config_dir().join("config.toml")
    }
}
