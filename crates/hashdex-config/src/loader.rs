//! Layered configuration loading
//!
//! Defaults are overlaid by `~/.hashdex/config.toml`, then by
//! `.hashdex/config.toml` in the working directory, then by CLI overrides.

use crate::error::{ConfigError, FileAction};
use crate::{
    ConfigOverrides, HashdexConfig, IndexConfig, LoggingConfig, QueryConfig, StoreConfig,
};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

const CONFIG_FILE_NAME: &str = "config.toml";

/// Directory name used both under home and under the working directory.
const CONFIG_DIR: &str = ".hashdex";

/// Discovers and layers configuration files.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Directory holding the global config, `None` without a home directory
    global_dir: Option<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Loader rooted at `~/.hashdex` for the global layer.
    pub fn new() -> Self {
        Self {
            global_dir: dirs::home_dir().map(|home| home.join(CONFIG_DIR)),
        }
    }

    /// Loader reading the global layer from `global_dir` instead of home.
    pub fn with_global_dir(global_dir: impl Into<PathBuf>) -> Self {
        Self {
            global_dir: Some(global_dir.into()),
        }
    }

    pub fn global_config_path(&self) -> Option<PathBuf> {
        self.global_dir.as_ref().map(|dir| dir.join(CONFIG_FILE_NAME))
    }

    pub fn local_config_path(&self, root: &Path) -> PathBuf {
        root.join(CONFIG_DIR).join(CONFIG_FILE_NAME)
    }

    /// Effective configuration for `root`: defaults, then the global file,
    /// then the local file, then `overrides`. The result is validated.
    pub fn load(
        &self,
        root: &Path,
        overrides: Option<&ConfigOverrides>,
    ) -> Result<HashdexConfig, ConfigError> {
        let layers = [
            ("global", self.global_config_path()),
            ("local", Some(self.local_config_path(root))),
        ];

        let mut config = HashdexConfig::default();
        for (scope, path) in layers {
            if let Some(layer) = read_layer(scope, path.as_deref())? {
                config = merge_configs(config, layer);
            }
        }

        if let Some(overrides) = overrides {
            config.apply_overrides(overrides);
        }

        config.validate()?;
        Ok(config)
    }

    /// Load and validate one explicit file, skipping discovery.
    pub fn load_file(&self, path: &Path) -> Result<HashdexConfig, ConfigError> {
        let config = load_config_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Write a default `.hashdex/config.toml` under `root` unless one exists.
    pub fn init_local(&self, root: &Path) -> Result<PathBuf, ConfigError> {
        let path = self.local_config_path(root);
        if !path.exists() {
            save_config_file(&path, &HashdexConfig::default())?;
        }
        Ok(path)
    }
}

/// One config layer, or `None` when its file is absent.
fn read_layer(scope: &str, path: Option<&Path>) -> Result<Option<HashdexConfig>, ConfigError> {
    let Some(path) = path else {
        debug!("No {} config location, skipping", scope);
        return Ok(None);
    };
    if !path.exists() {
        trace!("No {} config at {}", scope, path.display());
        return Ok(None);
    }

    debug!("Loading {} config from {}", scope, path.display());
    load_config_file(path).map(Some)
}

/// Load a configuration file from disk.
fn load_config_file(path: &Path) -> Result<HashdexConfig, ConfigError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::io(FileAction::Read, path, e))?;

    toml::from_str(&content).map_err(|e| ConfigError::parse(path, e))
}

/// Save a configuration file to disk, creating its directory if needed.
fn save_config_file(path: &Path, config: &HashdexConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ConfigError::io(FileAction::CreateDir, parent, e))?;
        }
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|e| ConfigError::io(FileAction::Write, path, e))
}

/// The overlay value unless it is still the default.
fn layered<T: PartialEq>(base: T, overlay: T, default: &T) -> T {
    if overlay != *default {
        overlay
    } else {
        base
    }
}

/// Merge two configurations, with `overlay` taking precedence.
///
/// A setting left at its default in the overlay keeps the base value.
/// Document types are merged by name; an overlay declaration replaces the
/// base declaration of the same name wholesale.
fn merge_configs(base: HashdexConfig, overlay: HashdexConfig) -> HashdexConfig {
    let defaults = HashdexConfig::default();

    let store = StoreConfig {
        url: layered(base.store.url, overlay.store.url, &defaults.store.url),
        username: overlay.store.username.or(base.store.username),
        password: overlay.store.password.or(base.store.password),
        scan_batch_size: layered(
            base.store.scan_batch_size,
            overlay.store.scan_batch_size,
            &defaults.store.scan_batch_size,
        ),
        connect_timeout_secs: layered(
            base.store.connect_timeout_secs,
            overlay.store.connect_timeout_secs,
            &defaults.store.connect_timeout_secs,
        ),
    };

    let query = QueryConfig {
        default_page_size: layered(
            base.query.default_page_size,
            overlay.query.default_page_size,
            &defaults.query.default_page_size,
        ),
        max_page_size: layered(
            base.query.max_page_size,
            overlay.query.max_page_size,
            &defaults.query.max_page_size,
        ),
    };

    let index = IndexConfig {
        reconcile_on_start: layered(
            base.index.reconcile_on_start,
            overlay.index.reconcile_on_start,
            &defaults.index.reconcile_on_start,
        ),
        record_prefix: layered(
            base.index.record_prefix,
            overlay.index.record_prefix,
            &defaults.index.record_prefix,
        ),
    };

    let logging = LoggingConfig {
        level: layered(
            base.logging.level,
            overlay.logging.level,
            &defaults.logging.level,
        ),
        format: layered(
            base.logging.format,
            overlay.logging.format,
            &defaults.logging.format,
        ),
    };

    let mut documents = base.documents;
    for doc in overlay.documents {
        match documents.iter_mut().find(|d| d.name == doc.name) {
            Some(existing) => *existing = doc,
            None => documents.push(doc),
        }
    }

    HashdexConfig {
        store,
        query,
        index,
        logging,
        documents,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn create_local_config(content: &str, dir: &Path) -> PathBuf {
        let config_dir = dir.join(".hashdex");
        std::fs::create_dir_all(&config_dir).unwrap();
        let path = config_dir.join("config.toml");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_default_config() {
        let temp = TempDir::new().unwrap();
        let loader = ConfigLoader::with_global_dir(temp.path().join("global"));

        let config = loader.load(temp.path(), None).unwrap();

        assert_eq!(config.store.url, "redis://127.0.0.1:6379");
        assert_eq!(config.query.default_page_size, 1000);
    }

    #[test]
    fn test_load_local_config() {
        let temp = TempDir::new().unwrap();
        let loader = ConfigLoader::with_global_dir(temp.path().join("global"));

        create_local_config(
            r#"
            [store]
            url = "redis://custom:6379"

            [query]
            default_page_size = 25
            "#,
            temp.path(),
        );

        let config = loader.load(temp.path(), None).unwrap();

        assert_eq!(config.store.url, "redis://custom:6379");
        assert_eq!(config.query.default_page_size, 25);
    }

    #[test]
    fn test_local_overrides_global() {
        let temp = TempDir::new().unwrap();
        let global_dir = temp.path().join("global");

        std::fs::create_dir_all(&global_dir).unwrap();
        std::fs::write(
            global_dir.join("config.toml"),
            r#"
            [logging]
            level = "debug"

            [store]
            url = "redis://global:6379"
            "#,
        )
        .unwrap();

        create_local_config(
            r#"
            [store]
            url = "redis://local:6379"
            "#,
            temp.path(),
        );

        let loader = ConfigLoader::with_global_dir(&global_dir);
        let config = loader.load(temp.path(), None).unwrap();

        assert_eq!(config.store.url, "redis://local:6379");
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_cli_overrides_all() {
        let temp = TempDir::new().unwrap();

        create_local_config(
            r#"
            [store]
            url = "redis://local:6379"
            "#,
            temp.path(),
        );

        let loader = ConfigLoader::with_global_dir(temp.path().join("global"));

        let overrides = ConfigOverrides {
            store_url: Some("redis://cli:6379".to_string()),
            log_level: Some("trace".to_string()),
            ..Default::default()
        };

        let config = loader.load(temp.path(), Some(&overrides)).unwrap();

        assert_eq!(config.store.url, "redis://cli:6379");
        assert_eq!(config.logging.level, "trace");
    }

    #[test]
    fn test_documents_merge_by_name() {
        let temp = TempDir::new().unwrap();
        let global_dir = temp.path().join("global");

        std::fs::create_dir_all(&global_dir).unwrap();
        std::fs::write(
            global_dir.join("config.toml"),
            r#"
            [[documents]]
            name = "cars"
            [[documents.fields]]
            name = "make"
            value_type = "string"

            [[documents]]
            name = "users"
            [[documents.fields]]
            name = "email"
            kind = "tag"
            "#,
        )
        .unwrap();

        create_local_config(
            r#"
            [[documents]]
            name = "cars"
            [[documents.fields]]
            name = "year"
            value_type = "u16"
            "#,
            temp.path(),
        );

        let loader = ConfigLoader::with_global_dir(&global_dir);
        let config = loader.load(temp.path(), None).unwrap();

        assert_eq!(config.documents.len(), 2);
        let cars = config.document("cars").unwrap();
        assert_eq!(cars.fields.len(), 1);
        assert_eq!(cars.fields[0].name, "year");
        assert!(config.document("users").is_some());
    }

    #[test]
    fn test_global_can_disable_reconcile_on_start() {
        let temp = TempDir::new().unwrap();
        let global_dir = temp.path().join("global");

        std::fs::create_dir_all(&global_dir).unwrap();
        std::fs::write(
            global_dir.join("config.toml"),
            r#"
            [index]
            reconcile_on_start = false

            [logging]
            format = "json"
            "#,
        )
        .unwrap();

        // A local file that does not mention either setting keeps them
        create_local_config(
            r#"
            [query]
            max_page_size = 500
            default_page_size = 100
            "#,
            temp.path(),
        );

        let loader = ConfigLoader::with_global_dir(&global_dir);
        let config = loader.load(temp.path(), None).unwrap();

        assert!(!config.index.reconcile_on_start);
        assert_eq!(config.logging.format, crate::LogFormat::Json);
        assert_eq!(config.query.max_page_size, 500);
    }

    #[test]
    fn test_invalid_local_config_rejected() {
        let temp = TempDir::new().unwrap();
        create_local_config(
            r#"
            [store]
            scan_batch_size = 0
            "#,
            temp.path(),
        );

        let loader = ConfigLoader::with_global_dir(temp.path().join("global"));
        let err = loader.load(temp.path(), None).unwrap_err();
        assert!(err.to_string().contains("scan_batch_size"));
    }

    #[test]
    fn test_load_file_directly() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("custom.toml");
        std::fs::write(
            &path,
            r#"
            [index]
            record_prefix = "idx"
            "#,
        )
        .unwrap();

        let loader = ConfigLoader::with_global_dir(temp.path().join("global"));
        let config = loader.load_file(&path).unwrap();
        assert_eq!(config.index.record_prefix, "idx");
    }

    #[test]
    fn test_init_local_creates_config() {
        let temp = TempDir::new().unwrap();
        let loader = ConfigLoader::with_global_dir(temp.path().join("global"));

        let config_path = loader.init_local(temp.path()).unwrap();

        assert!(config_path.exists());
        assert!(config_path.ends_with(".hashdex/config.toml"));

        let content = std::fs::read_to_string(&config_path).unwrap();
        let _: HashdexConfig = toml::from_str(&content).unwrap();

        // Existing files are left alone
        std::fs::write(&config_path, "[logging]\nlevel = \"warn\"\n").unwrap();
        loader.init_local(temp.path()).unwrap();
        let config = loader.load(temp.path(), None).unwrap();
        assert_eq!(config.logging.level, "warn");
    }
}
