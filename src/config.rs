//! Project configuration.
//!
//! Every field has a default, so a project without a `goo.toml` runs with
//! the conventional layout:
//!
//! ```text
//! <root>/index.html        base layout
//! <root>/app/page.goo      entry page, served at /
//! <root>/app/**/page.goo   further pages
//! ```

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::component::{CompileOptions, ScopeStrategy};
use crate::error::{GooError, Result};

pub const CONFIG_FILE: &str = "goo.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GooConfig {
    pub root: PathBuf,
    pub app_dir: String,
    pub layout_file: String,
    pub entry_file: String,
    pub extension: String,
    /// Keep compiled pages for the life of the process.
    pub cache: bool,
    /// Recompile a cached page when one of its sources changed on disk.
    pub invalidate_on_change: bool,
    pub scoped_styles: bool,
    pub web_components: bool,
    pub scope_strategy: ScopeStrategy,
    pub log_level: String,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub address: String,
}

impl Default for GooConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            app_dir: "app".to_string(),
            layout_file: "index.html".to_string(),
            entry_file: "page.goo".to_string(),
            extension: "goo".to_string(),
            cache: true,
            invalidate_on_change: false,
            scoped_styles: true,
            web_components: false,
            scope_strategy: ScopeStrategy::Random,
            log_level: "info".to_string(),
            server: ServerConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:4200".to_string(),
        }
    }
}

impl GooConfig {
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    pub fn from_toml_str(source: &str) -> Result<Self> {
        toml::from_str(source).map_err(|e| GooError::Config(e.to_string()))
    }

    /// Reads a config file. A relative `root` inside it is resolved against
    /// the file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let source = fs::read_to_string(path).map_err(|source| GooError::SourceNotFound {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&source)?;
        if config.root.is_relative() {
            if let Some(dir) = path.parent() {
                config.root = dir.join(&config.root);
            }
        }
        Ok(config)
    }

    /// Loads `<root>/goo.toml` when present, defaults otherwise.
    pub fn discover(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE);
        if path.is_file() {
            Self::load(&path)
        } else {
            Ok(Self::with_root(root))
        }
    }

    pub fn app_path(&self) -> PathBuf {
        self.root.join(&self.app_dir)
    }

    pub fn layout_path(&self) -> PathBuf {
        self.root.join(&self.layout_file)
    }

    pub fn entry_path(&self) -> PathBuf {
        self.app_path().join(&self.entry_file)
    }

    pub fn compile_options(&self) -> CompileOptions {
        CompileOptions {
            scoped_styles: self.scoped_styles,
            scope_strategy: self.scope_strategy,
            web_components: self.web_components.then(|| self.app_path()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GooConfig::from_toml_str("").unwrap();
        assert_eq!(config, GooConfig::default());
        assert!(config.cache);
        assert_eq!(config.entry_path(), PathBuf::from("./app/page.goo"));
    }

    #[test]
    fn test_partial_override() {
        let config = GooConfig::from_toml_str(
            r#"
cache = false
scope_strategy = "hashed"

[server]
address = "0.0.0.0:8080"
"#,
        )
        .unwrap();
        assert!(!config.cache);
        assert_eq!(config.scope_strategy, ScopeStrategy::Hashed);
        assert_eq!(config.server.address, "0.0.0.0:8080");
        assert_eq!(config.app_dir, "app");
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let err = GooConfig::from_toml_str("cahce = false").unwrap_err();
        assert!(matches!(err, GooError::Config(_)));
    }

    #[test]
    fn test_relative_root_resolves_against_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "root = \"site\"\nweb_components = true\n").unwrap();

        let config = GooConfig::load(&path).unwrap();
        assert_eq!(config.root, dir.path().join("site"));
        assert_eq!(
            config.compile_options().web_components,
            Some(dir.path().join("site").join("app"))
        );
    }
}
