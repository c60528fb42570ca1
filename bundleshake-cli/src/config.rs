//! `.bundleshake.toml`/`pyproject.toml` `[tool.bundleshake]` loading.
//!
//! Grounded in `cytoscnpy::config::Config::load_from_path`'s own
//! directory-walk: try `.bundleshake.toml`, then `pyproject.toml`'s
//! `[tool.bundleshake]` table, walking up to the filesystem root, falling
//! back to defaults if neither is found or neither parses.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    #[serde(default)]
    pub bundleshake: BundleshakeConfig,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct BundleshakeConfig {
    /// Directories searched, in order, for every module spec.
    pub search_paths: Option<Vec<PathBuf>>,
    /// Identifier third-party dependencies are vendored under.
    pub vendor_name: Option<String>,
    /// Copy `*.dist-info`/`*.egg-info` metadata alongside vendored packages.
    pub bundle_metadata: Option<bool>,
    /// Fully-qualified names kept alive regardless of reference count.
    pub preserve_symbols: Option<Vec<String>>,
    /// `source:destination` directory pairs copied after a successful bundle.
    pub resources: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Clone)]
struct PyProject {
    tool: ToolConfig,
}

#[derive(Debug, Deserialize, Clone)]
struct ToolConfig {
    bundleshake: BundleshakeConfig,
}

impl Config {
    /// Load configuration starting from the current directory.
    #[must_use]
    pub fn load() -> Self {
        Self::load_from_path(Path::new("."))
    }

    /// Load configuration starting from `path`, walking up to the
    /// filesystem root until a config file is found and parses.
    #[must_use]
    pub fn load_from_path(path: &Path) -> Self {
        let mut current = path.to_path_buf();
        if current.is_file() {
            current.pop();
        }

        loop {
            let bundleshake_toml = current.join(".bundleshake.toml");
            if bundleshake_toml.exists() {
                if let Ok(content) = fs::read_to_string(&bundleshake_toml) {
                    if let Ok(config) = toml::from_str::<Config>(&content) {
                        return config;
                    }
                }
            }

            let pyproject_toml = current.join("pyproject.toml");
            if pyproject_toml.exists() {
                if let Ok(content) = fs::read_to_string(&pyproject_toml) {
                    if let Ok(pyproject) = toml::from_str::<PyProject>(&content) {
                        return Config {
                            bundleshake: pyproject.tool.bundleshake,
                        };
                    }
                }
            }

            if !current.pop() {
                break;
            }
        }

        Config::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn loads_bundleshake_toml() {
        let temp = tempdir().expect("tempdir");
        fs::write(
            temp.path().join(".bundleshake.toml"),
            "[bundleshake]\nvendor_name = \"_vendor\"\npreserve_symbols = [\"app.cli.main\"]\n",
        )
        .expect("write");

        let config = Config::load_from_path(temp.path());
        assert_eq!(config.bundleshake.vendor_name.as_deref(), Some("_vendor"));
        assert_eq!(
            config.bundleshake.preserve_symbols,
            Some(vec!["app.cli.main".to_string()])
        );
    }

    #[test]
    fn loads_pyproject_tool_table() {
        let temp = tempdir().expect("tempdir");
        fs::write(
            temp.path().join("pyproject.toml"),
            "[tool.bundleshake]\nbundle_metadata = true\n",
        )
        .expect("write");

        let config = Config::load_from_path(temp.path());
        assert_eq!(config.bundleshake.bundle_metadata, Some(true));
    }

    #[test]
    fn loads_resources_list() {
        let temp = tempdir().expect("tempdir");
        fs::write(
            temp.path().join(".bundleshake.toml"),
            "[bundleshake]\nresources = [\"vendor/app.dist-info:app/.dist-info\"]\n",
        )
        .expect("write");

        let config = Config::load_from_path(temp.path());
        assert_eq!(
            config.bundleshake.resources,
            Some(vec!["vendor/app.dist-info:app/.dist-info".to_string()])
        );
    }

    #[test]
    fn falls_back_to_default_when_nothing_found() {
        let temp = tempdir().expect("tempdir");
        let config = Config::load_from_path(temp.path());
        assert!(config.bundleshake.vendor_name.is_none());
    }
}
