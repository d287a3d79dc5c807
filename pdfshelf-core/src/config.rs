//! Optional YAML configuration.
//!
//! ```yaml
//! source_dir: ./source-pdfs
//! template: ./templates/manifest_template.json
//! site_dir: ./docs
//! base_url: https://example.github.io/charts/
//! required_fields: [name, city]
//! ```
//!
//! Relative paths resolve against the directory holding the config file and
//! a leading `~` expands to the home directory. Command-line flags override
//! every value here.

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// File looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "pdfshelf.yaml";

/// Template fields every entry must carry unless configured otherwise.
pub const DEFAULT_REQUIRED_FIELDS: [&str; 1] = ["name"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_fields: Option<Vec<String>>,
}

impl Config {
    /// Load a config file, resolving its relative paths against its directory.
    pub fn load_at(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Config =
            serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        for field in [&mut config.source_dir, &mut config.template, &mut config.site_dir] {
            if let Some(p) = field.take() {
                *field = Some(resolve_path(&p, base)?);
            }
        }
        Ok(config)
    }

    /// `--config` if given (must exist), otherwise `<cwd>/pdfshelf.yaml` if
    /// present, otherwise an empty config.
    pub fn discover(explicit: Option<&Path>, cwd: &Path) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            let path = expand_home(path)?;
            return Self::load_at(&path);
        }
        let default = cwd.join(DEFAULT_CONFIG_FILE);
        if default.is_file() {
            return Self::load_at(&default);
        }
        Ok(Self::default())
    }

    /// Configured required fields, or [`DEFAULT_REQUIRED_FIELDS`].
    pub fn required_fields(&self) -> Vec<String> {
        self.required_fields.clone().unwrap_or_else(|| {
            DEFAULT_REQUIRED_FIELDS
                .iter()
                .map(|s| (*s).to_string())
                .collect()
        })
    }
}

/// Expand a leading `~` component to the home directory.
pub fn expand_home(path: &Path) -> Result<PathBuf, ConfigError> {
    let mut components = path.components();
    match components.next() {
        Some(Component::Normal(first)) if first == "~" => {
            let home = dirs::home_dir().ok_or_else(|| ConfigError::HomeNotFound {
                path: path.to_path_buf(),
            })?;
            Ok(home.join(components.as_path()))
        }
        _ => Ok(path.to_path_buf()),
    }
}

fn resolve_path(path: &Path, base: &Path) -> Result<PathBuf, ConfigError> {
    let expanded = expand_home(path)?;
    if expanded.is_absolute() {
        Ok(expanded)
    } else {
        Ok(base.join(expanded))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn discover_without_file_is_empty() {
        let cwd = TempDir::new().unwrap();
        let config = Config::discover(None, cwd.path()).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.required_fields(), vec!["name".to_string()]);
    }

    #[test]
    fn relative_paths_resolve_against_config_dir() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(
            &path,
            "source_dir: src-pdfs\nsite_dir: /srv/site\nrequired_fields: [name, city]\n",
        )
        .unwrap();

        let config = Config::discover(None, dir.path()).unwrap();
        assert_eq!(config.source_dir, Some(dir.path().join("src-pdfs")));
        assert_eq!(config.site_dir, Some(PathBuf::from("/srv/site")));
        assert_eq!(config.template, None);
        assert_eq!(config.required_fields(), vec!["name", "city"]);
    }

    #[test]
    fn explicit_missing_config_is_an_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.yaml");
        let err = Config::discover(Some(missing.as_path()), dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("c.yaml");
        std::fs::write(&path, "sorce_dir: typo\n").unwrap();
        let err = Config::load_at(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("c.yaml"));
    }

    #[test]
    fn plain_paths_are_not_expanded() {
        assert_eq!(expand_home(Path::new("a/~/b")).unwrap(), PathBuf::from("a/~/b"));
    }
}
