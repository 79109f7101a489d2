//! Patcher configuration
//!
//! Settings come from `schemapatch.yaml` in the working directory, or from
//! `~/.config/schemapatch/config.yaml` when there is none. Command line
//! flags override whatever is loaded here.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{PatchError, Result};

/// Name of the project configuration file
pub const CONFIG_FILE_NAME: &str = "schemapatch.yaml";

/// Configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Directory holding the CRD manifests
    #[serde(default)]
    pub manifests: Option<PathBuf>,

    /// Schema bundle files, merged in order
    #[serde(default)]
    pub schemas: Vec<PathBuf>,

    /// Maximum description length
    #[serde(default)]
    pub max_desc_len: Option<usize>,

    /// Write patched manifests here instead of in place
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

impl Config {
    /// Load `explicit` when given, otherwise the first configuration found
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }
        let local = Path::new(CONFIG_FILE_NAME);
        if local.is_file() {
            return Self::load_from(local);
        }
        match Self::user_path() {
            Some(path) if path.is_file() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from a specific path.
    ///
    /// Relative paths in the file are resolved against its directory.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| PatchError::io(path, e))?;
        let mut config: Self = serde_yaml::from_str(&content).map_err(|e| {
            PatchError::config(format!("invalid configuration {}: {}", path.display(), e))
        })?;
        tracing::debug!(path = %path.display(), "loaded configuration");

        let base = path.parent().unwrap_or(Path::new(""));
        config.manifests = config.manifests.map(|p| base.join(p));
        config.output_dir = config.output_dir.map(|p| base.join(p));
        config.schemas = config.schemas.into_iter().map(|p| base.join(p)).collect();
        Ok(config)
    }

    /// Per-user configuration path
    pub fn user_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("schemapatch").join("config.yaml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_resolves_relative_paths() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(
            &path,
            concat!(
                "manifests: config/crd\n",
                "schemas:\n  - schemas.yaml\n  - /abs/more.yaml\n",
                "maxDescLen: 40\n",
            ),
        )
        .unwrap();

        let config = Config::load(Some(path.as_path())).unwrap();
        assert_eq!(config.manifests, Some(dir.path().join("config/crd")));
        assert_eq!(
            config.schemas,
            vec![dir.path().join("schemas.yaml"), PathBuf::from("/abs/more.yaml")]
        );
        assert_eq!(config.max_desc_len, Some(40));
        assert_eq!(config.output_dir, None);
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            Config::load(Some(dir.path().join("missing.yaml").as_path())),
            Err(PatchError::Io { .. })
        ));
    }

    #[test]
    fn test_invalid_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "maxDescLen: lots\n").unwrap();
        assert!(matches!(Config::load_from(&path), Err(PatchError::Config { .. })));
    }
}
