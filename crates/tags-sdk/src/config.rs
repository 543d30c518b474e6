use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tags_store::RepositoryConfig;

use crate::error::{SdkError, SdkResult};

/// Where the repository lives and how to open it.
///
/// ```toml
/// path = "data/graph.tags"
///
/// [repository]
/// create_if_missing = true
/// read_only = false
/// max_label_len = 256
/// cache_size_bytes = 16777216
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TagsConfig {
    /// Database file. `None` opens an in-memory repository.
    pub path: Option<PathBuf>,
    pub repository: RepositoryConfig,
}

impl TagsConfig {
    /// A config for the database file at `path` with default options.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Default::default()
        }
    }

    pub fn from_toml_str(s: &str) -> SdkResult<Self> {
        toml::from_str(s).map_err(|e| SdkError::Config(e.to_string()))
    }

    pub fn to_toml_string(&self) -> SdkResult<String> {
        toml::to_string(self).map_err(|e| SdkError::Config(e.to_string()))
    }

    /// Read a TOML config file. A relative `path` is resolved against the
    /// directory containing the file.
    pub fn load(file: impl AsRef<Path>) -> SdkResult<Self> {
        let file = file.as_ref();
        let text = std::fs::read_to_string(file)?;
        let mut config = Self::from_toml_str(&text)?;
        if let (Some(path), Some(dir)) = (&config.path, file.parent()) {
            if path.is_relative() {
                config.path = Some(dir.join(path));
            }
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_is_default() {
        let c = TagsConfig::from_toml_str("").unwrap();
        assert_eq!(c, TagsConfig::default());
        assert!(c.path.is_none());
        assert!(c.repository.create_if_missing);
    }

    #[test]
    fn parse_full_config() {
        let c = TagsConfig::from_toml_str(
            r#"
            path = "/var/lib/tags/graph.tags"

            [repository]
            create_if_missing = false
            read_only = true
            max_label_len = 64
            cache_size_bytes = 1048576
            "#,
        )
        .unwrap();
        assert_eq!(c.path, Some(PathBuf::from("/var/lib/tags/graph.tags")));
        assert!(!c.repository.create_if_missing);
        assert!(c.repository.read_only);
        assert_eq!(c.repository.max_label_len, 64);
        assert_eq!(c.repository.cache_size_bytes, Some(1 << 20));
    }

    #[test]
    fn partial_repository_section_keeps_defaults() {
        let c = TagsConfig::from_toml_str("[repository]\nmax_label_len = 10\n").unwrap();
        assert_eq!(c.repository.max_label_len, 10);
        assert!(c.repository.create_if_missing);
    }

    #[test]
    fn invalid_toml_is_config_error() {
        let err = TagsConfig::from_toml_str("path = [").unwrap_err();
        assert!(matches!(err, SdkError::Config(_)));
        let err = TagsConfig::from_toml_str("[repository]\nmax_label_len = \"x\"").unwrap_err();
        assert!(matches!(err, SdkError::Config(_)));
    }

    #[test]
    fn toml_roundtrip() {
        let mut c = TagsConfig::at("graph.tags");
        c.repository.cache_size_bytes = Some(4096);
        let text = c.to_toml_string().unwrap();
        assert_eq!(TagsConfig::from_toml_str(&text).unwrap(), c);
    }

    #[test]
    fn load_resolves_relative_path() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("tags.toml");
        std::fs::write(&file, "path = \"db/graph.tags\"\n").unwrap();
        let c = TagsConfig::load(&file).unwrap();
        assert_eq!(c.path, Some(dir.path().join("db/graph.tags")));
    }

    #[test]
    fn load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = TagsConfig::load(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, SdkError::Io(_)));
    }
}
