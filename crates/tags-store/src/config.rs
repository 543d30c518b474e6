use serde::{Deserialize, Serialize};

/// Options for opening a [`Repository`](crate::Repository).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Create and initialize the repository when nothing exists at the path.
    pub create_if_missing: bool,
    /// Refuse write transactions. A read-only open never creates or
    /// initializes a repository.
    pub read_only: bool,
    /// Upper bound on relation label length, in bytes.
    pub max_label_len: usize,
    /// Page cache size handed to the storage engine. `None` keeps the
    /// engine default.
    pub cache_size_bytes: Option<usize>,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            read_only: false,
            max_label_len: 1024,
            cache_size_bytes: None,
        }
    }
}

impl RepositoryConfig {
    /// Open existing repositories only.
    pub fn existing() -> Self {
        Self {
            create_if_missing: false,
            ..Default::default()
        }
    }

    /// Open an existing repository for reading only.
    pub fn read_only() -> Self {
        Self {
            create_if_missing: false,
            read_only: true,
            ..Default::default()
        }
    }

    pub(crate) fn may_create(&self) -> bool {
        self.create_if_missing && !self.read_only
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = RepositoryConfig::default();
        assert!(c.create_if_missing);
        assert!(!c.read_only);
        assert_eq!(c.max_label_len, 1024);
        assert!(c.cache_size_bytes.is_none());
    }

    #[test]
    fn existing_disables_creation() {
        assert!(!RepositoryConfig::existing().create_if_missing);
    }

    #[test]
    fn read_only_never_creates() {
        let c = RepositoryConfig::read_only();
        assert!(c.read_only);
        assert!(!c.may_create());

        let c = RepositoryConfig {
            read_only: true,
            ..Default::default()
        };
        assert!(c.create_if_missing);
        assert!(!c.may_create());
    }
}
