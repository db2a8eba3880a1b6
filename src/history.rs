//! Recency-ordered gallery of generated images.

use crate::store::ImageStore;
use std::collections::HashSet;
use std::path::Path;

/// Local image paths, newest first, plus a pointer to the latest result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct History {
    paths: Vec<String>,
    latest: Option<String>,
}

impl History {
    pub fn new(paths: Vec<String>) -> Self {
        Self {
            paths,
            latest: None,
        }
    }

    /// Rebuild history from what is already on disk in `partition`.
    ///
    /// Listing failures degrade to an empty history.
    pub fn load(store: &ImageStore, partition: &Path) -> Self {
        match store.list_existing(partition) {
            Ok(paths) => {
                tracing::info!(
                    "Found {} existing images in {}",
                    paths.len(),
                    partition.display()
                );
                Self::new(paths)
            }
            Err(e) => {
                tracing::warn!(
                    "Could not list existing images in {}: {}",
                    partition.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// New history with `new_paths` (in generation order) ahead of the old ones.
    ///
    /// A path that was overwritten on disk keeps only its newest position.
    pub fn prepend(&self, new_paths: Vec<String>) -> Self {
        let latest = new_paths.first().cloned().or_else(|| self.latest.clone());
        let mut seen = HashSet::new();
        let paths = new_paths
            .into_iter()
            .chain(self.paths.iter().cloned())
            .filter(|path| seen.insert(path.clone()))
            .collect();
        Self { paths, latest }
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    /// First image of the most recent successful generation in this session.
    pub fn latest(&self) -> Option<&str> {
        self.latest.as_deref()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_prepend_keeps_generation_order_ahead_of_history() {
        let history = History::new(vec!["old/1.jpg".into(), "old/2.jpg".into()]);
        let merged = history.prepend(vec!["new/b.jpg".into(), "new/a.jpg".into()]);

        assert_eq!(
            merged.paths(),
            ["new/b.jpg", "new/a.jpg", "old/1.jpg", "old/2.jpg"]
        );
        assert_eq!(merged.latest(), Some("new/b.jpg"));
        // The original value is untouched.
        assert_eq!(history.len(), 2);
        assert_eq!(history.latest(), None);
    }

    #[test]
    fn test_prepend_nothing_keeps_latest() {
        let history = History::default().prepend(vec!["a.jpg".into()]);
        let same = history.prepend(Vec::new());
        assert_eq!(same.latest(), Some("a.jpg"));
        assert_eq!(same.len(), 1);
    }

    #[test]
    fn test_prepend_drops_overwritten_entries() {
        let history = History::new(vec!["p/same.jpg".into(), "p/other.jpg".into()]);
        let merged = history.prepend(vec!["p/same.jpg".into(), "p/same.jpg".into()]);

        assert_eq!(merged.paths(), ["p/same.jpg", "p/other.jpg"]);
        assert_eq!(merged.latest(), Some("p/same.jpg"));
    }

    #[test]
    fn test_load_missing_partition_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path());
        let history = History::load(&store, &dir.path().join("01-2000"));
        assert!(history.is_empty());
    }

    #[test]
    fn test_load_lists_existing_images() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path());
        let partition = store.ensure_partition("05-2025").unwrap();
        std::fs::write(partition.join("a.png"), b"x").unwrap();

        let history = History::load(&store, &partition);
        assert_eq!(history.len(), 1);
        assert!(history.paths()[0].ends_with("05-2025/a.png"));
        assert_eq!(history.latest(), None);
    }
}
