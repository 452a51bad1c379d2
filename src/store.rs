use std::path::{Path, PathBuf};

/// Oldest entries are evicted first once the log exceeds this.
pub const MAX_SEEN_ENTRIES: usize = 500;

/// Persisted log of already-delivered post links.
///
/// Insertion order is preserved so the newest entries survive truncation.
/// The store does no locking of its own; exclusive access comes from the
/// process-level run lock.
pub struct SeenSetStore {
    path: PathBuf,
}

impl SeenSetStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the seen-set. A missing or unreadable/corrupt file is treated
    /// as empty — dedup degrades to "everything is new" rather than failing
    /// the run.
    pub fn load(&self) -> Vec<String> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to read seen-set");
                return Vec::new();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(links) => links,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "corrupt seen-set, starting empty");
                Vec::new()
            }
        }
    }

    /// Persist the seen-set, keeping only the most recent
    /// [`MAX_SEEN_ENTRIES`] links. A write failure is logged and swallowed:
    /// the run must not fail because persistence did.
    pub fn save(&self, links: &[String]) {
        let start = links.len().saturating_sub(MAX_SEEN_ENTRIES);
        let bounded = &links[start..];

        let json = match serde_json::to_string_pretty(bounded) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialize seen-set");
                return;
            }
        };
        if let Err(e) = std::fs::write(&self.path, json) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to save seen-set");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = SeenSetStore::new(dir.path().join("sent_posts.json"));
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_load_corrupt_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sent_posts.json");
        std::fs::write(&path, "{not json").unwrap();
        let store = SeenSetStore::new(&path);
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = SeenSetStore::new(dir.path().join("sent_posts.json"));
        let links = vec!["https://a".to_string(), "https://b".to_string()];
        store.save(&links);
        assert_eq!(store.load(), links);
    }

    #[test]
    fn test_save_truncates_to_newest_500() {
        let dir = tempfile::tempdir().unwrap();
        let store = SeenSetStore::new(dir.path().join("sent_posts.json"));
        let links: Vec<String> = (0..620).map(|i| format!("https://post/{}", i)).collect();
        store.save(&links);

        let loaded = store.load();
        assert_eq!(loaded.len(), MAX_SEEN_ENTRIES);
        assert_eq!(loaded.first().unwrap(), "https://post/120");
        assert_eq!(loaded.last().unwrap(), "https://post/619");
    }

    #[test]
    fn test_save_failure_is_swallowed() {
        // Path points into a directory that does not exist.
        let store = SeenSetStore::new("/nonexistent-dir/sent_posts.json");
        store.save(&["https://a".to_string()]);
    }
}
