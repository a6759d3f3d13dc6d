use crate::components::ComponentCategory;
use crate::document::{load_document, Node};
use crate::error::{MergeError, Result};
use indexmap::IndexSet;
use log::debug;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// State scoped to a single merge run.
///
/// Tracks every external file touched so far (in discovery order), caches parsed
/// documents so each file is read once, and remembers which component keys have
/// already been imported per category. A fresh value is created for every run, so
/// two merges in the same process never influence each other.
#[derive(Debug, Default)]
pub struct MergeState {
    touched_files: IndexSet<PathBuf>,
    documents: HashMap<PathBuf, Node>,
    seen_keys: HashMap<ComponentCategory, HashSet<String>>,
}

impl MergeState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `file` as touched. Returns `true` if it was not known yet.
    pub fn touch(&mut self, file: PathBuf) -> bool {
        if self.touched_files.contains(&file) {
            return false;
        }
        debug!("Touched file: {}", file.display());
        self.touched_files.insert(file)
    }

    /// Files touched so far, in discovery order.
    pub fn touched_files(&self) -> &IndexSet<PathBuf> {
        &self.touched_files
    }

    pub fn touched_file(&self, index: usize) -> Option<&PathBuf> {
        self.touched_files.get_index(index)
    }

    /// Returns the parsed document for a referenced file, reading it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`MergeError::ReferencedFileInvalid`] when the file does not parse and
    /// [`MergeError::ReferencedFileUnreadable`] for any other load failure.
    pub fn load(&mut self, file: &Path) -> Result<&Node> {
        match self.documents.entry(file.to_path_buf()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let document = load_document(file).map_err(|err| match err {
                    MergeError::Syntax { .. } => MergeError::ReferencedFileInvalid {
                        file: file.to_path_buf(),
                        source: Box::new(err),
                    },
                    _ => MergeError::ReferencedFileUnreadable {
                        file: file.to_path_buf(),
                        source: Box::new(err),
                    },
                })?;
                Ok(entry.insert(document))
            }
        }
    }

    pub fn has_seen(&self, category: ComponentCategory, key: &str) -> bool {
        self.seen_keys
            .get(&category)
            .is_some_and(|keys| keys.contains(key))
    }

    /// Marks `key` as imported for `category`. Returns `false` if it was already marked.
    pub fn mark_seen(&mut self, category: ComponentCategory, key: &str) -> bool {
        self.seen_keys
            .entry(category)
            .or_default()
            .insert(key.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_touch_keeps_discovery_order() {
        let mut state = MergeState::new();
        assert!(state.touch(PathBuf::from("b.yaml")));
        assert!(state.touch(PathBuf::from("a.yaml")));
        assert!(!state.touch(PathBuf::from("b.yaml")));

        let files: Vec<&PathBuf> = state.touched_files().iter().collect();
        assert_eq!(files, vec![&PathBuf::from("b.yaml"), &PathBuf::from("a.yaml")]);
        assert_eq!(state.touched_file(1), Some(&PathBuf::from("a.yaml")));
        assert_eq!(state.touched_file(2), None);
    }

    #[test]
    fn test_seen_keys_are_per_category() {
        let mut state = MergeState::new();
        assert!(state.mark_seen(ComponentCategory::Schemas, "User"));
        assert!(!state.mark_seen(ComponentCategory::Schemas, "User"));
        assert!(state.has_seen(ComponentCategory::Schemas, "User"));
        assert!(!state.has_seen(ComponentCategory::Responses, "User"));
    }

    #[test]
    fn test_fresh_state_has_no_memory() {
        let mut first = MergeState::new();
        first.mark_seen(ComponentCategory::Schemas, "User");
        let second = MergeState::new();
        assert!(!second.has_seen(ComponentCategory::Schemas, "User"));
    }

    #[test]
    fn test_load_caches_documents() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("doc.yaml");
        fs::write(&path, "value: 1\n").unwrap();

        let mut state = MergeState::new();
        assert!(state.load(&path).unwrap().get("value").is_some());

        // A second load is served from the cache even after the file changes.
        fs::write(&path, "other: 2\n").unwrap();
        assert!(state.load(&path).unwrap().get("value").is_some());
    }

    #[test]
    fn test_load_classifies_errors() {
        let temp_dir = TempDir::new().unwrap();
        let broken = temp_dir.path().join("broken.yaml");
        fs::write(&broken, "a: [\n").unwrap();

        let mut state = MergeState::new();
        let err = state.load(&broken).unwrap_err();
        assert!(matches!(err, MergeError::ReferencedFileInvalid { .. }));

        let err = state.load(&temp_dir.path().join("missing.yaml")).unwrap_err();
        assert!(matches!(err, MergeError::ReferencedFileUnreadable { .. }));
        assert!(err.to_string().contains("missing.yaml"));
    }
}
