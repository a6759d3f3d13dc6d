//! Component aggregation: pulls reusable definitions from every touched file into the
//! root document's `components` section.

use crate::document::{Mapping, Node, Scalar};
use crate::error::Result;
use crate::reference::localize_references;
use crate::state::MergeState;
use log::{debug, info, warn};
use std::path::Path;

/// Component sections that are merged from referenced files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentCategory {
    Schemas,
    Responses,
    Examples,
    Parameters,
    RequestBodies,
    Headers,
    SecuritySchemes,
    Links,
    Callbacks,
}

impl ComponentCategory {
    /// All categories in merge order.
    pub const ALL: [ComponentCategory; 9] = [
        ComponentCategory::Schemas,
        ComponentCategory::Responses,
        ComponentCategory::Examples,
        ComponentCategory::Parameters,
        ComponentCategory::RequestBodies,
        ComponentCategory::Headers,
        ComponentCategory::SecuritySchemes,
        ComponentCategory::Links,
        ComponentCategory::Callbacks,
    ];

    /// The key used for this category inside `components`.
    pub fn key(self) -> &'static str {
        match self {
            ComponentCategory::Schemas => "schemas",
            ComponentCategory::Responses => "responses",
            ComponentCategory::Examples => "examples",
            ComponentCategory::Parameters => "parameters",
            ComponentCategory::RequestBodies => "requestBodies",
            ComponentCategory::Headers => "headers",
            ComponentCategory::SecuritySchemes => "securitySchemes",
            ComponentCategory::Links => "links",
            ComponentCategory::Callbacks => "callbacks",
        }
    }

    pub fn from_key(key: &str) -> Option<ComponentCategory> {
        Self::ALL.into_iter().find(|category| category.key() == key)
    }
}

/// Merges the components of every touched file into `root`, until no new files appear.
///
/// Importing a component may reveal references to further files; those are appended to
/// the run's touched files and processed in turn, so the loop ends at a fixpoint.
pub fn aggregate_components(root: &mut Node, state: &mut MergeState) -> Result<()> {
    let mut index = 0;
    while let Some(file) = state.touched_file(index).cloned() {
        merge_components_from(&file, root, state).map_err(|err| err.in_components(&file))?;
        index += 1;
    }

    info!("Aggregated components from {} files", index);
    Ok(())
}

/// Imports each component entry of `file` into `root.components`.
///
/// Entries are read from `components.<category>` and, for bare component files, from a
/// top-level `<category>` mapping. The first definition of a key wins: a key already in
/// the root document or imported earlier in this run is skipped. Nested external
/// references inside imported values are rewritten to local form and their files are
/// queued on `state`.
///
/// Returns the number of imported entries.
pub fn merge_components_from(file: &Path, root: &mut Node, state: &mut MergeState) -> Result<usize> {
    debug!("Merging components from {}", file.display());

    let document = state.load(file)?;
    let mut candidates: Vec<(ComponentCategory, String, Node)> = Vec::new();
    for category in ComponentCategory::ALL {
        for source in category_sources(document, category) {
            for (key, value) in source {
                candidates.push((category, key.clone(), value.clone()));
            }
        }
    }

    let mut imported = 0;
    for (category, key, mut value) in candidates {
        let Some(target) = root_category_mut(root, category) else {
            warn!(
                "Root components.{} is not a mapping; skipping '{}'",
                category.key(),
                key
            );
            continue;
        };

        if state.has_seen(category, &key) || target.contains_key(&key) {
            debug!(
                "Skipping duplicate {} '{}' from {}",
                category.key(),
                key,
                file.display()
            );
            continue;
        }

        for discovered in localize_references(&mut value, file) {
            state.touch(discovered);
        }

        state.mark_seen(category, &key);
        target.insert(key, value);
        imported += 1;
    }

    debug!("Imported {} components from {}", imported, file.display());
    Ok(imported)
}

fn category_sources(document: &Node, category: ComponentCategory) -> Vec<&Mapping> {
    let nested = document
        .get("components")
        .and_then(|components| components.get(category.key()));
    let top_level = document.get(category.key());

    [nested, top_level]
        .into_iter()
        .flatten()
        .filter_map(Node::as_mapping)
        .collect()
}

/// Returns `root.components.<category>`, creating it (or replacing a null placeholder).
fn root_category_mut(root: &mut Node, category: ComponentCategory) -> Option<&mut Mapping> {
    let components = root
        .as_mapping_mut()?
        .entry("components".to_string())
        .or_insert_with(Node::empty_mapping);
    if matches!(components, Node::Scalar(Scalar::Null)) {
        *components = Node::empty_mapping();
    }

    let section = components
        .as_mapping_mut()?
        .entry(category.key().to_string())
        .or_insert_with(Node::empty_mapping);
    if matches!(section, Node::Scalar(Scalar::Null)) {
        *section = Node::empty_mapping();
    }
    section.as_mapping_mut()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::REF_KEY;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn root_doc() -> Node {
        Node::from_yaml_str("openapi: 3.0.0\ninfo: {title: T, version: '1'}\npaths: {}\n").unwrap()
    }

    fn component<'a>(root: &'a Node, category: &str, key: &str) -> Option<&'a Node> {
        root.get("components")?.get(category)?.get(key)
    }

    #[test]
    fn test_category_keys_round_trip() {
        for category in ComponentCategory::ALL {
            assert_eq!(ComponentCategory::from_key(category.key()), Some(category));
        }
        assert_eq!(ComponentCategory::from_key("paths"), None);
    }

    #[test]
    fn test_merge_components_creates_sections() {
        let dir = TempDir::new().unwrap();
        let file = write(
            &dir,
            "schemas.yaml",
            "components:\n  schemas:\n    User:\n      type: object\n  examples:\n    Sample:\n      value: 1\n",
        );

        let mut root = root_doc();
        let mut state = MergeState::new();
        let imported = merge_components_from(&file, &mut root, &mut state).unwrap();

        assert_eq!(imported, 2);
        assert!(component(&root, "schemas", "User").is_some());
        assert!(component(&root, "examples", "Sample").is_some());
        assert!(state.has_seen(ComponentCategory::Schemas, "User"));
    }

    #[test]
    fn test_merge_components_first_definition_wins() {
        let dir = TempDir::new().unwrap();
        let first = write(&dir, "a.yaml", "components:\n  schemas:\n    User:\n      description: first\n");
        let second = write(&dir, "b.yaml", "components:\n  schemas:\n    User:\n      description: second\n    Pet:\n      type: object\n");

        let mut root = root_doc();
        let mut state = MergeState::new();
        merge_components_from(&first, &mut root, &mut state).unwrap();
        let imported = merge_components_from(&second, &mut root, &mut state).unwrap();

        assert_eq!(imported, 1);
        assert_eq!(
            component(&root, "schemas", "User").and_then(|u| u.get("description")).and_then(Node::as_str),
            Some("first")
        );
        let keys: Vec<&String> = root.get("components").unwrap().get("schemas").unwrap().as_mapping().unwrap().keys().collect();
        assert_eq!(keys, vec!["User", "Pet"]);
    }

    #[test]
    fn test_root_definitions_are_never_overwritten() {
        let dir = TempDir::new().unwrap();
        let file = write(&dir, "a.yaml", "components:\n  responses:\n    OK:\n      description: imported\n");

        let mut root = Node::from_yaml_str(
            "openapi: 3.0.0\ncomponents:\n  responses:\n    OK:\n      description: local\n",
        )
        .unwrap();
        let mut state = MergeState::new();
        assert_eq!(merge_components_from(&file, &mut root, &mut state).unwrap(), 0);
        assert_eq!(
            component(&root, "responses", "OK").and_then(|r| r.get("description")).and_then(Node::as_str),
            Some("local")
        );
    }

    #[test]
    fn test_bare_component_file_and_null_sections() {
        let dir = TempDir::new().unwrap();
        let file = write(&dir, "responses.yaml", "responses:\n  OK:\n    description: Success\n");

        let mut root = Node::from_yaml_str("openapi: 3.0.0\ncomponents:\n  responses:\n").unwrap();
        let mut state = MergeState::new();
        merge_components_from(&file, &mut root, &mut state).unwrap();

        assert_eq!(
            component(&root, "responses", "OK").and_then(|r| r.get("description")).and_then(Node::as_str),
            Some("Success")
        );
    }

    #[test]
    fn test_aggregate_follows_component_references() {
        let dir = TempDir::new().unwrap();
        let schemas = write(
            &dir,
            "schemas.yaml",
            "components:\n  schemas:\n    User:\n      type: object\n      properties:\n        address:\n          $ref: 'common/address.yaml#/components/schemas/Address'\n",
        );
        fs::create_dir(dir.path().join("common")).unwrap();
        write(
            &dir,
            "common/address.yaml",
            "components:\n  schemas:\n    Address:\n      type: string\n",
        );

        let mut root = root_doc();
        let mut state = MergeState::new();
        state.touch(schemas);
        aggregate_components(&mut root, &mut state).unwrap();

        assert_eq!(state.touched_files().len(), 2);
        assert!(component(&root, "schemas", "Address").is_some());
        let address_ref = component(&root, "schemas", "User")
            .and_then(|u| u.get("properties"))
            .and_then(|p| p.get("address"))
            .and_then(|a| a.get(REF_KEY))
            .and_then(Node::as_str);
        assert_eq!(address_ref, Some("#/components/schemas/Address"));
    }

    #[test]
    fn test_aggregate_reports_failing_file() {
        let dir = TempDir::new().unwrap();
        let mut root = root_doc();
        let mut state = MergeState::new();
        state.touch(dir.path().join("gone.yaml"));

        let err = aggregate_components(&mut root, &mut state).unwrap_err();
        assert!(err.to_string().contains("gone.yaml"));
        assert!(err.chain_message().contains("could not be read"));
    }
}
