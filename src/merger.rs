//! Merge orchestration: root validation, path merging, component aggregation and
//! canonical rendering, run with fresh state on every call.

use crate::canonical::canonicalize;
use crate::components::{aggregate_components, ComponentCategory};
use crate::document::{load_document, Node, Scalar};
use crate::error::{MergeError, Result};
use crate::path_merger::merge_paths;
use crate::reference::localize_references;
use crate::serializer::{serialize, write_to_file, OutputFormat};
use crate::state::MergeState;
use log::{debug, info};
use std::path::{Path, PathBuf};

/// Result of a successful merge run
#[derive(Debug, Clone)]
pub struct MergedDocument {
    /// The consolidated document, in canonical field order
    pub document: Node,
    /// External files pulled into the document, in discovery order
    pub files: Vec<PathBuf>,
}

/// Merges the document rooted at `input` and every file it references.
///
/// # Errors
///
/// Returns an error if the root or any referenced file cannot be read or parsed, if a
/// reference cannot be resolved, or if the root document lacks its version or info.
pub fn merge_document(input: &Path) -> Result<MergedDocument> {
    info!("Loading root document: {}", input.display());
    let mut root = load_document(input)?;
    validate_root(&mut root, input)?;

    let mut state = MergeState::new();

    info!("Merging paths...");
    merge_paths(&mut root, input, &mut state)?;

    if let Some(components) = root
        .as_mapping_mut()
        .and_then(|map| map.get_mut("components"))
    {
        for file in localize_references(components, input) {
            debug!("Root components reference {}", file.display());
            state.touch(file);
        }
    }

    info!("Aggregating components...");
    aggregate_components(&mut root, &mut state)?;

    Ok(MergedDocument {
        document: canonicalize(&root),
        files: state.touched_files().iter().cloned().collect(),
    })
}

/// Merges `input` and writes the result to `output`.
///
/// The output file is only created once the whole merge has succeeded.
pub fn merge_to_file(input: &Path, output: &Path, format: OutputFormat) -> Result<MergedDocument> {
    let merged = merge_document(input)?;

    info!("Serializing to {:?} format...", format);
    let content = serialize(&merged.document, format)?;

    info!("Writing output to: {}", output.display());
    write_to_file(&content, output)?;

    Ok(merged)
}

/// Checks the minimal required structure of a root document and fills in empty `paths`
/// and `components` sections where they are absent.
fn validate_root(root: &mut Node, path: &Path) -> Result<()> {
    let invalid = |reason: String| MergeError::InvalidRootDocument {
        path: path.to_path_buf(),
        reason,
    };

    let kind = root.kind_name();
    let Some(map) = root.as_mapping_mut() else {
        return Err(invalid(format!("expected a mapping at the top level, found {kind}")));
    };

    match map.get("openapi") {
        Some(Node::Scalar(Scalar::String(version))) if !version.trim().is_empty() => {}
        Some(Node::Scalar(Scalar::Number(_))) => {}
        _ => return Err(invalid("missing 'openapi' version field".to_string())),
    }

    let Some(info) = map.get("info").and_then(Node::as_mapping) else {
        return Err(invalid("missing 'info' object".to_string()));
    };
    for field in ["title", "version"] {
        if info.get(field).map_or(true, Node::is_empty) {
            return Err(invalid(format!("'info' is missing required field '{field}'")));
        }
    }

    for section in ["paths", "components"] {
        let value = map
            .entry(section.to_string())
            .or_insert_with(Node::empty_mapping);
        if matches!(value, Node::Scalar(Scalar::Null)) {
            *value = Node::empty_mapping();
        }
        if !matches!(value, Node::Mapping(_)) {
            return Err(invalid(format!(
                "'{section}' must be a mapping, found {}",
                value.kind_name()
            )));
        }
    }

    if let Some(components) = map.get("components").and_then(Node::as_mapping) {
        for category in ComponentCategory::ALL {
            match components.get(category.key()) {
                None | Some(Node::Mapping(_)) | Some(Node::Scalar(Scalar::Null)) => {}
                Some(other) => {
                    return Err(invalid(format!(
                        "'components.{}' must be a mapping, found {}",
                        category.key(),
                        other.kind_name()
                    )))
                }
            }
        }
    }

    Ok(())
}
