//! Substitutes external path-item references in the root `paths` table.

use crate::document::{Mapping, Node};
use crate::error::{MergeError, Result};
use crate::reference::{localize_references, navigate, Reference, REF_KEY};
use crate::state::MergeState;
use indexmap::IndexSet;
use log::{debug, info};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Replaces every `paths` entry that is an external `$ref` with the referenced path item.
///
/// For each substituted fragment, nested external references are rewritten to local
/// pointers (resolved relative to the file that supplied the fragment). Every file
/// touched this way is recorded on `state` so its components can be aggregated.
///
/// Entries that are not mappings, hold a local `$ref` or a value without a `#` fragment
/// are left unchanged. Inline path items stay in place, but their nested external
/// references are rewritten relative to `root_file`.
///
/// # Returns
///
/// The files touched by this call, in discovery order.
///
/// # Errors
///
/// Any failure is wrapped in [`MergeError::Path`] naming the path key and `root_file`.
pub fn merge_paths(
    root: &mut Node,
    root_file: &Path,
    state: &mut MergeState,
) -> Result<IndexSet<PathBuf>> {
    let mut touched = IndexSet::new();

    let Some(paths) = root
        .as_mapping_mut()
        .and_then(|map| map.get_mut("paths"))
        .and_then(Node::as_mapping_mut)
    else {
        debug!("No paths to merge in {}", root_file.display());
        return Ok(touched);
    };

    let mut substituted = 0;
    for (path_key, path_value) in paths.iter_mut() {
        let reference = path_reference(path_value).map_err(|err| err.in_path(path_key, root_file))?;
        let Some(reference) = reference else {
            // Inline path item: only its nested references need rewriting.
            for discovered in localize_references(path_value, root_file) {
                record(state, &mut touched, discovered);
            }
            continue;
        };
        let Some(file) = reference.resolve_file(root_file) else {
            debug!("Keeping local reference {} for path '{}'", reference.raw, path_key);
            continue;
        };

        debug!("Resolving path '{}' from {}", path_key, reference.raw);
        let (item, source_file) = resolve_path_item(&reference, file, state, &mut touched)
            .map_err(|err| err.in_path(path_key, root_file))?;

        let mut item = Node::Mapping(item);
        for discovered in localize_references(&mut item, &source_file) {
            record(state, &mut touched, discovered);
        }

        *path_value = item;
        substituted += 1;
    }

    info!(
        "Merged {} external path items from {} files",
        substituted,
        touched.len()
    );
    Ok(touched)
}

/// Extracts the `$ref` of a path entry, if it has a usable one.
fn path_reference(path_value: &Node) -> Result<Option<Reference>> {
    let Some(value) = path_value.get(REF_KEY) else {
        return Ok(None);
    };
    let Some(raw) = value.as_str() else {
        return Err(MergeError::ReferenceNotString {
            found: value.kind_name(),
        });
    };

    match Reference::parse(raw) {
        Ok(reference) => Ok(Some(reference)),
        Err(_) => {
            debug!("Path reference '{}' has no '#' fragment", raw);
            Ok(None)
        }
    }
}

/// Loads the mapping an external path reference points at.
///
/// A target that is itself nothing but an external `$ref` is followed (relative to the
/// file holding it) until a concrete path item is reached. Returns the path item and the
/// file that supplied it.
fn resolve_path_item(
    reference: &Reference,
    file: PathBuf,
    state: &mut MergeState,
    touched: &mut IndexSet<PathBuf>,
) -> Result<(Mapping, PathBuf)> {
    let mut current = reference.clone();
    let mut file = file;
    let mut chain = HashSet::new();

    loop {
        if !chain.insert((file.clone(), current.fragment.clone())) {
            return Err(MergeError::ReferenceCycle {
                reference: current.raw,
            });
        }
        record(state, touched, file.clone());

        let target = navigate(state.load(&file)?, &current.segments)?;
        let Node::Mapping(item) = target else {
            return Err(MergeError::InvalidReferenceTarget {
                reference: current.raw,
                found: target.kind_name(),
            });
        };

        match chained_reference(item, &file) {
            Some((next, next_file)) => {
                debug!("Following chained path reference {} in {}", next.raw, file.display());
                current = next;
                file = next_file;
            }
            None => return Ok((item.clone(), file)),
        }
    }
}

/// A path item consisting solely of an external `$ref`.
fn chained_reference(item: &Mapping, file: &Path) -> Option<(Reference, PathBuf)> {
    if item.len() != 1 {
        return None;
    }
    let reference = Reference::parse(item.get(REF_KEY)?.as_str()?).ok()?;
    let next_file = reference.resolve_file(file)?;
    Some((reference, next_file))
}

fn record(state: &mut MergeState, touched: &mut IndexSet<PathBuf>, file: PathBuf) {
    touched.insert(file.clone());
    state.touch(file);
}
