//! `$ref` parsing, file resolution and JSON-Pointer navigation.

use crate::components::ComponentCategory;
use crate::document::Node;
use crate::error::{MergeError, Result};
use log::{debug, warn};
use std::path::{Component, Path, PathBuf};

/// Key under which references are stored in a mapping.
pub const REF_KEY: &str = "$ref";

/// A parsed `$ref` value of the form `[file]#/pointer/segments`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// The reference exactly as written
    pub raw: String,
    /// File part before `#`, `None` for local references
    pub file_path: Option<String>,
    /// Fragment text after `#`, still escaped
    pub fragment: String,
    /// Decoded pointer tokens, empty tokens dropped
    pub segments: Vec<String>,
}

impl Reference {
    /// Parses a reference string.
    ///
    /// # Errors
    ///
    /// Returns [`MergeError::MalformedReference`] when the string has no `#` separator.
    /// Callers treat such values as opaque scalars rather than references.
    pub fn parse(reference: &str) -> Result<Reference> {
        let (file, fragment) =
            reference
                .split_once('#')
                .ok_or_else(|| MergeError::MalformedReference {
                    reference: reference.to_string(),
                })?;

        Ok(Reference {
            raw: reference.to_string(),
            file_path: (!file.is_empty()).then(|| file.to_string()),
            fragment: fragment.to_string(),
            segments: pointer_segments(fragment),
        })
    }

    /// A local reference points inside the current document only.
    pub fn is_local(&self) -> bool {
        self.file_path.is_none()
    }

    /// Resolves the file part against the directory of `referencing_file`.
    pub fn resolve_file(&self, referencing_file: &Path) -> Option<PathBuf> {
        self.file_path
            .as_deref()
            .and_then(|file| resolve_file_path(file, referencing_file))
    }

    /// Rewrites the reference into its intra-document form.
    ///
    /// Pointers already rooted at `components` keep their fragment, pointers whose first
    /// segment is a component category (`responses/OK`) are moved under `components`, and
    /// anything else keeps its fragment as-is. Returns `None` for an empty pointer, which
    /// has no local equivalent.
    pub fn local_form(&self) -> Option<String> {
        let first = self.segments.first()?;
        let pointer = format!("/{}", self.fragment.trim_start_matches('/'));

        let is_category = ComponentCategory::from_key(first).is_some();
        if first != "components" && is_category && self.segments.len() > 1 {
            Some(format!("#/components{pointer}"))
        } else {
            Some(format!("#{pointer}"))
        }
    }
}

/// Splits a fragment into decoded pointer tokens, dropping empty ones.
pub fn pointer_segments(fragment: &str) -> Vec<String> {
    fragment
        .split('/')
        .filter(|token| !token.is_empty())
        .map(decode_pointer)
        .collect()
}

/// Decodes JSON-Pointer escapes (`~1` to `/`, `~0` to `~`) in a single left-to-right pass.
///
/// Substituted output is never rescanned, so `~01` decodes to `~1`, not `/`.
pub fn decode_pointer(token: &str) -> String {
    let mut decoded = String::with_capacity(token.len());
    let mut chars = token.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '~' {
            decoded.push(c);
            continue;
        }
        match chars.peek() {
            Some('1') => {
                decoded.push('/');
                chars.next();
            }
            Some('0') => {
                decoded.push('~');
                chars.next();
            }
            _ => decoded.push('~'),
        }
    }

    decoded
}

/// Resolves a referenced file path relative to the file that contains the reference.
///
/// Returns `None` for an empty path (a local-only reference). Absolute paths are only
/// normalized; relative paths are joined with the referencing file's directory first.
pub fn resolve_file_path(relative_or_absolute: &str, referencing_file: &Path) -> Option<PathBuf> {
    if relative_or_absolute.is_empty() {
        return None;
    }

    let target = Path::new(relative_or_absolute);
    if target.is_absolute() {
        return Some(normalize_path(target));
    }

    let base = referencing_file.parent().unwrap_or_else(|| Path::new(""));
    Some(normalize_path(&base.join(target)))
}

/// Lexically collapses `.` and `..` components without touching the filesystem.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match normalized.components().next_back() {
                Some(Component::Normal(_)) => {
                    normalized.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => normalized.push(".."),
            },
            other => normalized.push(other.as_os_str()),
        }
    }

    if normalized.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        normalized
    }
}

/// Walks `segments` through nested mappings starting at `root`.
///
/// # Errors
///
/// Returns [`MergeError::PointerNotFound`] when a segment is missing and
/// [`MergeError::PointerTypeMismatch`] when a non-mapping is reached while segments remain.
pub fn navigate<'a>(root: &'a Node, segments: &[String]) -> Result<&'a Node> {
    let mut current = root;
    let mut path_so_far = String::from("#");

    for segment in segments {
        let map = current
            .as_mapping()
            .ok_or_else(|| MergeError::PointerTypeMismatch {
                segment: segment.clone(),
                path_so_far: path_so_far.clone(),
                found: current.kind_name(),
            })?;

        current = map.get(segment).ok_or_else(|| MergeError::PointerNotFound {
            segment: segment.clone(),
            path_so_far: path_so_far.clone(),
        })?;

        path_so_far.push('/');
        path_so_far.push_str(segment);
    }

    Ok(current)
}

/// Rewrites every external `$ref` nested anywhere inside `node` into its local form.
///
/// File parts are resolved relative to `source_file`, the file that supplied `node`.
/// Returns the referenced files in the order they were found so their components can
/// be merged. Local references and values without a `#` fragment are left untouched.
pub fn localize_references(node: &mut Node, source_file: &Path) -> Vec<PathBuf> {
    let mut discovered = Vec::new();
    localize_into(node, source_file, &mut discovered);
    discovered
}

fn localize_into(node: &mut Node, source_file: &Path, discovered: &mut Vec<PathBuf>) {
    match node {
        Node::Mapping(map) => {
            for (key, value) in map.iter_mut() {
                // A mapping under `$ref` is a property with that name, not a reference.
                if key == REF_KEY && matches!(value, Node::Scalar(_)) {
                    if let Some(local) = localize_one(value, source_file, discovered) {
                        *value = Node::string(local);
                    }
                } else {
                    localize_into(value, source_file, discovered);
                }
            }
        }
        Node::Sequence(items) => {
            for item in items {
                localize_into(item, source_file, discovered);
            }
        }
        Node::Scalar(_) => {}
    }
}

fn localize_one(value: &Node, source_file: &Path, discovered: &mut Vec<PathBuf>) -> Option<String> {
    let raw = value.as_str()?;
    let reference = match Reference::parse(raw) {
        Ok(reference) => reference,
        Err(_) => {
            warn!(
                "Leaving reference without fragment '{}' in {} as-is",
                raw,
                source_file.display()
            );
            return None;
        }
    };

    let file = reference.resolve_file(source_file)?;
    discovered.push(file);

    let local = reference.local_form();
    match &local {
        Some(local) => debug!("Rewrote reference '{}' to '{}'", raw, local),
        None => warn!(
            "Reference '{}' in {} has no local equivalent and is left as-is",
            raw,
            source_file.display()
        ),
    }
    local
}
