//! Serialization module for converting merged documents to YAML or JSON format.
//!
//! This module provides functions to serialize document trees into standard formats
//! and write them to files or return them as strings. Mapping entries are emitted in
//! tree order, so the canonical ordering applied by [`canonical`](crate::canonical)
//! survives in both formats.

use crate::document::Node;
use crate::error::{MergeError, Result};
use clap::ValueEnum;
use log::debug;
use std::fs;
use std::path::Path;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// YAML format
    Yaml,
    /// JSON format
    Json,
}

/// Serializes a document tree to YAML format.
///
/// Every `$ref` value that does not point inside the document (it does not start with
/// `#`) is emitted single-quoted, whatever the emitter would pick for it on its own.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn serialize_yaml(doc: &Node) -> Result<String> {
    debug!("Serializing document to YAML");
    let yaml = serde_yaml::to_string(doc)?;
    Ok(quote_external_refs(&yaml))
}

/// Rewrites plain `$ref: value` lines of emitted YAML into single-quoted form.
///
/// Plain scalars folded by the emitter continue on more deeply indented lines; those
/// are joined back into the value before quoting. Content of block scalars (`|`, `>`)
/// is copied untouched.
fn quote_external_refs(yaml: &str) -> String {
    let mut out = String::with_capacity(yaml.len());
    let mut lines = yaml.lines().peekable();
    let mut block_parent: Option<usize> = None;

    while let Some(line) = lines.next() {
        if let Some(parent) = block_parent {
            if line.trim().is_empty() || indentation(line) > parent {
                out.push_str(line);
                out.push('\n');
                continue;
            }
            block_parent = None;
        }

        let Some((prefix, value)) = plain_ref_entry(line) else {
            if opens_block_scalar(line) {
                block_parent = Some(indentation(line));
            }
            out.push_str(line);
            out.push('\n');
            continue;
        };

        let mut value = value.to_string();
        while let Some(next) = lines.peek() {
            if next.trim().is_empty() || indentation(next) <= prefix.len() {
                break;
            }
            value.push(' ');
            value.push_str(next.trim());
            lines.next();
        }

        if value.starts_with('#') || !reads_as_string(&value) {
            out.push_str(prefix);
            out.push_str(REF_ENTRY);
            out.push_str(&value);
        } else {
            out.push_str(prefix);
            out.push_str(REF_ENTRY);
            out.push('\'');
            out.push_str(&value.replace('\'', "''"));
            out.push('\'');
        }
        out.push('\n');
    }

    out
}

const REF_ENTRY: &str = "$ref: ";

/// Splits a `$ref: value` line (possibly a sequence item) whose value is an unquoted,
/// single-line scalar into its indentation prefix and the value.
fn plain_ref_entry(line: &str) -> Option<(&str, &str)> {
    let body = line.trim_start_matches([' ', '-']);
    let prefix = &line[..line.len() - body.len()];
    let value = body.strip_prefix(REF_ENTRY)?;

    if value.is_empty() || value.starts_with(['\'', '"', '|', '>']) {
        return None;
    }
    Some((prefix, value))
}

fn indentation(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

/// Whether `line` ends in a block scalar header such as `key: |-` or `- >`.
fn opens_block_scalar(line: &str) -> bool {
    let Some((before, header)) = line.trim_end().rsplit_once(' ') else {
        return false;
    };
    (before.ends_with(':') || before.ends_with('-'))
        && header.starts_with(['|', '>'])
        && header.len() <= 3
        && header[1..]
            .chars()
            .all(|c| c.is_ascii_digit() || c == '-' || c == '+')
}

fn reads_as_string(value: &str) -> bool {
    matches!(
        serde_yaml::from_str::<serde_yaml::Value>(value),
        Ok(serde_yaml::Value::String(_))
    )
}

/// Serializes a document tree to JSON format with pretty printing.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn serialize_json(doc: &Node) -> Result<String> {
    debug!("Serializing document to JSON");
    let mut json = serde_json::to_string_pretty(doc)?;
    json.push('\n');
    Ok(json)
}

/// Serializes a document tree in the requested format.
pub fn serialize(doc: &Node, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Yaml => serialize_yaml(doc),
        OutputFormat::Json => serialize_json(doc),
    }
}

/// Writes string content to a file.
///
/// Creates the file if it doesn't exist, or overwrites it if it does. Missing parent
/// directories are created first.
///
/// # Errors
///
/// Returns [`MergeError::Output`] if a directory or the file cannot be created or written.
pub fn write_to_file(content: &str, path: &Path) -> Result<()> {
    debug!("Writing content to file: {}", path.display());

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| MergeError::Output {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    fs::write(path, content).map_err(|source| MergeError::Output {
        path: path.to_path_buf(),
        source,
    })?;

    debug!("Successfully wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_document() -> Node {
        Node::from_yaml_str(
            "openapi: 3.0.0\ninfo:\n  title: Test API\n  version: 1.0.0\n  description: A test API\npaths:\n  /users:\n    $ref: 'other.yaml#/users'\n",
        )
        .unwrap()
    }

    #[test]
    fn test_serialize_yaml() {
        let yaml = serialize_yaml(&create_test_document()).unwrap();

        assert!(yaml.starts_with("openapi: "));
        assert!(yaml.contains("\ninfo:\n"));
        assert!(yaml.contains("title: Test API"));
        assert!(yaml.contains("description: A test API"));
        assert!(yaml.contains("paths:"));
    }

    #[test]
    fn test_serialize_yaml_external_ref_stays_string() {
        let yaml = serialize_yaml(&create_test_document()).unwrap();
        let reparsed = Node::from_yaml_str(&yaml).unwrap();
        let reference = reparsed
            .get("paths")
            .and_then(|p| p.get("/users"))
            .and_then(|u| u.get("$ref"))
            .and_then(Node::as_str);
        assert_eq!(reference, Some("other.yaml#/users"));
    }

    #[test]
    fn test_serialize_yaml_quotes_external_refs() {
        let doc = Node::from_yaml_str(
            r##"
paths:
  /opaque:
    $ref: whole.yaml
  /users:
    $ref: other.yaml#/x
  /quoted:
    $ref: "it's.yaml#/x"
  /local:
    $ref: "#/components/pathItems/Local"
parameters:
  - $ref: common.yaml#/components/parameters/Limit
odd:
  $ref: 12
"##,
        )
        .unwrap();

        let yaml = serialize_yaml(&doc).unwrap();
        assert!(yaml.contains("    $ref: 'whole.yaml'\n"), "{yaml}");
        assert!(yaml.contains("    $ref: 'other.yaml#/x'\n"), "{yaml}");
        assert!(yaml.contains("    $ref: 'it''s.yaml#/x'\n"), "{yaml}");
        assert!(yaml.contains("- $ref: 'common.yaml#/components/parameters/Limit'\n"), "{yaml}");
        assert!(yaml.contains("  $ref: 12\n"), "{yaml}");
        assert_eq!(Node::from_yaml_str(&yaml).unwrap(), doc);
    }

    #[test]
    fn test_serialize_yaml_joins_folded_ref_values() {
        let long = format!("{} file.yaml#/x", "segment ".repeat(20).trim_end());
        let mut doc = Node::empty_mapping();
        if let Some(map) = doc.as_mapping_mut() {
            let mut item = Node::empty_mapping();
            if let Some(inner) = item.as_mapping_mut() {
                inner.insert("$ref".to_string(), Node::string(long.clone()));
            }
            map.insert("item".to_string(), item);
        }

        let yaml = serialize_yaml(&doc).unwrap();
        assert!(yaml.contains(&format!("  $ref: '{long}'\n")), "{yaml}");
        assert_eq!(Node::from_yaml_str(&yaml).unwrap(), doc);
    }

    #[test]
    fn test_serialize_yaml_leaves_block_scalars_alone() {
        let doc = Node::from_yaml_str(
            "description: |\n  Example:\n  $ref: other.yaml#/x\nnext:\n  $ref: other.yaml#/x\n",
        )
        .unwrap();

        let yaml = serialize_yaml(&doc).unwrap();
        assert!(yaml.contains("\n  $ref: other.yaml#/x\n"), "{yaml}");
        assert!(yaml.contains("next:\n  $ref: 'other.yaml#/x'\n"), "{yaml}");
        assert_eq!(Node::from_yaml_str(&yaml).unwrap(), doc);
    }

    #[test]
    fn test_serialize_json() {
        let json = serialize_json(&create_test_document()).unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["openapi"], "3.0.0");
        assert_eq!(parsed["info"]["title"], "Test API");

        // Key order follows the tree, not alphabetical order.
        let openapi_at = json.find("\"openapi\"").unwrap();
        let info_at = json.find("\"info\"").unwrap();
        let paths_at = json.find("\"paths\"").unwrap();
        assert!(openapi_at < info_at && info_at < paths_at);
    }

    #[test]
    fn test_serialize_json_pretty_format() {
        let json = serialize(&create_test_document(), OutputFormat::Json).unwrap();
        assert!(json.contains('\n'));
        assert!(json.contains("  "));
        assert!(json.lines().count() > 5, "Pretty printed JSON should have multiple lines");
    }

    #[test]
    fn test_serialize_is_deterministic() {
        let doc = create_test_document();
        assert_eq!(serialize_yaml(&doc).unwrap(), serialize_yaml(&doc).unwrap());
        assert_eq!(serialize_json(&doc).unwrap(), serialize_json(&doc).unwrap());
    }

    #[test]
    fn test_write_to_file() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("test.yaml");

        write_to_file("test content", &file_path).unwrap();

        assert_eq!(fs::read_to_string(&file_path).unwrap(), "test content");
    }

    #[test]
    fn test_write_to_file_creates_directories() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("subdir").join("nested").join("test.yaml");

        write_to_file("test content", &file_path).unwrap();

        assert_eq!(fs::read_to_string(&file_path).unwrap(), "test content");
    }

    #[test]
    fn test_write_to_file_overwrites_existing() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("test.yaml");

        write_to_file("initial content", &file_path).unwrap();
        write_to_file("new content", &file_path).unwrap();

        assert_eq!(fs::read_to_string(&file_path).unwrap(), "new content");
    }

    #[test]
    fn test_write_to_file_reports_unwritable_directory() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();

        let err = write_to_file("content", &blocker.join("out.yaml")).unwrap_err();
        assert!(matches!(err, MergeError::Output { .. }));
    }
}
