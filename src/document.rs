//! In-memory document tree for OpenAPI files.
//!
//! Every file the merger touches is parsed into a [`Node`] tree. Mappings are backed by
//! [`IndexMap`] so the key order read from disk survives every mutation and is emitted
//! again verbatim (or reordered on purpose by the [`canonical`](crate::canonical) module).

use crate::error::{MergeError, Result};
use indexmap::IndexMap;
use log::debug;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fs;
use std::io;
use std::path::Path;

/// Ordered mapping with unique string keys.
pub type Mapping = IndexMap<String, Node>;

/// A node of a parsed document.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Ordered key/value entries
    Mapping(Mapping),
    /// Ordered list of nodes
    Sequence(Vec<Node>),
    /// Leaf value
    Scalar(Scalar),
}

/// Leaf values of a document tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(serde_yaml::Number),
    String(String),
}

impl Node {
    /// Parses YAML (or JSON, which is a subset of YAML) text into a tree.
    ///
    /// Non-string mapping keys such as `200:` are converted to their string form and
    /// YAML tags are dropped in favour of the tagged value.
    pub fn from_yaml_str(content: &str) -> std::result::Result<Node, serde_yaml::Error> {
        let value: serde_yaml::Value = serde_yaml::from_str(content)?;
        Ok(Node::from(value))
    }

    /// Creates an empty mapping node.
    pub fn empty_mapping() -> Node {
        Node::Mapping(Mapping::new())
    }

    /// Creates a string scalar node.
    pub fn string(value: impl Into<String>) -> Node {
        Node::Scalar(Scalar::String(value.into()))
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Node::Mapping(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_mapping_mut(&mut self) -> Option<&mut Mapping> {
        match self {
            Node::Mapping(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::Scalar(Scalar::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Looks up `key` when this node is a mapping.
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.as_mapping().and_then(|map| map.get(key))
    }

    /// Whether the node carries no content: null, an empty mapping or an empty sequence.
    pub fn is_empty(&self) -> bool {
        match self {
            Node::Mapping(map) => map.is_empty(),
            Node::Sequence(items) => items.is_empty(),
            Node::Scalar(Scalar::Null) => true,
            Node::Scalar(_) => false,
        }
    }

    /// Short name of the node kind, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::Mapping(_) => "mapping",
            Node::Sequence(_) => "sequence",
            Node::Scalar(Scalar::Null) => "null",
            Node::Scalar(Scalar::Bool(_)) => "boolean",
            Node::Scalar(Scalar::Number(_)) => "number",
            Node::Scalar(Scalar::String(_)) => "string",
        }
    }
}

impl From<serde_yaml::Value> for Node {
    fn from(value: serde_yaml::Value) -> Self {
        use serde_yaml::Value;

        match value {
            Value::Null => Node::Scalar(Scalar::Null),
            Value::Bool(b) => Node::Scalar(Scalar::Bool(b)),
            Value::Number(n) => Node::Scalar(Scalar::Number(n)),
            Value::String(s) => Node::Scalar(Scalar::String(s)),
            Value::Sequence(items) => Node::Sequence(items.into_iter().map(Node::from).collect()),
            Value::Mapping(entries) => {
                let mut map = Mapping::with_capacity(entries.len());
                for (key, value) in entries {
                    map.insert(key_to_string(key), Node::from(value));
                }
                Node::Mapping(map)
            }
            Value::Tagged(tagged) => {
                debug!("Dropping YAML tag {}", tagged.tag);
                Node::from(tagged.value)
            }
        }
    }
}

fn key_to_string(key: serde_yaml::Value) -> String {
    use serde_yaml::Value;

    match key {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Tagged(tagged) => key_to_string(tagged.value),
        complex => serde_yaml::to_string(&complex)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Node::Mapping(map) => {
                let mut state = serializer.serialize_map(Some(map.len()))?;
                for (key, value) in map {
                    state.serialize_entry(key, value)?;
                }
                state.end()
            }
            Node::Sequence(items) => serializer.collect_seq(items),
            Node::Scalar(scalar) => scalar.serialize(serializer),
        }
    }
}

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Scalar::Null => serializer.serialize_unit(),
            Scalar::Bool(b) => serializer.serialize_bool(*b),
            Scalar::Number(n) => n.serialize(serializer),
            Scalar::String(s) => serializer.serialize_str(s),
        }
    }
}

/// Reads and parses a document file.
///
/// # Errors
///
/// Returns [`MergeError::FileNotFound`] when the path does not exist,
/// [`MergeError::FileUnreadable`] for any other I/O failure and
/// [`MergeError::Syntax`] when the content is not valid YAML/JSON.
pub fn load_document(path: &Path) -> Result<Node> {
    debug!("Loading document: {}", path.display());

    let content = fs::read_to_string(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => MergeError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => MergeError::FileUnreadable {
            path: path.to_path_buf(),
            source,
        },
    })?;

    Node::from_yaml_str(&content).map_err(|err| MergeError::Syntax {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}
