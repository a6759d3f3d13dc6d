//! Canonical field ordering for merged documents.
//!
//! OpenAPI objects carry no type tags, so the shape of each mapping is sniffed from the
//! fields it exposes. Predicates are evaluated in a fixed precedence (schema, parameter,
//! response, path item, operation) and the first match decides which fields lead; any
//! other field follows in its original order. The result is deterministic for equal
//! input trees, so repeated merges produce byte-identical output.

use crate::document::{Mapping, Node};

/// Top-level fields, in output order.
const ROOT_FIELDS: &[&str] = &[
    "openapi",
    "info",
    "servers",
    "paths",
    "components",
    "security",
    "tags",
];

/// Top-level fields dropped from the output when absent or empty.
const OPTIONAL_ROOT_FIELDS: &[&str] = &["servers", "security", "tags"];

const SCHEMA_FIELDS: &[&str] = &[
    "type",
    "format",
    "title",
    "description",
    "default",
    "multipleOf",
    "maximum",
    "exclusiveMaximum",
    "minimum",
    "exclusiveMinimum",
    "maxLength",
    "minLength",
    "pattern",
    "maxItems",
    "minItems",
    "uniqueItems",
    "maxProperties",
    "minProperties",
    "required",
    "enum",
    "properties",
    "items",
    "allOf",
    "oneOf",
    "anyOf",
    "not",
    "additionalProperties",
    "nullable",
    "discriminator",
    "readOnly",
    "writeOnly",
    "xml",
    "externalDocs",
    "example",
    "deprecated",
];

const PARAMETER_FIELDS: &[&str] = &[
    "name",
    "in",
    "description",
    "required",
    "deprecated",
    "allowEmptyValue",
    "style",
    "explode",
    "allowReserved",
    "schema",
    "example",
    "examples",
    "content",
];

const RESPONSE_FIELDS: &[&str] = &["description", "headers", "content", "links"];

const HTTP_METHODS: &[&str] = &[
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

const PATH_ITEM_FIELDS: &[&str] = &[
    "$ref",
    "get",
    "put",
    "post",
    "delete",
    "options",
    "head",
    "patch",
    "trace",
    "summary",
    "description",
    "servers",
    "parameters",
];

const OPERATION_FIELDS: &[&str] = &[
    "tags",
    "summary",
    "description",
    "externalDocs",
    "operationId",
    "parameters",
    "requestBody",
    "responses",
    "callbacks",
    "deprecated",
    "security",
    "servers",
];

const OPERATION_MARKERS: &[&str] = &[
    "summary",
    "description",
    "operationId",
    "responses",
    "parameters",
    "requestBody",
];

/// Object shapes recognized by field sniffing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Schema,
    Parameter,
    Response,
    PathItem,
    Operation,
    /// No recognized shape; original order is kept
    Plain,
}

impl Shape {
    /// Detects the shape of `map`. `context` is the key the mapping (or its enclosing
    /// sequence) is stored under.
    pub fn detect(map: &Mapping, context: Option<&str>) -> Shape {
        if context == Some("parameters") && is_parameter(map) {
            return Shape::Parameter;
        }

        if is_schema(map) {
            Shape::Schema
        } else if is_parameter(map) {
            Shape::Parameter
        } else if is_response(map) {
            Shape::Response
        } else if is_path_item(map) {
            Shape::PathItem
        } else if is_operation(map) {
            Shape::Operation
        } else {
            Shape::Plain
        }
    }

    fn leading_fields(self) -> &'static [&'static str] {
        match self {
            Shape::Schema => SCHEMA_FIELDS,
            Shape::Parameter => PARAMETER_FIELDS,
            Shape::Response => RESPONSE_FIELDS,
            Shape::PathItem => PATH_ITEM_FIELDS,
            Shape::Operation => OPERATION_FIELDS,
            Shape::Plain => &[],
        }
    }
}

// `required` is a list of property names on schemas but a boolean on parameters and
// request bodies, so only the list form marks a schema.
fn is_schema(map: &Mapping) -> bool {
    ["type", "properties", "items", "format"]
        .iter()
        .any(|field| map.contains_key(*field))
        || matches!(map.get("required"), Some(Node::Sequence(_)))
}

fn is_parameter(map: &Mapping) -> bool {
    map.contains_key("name") && map.contains_key("in")
}

fn is_response(map: &Mapping) -> bool {
    map.contains_key("description") || map.contains_key("content")
}

fn is_path_item(map: &Mapping) -> bool {
    HTTP_METHODS.iter().any(|method| map.contains_key(*method))
        || map.contains_key("parameters")
        || map.contains_key("$ref")
}

fn is_operation(map: &Mapping) -> bool {
    OPERATION_MARKERS.iter().any(|field| map.contains_key(*field))
}

/// Returns a copy of `root` with every mapping in canonical field order.
pub fn canonicalize(root: &Node) -> Node {
    match root {
        Node::Mapping(map) => Node::Mapping(order_root(map)),
        other => order_node(other, None),
    }
}

fn order_root(map: &Mapping) -> Mapping {
    let mut ordered = Mapping::with_capacity(map.len());

    for field in ROOT_FIELDS {
        let Some(value) = map.get(*field) else {
            continue;
        };
        if OPTIONAL_ROOT_FIELDS.contains(field) && value.is_empty() {
            continue;
        }
        ordered.insert(field.to_string(), order_node(value, Some(*field)));
    }

    for (key, value) in map {
        if !ROOT_FIELDS.contains(&key.as_str()) {
            ordered.insert(key.clone(), order_node(value, Some(key.as_str())));
        }
    }

    ordered
}

fn order_node(node: &Node, context: Option<&str>) -> Node {
    match node {
        Node::Mapping(map) => Node::Mapping(order_mapping(map, context)),
        Node::Sequence(items) => {
            Node::Sequence(items.iter().map(|item| order_node(item, context)).collect())
        }
        Node::Scalar(_) => node.clone(),
    }
}

fn order_mapping(map: &Mapping, context: Option<&str>) -> Mapping {
    let shape = Shape::detect(map, context);
    let mut ordered = Mapping::with_capacity(map.len());

    for field in shape.leading_fields() {
        let Some(value) = map.get(*field) else {
            continue;
        };
        let value = match (shape, *field, value) {
            (Shape::Schema, "properties", Node::Mapping(properties)) => {
                Node::Mapping(order_properties(properties))
            }
            _ => order_node(value, Some(*field)),
        };
        ordered.insert(field.to_string(), value);
    }

    for (key, value) in map {
        if !ordered.contains_key(key) {
            ordered.insert(key.clone(), order_node(value, Some(key.as_str())));
        }
    }

    ordered
}

/// Schema properties are sorted by name.
fn order_properties(properties: &Mapping) -> Mapping {
    let mut names: Vec<&String> = properties.keys().collect();
    names.sort();

    names
        .into_iter()
        .filter_map(|name| {
            properties
                .get(name)
                .map(|value| (name.clone(), order_node(value, None)))
        })
        .collect()
}
