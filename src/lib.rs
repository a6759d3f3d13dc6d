//! OpenAPI Merge - Consolidate multi-file OpenAPI 3.x documents into one.
//!
//! A root document may point at other files through `$ref` values such as
//! `./paths/users.yaml#/users`. This library resolves those references, pulls the
//! referenced path items and component definitions into the root document, rewrites
//! every remaining external reference to its local `#/components/...` form, and emits
//! the result with a stable, human-friendly field order.
//!
//! # Architecture
//!
//! 1. [`document`] - Order-preserving document tree and file loading
//! 2. [`reference`] - `$ref` parsing, JSON Pointer navigation and local rewriting
//! 3. [`state`] - Per-run bookkeeping: touched files, document cache, imported keys
//! 4. [`path_merger`] - Substitutes external path-item references
//! 5. [`components`] - Aggregates components from every touched file
//! 6. [`canonical`] - Canonical field ordering
//! 7. [`serializer`] - Serializes the document to YAML or JSON
//! 8. [`merger`] - Runs the whole pipeline
//!
//! # Example Usage
//!
//! ```no_run
//! use openapi_merge::{merger::merge_document, serializer::serialize_yaml};
//! use std::path::Path;
//!
//! let merged = merge_document(Path::new("api.yaml")).unwrap();
//! println!("Merged {} files", merged.files.len());
//! println!("{}", serialize_yaml(&merged.document).unwrap());
//! ```
//!
//! # Command-Line Interface
//!
//! For command-line usage, see the [`cli`] module.

pub mod canonical;
pub mod cli;
pub mod components;
pub mod document;
pub mod error;
pub mod merger;
pub mod path_merger;
pub mod reference;
pub mod serializer;
pub mod state;
