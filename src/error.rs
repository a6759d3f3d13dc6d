use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for the merge engine
pub type Result<T> = std::result::Result<T, MergeError>;

/// Error types for the merge engine
#[derive(Debug, Error)]
pub enum MergeError {
    #[error("file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("failed to read file {}", path.display())]
    FileUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {message}", path.display())]
    Syntax { path: PathBuf, message: String },

    #[error("referenced file {} could not be read", file.display())]
    ReferencedFileUnreadable {
        file: PathBuf,
        #[source]
        source: Box<MergeError>,
    },

    #[error("referenced file {} is not a valid document", file.display())]
    ReferencedFileInvalid {
        file: PathBuf,
        #[source]
        source: Box<MergeError>,
    },

    #[error("malformed reference '{reference}': missing '#' fragment separator")]
    MalformedReference { reference: String },

    #[error("reference value must be a string, found {found}")]
    ReferenceNotString { found: &'static str },

    #[error("pointer segment '{segment}' not found at '{path_so_far}'")]
    PointerNotFound { segment: String, path_so_far: String },

    #[error("expected a mapping at '{path_so_far}' to resolve segment '{segment}', found {found}")]
    PointerTypeMismatch {
        segment: String,
        path_so_far: String,
        found: &'static str,
    },

    #[error("reference '{reference}' must point at a mapping, found {found}")]
    InvalidReferenceTarget {
        reference: String,
        found: &'static str,
    },

    #[error("reference cycle detected at '{reference}'")]
    ReferenceCycle { reference: String },

    #[error("invalid root document {}: {reason}", path.display())]
    InvalidRootDocument { path: PathBuf, reason: String },

    #[error("failed to merge path '{path_key}' from {}", file.display())]
    Path {
        path_key: String,
        file: PathBuf,
        #[source]
        source: Box<MergeError>,
    },

    #[error("failed to merge components from {}", file.display())]
    Components {
        file: PathBuf,
        #[source]
        source: Box<MergeError>,
    },

    #[error("failed to write output {}", path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl MergeError {
    /// Wraps an error raised while merging the path entry `path_key` of `file`.
    pub fn in_path(self, path_key: &str, file: impl Into<PathBuf>) -> Self {
        MergeError::Path {
            path_key: path_key.to_string(),
            file: file.into(),
            source: Box::new(self),
        }
    }

    /// Wraps an error raised while aggregating the components of `file`.
    pub fn in_components(self, file: impl Into<PathBuf>) -> Self {
        MergeError::Components {
            file: file.into(),
            source: Box::new(self),
        }
    }

    /// Renders this error and every underlying cause as one line.
    pub fn chain_message(&self) -> String {
        let mut message = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        message
    }
}

impl From<serde_json::Error> for MergeError {
    fn from(err: serde_json::Error) -> Self {
        MergeError::Serialization(format!("JSON serialization error: {}", err))
    }
}

impl From<serde_yaml::Error> for MergeError {
    fn from(err: serde_yaml::Error) -> Self {
        MergeError::Serialization(format!("YAML serialization error: {}", err))
    }
}
