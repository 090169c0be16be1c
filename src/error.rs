use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error for a generation run
#[derive(Debug, Error)]
pub enum Error {
    #[error("parse error in {}: {message}", .file.display())]
    Parse { file: PathBuf, message: String },

    #[error("invalid declarations:\n{0}")]
    Declarations(#[from] DeclarationErrors),

    #[error("registration rejected: {0}")]
    Registration(#[from] RegistrationError),

    #[error("rendering failed for type {type_name}: {source}")]
    Render {
        type_name: String,
        #[source]
        source: SchemaError,
    },

    #[error("rendering failed for operation {operation_id}: {source}")]
    Operation {
        operation_id: String,
        #[source]
        source: SchemaError,
    },

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(format!("JSON: {}", err))
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::Serialization(format!("YAML: {}", err))
    }
}

/// A problem with a single declared name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{type_name}: {message}")]
pub struct DeclarationError {
    pub type_name: String,
    pub message: String,
}

impl DeclarationError {
    pub fn new(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            message: message.into(),
        }
    }
}

/// Every declaration problem found during one scan pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeclarationErrors(pub Vec<DeclarationError>);

impl DeclarationErrors {
    pub fn push(&mut self, err: DeclarationError) {
        self.0.push(err);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DeclarationError> {
        self.0.iter()
    }

    /// Returns `Ok(())` when nothing was collected.
    pub fn into_result(self) -> std::result::Result<(), DeclarationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for DeclarationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines: Vec<String> = self.0.iter().map(|e| format!("  - {}", e)).collect();
        write!(f, "{}", lines.join("\n"))
    }
}

impl std::error::Error for DeclarationErrors {}

/// Errors returned synchronously from the registration surface
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error("registration window is closed, cannot register {operation_id}")]
    WindowClosed { operation_id: String },

    #[error("invalid operation id {0:?}: only ASCII letters are allowed")]
    InvalidOperationId(String),

    #[error("duplicate operation id {0}")]
    DuplicateOperationId(String),

    #[error("{operation_id}: route {method} {path} is already registered")]
    DuplicateRoute {
        operation_id: String,
        method: String,
        path: String,
    },

    #[error("{operation_id}: missing {field}")]
    MissingField {
        operation_id: String,
        field: &'static str,
    },

    #[error("{operation_id}: invalid path {path:?}: {reason}")]
    InvalidPath {
        operation_id: String,
        path: String,
        reason: String,
    },

    #[error("{operation_id}: path placeholder {{{name}}} has no declared path parameter")]
    UndeclaredPathParameter { operation_id: String, name: String },

    #[error("{operation_id}: path parameter {name} does not appear in the path")]
    UnusedPathParameter { operation_id: String, name: String },

    #[error("{operation_id}: path parameter {name} must be required")]
    OptionalPathParameter { operation_id: String, name: String },

    #[error("{operation_id}: parameter {name} declared more than once in {location}")]
    DuplicateParameter {
        operation_id: String,
        name: String,
        location: String,
    },

    #[error("{operation_id}: unknown type {type_name}")]
    UnknownType {
        operation_id: String,
        type_name: String,
    },

    #[error("{operation_id}: invalid QoS level {qos}, expected 0, 1 or 2")]
    InvalidQos { operation_id: String, qos: u8 },

    #[error("{operation_id}: {source}")]
    Topic {
        operation_id: String,
        #[source]
        source: TopicError,
    },
}

/// Topic pattern syntax and parameter cross-check failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopicError {
    #[error("topic pattern is empty")]
    Empty,

    #[error("topic {0:?} must not start with a separator")]
    LeadingSeparator(String),

    #[error("topic {0:?} must not end with a separator")]
    TrailingSeparator(String),

    #[error("topic {pattern:?} has an empty segment at position {index}")]
    EmptySegment { pattern: String, index: usize },

    #[error("topic {pattern:?} contains wildcard {wildcard:?}, declare a named parameter instead")]
    Wildcard { pattern: String, wildcard: char },

    #[error("topic segment {segment:?} is not a well-formed {{name}} parameter")]
    MalformedParameter { segment: String },

    #[error("topic parameter {{{0}}} appears more than once")]
    RepeatedPlaceholder(String),

    #[error("topic placeholder {{{0}}} has no declared parameter")]
    UndeclaredParameter(String),

    #[error("topic parameter {0} does not appear in the pattern")]
    UnusedParameter(String),

    #[error("topic parameter {0} declared more than once")]
    DuplicateParameter(String),

    #[error("topic parameter {0} needs a description")]
    MissingDescription(String),

    #[error("topic parameter {0} needs a type")]
    MissingType(String),
}

/// Schema synthesis failure; always an upstream defect
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct SchemaError {
    pub message: String,
}

impl SchemaError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
