//! # Management Errors
//!
//! This module defines the error taxonomy shared by the model, the dispatcher,
//! the handlers and the document codecs. Every failure is recoverable at the
//! operation boundary: the transaction rolls back and the typed error is handed
//! to the caller unchanged.
//!
//! The five categories are separate enums so callers can match on a whole
//! family (`ManagementError::Validation(_)`) or on a single case.

use thiserror::Error;

/// Errors about the shape of the resource tree.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StructuralError {
    /// A resource already exists at the address.
    #[error("Duplicate resource: {0}")]
    DuplicateResource(String),

    /// The parent of the address does not exist.
    #[error("Unknown parent for {0}")]
    UnknownParent(String),

    /// No resource exists at the address.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// The resource still has children and cannot be removed.
    #[error("Resource {0} has children; remove them first")]
    HasChildren(String),
}

/// Errors about attribute values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Unknown attribute '{attribute}' for resource type '{resource_type}'")]
    UnknownAttribute {
        resource_type: String,
        attribute: String,
    },

    #[error("Invalid value for '{attribute}': {reason}")]
    InvalidValue { attribute: String, reason: String },

    #[error("Missing required attribute '{attribute}' on {address}")]
    MissingRequiredAttribute { address: String, attribute: String },
}

/// Errors about references between resources.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReferenceError {
    /// The referenced resource does not exist.
    #[error("'{attribute}' references {target}, which does not exist")]
    DanglingReference { attribute: String, target: String },
}

/// Errors raised while resolving an operation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OperationError {
    #[error("No operation '{operation}' at {address}")]
    NoSuchOperation { address: String, operation: String },

    #[error("Operation '{0}' is internal and cannot be invoked directly")]
    InternalOperation(String),

    #[error("Operation '{operation}' is already registered for {pattern}")]
    DuplicateOperation { pattern: String, operation: String },
}

/// Errors raised by the document codecs.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FormatError {
    #[error("Unrecognized element '{element}' in schema {version}")]
    UnrecognizedElement { element: String, version: String },

    #[error("Element '{0}' may only appear once")]
    DuplicateElement(String),

    #[error("Attribute '{attribute}' cannot be written in schema {version}")]
    UnsupportedForVersion { attribute: String, version: String },

    #[error("Unknown document namespace '{0}'")]
    UnknownNamespace(String),

    #[error("Namespace '{namespace}' is newer than schema {version}")]
    UnsupportedNamespace { namespace: String, version: String },

    #[error("No codec registered for schema version {0}")]
    UnknownVersion(String),

    #[error("Malformed document: {0}")]
    Malformed(String),
}

/// Top-level error returned by every management entry point.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ManagementError {
    #[error(transparent)]
    Structural(#[from] StructuralError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Reference(#[from] ReferenceError),
    #[error(transparent)]
    Operation(#[from] OperationError),
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error("Management controller closed")]
    ControllerClosed,
    #[error("Management controller dropped response channel")]
    ControllerDropped,
}

impl From<quick_xml::Error> for FormatError {
    fn from(e: quick_xml::Error) -> Self {
        FormatError::Malformed(e.to_string())
    }
}

impl From<quick_xml::Error> for ManagementError {
    fn from(e: quick_xml::Error) -> Self {
        ManagementError::Format(e.into())
    }
}

/// Convenience alias used across the framework.
pub type ManagementResult<T> = Result<T, ManagementError>;
