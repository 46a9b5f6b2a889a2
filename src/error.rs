use std::io;

use thiserror::Error;

use crate::{const_array::ElementKind, link::LinkOption};

/// Problems detected while constructing a value, name or record
///
/// These are always raised immediately, at the point the offending value is
/// built, and carry enough context (index, name) to point at the culprit.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("ConstArray: empty iterable is not allowed")]
    EmptyArray,
    #[error("ConstArray: element at index {index} is a {kind}, expected a string, parameter or number")]
    UnsupportedElement { index: usize, kind: &'static str },
    #[error("ConstArray: cannot mix {expected} with an element at index {index} which is a {found}")]
    MixedElements {
        index: usize,
        expected: ElementKind,
        found: &'static str,
    },
    #[error("Invalid record name '{name}': {reason}")]
    InvalidRecordName { name: String, reason: &'static str },
    #[error("Invalid record type '{0}'")]
    InvalidRecordType(String),
    #[error("Invalid field name '{0}'")]
    InvalidFieldName(String),
    #[error("Invalid parameter name '{0}'")]
    InvalidParameterName(String),
    #[error("Invalid name prefix '{0}'")]
    InvalidPrefix(String),
    #[error("Invalid info name '{0}'")]
    InvalidInfoName(String),
    #[error("Link options {first} and {second} cannot be combined")]
    ConflictingLinkOptions { first: LinkOption, second: LinkOption },
    #[error("Cannot create fanout '{0}' with no links")]
    EmptyFanout(String),
}

/// Top-level error for building and writing a database
#[derive(Error, Debug)]
pub enum BuilderError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{kind} '{name}' is already defined")]
    DuplicateName { kind: &'static str, name: String },
    #[error("Field {field} of record '{record}' links to undefined record '{target}'")]
    UnresolvedReference {
        record: String,
        field: String,
        target: String,
    },
    /// An operation that needs a defined record was given a name with none
    #[error("Record '{0}' is not defined")]
    UndefinedRecord(String),
    /// A value reached formatting in a state validation should have rejected
    #[error("Internal formatting error: {0}")]
    Format(String),
    #[error("Failed to write database")]
    Io(#[from] io::Error),
    #[error("Failed to parse database text: {0}")]
    Parse(String),
}

impl From<nom::error::Error<&str>> for BuilderError {
    fn from(err: nom::error::Error<&str>) -> Self {
        let context: String = err.input.chars().take(24).collect();
        BuilderError::Parse(format!("{:?} at {context:?}", err.code))
    }
}
