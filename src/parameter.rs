use std::fmt;

use crate::{
    error::{BuilderError, ValidationError},
    format::quote_string,
    value::{DbValue, FieldContext},
};

/// A named macro placeholder, substituted when the database is loaded
///
/// The textual form is the macro reference `$(NAME)`, so a parameter can be
/// embedded into larger strings with `format!("@{param}")` as well as being
/// assigned directly to a field.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Parameter {
    name: String,
    description: String,
}

impl Parameter {
    pub fn new(name: &str, description: &str) -> Result<Parameter, ValidationError> {
        let valid = name
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid {
            return Err(ValidationError::InvalidParameterName(name.to_owned()));
        }
        Ok(Parameter {
            name: name.to_owned(),
            description: description.to_owned(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "$({})", self.name)
    }
}

impl DbValue for Parameter {
    fn validate(&self, _context: &FieldContext<'_>) -> Result<(), BuilderError> {
        // The name grammar was checked on construction, and whether the macro
        // is defined is only known at expansion time.
        Ok(())
    }
    fn format_db(&self, _context: &FieldContext<'_>) -> Result<String, BuilderError> {
        Ok(quote_string(&self.to_string()))
    }
}
