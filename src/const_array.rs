//! Constant link values, supported by EPICS Base 3.16.1 and above.
//!
//! A [`ConstArray`] assigned to a link field renders as a bracketed literal,
//! which the IOC treats as a constant rather than a link to another record:
//!
//! ```
//! # use epics_dbbuilder::{ConstArray, Database};
//! let mut db = Database::default();
//! db.record("lsi", "r")?
//!     .set("INP", ConstArray::new(["Plain String not DBLINK"])?)?;
//! let text = db.to_db_string(&Default::default())?;
//! assert!(text.contains(r#"field(INP, ["Plain String not DBLINK"])"#));
//! # Ok::<(), epics_dbbuilder::BuilderError>(())
//! ```

use std::fmt;

use crate::{
    error::{BuilderError, ValidationError},
    format::{format_scalar, quote_string},
    parameter::Parameter,
    value::{DbValue, FieldContext, Scalar, Value},
};

/// Which side of the string/number divide an element falls on
///
/// EPICS refuses arrays that mix the two, so every element of a
/// [`ConstArray`] must share one kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElementKind {
    /// Strings and parameters (which render as quoted macro references)
    StringLike,
    /// Integers, floats, decimals and booleans
    NumericLike,
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementKind::StringLike => f.write_str("strings"),
            ElementKind::NumericLike => f.write_str("numbers"),
        }
    }
}

/// One element of a constant array
#[derive(Clone, PartialEq)]
pub enum Constant {
    Parameter(Parameter),
    Scalar(Scalar),
}

impl Constant {
    pub fn kind(&self) -> ElementKind {
        match self {
            Constant::Parameter(_) | Constant::Scalar(Scalar::String(_)) => ElementKind::StringLike,
            Constant::Scalar(_) => ElementKind::NumericLike,
        }
    }

    fn kind_name(&self) -> &'static str {
        match self {
            Constant::Parameter(_) => "parameter",
            Constant::Scalar(scalar) => scalar.kind_name(),
        }
    }

    fn format(&self) -> String {
        match self {
            Constant::Parameter(p) => format!("\"{p}\""),
            Constant::Scalar(Scalar::String(s)) => quote_string(s),
            Constant::Scalar(scalar) => format_scalar(scalar),
        }
    }
}

impl fmt::Debug for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Parameter(p) => write!(f, "{p}"),
            Constant::Scalar(Scalar::String(s)) => write!(f, "{s:?}"),
            Constant::Scalar(scalar) => f.write_str(&format_scalar(scalar)),
        }
    }
}

/// A homogeneous, non-empty constant link array
#[derive(Clone, PartialEq)]
pub struct ConstArray {
    kind: ElementKind,
    values: Vec<Constant>,
}

impl ConstArray {
    /// Build a constant array from any finite iterable of values.
    ///
    /// Fails if the iterable is empty, if any element is not a string,
    /// parameter or number, or if strings and numbers are mixed. The first
    /// element decides the expected kind, and the error names the index of
    /// the first element that contradicts it.
    pub fn new<I, T>(values: I) -> Result<ConstArray, ValidationError>
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        let mut constants = Vec::new();
        let mut kind = None;
        for (index, value) in values.into_iter().enumerate() {
            let constant = match value.into() {
                Value::Scalar(scalar) => Constant::Scalar(scalar),
                Value::Parameter(param) => Constant::Parameter(param),
                other => {
                    return Err(ValidationError::UnsupportedElement {
                        index,
                        kind: other.kind_name(),
                    });
                }
            };
            match kind {
                None => kind = Some(constant.kind()),
                Some(expected) if expected != constant.kind() => {
                    return Err(ValidationError::MixedElements {
                        index,
                        expected,
                        found: constant.kind_name(),
                    });
                }
                Some(_) => (),
            }
            constants.push(constant);
        }
        // EPICS 7.0.3.1 does not consider "[]" a constant
        let Some(kind) = kind else {
            return Err(ValidationError::EmptyArray);
        };
        Ok(ConstArray {
            kind,
            values: constants,
        })
    }

    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    pub fn values(&self) -> &[Constant] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl DbValue for ConstArray {
    fn validate(&self, _context: &FieldContext<'_>) -> Result<(), BuilderError> {
        // Everything was checked in the constructor. dbVerify() does not
        // understand link syntax, so there is nothing further to ask of it.
        Ok(())
    }

    fn format_db(&self, _context: &FieldContext<'_>) -> Result<String, BuilderError> {
        let formatted: Vec<String> = self.values.iter().map(Constant::format).collect();
        Ok(format!("[{}]", formatted.join(",")))
    }
}

impl fmt::Debug for ConstArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ConstArray").field(&self.values).finish()
    }
}
