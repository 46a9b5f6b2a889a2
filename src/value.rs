//! Field values and the callback contract used to render them.
//!
//! Every value that can be assigned to a record field is one of a closed set
//! of kinds, enumerated by [`Value`]:
//! - [`Value::Scalar`] - a plain number, boolean or string ([`Scalar`])
//! - [`Value::Parameter`] - a macro placeholder, see [`Parameter`]
//! - [`Value::ConstArray`] - a constant link array literal, see [`ConstArray`]
//! - [`Value::Record`] - a link to another record (or one of its fields)
//! - [`Value::Decorated`] - a link carrying process/severity options
//!
//! Each kind implements [`DbValue`], which is invoked by the serializer once per
//! field: first [`DbValue::validate`] against the owning record and field, then
//! [`DbValue::format_db`] to produce the exact text that goes after the field
//! name.

use rust_decimal::Decimal;

use crate::{
    const_array::ConstArray,
    database::{Database, Record, RecordName},
    error::BuilderError,
    format::{format_scalar, quote_string},
    link::{DecoratedLink, RecordLink},
    parameter::Parameter,
};

/// The record and field a value is being rendered for
#[derive(Clone, Copy)]
pub struct FieldContext<'a> {
    pub database: &'a Database,
    pub record: &'a Record,
    pub field: &'a str,
}

/// Callbacks invoked by the serializer for every field value
pub trait DbValue {
    /// Check the value against its owning record and field.
    ///
    /// Called any number of times; must not change the value.
    fn validate(&self, context: &FieldContext<'_>) -> Result<(), BuilderError>;

    /// Produce the rendered field text, e.g. `"1 second"` or `[1,2,3]`
    fn format_db(&self, context: &FieldContext<'_>) -> Result<String, BuilderError>;
}

/// A literal value
#[derive(Clone, Debug, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    /// Kept apart from `Float` so it renders in its own shortest form
    Float32(f32),
    Decimal(Decimal),
    String(String),
}

impl Scalar {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Scalar::Bool(_) => "boolean",
            Scalar::Int(_) => "integer",
            Scalar::Float(_) | Scalar::Float32(_) => "float",
            Scalar::Decimal(_) => "decimal",
            Scalar::String(_) => "string",
        }
    }
}

impl DbValue for Scalar {
    fn validate(&self, _context: &FieldContext<'_>) -> Result<(), BuilderError> {
        Ok(())
    }
    fn format_db(&self, _context: &FieldContext<'_>) -> Result<String, BuilderError> {
        Ok(quote_string(&format_scalar(self)))
    }
}

/// Anything that can be assigned to a record field
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Scalar(Scalar),
    Parameter(Parameter),
    ConstArray(ConstArray),
    Record(RecordLink),
    Decorated(DecoratedLink),
}

impl Value {
    /// Human readable name of the value kind, for error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Scalar(scalar) => scalar.kind_name(),
            Value::Parameter(_) => "parameter",
            Value::ConstArray(_) => "constant array",
            Value::Record(_) => "record link",
            Value::Decorated(_) => "decorated link",
        }
    }
}

impl DbValue for Value {
    fn validate(&self, context: &FieldContext<'_>) -> Result<(), BuilderError> {
        match self {
            Value::Scalar(v) => v.validate(context),
            Value::Parameter(v) => v.validate(context),
            Value::ConstArray(v) => v.validate(context),
            Value::Record(v) => v.validate(context),
            Value::Decorated(v) => v.validate(context),
        }
    }
    fn format_db(&self, context: &FieldContext<'_>) -> Result<String, BuilderError> {
        match self {
            Value::Scalar(v) => v.format_db(context),
            Value::Parameter(v) => v.format_db(context),
            Value::ConstArray(v) => v.format_db(context),
            Value::Record(v) => v.format_db(context),
            Value::Decorated(v) => v.format_db(context),
        }
    }
}

/// Implement a From<type> for a specific scalar kind, and for Value through it
macro_rules! impl_scalar_from {
    ($variant:ident, $typ:ty) => {
        impl From<$typ> for Scalar {
            fn from(value: $typ) -> Self {
                Scalar::$variant(value.into())
            }
        }
        impl From<$typ> for Value {
            fn from(value: $typ) -> Self {
                Value::Scalar(value.into())
            }
        }
    };
}
impl_scalar_from!(Bool, bool);
impl_scalar_from!(Int, i8);
impl_scalar_from!(Int, i16);
impl_scalar_from!(Int, i32);
impl_scalar_from!(Int, i64);
impl_scalar_from!(Int, u8);
impl_scalar_from!(Int, u16);
impl_scalar_from!(Int, u32);
impl_scalar_from!(Float32, f32);
impl_scalar_from!(Float, f64);
impl_scalar_from!(Decimal, Decimal);
impl_scalar_from!(String, String);
impl_scalar_from!(String, &str);

impl From<Scalar> for Value {
    fn from(value: Scalar) -> Self {
        Value::Scalar(value)
    }
}

impl From<Parameter> for Value {
    fn from(value: Parameter) -> Self {
        Value::Parameter(value)
    }
}

impl From<&Parameter> for Value {
    fn from(value: &Parameter) -> Self {
        Value::Parameter(value.clone())
    }
}

impl From<ConstArray> for Value {
    fn from(value: ConstArray) -> Self {
        Value::ConstArray(value)
    }
}

impl From<RecordName> for Value {
    fn from(value: RecordName) -> Self {
        Value::Record(value.into())
    }
}

impl From<RecordLink> for Value {
    fn from(value: RecordLink) -> Self {
        Value::Record(value)
    }
}

impl From<DecoratedLink> for Value {
    fn from(value: DecoratedLink) -> Self {
        Value::Decorated(value)
    }
}
