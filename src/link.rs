//! Links between records, and the options that decorate them.
//!
//! Assigning a [`RecordName`] to a field links to the record as a whole;
//! [`RecordName::field`] links to one of its fields. Either can be wrapped by
//! the decorator functions in this module, which append EPICS link options to
//! the rendered link. Decorations nest, and the options are written innermost
//! first, so `pp(ms(t))` renders as `"T MS PP"`.
//!
//! Field names and option combinations are checked as the link is built, so
//! [`RecordName::field`] and every decorator return a `Result`. Decorators
//! also accept such a `Result`, which lets nested decorations be written with
//! a single `?` at the end: `pp(ms(t.field("VAL")))?`.

use std::fmt;

use crate::{
    database::{RecordName, is_valid_field_name},
    error::{BuilderError, ValidationError},
    format::quote_string,
    parameter::Parameter,
    value::{DbValue, FieldContext},
};

/// Options that can follow a link target in a `.db` field
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkOption {
    /// No process passive
    NPP,
    /// Process passive
    PP,
    /// Force a Channel Access link
    CA,
    /// Process this record on every monitor update
    CP,
    /// As CP, but only if this record is passive
    CPP,
    /// No maximize severity
    NMS,
    /// Maximize severity
    MS,
    /// Maximize severity, with status
    MSS,
    /// Maximize severity, if invalid
    MSI,
}

impl LinkOption {
    /// Whether this option controls processing rather than alarm severity
    pub fn is_process_option(&self) -> bool {
        matches!(
            self,
            LinkOption::NPP | LinkOption::PP | LinkOption::CA | LinkOption::CP | LinkOption::CPP
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LinkOption::NPP => "NPP",
            LinkOption::PP => "PP",
            LinkOption::CA => "CA",
            LinkOption::CP => "CP",
            LinkOption::CPP => "CPP",
            LinkOption::NMS => "NMS",
            LinkOption::MS => "MS",
            LinkOption::MSS => "MSS",
            LinkOption::MSI => "MSI",
        }
    }
}

impl fmt::Display for LinkOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A link to a record, optionally to a specific field of it
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordLink {
    name: RecordName,
    field: Option<String>,
}

impl RecordLink {
    pub fn record(&self) -> RecordName {
        self.name
    }

    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    /// The unquoted link text, `NAME` or `NAME.FIELD`
    fn target_text(&self, context: &FieldContext<'_>) -> Result<String, BuilderError> {
        let name = context.database.name(self.name)?;
        Ok(match &self.field {
            Some(field) => format!("{name}.{field}"),
            None => name.to_owned(),
        })
    }
}

impl From<RecordName> for RecordLink {
    fn from(name: RecordName) -> Self {
        RecordLink { name, field: None }
    }
}

impl RecordName {
    /// Link to a single field of this record
    pub fn field(&self, field: &str) -> Result<RecordLink, ValidationError> {
        if !is_valid_field_name(field) {
            return Err(ValidationError::InvalidFieldName(field.to_owned()));
        }
        Ok(RecordLink {
            name: *self,
            field: Some(field.to_owned()),
        })
    }
}

impl DbValue for RecordLink {
    fn validate(&self, context: &FieldContext<'_>) -> Result<(), BuilderError> {
        if !context.database.is_resolved(self.name)? {
            return Err(BuilderError::UnresolvedReference {
                record: context.record.canonical_name().to_owned(),
                field: context.field.to_owned(),
                target: context.database.name(self.name)?.to_owned(),
            });
        }
        Ok(())
    }

    fn format_db(&self, context: &FieldContext<'_>) -> Result<String, BuilderError> {
        Ok(quote_string(&self.target_text(context)?))
    }
}

/// What a decorated link points at
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LinkTarget {
    Record(RecordLink),
    Parameter(Parameter),
}

/// A link with one or more options attached
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecoratedLink {
    target: LinkTarget,
    options: Vec<LinkOption>,
}

impl DecoratedLink {
    pub fn target(&self) -> &LinkTarget {
        &self.target
    }

    pub fn options(&self) -> &[LinkOption] {
        &self.options
    }

    /// Add one more option, after any already present
    ///
    /// A link takes at most one process option (NPP, PP, CA, CP, CPP) and one
    /// severity option (NMS, MS, MSS, MSI).
    pub fn with_option(mut self, option: LinkOption) -> Result<DecoratedLink, ValidationError> {
        if let Some(first) = self
            .options
            .iter()
            .find(|o| o.is_process_option() == option.is_process_option())
        {
            return Err(ValidationError::ConflictingLinkOptions {
                first: *first,
                second: option,
            });
        }
        self.options.push(option);
        Ok(self)
    }
}

/// Anything a link option can be attached to
pub trait IntoLink {
    fn into_link(self) -> Result<DecoratedLink, ValidationError>;
}

impl IntoLink for DecoratedLink {
    fn into_link(self) -> Result<DecoratedLink, ValidationError> {
        Ok(self)
    }
}

impl IntoLink for RecordLink {
    fn into_link(self) -> Result<DecoratedLink, ValidationError> {
        Ok(self.into())
    }
}

impl IntoLink for RecordName {
    fn into_link(self) -> Result<DecoratedLink, ValidationError> {
        Ok(self.into())
    }
}

impl IntoLink for Parameter {
    fn into_link(self) -> Result<DecoratedLink, ValidationError> {
        Ok(self.into())
    }
}

impl IntoLink for &Parameter {
    fn into_link(self) -> Result<DecoratedLink, ValidationError> {
        Ok(self.into())
    }
}

impl<T: IntoLink> IntoLink for Result<T, ValidationError> {
    fn into_link(self) -> Result<DecoratedLink, ValidationError> {
        self?.into_link()
    }
}

impl From<RecordLink> for DecoratedLink {
    fn from(link: RecordLink) -> Self {
        DecoratedLink {
            target: LinkTarget::Record(link),
            options: Vec::new(),
        }
    }
}

impl From<RecordName> for DecoratedLink {
    fn from(name: RecordName) -> Self {
        RecordLink::from(name).into()
    }
}

impl From<Parameter> for DecoratedLink {
    fn from(param: Parameter) -> Self {
        DecoratedLink {
            target: LinkTarget::Parameter(param),
            options: Vec::new(),
        }
    }
}

impl From<&Parameter> for DecoratedLink {
    fn from(param: &Parameter) -> Self {
        param.clone().into()
    }
}

impl DbValue for DecoratedLink {
    fn validate(&self, context: &FieldContext<'_>) -> Result<(), BuilderError> {
        match &self.target {
            LinkTarget::Record(link) => link.validate(context),
            LinkTarget::Parameter(param) => param.validate(context),
        }
    }

    fn format_db(&self, context: &FieldContext<'_>) -> Result<String, BuilderError> {
        let mut text = match &self.target {
            LinkTarget::Record(link) => link.target_text(context)?,
            LinkTarget::Parameter(param) => param.to_string(),
        };
        for option in &self.options {
            text.push(' ');
            text.push_str(option.as_str());
        }
        Ok(quote_string(&text))
    }
}

/// Generate the decorator function for a single link option
macro_rules! link_decorator {
    ($(#[$doc:meta])* $name:ident, $option:ident) => {
        $(#[$doc])*
        pub fn $name(link: impl IntoLink) -> Result<DecoratedLink, ValidationError> {
            link.into_link()?.with_option(LinkOption::$option)
        }
    };
}
link_decorator!(
    /// Add the `NPP` (no process passive) option to a link
    npp, NPP
);
link_decorator!(
    /// Add the `PP` (process passive) option to a link
    pp, PP
);
link_decorator!(
    /// Add the `CA` (channel access) option to a link
    ca, CA
);
link_decorator!(
    /// Add the `CP` (process on change) option to a link
    cp, CP
);
link_decorator!(
    /// Add the `CPP` (process on change if passive) option to a link
    cpp, CPP
);
link_decorator!(
    /// Add the `NMS` (no maximize severity) option to a link
    nms, NMS
);
link_decorator!(
    /// Add the `MS` (maximize severity) option to a link
    ms, MS
);
link_decorator!(
    /// Add the `MSS` (maximize severity and status) option to a link
    mss, MSS
);
link_decorator!(
    /// Add the `MSI` (maximize severity if invalid) option to a link
    msi, MSI
);
