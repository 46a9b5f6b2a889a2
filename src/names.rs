//! Record naming strategies.
//!
//! A record is declared with a short name, which is turned into its canonical
//! name by the active [`RecordNames`] strategy of the [`Database`] together with
//! the stack of prefixes pushed with [`Database::push_prefix`]:
//!
//! - [`RecordNames::Template`] uses the short name verbatim. This suits
//!   template databases where the device part of the name is a macro.
//! - [`RecordNames::Delimited`] joins an optional device name, every active
//!   prefix and the short name with a delimiter, e.g. `XX-YY-ZZ-01:ABC:TEST`.
//!
//! [`Database`]: crate::Database
//! [`Database::push_prefix`]: crate::Database::push_prefix

use crate::error::ValidationError;

/// Longest record name accepted by the IOC (`PVNAME_STRINGSZ` less the NUL)
pub const MAX_RECORD_NAME_LENGTH: usize = 60;

/// Configuration for delimiter-joined names
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DelimitedNames {
    device: Option<String>,
    delimiter: char,
    check: bool,
}

impl DelimitedNames {
    pub fn new(delimiter: char) -> Self {
        DelimitedNames {
            device: None,
            delimiter,
            check: true,
        }
    }
    /// A fixed leading component, placed before any pushed prefixes
    pub fn device(mut self, device: &str) -> Self {
        self.device = Some(device.to_owned());
        self
    }
    /// Whether to check names for length and characters. Defaults to true.
    pub fn check(mut self, check: bool) -> Self {
        self.check = check;
        self
    }
    pub fn delimiter(&self) -> char {
        self.delimiter
    }
}

/// The strategy used to turn short names into canonical record names
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordNames {
    Template,
    Delimited(DelimitedNames),
}

impl Default for RecordNames {
    fn default() -> Self {
        RecordNames::Delimited(DelimitedNames::new(':'))
    }
}

impl From<DelimitedNames> for RecordNames {
    fn from(value: DelimitedNames) -> Self {
        RecordNames::Delimited(value)
    }
}

impl RecordNames {
    pub fn template() -> Self {
        RecordNames::Template
    }

    /// Delimited names with a device component, e.g. `("XX-YY-ZZ-01", ':')`
    pub fn simple(device: &str, delimiter: char) -> Self {
        DelimitedNames::new(delimiter).device(device).into()
    }

    /// Compute the canonical name for a short name under a prefix stack
    pub fn resolve(&self, short_name: &str, prefixes: &[String]) -> Result<String, ValidationError> {
        check_basic_name(short_name)?;
        match self {
            RecordNames::Template => Ok(short_name.to_owned()),
            RecordNames::Delimited(config) => {
                let parts: Vec<&str> = config
                    .device
                    .iter()
                    .chain(prefixes)
                    .map(String::as_str)
                    .chain(std::iter::once(short_name))
                    .collect();
                let name = parts.join(&config.delimiter.to_string());
                if config.check {
                    check_strict_name(&name)?;
                }
                Ok(name)
            }
        }
    }
}

/// Checks that apply to every name, whatever the strategy
pub(crate) fn check_basic_name(name: &str) -> Result<(), ValidationError> {
    let reason = if name.is_empty() {
        "name is empty"
    } else if name.chars().any(|c| c.is_whitespace() || c == '"' || c.is_control()) {
        "name contains whitespace, quotes or control characters"
    } else {
        return Ok(());
    };
    Err(ValidationError::InvalidRecordName {
        name: name.to_owned(),
        reason,
    })
}

/// Characters and length the IOC accepts without complaint
fn check_strict_name(name: &str) -> Result<(), ValidationError> {
    let reason = if name.len() > MAX_RECORD_NAME_LENGTH {
        "name is longer than 60 characters"
    } else if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "_-+:[]<>;".contains(c))
    {
        "name contains characters outside [A-Za-z0-9_-+:[]<>;]"
    } else {
        return Ok(());
    };
    Err(ValidationError::InvalidRecordName {
        name: name.to_owned(),
        reason,
    })
}

/// Prefixes must be usable as a name component
pub(crate) fn check_prefix(prefix: &str) -> Result<(), ValidationError> {
    if prefix.is_empty() || check_basic_name(prefix).is_err() {
        Err(ValidationError::InvalidPrefix(prefix.to_owned()))
    } else {
        Ok(())
    }
}
