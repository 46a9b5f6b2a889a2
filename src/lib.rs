// #![warn(missing_docs)]

//! Declarative builder for EPICS IOC database (`.db`) files.
//!
//! This crate builds the textual record definitions loaded by an EPICS IOC. It
//! does not talk to a running IOC or depend on the C-based [epics-base]
//! project; it only produces the static files an IOC later reads.
//!
//! Writing `.db` files by hand is error prone: names are repeated by hand in
//! every link, escaping rules for strings are strict, and a typo in a link target
//! is only found when the IOC fails to start. Here, records are declared into a
//! [`Database`] and linked to each other through typed values, and everything is
//! checked before any text is written.
//!
//! The pieces are:
//!
//! - A [`Database`] holding records, the naming strategy ([`RecordNames`]) and a
//!   stack of name prefixes, pushed with [`Database::push_prefix`].
//! - [`RecordName`] handles, which can be taken before the named record is
//!   declared. Links made with them are resolved when the database is written.
//! - Field values ([`Value`]): scalars, [`Parameter`] macros, constant arrays
//!   ([`ConstArray`]), links to records or their fields, and links decorated with
//!   options such as [`link::pp`] and [`link::ms`].
//! - Writing, through [`Database::write_records`], and reading the result back
//!   with the [reader] module.
//!
//! ## Example
//!
//! ```
//! use epics_dbbuilder::{Database, RecordNames, WriteOptions, link::{ms, pp}};
//!
//! # fn main() -> Result<(), epics_dbbuilder::BuilderError> {
//! let mut db = Database::new(RecordNames::simple("XX-YY-ZZ-01", ':'));
//! // Forward reference, the record is declared below
//! let trigger = db.record_name("TRIG")?;
//! db.record("ai", "VALUE")?
//!     .set("SCAN", "1 second")?
//!     .set("FLNK", trigger)?;
//! let value = db.lookup("XX-YY-ZZ-01:VALUE").unwrap();
//! db.record("calc", "TRIG")?
//!     .set("INPA", pp(ms(value.field("VAL")))?)?
//!     .set("CALC", "A*2")?;
//!
//! let text = db.to_db_string(&WriteOptions::new())?;
//! assert!(text.contains(r#"field(FLNK, "XX-YY-ZZ-01:TRIG")"#));
//! assert!(text.contains(r#"field(INPA, "XX-YY-ZZ-01:VALUE.VAL MS PP")"#));
//! # Ok(())
//! # }
//! ```
//!
//! [epics-base]: https://github.com/epics-base/epics-base

mod const_array;
mod database;
mod error;
mod fanout;
pub mod format;
pub mod link;
mod names;
mod parameter;
pub mod reader;
mod value;
mod writer;

pub use crate::const_array::{ConstArray, Constant, ElementKind};
pub use crate::database::{Database, PrefixScope, Record, RecordName};
pub use crate::error::{BuilderError, ValidationError};
pub use crate::fanout::{create_dfanout, create_fanout};
pub use crate::link::{DecoratedLink, LinkOption, RecordLink};
pub use crate::names::{DelimitedNames, MAX_RECORD_NAME_LENGTH, RecordNames};
pub use crate::parameter::Parameter;
pub use crate::value::{DbValue, FieldContext, Scalar, Value};
pub use crate::writer::{RenderedRecord, WriteOptions};
