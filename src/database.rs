//! The record graph, and the naming context records are declared under.
//!
//! A [`Database`] owns every record, a table of every canonical name that has
//! been mentioned, and the active naming strategy and prefix stack. Names are
//! handed out as [`RecordName`] handles: an index into the name table rather
//! than a reference to a record. This lets a link be made to a record that has
//! not been declared yet; whether every link points at something real is only
//! checked when the database is rendered.

use std::{
    ops::{Deref, DerefMut},
    sync::atomic::{AtomicU64, Ordering},
};

use indexmap::IndexMap;
use tracing::{debug, trace, warn};

use crate::{
    error::{BuilderError, ValidationError},
    link::RecordLink,
    names::{RecordNames, check_basic_name, check_prefix},
    parameter::Parameter,
    value::Value,
};

static NEXT_DATABASE_ID: AtomicU64 = AtomicU64::new(0);

/// Handle to a canonical record name within one [`Database`]
///
/// Two handles from the same database are equal exactly when their names are.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RecordName {
    database: u64,
    index: usize,
}

/// What is known about a name in the name table
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum NameState {
    /// Mentioned, but nothing declared under it yet
    Referenced,
    /// A record defined somewhere else (e.g. another IOC), never written out
    Imported,
    /// Defined here: the index into the record list
    Defined(usize),
}

pub(crate) fn is_valid_field_name(field: &str) -> bool {
    !field.is_empty()
        && field
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

fn is_valid_identifier(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// A single record definition
#[derive(Clone, Debug)]
pub struct Record {
    name: RecordName,
    canonical_name: String,
    record_type: String,
    fields: IndexMap<String, Value>,
    aliases: Vec<String>,
    info: IndexMap<String, String>,
    comments: Vec<String>,
}

impl Record {
    pub fn name(&self) -> RecordName {
        self.name
    }

    pub fn canonical_name(&self) -> &str {
        &self.canonical_name
    }

    pub fn record_type(&self) -> &str {
        &self.record_type
    }

    /// Assign a field value.
    ///
    /// Assigning a field a second time replaces the value but keeps the
    /// field in its original position.
    pub fn set(&mut self, field: &str, value: impl Into<Value>) -> Result<&mut Self, ValidationError> {
        if !is_valid_field_name(field) {
            return Err(ValidationError::InvalidFieldName(field.to_owned()));
        }
        if let Some(old) = self.fields.insert(field.to_owned(), value.into()) {
            warn!(
                "Overwriting field {field} of {}, was {old:?}",
                self.canonical_name
            );
        }
        Ok(self)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Link to one of this record's fields, e.g. `pp(record.link("VAL"))?`
    pub fn link(&self, field: &str) -> Result<RecordLink, ValidationError> {
        self.name.field(field)
    }

    /// Fields in assignment order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Attach an `info(name, "value")` item
    pub fn add_info(&mut self, name: &str, value: &str) -> Result<&mut Self, ValidationError> {
        if name.is_empty()
            || name
                .chars()
                .any(|c| c.is_whitespace() || c.is_control() || "\",()".contains(c))
        {
            return Err(ValidationError::InvalidInfoName(name.to_owned()));
        }
        self.info.insert(name.to_owned(), value.to_owned());
        Ok(self)
    }

    pub fn info(&self) -> impl Iterator<Item = (&str, &str)> {
        self.info.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Add a comment line, written immediately before the record
    pub fn add_comment(&mut self, comment: &str) -> &mut Self {
        self.comments.extend(comment.lines().map(str::to_owned));
        self
    }

    pub fn comments(&self) -> &[String] {
        &self.comments
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }
}

/// A collection of records, with the naming context used to declare them
#[derive(Debug)]
pub struct Database {
    id: u64,
    names: IndexMap<String, NameState>,
    records: Vec<Record>,
    parameters: IndexMap<String, Parameter>,
    record_names: RecordNames,
    prefixes: Vec<String>,
}

impl Default for Database {
    fn default() -> Self {
        Database::new(RecordNames::default())
    }
}

impl Database {
    pub fn new(record_names: impl Into<RecordNames>) -> Database {
        Database {
            id: NEXT_DATABASE_ID.fetch_add(1, Ordering::Relaxed),
            names: IndexMap::new(),
            records: Vec::new(),
            parameters: IndexMap::new(),
            record_names: record_names.into(),
            prefixes: Vec::new(),
        }
    }

    /// Change the naming strategy for records declared from now on.
    ///
    /// Returns the previous strategy, so it can be restored.
    pub fn set_record_names(&mut self, record_names: impl Into<RecordNames>) -> RecordNames {
        let previous = std::mem::replace(&mut self.record_names, record_names.into());
        trace!("Record names now {:?}", self.record_names);
        previous
    }

    pub fn record_names(&self) -> &RecordNames {
        &self.record_names
    }

    /// Push a name prefix, for as long as the returned scope is alive
    ///
    /// The scope dereferences to the database, so records can be declared
    /// through it; the prefix is popped again when it is dropped.
    pub fn push_prefix(&mut self, prefix: &str) -> Result<PrefixScope<'_>, ValidationError> {
        check_prefix(prefix)?;
        trace!("Pushing name prefix {prefix}");
        self.prefixes.push(prefix.to_owned());
        Ok(PrefixScope { database: self })
    }

    /// Run a closure with an extra name prefix pushed
    pub fn with_prefix<T, F>(&mut self, prefix: &str, f: F) -> Result<T, BuilderError>
    where
        F: FnOnce(&mut Database) -> Result<T, BuilderError>,
    {
        let mut scope = self.push_prefix(prefix)?;
        f(&mut scope)
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    /// Look up or add a canonical name in the name table
    fn intern(&mut self, canonical: String) -> RecordName {
        let entry = self.names.entry(canonical);
        let index = entry.index();
        entry.or_insert(NameState::Referenced);
        RecordName {
            database: self.id,
            index,
        }
    }

    /// Resolve a short name under the active naming context.
    ///
    /// The record does not need to exist yet; links made with the handle are
    /// checked when the database is rendered.
    pub fn record_name(&mut self, short_name: &str) -> Result<RecordName, BuilderError> {
        let canonical = self.record_names.resolve(short_name, &self.prefixes)?;
        Ok(self.intern(canonical))
    }

    /// Refer to a record by its full name, without defining it here.
    ///
    /// Links to an imported record are always considered resolved, and the
    /// record itself is never written out. If a record with the same name is
    /// declared later, that declaration is written as normal.
    pub fn import_record(&mut self, full_name: &str) -> Result<RecordName, BuilderError> {
        check_basic_name(full_name)?;
        let name = self.intern(full_name.to_owned());
        let state = &mut self.names[name.index];
        if *state == NameState::Referenced {
            debug!("Importing record {full_name}");
            *state = NameState::Imported;
        }
        Ok(name)
    }

    /// Declare a new record, named under the active naming context
    pub fn record(&mut self, record_type: &str, short_name: &str) -> Result<&mut Record, BuilderError> {
        if !is_valid_identifier(record_type) {
            return Err(ValidationError::InvalidRecordType(record_type.to_owned()).into());
        }
        let canonical = self.record_names.resolve(short_name, &self.prefixes)?;
        let name = self.define(canonical.clone())?;
        debug!("Adding {record_type} record {canonical}");
        self.records.push(Record {
            name,
            canonical_name: canonical,
            record_type: record_type.to_owned(),
            fields: IndexMap::new(),
            aliases: Vec::new(),
            info: IndexMap::new(),
            comments: Vec::new(),
        });
        let index = self.records.len() - 1;
        Ok(&mut self.records[index])
    }

    /// Claim a name for the next record to be pushed
    fn define(&mut self, canonical: String) -> Result<RecordName, BuilderError> {
        let name = self.intern(canonical);
        if let Some((existing, NameState::Defined(_))) = self.names.get_index(name.index) {
            return Err(BuilderError::DuplicateName {
                kind: "Record",
                name: existing.clone(),
            });
        }
        self.names[name.index] = NameState::Defined(self.records.len());
        Ok(name)
    }

    /// Give a record an additional full name
    ///
    /// Aliases share the name table with records, so they must be unique and
    /// links made to them resolve to the record.
    pub fn add_alias(&mut self, record: RecordName, alias: &str) -> Result<(), BuilderError> {
        check_basic_name(alias)?;
        let index = self.record_index(record)?;
        let alias_name = self.intern(alias.to_owned());
        if let NameState::Defined(_) = self.names[alias_name.index] {
            return Err(BuilderError::DuplicateName {
                kind: "Record",
                name: alias.to_owned(),
            });
        }
        self.names[alias_name.index] = NameState::Defined(index);
        debug!("Adding alias {alias} for {}", self.records[index].canonical_name);
        self.records[index].aliases.push(alias.to_owned());
        Ok(())
    }

    fn check_handle(&self, name: RecordName) -> Result<NameState, BuilderError> {
        if name.database != self.id {
            return Err(BuilderError::Format(format!(
                "record name handle {name:?} belongs to a different database"
            )));
        }
        self.names
            .get_index(name.index)
            .map(|(_, state)| *state)
            .ok_or_else(|| BuilderError::Format(format!("unknown record name handle {name:?}")))
    }

    fn record_index(&self, name: RecordName) -> Result<usize, BuilderError> {
        match self.check_handle(name)? {
            NameState::Defined(index) => Ok(index),
            _ => Err(BuilderError::UndefinedRecord(self.name(name)?.to_owned())),
        }
    }

    /// The canonical name behind a handle
    pub fn name(&self, name: RecordName) -> Result<&str, BuilderError> {
        self.check_handle(name)?;
        Ok(self
            .names
            .get_index(name.index)
            .map(|(k, _)| k.as_str())
            .unwrap_or_default())
    }

    /// Whether a handle names a record defined here or imported
    pub fn is_resolved(&self, name: RecordName) -> Result<bool, BuilderError> {
        Ok(self.check_handle(name)? != NameState::Referenced)
    }

    /// Find the handle for an already known canonical name
    pub fn lookup(&self, canonical: &str) -> Option<RecordName> {
        self.names.get_index_of(canonical).map(|index| RecordName {
            database: self.id,
            index,
        })
    }

    pub fn get(&self, name: RecordName) -> Option<&Record> {
        match self.check_handle(name).ok()? {
            NameState::Defined(index) => self.records.get(index),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, name: RecordName) -> Option<&mut Record> {
        match self.check_handle(name).ok()? {
            NameState::Defined(index) => self.records.get_mut(index),
            _ => None,
        }
    }

    /// Records defined here, in declaration order
    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }

    /// Declare a macro parameter; each name may be declared once
    pub fn parameter(&mut self, name: &str, description: &str) -> Result<Parameter, BuilderError> {
        let param = Parameter::new(name, description)?;
        if self.parameters.contains_key(name) {
            return Err(BuilderError::DuplicateName {
                kind: "Parameter",
                name: name.to_owned(),
            });
        }
        debug!("Adding parameter {name}");
        self.parameters.insert(name.to_owned(), param.clone());
        Ok(param)
    }

    /// Declared parameters, in declaration order
    pub fn parameters(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters.values()
    }
}

/// A pushed name prefix, popped when this is dropped
pub struct PrefixScope<'a> {
    database: &'a mut Database,
}

impl Deref for PrefixScope<'_> {
    type Target = Database;
    fn deref(&self) -> &Database {
        self.database
    }
}

impl DerefMut for PrefixScope<'_> {
    fn deref_mut(&mut self) -> &mut Database {
        self.database
    }
}

impl Drop for PrefixScope<'_> {
    fn drop(&mut self) {
        if let Some(prefix) = self.database.prefixes.pop() {
            trace!("Popped name prefix {prefix}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::names::DelimitedNames;

    #[test]
    fn duplicate_names_fail_on_creation() {
        let mut db = Database::default();
        db.record("ai", "TEST").unwrap();
        let err = db.record("bi", "TEST").unwrap_err();
        assert!(matches!(
            err,
            BuilderError::DuplicateName { kind: "Record", ref name } if name == "TEST"
        ));
        assert_eq!(db.records().count(), 1);
    }

    #[test]
    fn prefixes_keep_names_apart() {
        let mut db = Database::default();
        let outer = db.record("ai", "TEST").unwrap().name();
        let inner = {
            let mut scope = db.push_prefix("ABC").unwrap();
            scope.record("ai", "TEST").unwrap().name()
        };
        assert_ne!(outer, inner);
        assert_eq!(db.name(outer).unwrap(), "TEST");
        assert_eq!(db.name(inner).unwrap(), "ABC:TEST");
        assert!(db.prefixes().is_empty());
        // And a second record in the ABC scope does collide
        let err = db.with_prefix("ABC", |db| Ok(db.record("ai", "TEST")?.name()));
        assert!(matches!(err, Err(BuilderError::DuplicateName { .. })));
        assert!(db.prefixes().is_empty());
    }

    #[test]
    fn nested_prefixes_pop_in_order() {
        let mut db = Database::new(RecordNames::simple("XX", ':'));
        let mut outer = db.push_prefix("A").unwrap();
        {
            let mut inner = outer.push_prefix("B").unwrap();
            assert_eq!(inner.prefixes(), ["A", "B"]);
            let name = inner.record_name("C").unwrap();
            assert_eq!(inner.name(name).unwrap(), "XX:A:B:C");
        }
        assert_eq!(outer.prefixes(), ["A"]);
        drop(outer);
        assert!(db.prefixes().is_empty());
        assert!(db.push_prefix("").is_err());
    }

    #[test]
    fn strategy_changes_only_affect_later_records() {
        let mut db = Database::new(DelimitedNames::new(':').device("DEV"));
        let first = db.record("ai", "X").unwrap().name();
        let previous = db.set_record_names(RecordNames::template());
        assert_eq!(previous, RecordNames::simple("DEV", ':'));
        let second = db.record("ai", "X").unwrap().name();
        assert_eq!(db.name(first).unwrap(), "DEV:X");
        assert_eq!(db.name(second).unwrap(), "X");
    }

    #[test]
    fn forward_references_resolve_once_defined() {
        let mut db = Database::default();
        let forward = db.record_name("LATER").unwrap();
        assert!(!db.is_resolved(forward).unwrap());
        assert!(db.get(forward).is_none());
        let defined = db.record("ai", "LATER").unwrap().name();
        assert_eq!(forward, defined);
        assert!(db.is_resolved(forward).unwrap());
        assert_eq!(db.get(forward).unwrap().record_type(), "ai");
        assert_eq!(db.lookup("LATER"), Some(forward));
        assert_eq!(db.lookup("NEVER"), None);
    }

    #[test]
    fn imports() {
        let mut db = Database::default();
        let external = db.import_record("SR-DI-DCCT-01:SIGNAL").unwrap();
        assert!(db.is_resolved(external).unwrap());
        assert!(db.get(external).is_none());
        // Importing a defined record keeps it defined
        let local = db.record("bi", "TRIG").unwrap().name();
        assert_eq!(db.import_record("TRIG").unwrap(), local);
        assert!(db.get(local).is_some());
        // Defining an imported name upgrades it
        let upgraded = db.record("ai", "SR-DI-DCCT-01:SIGNAL").unwrap().name();
        assert_eq!(upgraded, external);
        assert!(db.get(external).is_some());
        assert!(matches!(
            db.import_record("has space"),
            Err(BuilderError::Validation(ValidationError::InvalidRecordName { .. }))
        ));
    }

    #[test]
    fn handles_from_another_database() {
        let mut a = Database::default();
        let b = Database::default();
        let name = a.record("ai", "X").unwrap().name();
        assert!(matches!(b.name(name), Err(BuilderError::Format(_))));
        assert!(b.get(name).is_none());
    }

    #[test]
    fn fields_keep_assignment_order() {
        let mut db = Database::default();
        let record = db.record("ai", "X").unwrap();
        record.set("SCAN", "1 second").unwrap().set("DESC", "d").unwrap();
        record.set("SCAN", "Passive").unwrap();
        let fields: Vec<&str> = record.fields().map(|(k, _)| k).collect();
        assert_eq!(fields, ["SCAN", "DESC"]);
        assert_eq!(record.get("SCAN"), Some(&Value::from("Passive")));
        assert_eq!(record.link("VAL"), record.name().field("VAL"));
        assert_eq!(record.link("VAL").unwrap().field(), Some("VAL"));
        assert!(record.link("V A L").is_err());
        assert_eq!(
            record.set("scan", 1).unwrap_err(),
            ValidationError::InvalidFieldName("scan".to_string())
        );
        assert!(record.add_info("autosaveFields", "VAL").is_ok());
        assert!(record.add_info("bad name", "VAL").is_err());
        assert!(db.record("bad type", "Y").is_err());
    }

    #[test]
    fn aliases_share_the_name_table() {
        let mut db = Database::default();
        let x = db.record("ai", "X").unwrap().name();
        db.add_alias(x, "OTHER:X").unwrap();
        assert_eq!(db.lookup("OTHER:X").map(|n| db.get(n).unwrap().name()), Some(x));
        assert!(matches!(
            db.add_alias(x, "X"),
            Err(BuilderError::DuplicateName { .. })
        ));
        assert!(db.record("ai", "OTHER:X").is_err());
        let missing = db.record_name("MISSING").unwrap();
        let err = db.add_alias(missing, "ALIAS").unwrap_err();
        assert!(matches!(err, BuilderError::UndefinedRecord(ref name) if name == "MISSING"));
        assert_eq!(err.to_string(), "Record 'MISSING' is not defined");
    }

    #[test]
    fn parameters_are_unique() {
        let mut db = Database::default();
        let p = db.parameter("P", "A parameter").unwrap();
        assert_eq!(p.to_string(), "$(P)");
        assert!(matches!(
            db.parameter("P", "again"),
            Err(BuilderError::DuplicateName { kind: "Parameter", .. })
        ));
        assert!(db.parameter("not valid", "").is_err());
        assert_eq!(db.parameters().count(), 1);
    }
}
