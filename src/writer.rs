//! Serializing a [`Database`] to `.db` text.
//!
//! Output is produced in two steps. [`Database::render`] validates and formats
//! every field of every record into [`RenderedRecord`]s, failing on the first
//! problem; only once that has succeeded does [`Database::write_records`] put
//! anything on the writer. A failed render therefore never leaves half a file.

use std::io::{self, Write};

use tracing::debug;

use crate::{
    database::Database,
    error::BuilderError,
    format::quote_string,
    value::{DbValue, FieldContext},
};

/// Output configuration for [`Database::write_records`]
#[derive(Clone, Debug, Default)]
pub struct WriteOptions {
    header: Option<String>,
    alphabetical: bool,
}

impl WriteOptions {
    pub fn new() -> Self {
        Self::default()
    }
    /// Text written as `#` comment lines at the top of the file
    pub fn header(mut self, header: &str) -> Self {
        self.header = Some(header.to_owned());
        self
    }
    /// Sort records by name instead of keeping declaration order
    pub fn alphabetical(mut self, alphabetical: bool) -> Self {
        self.alphabetical = alphabetical;
        self
    }
}

/// A record with every field already rendered to text
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedRecord {
    pub record_type: String,
    pub name: String,
    pub fields: Vec<(String, String)>,
    pub aliases: Vec<String>,
    pub info: Vec<(String, String)>,
    pub comments: Vec<String>,
}

impl RenderedRecord {
    pub fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        for comment in &self.comments {
            writeln!(writer, "# {comment}")?;
        }
        writeln!(
            writer,
            "record({}, {}) {{",
            self.record_type,
            quote_string(&self.name)
        )?;
        for (field, value) in &self.fields {
            writeln!(writer, "    field({field}, {value})")?;
        }
        for alias in &self.aliases {
            writeln!(writer, "    alias({})", quote_string(alias))?;
        }
        for (name, value) in &self.info {
            writeln!(writer, "    info({name}, {})", quote_string(value))?;
        }
        writeln!(writer, "}}")
    }
}

impl Database {
    /// Validate and format every record, in declaration or name order
    ///
    /// Imported records are not included.
    pub fn render(&self, alphabetical: bool) -> Result<Vec<RenderedRecord>, BuilderError> {
        let mut records: Vec<_> = self.records().collect();
        if alphabetical {
            records.sort_by(|a, b| a.canonical_name().cmp(b.canonical_name()));
        }
        records
            .into_iter()
            .map(|record| -> Result<RenderedRecord, BuilderError> {
                let fields = record
                    .fields()
                    .map(|(field, value)| -> Result<(String, String), BuilderError> {
                        let context = FieldContext {
                            database: self,
                            record,
                            field,
                        };
                        value.validate(&context)?;
                        Ok((field.to_owned(), value.format_db(&context)?))
                    })
                    .collect::<Result<Vec<_>, BuilderError>>()?;
                Ok(RenderedRecord {
                    record_type: record.record_type().to_owned(),
                    name: record.canonical_name().to_owned(),
                    fields,
                    aliases: record.aliases().to_vec(),
                    info: record
                        .info()
                        .map(|(k, v)| (k.to_owned(), v.to_owned()))
                        .collect(),
                    comments: record.comments().to_vec(),
                })
            })
            .collect()
    }

    /// Write the whole database, returning the number of records written
    pub fn write_records<W: Write>(
        &self,
        writer: &mut W,
        options: &WriteOptions,
    ) -> Result<usize, BuilderError> {
        let records = self.render(options.alphabetical)?;

        let mut preamble = false;
        if let Some(header) = &options.header {
            for line in header.lines() {
                writeln!(writer, "# {line}")?;
            }
            preamble = true;
        }
        for param in self.parameters() {
            writeln!(writer, "# % macro, {}, {}", param.name(), param.description())?;
            preamble = true;
        }
        if preamble && !records.is_empty() {
            writeln!(writer)?;
        }

        for (i, record) in records.iter().enumerate() {
            if i > 0 {
                writeln!(writer)?;
            }
            record.write(writer)?;
        }
        writer.flush()?;
        debug!("Wrote {} records", records.len());
        Ok(records.len())
    }

    /// Render the whole database into a string
    pub fn to_db_string(&self, options: &WriteOptions) -> Result<String, BuilderError> {
        let mut buffer = Vec::new();
        self.write_records(&mut buffer, options)?;
        String::from_utf8(buffer).map_err(|e| BuilderError::Format(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        const_array::ConstArray,
        link::{ms, pp},
        names::RecordNames,
    };

    #[test]
    fn records_in_declaration_order() {
        let mut db = Database::new(RecordNames::template());
        db.record("ai", "ZED").unwrap().set("SCAN", "1 second").unwrap();
        let zed = db.lookup("ZED").unwrap();
        db.record("bi", "ALPHA")
            .unwrap()
            .set("INP", pp(ms(zed)).unwrap())
            .unwrap()
            .set("ZNAM", "Off")
            .unwrap();
        let text = db.to_db_string(&WriteOptions::new()).unwrap();
        assert_eq!(
            text,
            "record(ai, \"ZED\") {\n\
             \x20   field(SCAN, \"1 second\")\n\
             }\n\
             \n\
             record(bi, \"ALPHA\") {\n\
             \x20   field(INP, \"ZED MS PP\")\n\
             \x20   field(ZNAM, \"Off\")\n\
             }\n"
        );
        let sorted = db.render(true).unwrap();
        assert_eq!(sorted[0].name, "ALPHA");
        assert_eq!(sorted[1].name, "ZED");
    }

    #[test]
    fn header_parameters_and_extras() {
        let mut db = Database::new(RecordNames::template());
        let p = db.parameter("P", "Device prefix").unwrap();
        let record = db.record("ai", "X").unwrap();
        record
            .set("VAL", &p)
            .unwrap()
            .set("INP", ConstArray::new([1, 2]).unwrap())
            .unwrap()
            .add_info("autosaveFields", "VAL")
            .unwrap()
            .add_comment("First line\nSecond line");
        let x = record.name();
        db.add_alias(x, "Y").unwrap();
        let text = db
            .to_db_string(&WriteOptions::new().header("Generated file"))
            .unwrap();
        assert_eq!(
            text,
            "# Generated file\n\
             # % macro, P, Device prefix\n\
             \n\
             # First line\n\
             # Second line\n\
             record(ai, \"X\") {\n\
             \x20   field(VAL, \"$(P)\")\n\
             \x20   field(INP, [1,2])\n\
             \x20   alias(\"Y\")\n\
             \x20   info(autosaveFields, \"VAL\")\n\
             }\n"
        );
    }

    #[test]
    fn unresolved_links_write_nothing() {
        let mut db = Database::default();
        db.record("ai", "FIRST").unwrap();
        let missing = db.record_name("MISSING").unwrap();
        db.record("ai", "SECOND").unwrap().set("INP", missing.field("VAL").unwrap()).unwrap();
        let mut buffer = Vec::new();
        let err = db.write_records(&mut buffer, &WriteOptions::new()).unwrap_err();
        assert!(matches!(
            err,
            BuilderError::UnresolvedReference { ref record, ref field, ref target }
                if record == "SECOND" && field == "INP" && target == "MISSING"
        ));
        assert!(buffer.is_empty());
    }

    #[test]
    fn imports_are_linked_but_not_written() {
        let mut db = Database::default();
        let external = db.import_record("SR-DI-DCCT-01:SIGNAL").unwrap();
        db.record("ai", "B").unwrap().set("INP", external).unwrap();
        let records = db.render(false).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].fields,
            [("INP".to_string(), "\"SR-DI-DCCT-01:SIGNAL\"".to_string())]
        );
    }

    #[test]
    fn empty_database() {
        let db = Database::default();
        assert_eq!(db.to_db_string(&WriteOptions::new()).unwrap(), "");
    }
}
