use epics_dbbuilder::{
    BuilderError, ConstArray, Database, DelimitedNames, RecordNames, WriteOptions, create_dfanout,
    create_fanout,
    link::{cp, ms, pp},
    reader::{ParsedConstant, ParsedValue, parse_database},
};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt::TestWriter;

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(LevelFilter::TRACE)
        .with_writer(TestWriter::new())
        .try_init();
}

fn string(value: &str) -> ParsedValue {
    ParsedValue::String(value.to_owned())
}

/// A database with a bit of everything in it
fn build() -> Result<Database, BuilderError> {
    let mut db = Database::new(RecordNames::simple("XX-YY-ZZ-01", ':'));
    let device = db.parameter("DEVICE", "Device name")?;
    let current = db.import_record("SR-DI-DCCT-01:SIGNAL")?;
    let trig = db.record_name("TRIG")?;
    let fan = create_fanout(&mut db, "FAN", &[trig])?;

    db.record("bi", "TRIG")?
        .set("INP", cp(current)?)?
        .set("FLNK", fan)?;
    {
        let mut scope = db.push_prefix("ABC")?;
        scope
            .record("ai", "TEST")?
            .set("INP", pp(ms(current.field("VAL")))?)?
            .set("HOPR", 2.5)?
            .add_comment("Scaled current");
    }
    let previous = db.set_record_names(RecordNames::template());
    db.record("stringin", "TEST")?
        .set("VAL", &device)?
        .set("DESC", "\"\n\\\x01€")?
        .add_info("autosaveFields", "VAL")?;
    db.record("waveform", "ARRAY")?
        .set("INP", ConstArray::new(["A", "B\"", "C"])?)?;
    db.set_record_names(previous);
    Ok(db)
}

#[test]
fn written_database_reads_back() {
    init_logging();
    let db = build().unwrap();
    let text = db
        .to_db_string(&WriteOptions::new().header("Built by database_tests"))
        .unwrap();
    assert!(text.starts_with("# Built by database_tests\n# % macro, DEVICE, Device name\n\n"));

    let records = parse_database(&text).unwrap();
    let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(
        names,
        [
            "XX-YY-ZZ-01:FAN",
            "XX-YY-ZZ-01:TRIG",
            "XX-YY-ZZ-01:ABC:TEST",
            "TEST",
            "ARRAY"
        ]
    );

    let fan = &records[0];
    assert_eq!(fan.record_type, "fanout");
    assert_eq!(fan.field("LNK1"), Some(&string("XX-YY-ZZ-01:TRIG")));

    let trig = &records[1];
    assert_eq!(trig.field("INP"), Some(&string("SR-DI-DCCT-01:SIGNAL CP")));
    assert_eq!(trig.field("FLNK"), Some(&string("XX-YY-ZZ-01:FAN")));

    let scaled = &records[2];
    assert_eq!(
        scaled.field("INP"),
        Some(&string("SR-DI-DCCT-01:SIGNAL.VAL MS PP"))
    );
    assert_eq!(scaled.field("HOPR"), Some(&string("2.5")));

    let template = &records[3];
    assert_eq!(template.field("VAL"), Some(&string("$(DEVICE)")));
    assert_eq!(template.field("DESC"), Some(&string("\"\n\\\x01€")));
    assert_eq!(
        template.info,
        [("autosaveFields".to_string(), "VAL".to_string())]
    );

    assert_eq!(
        records[4].field("INP"),
        Some(&ParsedValue::Array(
            ["A", "B\"", "C"]
                .map(|s| ParsedConstant::String(s.to_owned()))
                .to_vec()
        ))
    );
}

#[test]
fn comments_and_escapes_are_written_verbatim() {
    init_logging();
    let db = build().unwrap();
    let text = db.to_db_string(&WriteOptions::new()).unwrap();
    assert!(text.contains("# Scaled current\nrecord(ai, \"XX-YY-ZZ-01:ABC:TEST\") {\n"));
    assert!(text.contains(r#"    field(DESC, "\"\n\\\001\342\202\254")"#));
    assert!(text.contains(r#"    field(INP, ["A","B\"","C"])"#));
    // Imported records are only linked to
    assert!(!text.contains("record(ai, \"SR-DI-DCCT-01:SIGNAL\")"));
}

#[test]
fn alphabetical_output() {
    init_logging();
    let db = build().unwrap();
    let text = db
        .to_db_string(&WriteOptions::new().alphabetical(true))
        .unwrap();
    let names: Vec<String> = parse_database(&text)
        .unwrap()
        .into_iter()
        .map(|r| r.name)
        .collect();
    let mut sorted = names.clone();
    sorted.sort();
    assert_eq!(names, sorted);
    assert_eq!(names.len(), 5);
}

#[test]
fn prefixes_separate_identical_short_names() {
    init_logging();
    let mut db = Database::new(DelimitedNames::new(':'));
    db.record("ai", "TEST").unwrap();
    db.with_prefix("ABC", |db| {
        db.record("ai", "TEST")?;
        Ok(())
    })
    .unwrap();
    // The prefix is gone again
    assert!(db.prefixes().is_empty());
    assert!(matches!(
        db.record("ai", "TEST"),
        Err(BuilderError::DuplicateName { .. })
    ));
    let text = db.to_db_string(&WriteOptions::new()).unwrap();
    let records = parse_database(&text).unwrap();
    assert_eq!(records[0].name, "TEST");
    assert_eq!(records[1].name, "ABC:TEST");
}

#[test]
fn prefix_is_popped_when_a_closure_fails() {
    init_logging();
    let mut db = Database::default();
    let result: Result<(), BuilderError> = db.with_prefix("ABC", |db| {
        db.record("ai", "X")?;
        db.record("ai", "X")?;
        Ok(())
    });
    assert!(result.is_err());
    assert!(db.prefixes().is_empty());
    assert!(db.lookup("ABC:X").is_some());
}

#[test]
fn forward_references_resolve_in_any_order() {
    init_logging();
    let mut db = Database::new(RecordNames::template());
    let later = db.record_name("LATER").unwrap();
    db.record("calc", "EARLY")
        .unwrap()
        .set("INPA", pp(later.field("VAL")).unwrap())
        .unwrap();
    // Not declared yet, so nothing can be written
    assert!(matches!(
        db.to_db_string(&WriteOptions::new()),
        Err(BuilderError::UnresolvedReference { ref target, .. }) if target == "LATER"
    ));
    db.record("ai", "LATER").unwrap();
    let text = db.to_db_string(&WriteOptions::new()).unwrap();
    assert!(text.contains(r#"field(INPA, "LATER.VAL PP")"#));
}

#[test]
fn dfanout_reaches_every_output() {
    init_logging();
    let mut db = Database::new(RecordNames::template());
    let outputs: Vec<_> = (0..20)
        .map(|i| db.record("ao", &format!("OUT{i}")).unwrap().name())
        .collect();
    let links = outputs
        .iter()
        .map(|o| pp(o.field("VAL")))
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    create_dfanout(&mut db, "SPREAD", links).unwrap();
    let text = db.to_db_string(&WriteOptions::new()).unwrap();
    let records = parse_database(&text).unwrap();
    let targets: Vec<String> = records
        .iter()
        .filter(|r| r.record_type == "dfanout")
        .flat_map(|r| r.fields.iter())
        .filter_map(|(_, v)| match v {
            ParsedValue::String(s) if s.starts_with("OUT") => Some(s.clone()),
            _ => None,
        })
        .collect();
    let expected: Vec<String> = (0..20).map(|i| format!("OUT{i}.VAL PP")).collect();
    assert_eq!(targets, expected);
}
