use std::{
    fs::File,
    io::{BufWriter, Write},
    path::PathBuf,
    process::ExitCode,
};

use clap::Parser;
use epics_dbbuilder::{
    BuilderError, ConstArray, Database, RecordNames, WriteOptions, create_fanout,
    link::{cp, ms, msi, nms, npp, pp},
};
use rust_decimal::Decimal;
use tracing::{error, info, level_filters::LevelFilter};

/// Write a demonstration database exercising every kind of field value
#[derive(Parser)]
struct Options {
    /// Write to this file instead of standard output
    #[clap(short, long)]
    output: Option<PathBuf>,
    /// Sort records by name instead of declaration order
    #[clap(long)]
    alphabetical: bool,
    /// Comment written at the top of the file
    #[clap(long)]
    header: Option<String>,
    /// Show debug output
    #[clap(short, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn build_database() -> Result<Database, BuilderError> {
    let mut db = Database::new(RecordNames::simple("XX-YY-ZZ-01", ':'));
    let prefix = db.parameter("P", "A parameter")?;
    let value = db.parameter("Q", "A number")?;

    let current = db.import_record("SR-DI-DCCT-01:SIGNAL")?;
    let trig = db.record_name("TRIG")?;
    let fan = create_fanout(&mut db, "FAN", &[trig])?;

    db.record("bi", "TRIG")?
        .set("INP", cp(current)?)?
        .set("ZNAM", "Off")?
        .set("ONAM", "On")?
        .set("FLNK", fan)?;

    let test = db.with_prefix("ABC", |db| {
        Ok(db
            .record("ai", "TEST")?
            .set("INP", pp(ms(current))?)?
            .set("PREC", 3)?
            .set("HOPR", 1.5)?
            .set("PINI", true)?
            .add_info("autosaveFields", "VAL")?
            .add_comment("Under the ABC prefix")
            .name())
    })?;

    let previous = db.set_record_names(RecordNames::template());
    db.record("ai", "TEST")?.set("INP", npp(test.field("VAL"))?)?;
    db.record("stringin", "BOO")?
        .set("VAL", &prefix)?
        .set("SIML", pp(nms(&value))?)?
        .set("SIOL", msi(test)?)?;
    db.set_record_names(previous);

    db.record("waveform", "STRINGS")?
        .set("INP", ConstArray::new(["A", "B", "C"])?)?
        .set("NELM", 3)?;
    db.record("waveform", "NUMBERS")?
        .set(
            "INP",
            ConstArray::new([Decimal::new(150, 2), Decimal::ONE, Decimal::new(-25, 1)])?,
        )?
        .set("NELM", 3)?;
    db.record("stringin", "EVIL")?
        .set("VAL", "\"\n\\\x01€")?
        .add_comment("Every character that needs escaping");
    let evil = db.lookup("XX-YY-ZZ-01:EVIL").ok_or_else(|| {
        BuilderError::Format("record XX-YY-ZZ-01:EVIL was not declared".to_owned())
    })?;
    db.add_alias(evil, "XX-YY-ZZ-01:WICKED")?;
    Ok(db)
}

fn run(opts: &Options) -> Result<usize, BuilderError> {
    let db = build_database()?;
    let mut options = WriteOptions::new().alphabetical(opts.alphabetical);
    if let Some(header) = &opts.header {
        options = options.header(header);
    }
    match &opts.output {
        Some(path) => {
            // Render before creating the file, so a failed build leaves nothing behind
            let text = db.to_db_string(&options)?;
            let mut writer = BufWriter::new(File::create(path)?);
            writer.write_all(text.as_bytes())?;
            writer.flush()?;
            info!("Wrote {}", path.display());
            Ok(db.records().count())
        }
        None => db.write_records(&mut std::io::stdout().lock(), &options),
    }
}

fn main() -> ExitCode {
    let opts = Options::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(match opts.verbose {
            0 => LevelFilter::INFO,
            1 => LevelFilter::DEBUG,
            2.. => LevelFilter::TRACE,
        })
        .init();

    match run(&opts) {
        Ok(count) => {
            info!("Built database with {count} records");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
