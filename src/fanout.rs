//! Helpers for fanning out to more records than one fanout record can reach.
//!
//! A `fanout` record has six forward links and a `dfanout` eight outputs. When
//! more are needed the records are chained: the last link of each record in
//! the chain points at the next one, and the chained records are named by
//! appending a counter to the base name (`FAN`, `FAN1`, `FAN2`, ...).

use tracing::debug;

use crate::{
    database::{Database, RecordName},
    error::{BuilderError, ValidationError},
    link::pp,
    value::Value,
};

const FANOUT_LINKS: [&str; 6] = ["LNK1", "LNK2", "LNK3", "LNK4", "LNK5", "LNK6"];
const DFANOUT_LINKS: [&str; 8] = [
    "OUTA", "OUTB", "OUTC", "OUTD", "OUTE", "OUTF", "OUTG", "OUTH",
];

/// Process every record in `links`, in order, from a chain of fanout records
///
/// Returns the name of the head of the chain, to be used as e.g. a `FLNK`.
pub fn create_fanout(
    db: &mut Database,
    name: &str,
    links: &[RecordName],
) -> Result<RecordName, BuilderError> {
    let links = links.iter().map(|link| Value::from(*link)).collect();
    create_chain(db, name, "fanout", &FANOUT_LINKS, links, |next| {
        Ok(Value::from(next))
    })
}

/// Write the value of a chain of dfanout records to every output in `outputs`
///
/// The outputs are usually decorated links, e.g. `pp(record.field("VAL"))?`.
/// Returns the name of the head of the chain.
pub fn create_dfanout<T>(
    db: &mut Database,
    name: &str,
    outputs: impl IntoIterator<Item = T>,
) -> Result<RecordName, BuilderError>
where
    T: Into<Value>,
{
    let outputs = outputs.into_iter().map(Into::into).collect();
    create_chain(db, name, "dfanout", &DFANOUT_LINKS, outputs, |next| {
        Ok(pp(next.field("VAL"))?.into())
    })
}

fn create_chain(
    db: &mut Database,
    name: &str,
    record_type: &str,
    fields: &[&str],
    mut links: Vec<Value>,
    chain: impl Fn(RecordName) -> Result<Value, ValidationError>,
) -> Result<RecordName, BuilderError> {
    if links.is_empty() {
        return Err(ValidationError::EmptyFanout(name.to_owned()).into());
    }
    // Split into per-record groups, each but the last one short by one link
    let mut groups = Vec::new();
    while links.len() > fields.len() {
        let rest = links.split_off(fields.len() - 1);
        groups.push(links);
        links = rest;
    }
    groups.push(links);

    let short_names: Vec<String> = (0..groups.len())
        .map(|i| {
            if i == 0 {
                name.to_owned()
            } else {
                format!("{name}{i}")
            }
        })
        .collect();
    let names = short_names
        .iter()
        .map(|short_name| db.record_name(short_name))
        .collect::<Result<Vec<_>, _>>()?;
    // Claim nothing unless the whole chain can be created
    for &record_name in &names {
        if db.get(record_name).is_some() {
            return Err(BuilderError::DuplicateName {
                kind: "Record",
                name: db.name(record_name)?.to_owned(),
            });
        }
    }
    let next_links = names[1..]
        .iter()
        .map(|next| chain(*next))
        .collect::<Result<Vec<_>, _>>()?;
    debug!("Creating {record_type} chain {name} of {} records", groups.len());

    let mut next_links = next_links.into_iter();
    for (group, short_name) in groups.into_iter().zip(&short_names) {
        let record = db.record(record_type, short_name)?;
        let count = group.len();
        for (field, link) in fields.iter().zip(group) {
            record.set(field, link)?;
        }
        if let Some(next) = next_links.next() {
            record.set(fields[count], next)?;
        }
    }
    Ok(names[0])
}
