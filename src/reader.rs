//! Reading `.db` text back in.
//!
//! This understands the subset of the database grammar that the writer
//! produces: `record`, `field`, `alias` and `info` entries, double-quoted
//! strings with C escapes, and constant arrays. `#` comments are skipped. It
//! is used to check that written files mean what they were built to mean.

use nom::{
    Finish, IResult, Parser,
    branch::alt,
    bytes::complete::{is_not, tag, take_while_m_n, take_while1},
    character::complete::{char, multispace1, not_line_ending, one_of},
    combinator::{all_consuming, map, map_res, value},
    multi::{fold_many0, many0, separated_list1},
    sequence::{delimited, preceded, terminated},
};

use crate::error::BuilderError;

/// An element of a constant array
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParsedConstant {
    String(String),
    /// The number exactly as written, e.g. `1e-05` or `-Inf`
    Number(String),
}

/// The value of a single field
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParsedValue {
    String(String),
    Array(Vec<ParsedConstant>),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParsedRecord {
    pub record_type: String,
    pub name: String,
    pub fields: Vec<(String, ParsedValue)>,
    pub aliases: Vec<String>,
    pub info: Vec<(String, String)>,
}

impl ParsedRecord {
    pub fn field(&self, name: &str) -> Option<&ParsedValue> {
        self.fields.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }
}

enum Item {
    Field(String, ParsedValue),
    Alias(String),
    Info(String, String),
}

enum Fragment<'a> {
    Literal(&'a str),
    Byte(u8),
}

/// Whitespace and `#` comments
fn ws(input: &str) -> IResult<&str, ()> {
    value(
        (),
        many0(alt((
            value((), multispace1),
            value((), (char('#'), not_line_ending)),
        ))),
    )
    .parse(input)
}

fn comma(input: &str) -> IResult<&str, ()> {
    value((), (ws, char(','), ws)).parse(input)
}

fn close(input: &str) -> IResult<&str, ()> {
    value((), (ws, char(')'))).parse(input)
}

/// `keyword (` with any whitespace between
fn open<'a>(
    keyword: &'static str,
) -> impl Parser<&'a str, Output = (), Error = nom::error::Error<&'a str>> {
    value((), (tag(keyword), ws, char('('), ws))
}

fn identifier(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_').parse(input)
}

/// A single backslash escape, decoded to the byte it stands for
fn escape(input: &str) -> IResult<&str, u8> {
    preceded(
        char('\\'),
        alt((
            map_res(take_while_m_n(1, 3, |c: char| c.is_digit(8)), |s: &str| {
                u8::from_str_radix(s, 8)
            }),
            map_res(
                preceded(
                    char('x'),
                    take_while_m_n(1, 2, |c: char| c.is_ascii_hexdigit()),
                ),
                |s: &str| u8::from_str_radix(s, 16),
            ),
            map(one_of("abfnrtv\\'\"?"), |c| match c {
                'a' => 0x07,
                'b' => 0x08,
                'f' => 0x0c,
                'n' => b'\n',
                'r' => b'\r',
                't' => b'\t',
                'v' => 0x0b,
                other => other as u8,
            }),
        )),
    )
    .parse(input)
}

fn quoted_string(input: &str) -> IResult<&str, String> {
    let body = fold_many0(
        alt((
            map(is_not("\"\\"), Fragment::Literal),
            map(escape, Fragment::Byte),
        )),
        Vec::new,
        |mut bytes: Vec<u8>, fragment| {
            match fragment {
                Fragment::Literal(s) => bytes.extend_from_slice(s.as_bytes()),
                Fragment::Byte(b) => bytes.push(b),
            }
            bytes
        },
    );
    map_res(delimited(char('"'), body, char('"')), String::from_utf8).parse(input)
}

fn number(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || "+-.".contains(c)).parse(input)
}

fn const_array(input: &str) -> IResult<&str, Vec<ParsedConstant>> {
    let element = alt((
        map(quoted_string, ParsedConstant::String),
        map(number, |n: &str| ParsedConstant::Number(n.to_owned())),
    ));
    delimited(
        (char('['), ws),
        separated_list1(comma, element),
        (ws, char(']')),
    )
    .parse(input)
}

fn field(input: &str) -> IResult<&str, Item> {
    let (input, _) = open("field").parse(input)?;
    let (input, name) = identifier(input)?;
    let (input, _) = comma(input)?;
    let (input, value) = alt((
        map(const_array, ParsedValue::Array),
        map(quoted_string, ParsedValue::String),
    ))
    .parse(input)?;
    let (input, _) = close(input)?;
    Ok((input, Item::Field(name.to_owned(), value)))
}

fn alias(input: &str) -> IResult<&str, Item> {
    let (input, _) = open("alias").parse(input)?;
    let (input, name) = quoted_string(input)?;
    let (input, _) = close(input)?;
    Ok((input, Item::Alias(name)))
}

fn info(input: &str) -> IResult<&str, Item> {
    let (input, _) = open("info").parse(input)?;
    let (input, name) = identifier(input)?;
    let (input, _) = comma(input)?;
    let (input, value) = quoted_string(input)?;
    let (input, _) = close(input)?;
    Ok((input, Item::Info(name.to_owned(), value)))
}

fn record(input: &str) -> IResult<&str, ParsedRecord> {
    let (input, _) = open("record").parse(input)?;
    let (input, record_type) = identifier(input)?;
    let (input, _) = comma(input)?;
    let (input, name) = quoted_string(input)?;
    let (input, _) = (close, ws, char('{'), ws).parse(input)?;
    let (input, items) = many0(terminated(alt((field, alias, info)), ws)).parse(input)?;
    let (input, _) = char('}').parse(input)?;

    let mut record = ParsedRecord {
        record_type: record_type.to_owned(),
        name,
        ..Default::default()
    };
    for item in items {
        match item {
            Item::Field(name, value) => record.fields.push((name, value)),
            Item::Alias(alias) => record.aliases.push(alias),
            Item::Info(name, value) => record.info.push((name, value)),
        }
    }
    Ok((input, record))
}

/// Decode a complete double-quoted, escaped string
pub fn parse_quoted_string(input: &str) -> Result<String, BuilderError> {
    let (_, string) = all_consuming(quoted_string).parse(input).finish()?;
    Ok(string)
}

/// Decode a complete constant array, e.g. `["A","B"]` or `[1,2.5]`
pub fn parse_const_array(input: &str) -> Result<Vec<ParsedConstant>, BuilderError> {
    let (_, values) = all_consuming(const_array).parse(input).finish()?;
    Ok(values)
}

/// Parse every record in a database file
pub fn parse_database(input: &str) -> Result<Vec<ParsedRecord>, BuilderError> {
    let (_, records) = all_consuming(preceded(ws, many0(terminated(record, ws))))
        .parse(input)
        .finish()?;
    Ok(records)
}
