//! Textual encoding of scalar values, as accepted by the EPICS database lexer.
//!
//! The `.db` parser is strict about what may appear inside a quoted token, so
//! every string that ends up in the output passes through [`quote_string`].
//! Anything that is not printable ASCII is written as a three-digit octal
//! escape of its UTF-8 bytes; octal escapes are bounded at three digits by the
//! EPICS unescaper, so a following digit can never be swallowed into them.

use std::fmt::Write;

use crate::value::Scalar;

/// Quote and escape a string so that it forms a single `.db` string token
pub fn quote_string(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for byte in value.bytes() {
        match byte {
            b'"' => quoted.push_str("\\\""),
            b'\\' => quoted.push_str("\\\\"),
            b'\n' => quoted.push_str("\\n"),
            b'\r' => quoted.push_str("\\r"),
            b'\t' => quoted.push_str("\\t"),
            0x20..=0x7e => quoted.push(byte as char),
            _ => {
                let _ = write!(quoted, "\\{byte:03o}");
            }
        }
    }
    quoted.push('"');
    quoted
}

pub fn format_bool(value: bool) -> &'static str {
    if value { "1" } else { "0" }
}

/// Render a float in shortest round-trip form
///
/// Infinities are written the way `epicsStrtod` spells them.
pub fn format_float(value: f64) -> String {
    if value.is_infinite() {
        if value.is_sign_positive() { "Inf" } else { "-Inf" }.to_string()
    } else {
        format!("{value:?}")
    }
}

/// As [`format_float`], for single precision
pub fn format_float32(value: f32) -> String {
    if value.is_infinite() {
        format_float(f64::from(value))
    } else {
        format!("{value:?}")
    }
}

/// The unquoted text of a scalar
pub fn format_scalar(value: &Scalar) -> String {
    match value {
        Scalar::Bool(v) => format_bool(*v).to_string(),
        Scalar::Int(v) => v.to_string(),
        Scalar::Float(v) => format_float(*v),
        Scalar::Float32(v) => format_float32(*v),
        Scalar::Decimal(v) => v.to_string(),
        Scalar::String(v) => v.clone(),
    }
}
