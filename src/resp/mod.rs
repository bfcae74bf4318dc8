//! Reader for the line-oriented RESP instrument response format.
//!
//! A RESP file is a sequence of blockettes. Each data line carries a
//! 3-digit blockette type and a 2-digit field code; pole/zero and
//! coefficient tables use a field range (`10-13`) and one line per row.

mod parser;

use std::collections::BTreeMap;

pub use parser::{parse_resp_file, parse_resp_str};

use crate::error::{RespError, RespResult};

/// Identification blockettes without a stage
pub const STATION_IDENTIFIER: &str = "050";
pub const CHANNEL_IDENTIFIER: &str = "052";
/// Staged response blockettes
pub const POLES_ZEROS: &str = "053";
pub const COEFFICIENTS: &str = "054";
pub const DECIMATION: &str = "057";
pub const GAIN: &str = "058";

/// One row of a tabulated field: an integer index followed by numbers
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub index: i64,
    pub values: Vec<f64>,
}

impl Row {
    /// Column `n` of the row, where column 0 is the index
    pub fn column(&self, n: usize) -> Option<f64> {
        match n {
            0 => Some(self.index as f64),
            _ => self.values.get(n - 1).copied(),
        }
    }
}

/// Value of one blockette field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    /// A field code seen more than once in the same blockette
    List(Vec<String>),
    Rows(Vec<Row>),
    /// Stage number after the blockette has been read completely
    Integer(i64),
}

/// A typed record of a RESP file
#[derive(Debug, Clone, PartialEq)]
pub struct Blockette {
    kind: String,
    fields: BTreeMap<String, FieldValue>,
}

impl Blockette {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Three digit blockette type, e.g. `"053"`
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub(crate) fn insert(&mut self, field: impl Into<String>, value: FieldValue) {
        self.fields.insert(field.into(), value);
    }

    pub(crate) fn get_mut(&mut self, field: &str) -> Option<&mut FieldValue> {
        self.fields.get_mut(field)
    }

    /// Text of a scalar field; the first occurrence of a repeated one
    pub fn text(&self, field: &str) -> Option<&str> {
        match self.fields.get(field)? {
            FieldValue::Text(s) => Some(s),
            FieldValue::List(items) => items.first().map(String::as_str),
            FieldValue::Rows(_) | FieldValue::Integer(_) => None,
        }
    }

    /// Field parsed as a floating point number
    pub fn number(&self, field: &str) -> Option<f64> {
        match self.fields.get(field)? {
            FieldValue::Integer(i) => Some(*i as f64),
            _ => self.text(field).and_then(|s| s.trim().parse().ok()),
        }
    }

    /// First whitespace separated token parsed as a number, for values
    /// that carry a unit such as `1.000000E+00 HZ`
    pub fn leading_number(&self, field: &str) -> Option<f64> {
        self.text(field)
            .and_then(|s| s.split_whitespace().next())
            .and_then(|s| s.parse().ok())
    }

    pub fn integer(&self, field: &str) -> Option<i64> {
        match self.fields.get(field)? {
            FieldValue::Integer(i) => Some(*i),
            _ => self.text(field).and_then(|s| s.trim().parse().ok()),
        }
    }

    pub fn rows(&self, field: &str) -> &[Row] {
        match self.fields.get(field) {
            Some(FieldValue::Rows(rows)) => rows,
            _ => &[],
        }
    }

    /// Field code holding the stage number, if this type has one
    fn stage_field(kind: &str) -> RespResult<Option<&'static str>> {
        match kind {
            STATION_IDENTIFIER | CHANNEL_IDENTIFIER => Ok(None),
            POLES_ZEROS | COEFFICIENTS => Ok(Some("04")),
            DECIMATION | GAIN => Ok(Some("03")),
            other => Err(RespError::UnknownBlocketteType {
                code: other.to_string(),
            }),
        }
    }
}

/// Stage number of a blockette.
///
/// Identification blockettes have none; unknown types are an error since
/// the format is closed.
pub fn stage_for_blockette(blockette: &Blockette) -> RespResult<Option<i64>> {
    Ok(Blockette::stage_field(blockette.kind())?.and_then(|f| blockette.integer(f)))
}

/// First blockette of `kind` that belongs to `stage`
pub fn find_blockette<'a>(
    blockettes: &'a [Blockette],
    stage: i64,
    kind: &str,
) -> RespResult<Option<&'a Blockette>> {
    for b in blockettes.iter().filter(|b| b.kind() == kind) {
        if stage_for_blockette(b)? == Some(stage) {
            return Ok(Some(b));
        }
    }
    Ok(None)
}

/// Stage number of the last staged blockette, ignoring stage 0 which the
/// overall sensitivity uses
pub fn last_stage(blockettes: &[Blockette]) -> RespResult<Option<i64>> {
    for b in blockettes.iter().rev() {
        if let Some(stage) = stage_for_blockette(b)?
            && stage != 0
        {
            return Ok(Some(stage));
        }
    }
    Ok(None)
}
