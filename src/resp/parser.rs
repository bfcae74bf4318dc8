use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use super::{Blockette, COEFFICIENTS, DECIMATION, FieldValue, GAIN, POLES_ZEROS, Row};
use crate::error::{RespError, RespResult};

static FIELD_LINE: OnceLock<Regex> = OnceLock::new();
static EMPTY_LOCATION_LINE: OnceLock<Regex> = OnceLock::new();
static ROW_LINE: OnceLock<Regex> = OnceLock::new();

fn field_line() -> &'static Regex {
    FIELD_LINE.get_or_init(|| {
        Regex::new(r"^B(\d\d\d)F(\d\d)\s+(\S.+):\s+(\S.*)$").expect("Invalid RESP field regex")
    })
}

fn empty_location_line() -> &'static Regex {
    EMPTY_LOCATION_LINE.get_or_init(|| {
        Regex::new(r"^B(\d\d\d)F(\d\d)\s+(Location):\s*()$").expect("Invalid RESP location regex")
    })
}

fn row_line() -> &'static Regex {
    ROW_LINE.get_or_init(|| {
        Regex::new(r"^B(\d\d\d)F(\d\d-\d\d)\s+(\d+\s+\S.*)$").expect("Invalid RESP row regex")
    })
}

/// What a single data line contributes to the current blockette
enum LineValue {
    Scalar(String),
    Row(Row),
}

struct ParsedLine {
    kind: String,
    field: String,
    value: LineValue,
}

/// Read and parse a RESP file
pub fn parse_resp_file(path: &Path) -> RespResult<Vec<Blockette>> {
    let text = fs::read_to_string(path).map_err(|source| RespError::Io {
        file: path.to_path_buf(),
        source,
    })?;
    parse_resp_str(&text, path)
}

/// Parse RESP text; `file` is only used in error messages.
///
/// A blockette ends when a comment line containing `-----` is seen or when
/// the blockette type of a data line changes.
pub fn parse_resp_str(text: &str, file: &Path) -> RespResult<Vec<Blockette>> {
    let mut blockettes = Vec::new();
    let mut current: Option<Blockette> = None;
    let mut prev_kind: Option<String> = None;

    for (idx, line) in text.lines().enumerate() {
        if line.starts_with('#') {
            if line.contains("-----") {
                prev_kind = None;
            }
            continue;
        }
        if !line.starts_with('B') {
            continue;
        }

        let parsed = parse_line(line).map_err(|kind| match kind {
            LineError::NoMatch => RespError::MalformedLine {
                file: file.to_path_buf(),
                line_number: idx + 1,
                line: line.to_string(),
            },
            LineError::BadNumber {
                kind,
                field,
                value,
            } => RespError::InvalidField {
                file: file.to_path_buf(),
                blockette: kind,
                field,
                value,
            },
        })?;

        if prev_kind.as_deref() != Some(parsed.kind.as_str()) {
            if let Some(done) = current.take() {
                blockettes.push(finish(done, file)?);
            }
            current = Some(Blockette::new(parsed.kind.clone()));
            prev_kind = Some(parsed.kind.clone());
        }

        if let Some(blockette) = current.as_mut() {
            add_field(blockette, parsed, file)?;
        }
    }

    if let Some(done) = current {
        blockettes.push(finish(done, file)?);
    }
    Ok(blockettes)
}

enum LineError {
    NoMatch,
    BadNumber {
        kind: String,
        field: String,
        value: String,
    },
}

fn parse_line(line: &str) -> Result<ParsedLine, LineError> {
    let scalar = field_line()
        .captures(line)
        .or_else(|| empty_location_line().captures(line));
    if let Some(caps) = scalar {
        return Ok(ParsedLine {
            kind: caps[1].to_string(),
            field: caps[2].to_string(),
            value: LineValue::Scalar(caps[4].trim_end().to_string()),
        });
    }

    let caps = row_line().captures(line).ok_or(LineError::NoMatch)?;
    let kind = caps[1].to_string();
    let field = caps[2].to_string();
    let bad = |value: &str| LineError::BadNumber {
        kind: kind.clone(),
        field: field.clone(),
        value: value.to_string(),
    };

    let mut tokens = caps[3].split_whitespace();
    let first = tokens.next().ok_or_else(|| bad(&caps[3]))?;
    let index = first.parse::<i64>().map_err(|_| bad(first))?;
    let values = tokens
        .map(|t| t.parse::<f64>().map_err(|_| bad(t)))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ParsedLine {
        kind,
        field,
        value: LineValue::Row(Row { index, values }),
    })
}

/// Store a line's value: a repeated scalar field becomes a list, rows are
/// appended to their table
fn add_field(blockette: &mut Blockette, line: ParsedLine, file: &Path) -> RespResult<()> {
    let conflict = || RespError::ConflictingField {
        file: file.to_path_buf(),
        blockette: line.kind.clone(),
        field: line.field.clone(),
    };

    match (blockette.get_mut(&line.field), &line.value) {
        (None, LineValue::Scalar(s)) => {
            blockette.insert(line.field.clone(), FieldValue::Text(s.clone()));
        }
        (None, LineValue::Row(row)) => {
            blockette.insert(line.field.clone(), FieldValue::Rows(vec![row.clone()]));
        }
        (Some(existing), LineValue::Scalar(s)) => match existing {
            FieldValue::Text(first) => {
                *existing = FieldValue::List(vec![std::mem::take(first), s.clone()]);
            }
            FieldValue::List(items) => items.push(s.clone()),
            FieldValue::Rows(_) | FieldValue::Integer(_) => return Err(conflict()),
        },
        (Some(existing), LineValue::Row(row)) => match existing {
            FieldValue::Rows(rows) => rows.push(row.clone()),
            _ => return Err(conflict()),
        },
    }
    Ok(())
}

/// Type the stage number once the blockette is complete
fn finish(mut blockette: Blockette, file: &Path) -> RespResult<Blockette> {
    let stage_field = match blockette.kind() {
        POLES_ZEROS | COEFFICIENTS => "04",
        DECIMATION | GAIN => "03",
        _ => return Ok(blockette),
    };

    let invalid = |value: String| RespError::InvalidField {
        file: file.to_path_buf(),
        blockette: blockette.kind().to_string(),
        field: stage_field.to_string(),
        value,
    };
    let stage = match blockette.get(stage_field) {
        Some(FieldValue::Text(s)) => s.trim().parse::<i64>().map_err(|_| invalid(s.clone()))?,
        Some(FieldValue::Integer(i)) => *i,
        Some(other) => return Err(invalid(format!("{:?}", other))),
        None => return Err(invalid(String::new())),
    };
    blockette.insert(stage_field, FieldValue::Integer(stage));
    Ok(blockette)
}
