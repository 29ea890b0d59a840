//! Helpers shared by the semicolon-delimited logs. Older tooling materialized each raw byte line as
//! debug-printed text, so fields and lines may still carry quote and escaped line-ending
//! artifacts; these are stripped here.

use std::io::Read;
use std::path::Path;

use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::{Error, Result};

pub const FIELD_DELIMITER: char = ';';
const DATE_MARKER: &str = "Date:";

const ESCAPED_LINE_ENDINGS: [&str; 4] = ["\\r\\n'", "\\n'", "\\r\\n", "\\n"];

const DATETIME_FORMATS: [&str; 7] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%A, %B %d, %Y %I:%M:%S %p",
    "%B %d, %Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %H:%M:%S",
    "%d.%m.%Y %H:%M:%S",
];
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%d.%m.%Y"];

/// Reads everything. The logs aren't always valid UTF-8 (free-text comments in the preamble), so
/// invalid bytes are replaced rather than failing the whole file.
pub fn slurp<R: Read>(mut reader: R, input: &str) -> Result<String> {
    let mut bytes = Vec::new();
    reader
        .read_to_end(&mut bytes)
        .map_err(|err| Error::io(input, err))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

pub fn slurp_path(path: &Path) -> Result<String> {
    let file =
        fs_err::File::open(path).map_err(|err| Error::io(path.display().to_string(), err))?;
    slurp(file, &path.display().to_string())
}

/// Removes a trailing line ending, or its escaped form, and the closing quote of a line that was
/// wrapped in quotes. The opening quote belongs to the first field; see `unquote`.
pub fn strip_line_artifacts(line: &str) -> &str {
    let mut line = line.trim_end_matches(|c: char| c == '\r' || c == '\n');
    for suffix in ESCAPED_LINE_ENDINGS {
        if let Some(rest) = line.strip_suffix(suffix) {
            line = rest;
            break;
        }
    }
    let wrapped = line.starts_with('\'') || line.starts_with("b'");
    if wrapped && line.len() > 1 {
        if let Some(rest) = line.strip_suffix('\'') {
            line = rest;
        }
    }
    line
}

/// Strips at most one leading and one trailing quote, then surrounding whitespace.
pub fn unquote(field: &str) -> &str {
    let mut field = field.trim();
    if let Some(rest) = field
        .strip_prefix("b'")
        .or_else(|| field.strip_prefix('\''))
        .or_else(|| field.strip_prefix('"'))
    {
        field = rest;
    }
    if let Some(rest) = field
        .strip_suffix('\'')
        .or_else(|| field.strip_suffix('"'))
    {
        field = rest;
    }
    field.trim()
}

pub fn split_fields(line: &str) -> Vec<&str> {
    strip_line_artifacts(line).split(FIELD_DELIMITER).collect()
}

/// The first field of the line, with artifacts removed
pub fn first_field(line: &str) -> &str {
    unquote(split_fields(line)[0])
}

/// Drops a fixed number of trailing characters (not bytes).
pub fn strip_suffix_chars(value: &str, count: usize) -> &str {
    let keep = value.chars().count().saturating_sub(count);
    match value.char_indices().nth(keep) {
        Some((idx, _)) => &value[..idx],
        None => value,
    }
}

/// Parses the first column of a record: a possibly quoted number of seconds.
pub fn parse_offset(field: &str) -> std::result::Result<Duration, String> {
    let raw = unquote(field);
    let seconds = raw
        .parse::<f64>()
        .map_err(|err| format!("time offset {raw:?}: {err}"))?;
    // Duration::nanoseconds takes an i64, good for about 292 years
    if !seconds.is_finite() || seconds.abs() > 9.0e9 {
        return Err(format!("time offset {raw:?} is out of range"));
    }
    Ok(Duration::nanoseconds((seconds * 1e9).round() as i64))
}

/// Finds the run date on a fixed line of the preamble (0-based `idx`). The value follows the
/// `Date:` marker, and ends before `end_marker` if that appears afterwards.
pub fn run_datetime(lines: &[&str], idx: usize, end_marker: Option<&str>) -> Result<NaiveDateTime> {
    let missing = |reason: String| Error::MissingRunDate {
        line: idx + 1,
        reason,
    };

    let line = lines
        .get(idx)
        .ok_or_else(|| missing(format!("the file only has {} lines", lines.len())))?;
    let line = strip_line_artifacts(line);
    let (_, value) = line
        .split_once(DATE_MARKER)
        .ok_or_else(|| missing(format!("no {DATE_MARKER:?} in {line:?}")))?;
    let value = match end_marker.and_then(|marker| value.split_once(marker)) {
        Some((before, _)) => before,
        None => value,
    };
    parse_datetime(value).ok_or_else(|| missing(format!("can't parse {:?}", value.trim())))
}

/// A date without a time means midnight.
pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim().trim_matches('\'').trim();
    for format in DATETIME_FORMATS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(datetime);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    None
}
