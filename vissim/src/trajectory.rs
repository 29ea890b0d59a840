//! Vehicle records (`.fzp`): a free-text preamble, then a `VEHICLE` header row and one
//! semicolon-delimited line per vehicle per time step.

use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::records::{first_field, run_datetime, slurp, slurp_path, strip_suffix_chars};
use crate::table::{SpatialColumns, Table};
use crate::{Error, Result, Transformer};

/// 0-based line of the preamble holding `Date:`
pub const RUN_DATE_LINE: usize = 3;
pub const HEADER_MARKER: &str = "VEHICLE";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryConfig {
    /// Local x coordinate
    pub x_column: String,
    /// Local y coordinate. Values carry a unit suffix.
    pub y_column: String,
    /// How many trailing characters to drop from every `y_column` value
    pub y_suffix_len: usize,
}

impl Default for TrajectoryConfig {
    fn default() -> Self {
        Self {
            x_column: "POS".to_string(),
            y_column: "POSLAT".to_string(),
            y_suffix_len: 5,
        }
    }
}

pub fn load<R: Read>(
    reader: R,
    config: &TrajectoryConfig,
    transformer: &Transformer,
) -> Result<Table> {
    parse(&slurp(reader, "vehicle records")?, config, transformer)
}

pub fn load_path<P: AsRef<Path>>(
    path: P,
    config: &TrajectoryConfig,
    transformer: &Transformer,
) -> Result<Table> {
    parse(&slurp_path(path.as_ref())?, config, transformer)
}

pub fn parse(text: &str, config: &TrajectoryConfig, transformer: &Transformer) -> Result<Table> {
    let lines: Vec<&str> = text.lines().collect();
    if lines.is_empty() {
        return Err(Error::HeaderNotFound {
            marker: HEADER_MARKER.to_string(),
        });
    }
    let header_idx = match lines.iter().position(|line| is_header(line)) {
        Some(idx) => idx,
        None => {
            warn!("No {HEADER_MARKER} header row; treating the first line as the header");
            0
        }
    };
    let run_start = run_datetime(&lines, RUN_DATE_LINE, None)?;

    let mut table = Table::from_lines(
        lines[header_idx],
        lines[header_idx + 1..].iter().copied(),
        run_start,
    );
    add_positions(&mut table, config, transformer);
    Ok(table)
}

/// The header's first field is `VEHICLE`, or a qualified `VEHICLE:...` name, possibly behind a
/// `$` sigil.
fn is_header(line: &str) -> bool {
    let first = first_field(line);
    let first = first.strip_prefix('$').unwrap_or(first);
    first == HEADER_MARKER
        || first
            .strip_prefix(HEADER_MARKER)
            .map(|rest| rest.starts_with(':'))
            .unwrap_or(false)
}

fn add_positions(table: &mut Table, config: &TrajectoryConfig, transformer: &Transformer) {
    let spatial = SpatialColumns::new(&config.x_column, &config.y_column);
    let x_idx = table.column(&spatial.x);
    let y_idx = table.column(&spatial.y);
    table.spatial = Some(spatial);

    let (x_idx, y_idx) = match (x_idx, y_idx) {
        (Some(x), Some(y)) => (x, y),
        _ => {
            warn!(
                "Header doesn't have both {} and {}; no positions will be calculated",
                config.x_column, config.y_column
            );
            return;
        }
    };

    for row_idx in 0..table.rows.len() {
        if let Some(Some(y)) = table.rows[row_idx].fields.get_mut(y_idx) {
            *y = strip_suffix_chars(y, config.y_suffix_len).to_string();
        }

        let row = &table.rows[row_idx];
        let x = parse_coordinate(row.fields.get(x_idx));
        let y = parse_coordinate(row.fields.get(y_idx));
        match (x, y) {
            (Ok(x), Ok(y)) => match transformer.checked_transform(x, y) {
                Some(pt) => {
                    table.rows[row_idx].position = Some(pt);
                }
                None => {
                    table.fail(row_idx, x_idx, format!("({x}, {y}) has no WGS84 position"));
                }
            },
            (Err(reason), _) => table.fail(row_idx, x_idx, reason),
            (_, Err(reason)) => table.fail(row_idx, y_idx, reason),
        }
    }
}

fn parse_coordinate(field: Option<&Option<String>>) -> std::result::Result<f64, String> {
    let raw = match field {
        Some(Some(raw)) => raw.trim(),
        _ => return Err("missing".to_string()),
    };
    raw.parse::<f64>()
        .map_err(|err| format!("{raw:?} isn't a number: {err}"))
}
