use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::records::{parse_offset, split_fields, unquote};
use crate::{GeoPoint, RowDecodeFailure};

pub const DATETIME_COLUMN: &str = "datetime";
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Rows from one semicolon-delimited log. The column set comes from that file's header row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    /// Only trajectory logs have these
    pub spatial: Option<SpatialColumns>,
    /// Rows that were kept, but couldn't be fully decoded
    pub failures: Vec<RowDecodeFailure>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// Index-aligned with `Table::columns`. None when the line had fewer fields than the header.
    pub fields: Vec<Option<String>>,
    /// The run's start plus the first column, in seconds
    pub datetime: Option<NaiveDateTime>,
    pub position: Option<GeoPoint>,
}

/// Which raw columns hold local coordinates, and the names of the derived WGS84 columns.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpatialColumns {
    pub x: String,
    pub y: String,
    pub longitude: String,
    pub latitude: String,
}

impl SpatialColumns {
    pub fn new(x: &str, y: &str) -> Self {
        Self {
            x: x.to_string(),
            y: y.to_string(),
            longitude: format!("{x}_wgs"),
            latitude: format!("{y}_wgs"),
        }
    }
}

impl Table {
    /// Splits the header and every following non-blank line. Each row's timestamp is
    /// `run_start` plus its first field; a row without a usable offset is kept without one.
    pub(crate) fn from_lines<'a, I: IntoIterator<Item = &'a str>>(
        header: &str,
        lines: I,
        run_start: NaiveDateTime,
    ) -> Self {
        let columns: Vec<String> = split_fields(header)
            .into_iter()
            .enumerate()
            .map(|(idx, name)| {
                if idx == 0 {
                    unquote(name).to_string()
                } else {
                    name.trim().to_string()
                }
            })
            .collect();

        let mut table = Table {
            columns,
            rows: Vec::new(),
            spatial: None,
            failures: Vec::new(),
        };
        let mut extra_fields = 0;

        for line in lines {
            let fields = split_fields(line);
            if fields.len() == 1 && unquote(fields[0]).is_empty() {
                continue;
            }
            if fields.len() > table.columns.len() {
                extra_fields += 1;
            }

            let mut values: Vec<Option<String>> = Vec::with_capacity(table.columns.len());
            for idx in 0..table.columns.len() {
                values.push(fields.get(idx).map(|field| {
                    if idx == 0 {
                        unquote(field).to_string()
                    } else {
                        field.to_string()
                    }
                }));
            }

            let datetime = match parse_offset(fields[0]) {
                Ok(offset) => {
                    let datetime = run_start.checked_add_signed(offset);
                    if datetime.is_none() {
                        table.fail(table.rows.len(), 0, "timestamp overflows".to_string());
                    }
                    datetime
                }
                Err(reason) => {
                    table.fail(table.rows.len(), 0, reason);
                    None
                }
            };

            table.rows.push(Row {
                fields: values,
                datetime,
                position: None,
            });
        }

        if extra_fields > 0 {
            debug!(
                "{extra_fields} rows have more fields than the {} header columns; the extras are ignored",
                table.columns.len()
            );
        }
        table
    }

    pub(crate) fn fail(&mut self, row: usize, column: usize, reason: String) {
        let failure = RowDecodeFailure {
            row,
            column: self.columns.get(column).cloned().unwrap_or_default(),
            reason,
        };
        debug!("{failure}");
        self.failures.push(failure);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The first column with this name
    pub fn column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|col| col == name)
    }

    pub fn get<'a>(&self, row: &'a Row, name: &str) -> Option<&'a str> {
        let idx = self.column(name)?;
        row.fields.get(idx)?.as_deref()
    }

    pub fn rows_with_position(&self) -> usize {
        self.rows.iter().filter(|row| row.position.is_some()).count()
    }

    /// The raw header, then the timestamp, then any derived coordinates.
    pub fn output_columns(&self) -> Vec<String> {
        let mut columns = self.columns.clone();
        columns.push(DATETIME_COLUMN.to_string());
        if let Some(ref spatial) = self.spatial {
            columns.push(spatial.longitude.clone());
            columns.push(spatial.latitude.clone());
        }
        columns
    }

    /// Aligned with `output_columns`
    pub fn output_values(&self, row: &Row) -> Vec<Option<String>> {
        let mut values = row.fields.clone();
        values.push(
            row.datetime
                .map(|datetime| datetime.format(DATETIME_FORMAT).to_string()),
        );
        if self.spatial.is_some() {
            values.push(row.position.map(|pt| pt.longitude.to_string()));
            values.push(row.position.map(|pt| pt.latitude.to_string()));
        }
        values
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2022, 6, 14)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    #[test]
    fn rows_are_zipped_against_header() {
        let table = Table::from_lines(
            "'$T; A ;B\\r\\n'",
            vec!["'1.5;x;y\\r\\n'", "", "'2;only", "'3;a;b;extra"],
            start(),
        );
        assert_eq!(table.columns, vec!["$T", "A", "B"]);
        assert_eq!(table.len(), 3);

        let first = &table.rows[0];
        assert_eq!(
            first.fields,
            vec![Some("1.5".to_string()), Some("x".to_string()), Some("y".to_string())]
        );
        assert_eq!(
            first.datetime,
            NaiveDate::from_ymd_opt(2022, 6, 14)
                .unwrap()
                .and_hms_milli_opt(8, 0, 1, 500)
        );
        assert_eq!(table.get(first, "B"), Some("y"));
        assert_eq!(table.get(&table.rows[1], "B"), None);
        assert_eq!(table.get(&table.rows[2], "B"), Some("b"));
        assert!(table.failures.is_empty());
    }

    #[test]
    fn bad_offset_keeps_the_row() {
        let table = Table::from_lines("T;A", vec!["'abc;1", "'2;2"], start());
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0].datetime, None);
        assert!(table.rows[1].datetime.is_some());
        assert_eq!(table.failures.len(), 1);
        assert_eq!(table.failures[0].row, 0);
        assert_eq!(table.failures[0].column, "T");
    }

    #[test]
    fn output_order() {
        let mut table = Table::from_lines("T;POS;POSLAT", vec!["0;1;2"], start());
        assert_eq!(table.output_columns(), vec!["T", "POS", "POSLAT", "datetime"]);
        assert_eq!(
            table.output_values(&table.rows[0])[3].as_deref(),
            Some("2022-06-14 08:00:00")
        );

        table.spatial = Some(SpatialColumns::new("POS", "POSLAT"));
        assert_eq!(
            table.output_columns(),
            vec!["T", "POS", "POSLAT", "datetime", "POS_wgs", "POSLAT_wgs"]
        );
        assert_eq!(table.output_values(&table.rows[0])[5], None);
    }
}
