//! Aggregated time series (`.fhz`). Same layout as the vehicle records, but the header row is
//! recognized by `Time` at a fixed position, and there's nothing to georeference.

use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::records::{run_datetime, slurp, slurp_path};
use crate::table::Table;
use crate::{Error, Result};

/// 0-based line of the preamble holding `Date:`
pub const RUN_DATE_LINE: usize = 5;
/// On the run date line, the date is followed by this
const RUN_DATE_END_MARKER: &str = "Name";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AggregateConfig {
    pub header_marker: String,
    /// Byte offset into the line where `header_marker` must appear
    pub header_offset: usize,
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            header_marker: "Time".to_string(),
            header_offset: 4,
        }
    }
}

impl AggregateConfig {
    /// The offset counts from after a leading quote artifact, if the line has one.
    fn is_header(&self, line: &str) -> bool {
        let line = line
            .strip_prefix("b'")
            .or_else(|| line.strip_prefix('\''))
            .unwrap_or(line);
        let end = self.header_offset + self.header_marker.len();
        line.get(self.header_offset..end) == Some(self.header_marker.as_str())
    }
}

pub fn load<R: Read>(reader: R, config: &AggregateConfig) -> Result<Table> {
    parse(&slurp(reader, "aggregate records")?, config)
}

pub fn load_path<P: AsRef<Path>>(path: P, config: &AggregateConfig) -> Result<Table> {
    parse(&slurp_path(path.as_ref())?, config)
}

pub fn parse(text: &str, config: &AggregateConfig) -> Result<Table> {
    let lines: Vec<&str> = text.lines().collect();
    let header_idx = lines
        .iter()
        .position(|line| config.is_header(line))
        .ok_or_else(|| Error::HeaderNotFound {
            marker: config.header_marker.clone(),
        })?;
    let run_start = run_datetime(&lines, RUN_DATE_LINE, Some(RUN_DATE_END_MARKER))?;

    Ok(Table::from_lines(
        lines[header_idx],
        lines[header_idx + 1..].iter().copied(),
        run_start,
    ))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    const PREAMBLE: &str = "$VISSIM_AGGREGATE\nFile: net.inpx\nComment:\nSimulation run: 1\nPTV Vissim\nDate: 2022-06-14 07:30:00 Name: morning peak\n";

    #[test]
    fn header_after_long_preamble() {
        let mut text = PREAMBLE.to_string();
        for i in 0..50 {
            text.push_str(&format!("free text {i}; with ; delimiters\n"));
        }
        text.push_str("$VS:Time;Vehicles;Speed\\r\\n'\n'60.0;12;48.3\\r\\n'\n'120.0;9;51.0\\r\\n'\n");

        let table = parse(&text, &AggregateConfig::default()).unwrap();
        assert_eq!(table.columns, vec!["$VS:Time", "Vehicles", "Speed"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.spatial, None);
        assert_eq!(
            table.rows[1].datetime,
            NaiveDate::from_ymd_opt(2022, 6, 14)
                .unwrap()
                .and_hms_opt(7, 32, 0)
        );
        assert_eq!(table.get(&table.rows[0], "$VS:Time"), Some("60.0"));
        assert_eq!(table.get(&table.rows[1], "Speed"), Some("51.0"));
        assert_eq!(
            table.output_columns(),
            vec!["$VS:Time", "Vehicles", "Speed", "datetime"]
        );
    }

    #[test]
    fn no_header() {
        let text = format!("{PREAMBLE}Time;Vehicles\n1;2\n");
        assert!(matches!(
            parse(&text, &AggregateConfig::default()),
            Err(Error::HeaderNotFound { .. })
        ));
    }

    #[test]
    fn date_without_name() {
        let text = "1\n2\n3\n4\n5\nDate: 06/14/2022 5:00:00 PM\n$VS:Time;A\n0;1\n";
        let table = parse(text, &AggregateConfig::default()).unwrap();
        assert_eq!(
            table.rows[0].datetime,
            NaiveDate::from_ymd_opt(2022, 6, 14)
                .unwrap()
                .and_hms_opt(17, 0, 0)
        );
    }

    #[test]
    fn missing_date_is_fatal() {
        let text = "$VS:Time;A\n0;1\n";
        assert!(matches!(
            parse(text, &AggregateConfig::default()),
            Err(Error::MissingRunDate { line: 6, .. })
        ));
    }

    #[test]
    fn header_offset_is_in_bytes() {
        let config = AggregateConfig::default();
        assert!(config.is_header("$VS:Time;A"));
        assert!(config.is_header("    Time"));
        assert!(!config.is_header("Time;A"));
        assert!(!config.is_header("$VS:"));
        assert!(!config.is_header("abcéTime"));
        assert!(config.is_header("'$VS:Time;A\\r\\n'"));
        assert!(config.is_header("b'$VS:Time;A"));
        assert!(!config.is_header("'abcTime;A"));
    }

    #[test]
    fn quoted_header() {
        let text = format!("{PREAMBLE}'$VS:Time;Vehicles\\r\\n'\n'60.0;12\\r\\n'\n");
        let table = parse(&text, &AggregateConfig::default()).unwrap();
        assert_eq!(table.columns, vec!["$VS:Time", "Vehicles"]);
        assert_eq!(table.get(&table.rows[0], "Vehicles"), Some("12"));
        assert_eq!(
            table.rows[0].datetime,
            NaiveDate::from_ymd_opt(2022, 6, 14)
                .unwrap()
                .and_hms_opt(7, 31, 0)
        );
    }
}
