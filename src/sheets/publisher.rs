use super::client::{Dimension, SheetsClient, ValueInputOption};
use crate::error::Result;
use crate::report::{SizeValue, SketchesReport};
use log::{debug, info};
use serde_json::json;

const TIMESTAMP_HEADING: &str = "Commit Timestamp";
const COMMIT_HASH_HEADING: &str = "Commit Hash";
/// Columns A and B hold the timestamp and commit of each row.
const FIRST_DATA_COLUMN: usize = 3;
const FIRST_DATA_ROW: usize = 2;

/// Spreadsheet column letters of a 1 based column number: 1 is A, 27 is AA.
pub fn column_letter(mut column: usize) -> String {
    let mut letters = Vec::new();
    while column > 0 {
        let remainder = (column - 1) % 26;
        letters.push((b'A' + remainder as u8) as char);
        column = (column - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// `<sheet>!<range>` with the sheet name quoted when A1 notation requires it.
fn a1(sheet_name: &str, range: &str) -> String {
    if sheet_name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        format!("{}!{}", sheet_name, range)
    } else {
        format!("'{}'!{}", sheet_name.replace('\'', "''"), range)
    }
}

#[derive(Debug, PartialEq)]
struct Slot {
    number: usize,
    populated: bool,
}

/// Writes the current sizes of a report into the trends sheet: one column per
/// (board, sketch, memory type), one row per commit.
///
/// Columns and rows are located from the sheet itself before every write, so other
/// writers and earlier partial runs are taken into account.
pub struct TrendsPublisher<'a> {
    client: &'a SheetsClient,
    sheet_name: &'a str,
    sheet_id: i64,
}

impl<'a> TrendsPublisher<'a> {
    pub fn new(client: &'a SheetsClient, sheet_name: &'a str, sheet_id: i64) -> Self {
        TrendsPublisher {
            client,
            sheet_name,
            sheet_id,
        }
    }

    pub fn publish(&self, report: &SketchesReport) -> Result<()> {
        if self.heading_row()?.is_empty() {
            info!("Initializing empty sheet");
            self.client.values_update(
                &a1(self.sheet_name, "A1:B1"),
                json!([[TIMESTAMP_HEADING, COMMIT_HASH_HEADING]]),
                ValueInputOption::Raw,
            )?;
        }

        debug!("Reporting for board: {}", report.board);
        for sketch in &report.sketches {
            debug!("Reporting for sketch: {}", sketch.name);
            for size in &sketch.sizes {
                debug!("Reporting for memory type: {}", size.name);
                let column = self.data_column(&report.board, &sketch.name, &size.name)?;
                let row = self.commit_row(&report.commit_hash, &report.commit_url)?;
                self.write_size(&column, row, &size.current.absolute)?;
            }
        }
        Ok(())
    }

    fn heading_row(&self) -> Result<Vec<String>> {
        let mut rows = self.client.values_get(&a1(self.sheet_name, "1:1"))?;
        Ok(if rows.is_empty() {
            vec![]
        } else {
            rows.swap_remove(0)
        })
    }

    fn locate_column(&self, heading: &str) -> Result<Slot> {
        let headings = self.heading_row()?;
        Ok(match headings.iter().position(|h| h == heading) {
            Some(index) => Slot {
                number: index + 1,
                populated: true,
            },
            None => Slot {
                number: (headings.len() + 1).max(FIRST_DATA_COLUMN),
                populated: false,
            },
        })
    }

    /// Letter of the column for a board, sketch and memory type, created when missing.
    fn data_column(&self, board: &str, sketch: &str, size: &str) -> Result<String> {
        let heading = format!("{}\n{}\n{}", board, sketch, size);
        let slot = self.locate_column(&heading)?;
        let letter = column_letter(slot.number);
        if !slot.populated {
            info!(
                "No data columns found for {}, {}, {}. Adding column heading at column {}",
                board, sketch, size, letter
            );
            self.client
                .append_dimension(self.sheet_id, Dimension::Columns)?;
            self.client.values_update(
                &a1(self.sheet_name, &format!("{0}1:{0}1", letter)),
                json!([[heading]]),
                ValueInputOption::Raw,
            )?;
        }
        Ok(letter)
    }

    fn locate_row(&self, commit_hash: &str) -> Result<Slot> {
        let cells = self.client.values_get(&a1(self.sheet_name, "B:B"))?;
        let found = cells
            .iter()
            .position(|row| row.first().map(String::as_str) == Some(commit_hash));
        Ok(match found {
            Some(index) => Slot {
                number: index + 1,
                populated: true,
            },
            None => Slot {
                number: (cells.len() + 1).max(FIRST_DATA_ROW),
                populated: false,
            },
        })
    }

    /// Row number of the commit, created when missing.
    fn commit_row(&self, commit_hash: &str, commit_url: &str) -> Result<usize> {
        let slot = self.locate_row(commit_hash)?;
        debug!("Current row number: {}", slot.number);
        if !slot.populated {
            info!(
                "No row found for the commit hash: {}. Creating a new row #{}",
                commit_hash, slot.number
            );
            self.client.append_dimension(self.sheet_id, Dimension::Rows)?;
            let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
            let link = format!("=HYPERLINK(\"{}\",T(\"{}\"))", commit_url, commit_hash);
            self.client.values_update(
                &a1(self.sheet_name, &format!("A{0}:B{0}", slot.number)),
                json!([[timestamp, link]]),
                ValueInputOption::UserEntered,
            )?;
        }
        Ok(slot.number)
    }

    fn write_size(&self, column: &str, row: usize, value: &SizeValue) -> Result<()> {
        debug!("Writing memory usage value: {}", value);
        self.client.values_update(
            &a1(self.sheet_name, &format!("{0}{1}:{0}{1}", column, row)),
            json!([[value.to_json()]]),
            ValueInputOption::Raw,
        )
    }
}
