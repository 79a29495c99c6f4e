/// First heading of every report table, the board column.
pub const FQBN_HEADING: &str = "FQBN";

/// Row 0 is the heading row. All rows always have as many cells as the heading row.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportTable {
    rows: Vec<Vec<String>>,
}

impl Default for ReportTable {
    fn default() -> Self {
        ReportTable {
            rows: vec![vec![FQBN_HEADING.to_owned()]],
        }
    }
}

impl ReportTable {
    pub fn new() -> Self {
        ReportTable::default()
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    fn width(&self) -> usize {
        self.rows[0].len()
    }

    /// Appends a row for `board` and returns its index.
    pub fn add_row(&mut self, board: &str) -> usize {
        let mut row = vec![String::new(); self.width()];
        row[0] = board.to_owned();
        self.rows.push(row);
        self.rows.len() - 1
    }

    /// Index of the column headed `heading`, appending it when missing.
    pub fn column(&mut self, heading: &str) -> usize {
        if let Some(index) = self.rows[0].iter().skip(1).position(|h| h == heading) {
            return index + 1;
        }
        self.rows[0].push(heading.to_owned());
        for row in self.rows.iter_mut().skip(1) {
            row.push(String::new());
        }
        self.width() - 1
    }

    pub fn set<V: ToString>(&mut self, row: usize, column: usize, value: V) {
        self.rows[row][column] = value.to_string();
    }

    pub fn to_markdown(&self) -> String {
        let mut markdown = String::new();
        for (index, row) in self.rows.iter().enumerate() {
            markdown.push_str(&row.join("|"));
            markdown.push('\n');
            if index == 0 {
                markdown.push_str(&vec!["-"; row.len()].join("|"));
                markdown.push('\n');
            }
        }
        markdown
    }

    pub fn to_csv(&self) -> String {
        let mut csv = String::new();
        for row in &self.rows {
            let cells: Vec<String> = row.iter().map(|cell| csv_cell(cell)).collect();
            csv.push_str(&cells.join(","));
            csv.push('\n');
        }
        csv
    }
}

fn csv_cell(cell: &str) -> String {
    if cell.contains(|c| matches!(c, ',' | '"' | '\n' | '\r')) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_owned()
    }
}
