//! Read-only preview of the merged table, without a row-number column.

use crate::database::merge::MergedTable;
use serde::Serialize;
use std::fmt::Display;

/// Longest cell text shown in the text rendering before it is cut.
const MAX_TEXT_WIDTH: usize = 40;

/// Column names plus the display strings of the first rows of a merged table.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Preview {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub total_rows: usize,
}

impl Preview {
    /// Builds a preview holding at most `limit` rows.
    pub fn new(merged: &MergedTable, limit: usize) -> Self {
        let rows = merged
            .rows()
            .iter()
            .take(limit)
            .map(|row| row.iter().map(ToString::to_string).collect())
            .collect();
        Self {
            columns: merged.columns().to_vec(),
            rows,
            total_rows: merged.table.row_count(),
        }
    }

    /// True when the table has more rows than the preview shows.
    pub fn is_truncated(&self) -> bool {
        self.total_rows > self.rows.len()
    }
}

impl Display for Preview {
    /// Renders an aligned plain-text table for terminals.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let clip = |value: &str| -> String {
            if value.chars().count() > MAX_TEXT_WIDTH {
                let mut clipped: String = value.chars().take(MAX_TEXT_WIDTH - 1).collect();
                clipped.push('…');
                clipped
            } else {
                value.to_owned()
            }
        };
        let header: Vec<String> = self.columns.iter().map(|column| clip(column.as_str())).collect();
        let rows: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| row.iter().map(|value| clip(value.as_str())).collect())
            .collect();

        let mut widths: Vec<usize> = header.iter().map(|name| name.chars().count()).collect();
        for row in &rows {
            for (width, value) in widths.iter_mut().zip(row) {
                *width = (*width).max(value.chars().count());
            }
        }

        let line = |f: &mut std::fmt::Formatter<'_>, cells: &[String]| -> std::fmt::Result {
            let padded: Vec<String> = cells
                .iter()
                .zip(&widths)
                .map(|(value, width)| format!("{:<width$}", value, width = *width))
                .collect();
            writeln!(f, "{}", padded.join(" | ").trim_end())
        };

        line(f, &header)?;
        let rule: Vec<String> = widths.iter().map(|width| "-".repeat(*width)).collect();
        writeln!(f, "{}", rule.join("-+-"))?;
        for row in &rows {
            line(f, row.as_slice())?;
        }
        if self.is_truncated() {
            writeln!(f, "... showing {} of {} rows", self.rows.len(), self.total_rows)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::merge::merge_tables;
    use crate::database::table::Table;
    use crate::spreadsheet::cell::CellValue;

    fn merged() -> MergedTable {
        let table = Table {
            name: "source".to_owned(),
            columns: vec!["ID".to_owned(), "Name".to_owned()],
            rows: vec![
                vec![CellValue::Number(1.0), CellValue::Text("A".to_owned())],
                vec![CellValue::Number(2.0), CellValue::Empty],
                vec![CellValue::Number(3.5), CellValue::Text("Charlie".to_owned())],
            ],
        };
        merge_tables(&[table]).unwrap()
    }

    #[test]
    fn preview_has_no_index_column() {
        let preview = Preview::new(&merged(), 10);
        assert_eq!(preview.columns, vec!["ID", "Name"]);
        assert_eq!(preview.rows[0], vec!["1", "A"]);
        assert_eq!(preview.rows[1], vec!["2", ""]);
        assert!(!preview.is_truncated());
    }

    #[test]
    fn preview_is_capped() {
        let preview = Preview::new(&merged(), 2);
        assert_eq!(preview.rows.len(), 2);
        assert_eq!(preview.total_rows, 3);
        assert!(preview.is_truncated());
    }

    #[test]
    fn text_rendering() {
        let text = Preview::new(&merged(), 2).to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "ID | Name");
        assert_eq!(lines[1], "---+-----");
        assert_eq!(lines[2], "1  | A");
        assert_eq!(lines[3], "2  |");
        assert_eq!(lines[4], "... showing 2 of 3 rows");
    }
}
