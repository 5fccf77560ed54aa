use crate::spreadsheet::cell::CellValue;
use std::collections::HashMap;
use std::collections::HashSet;

/// A row of cell values, one per table column.
pub type Row = Vec<CellValue>;

/// Represents a table extracted from a spreadsheet: named columns and rectangular rows.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    /// Table/source name
    pub name: String,
    /// Column names, unique within the table
    pub columns: Vec<String>,
    /// Data rows, each as wide as `columns`
    pub rows: Vec<Row>,
}

impl Table {
    /// Creates an empty table with the given name.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Builds a table from a header row and data rows.
    ///
    /// Header cells are normalized into unique column names, fully empty data rows
    /// are skipped, and every row is padded or cut to the header width.
    pub fn from_rows<I>(name: &str, header: &[CellValue], rows: I) -> Self
    where
        I: IntoIterator<Item = Row>,
    {
        let columns = normalize_header(header);
        let width = columns.len();
        let rows = rows
            .into_iter()
            .filter(|row| !row.iter().all(CellValue::is_empty))
            .map(|mut row| {
                row.resize(width, CellValue::Empty);
                row
            })
            .collect();
        Self {
            name: name.to_owned(),
            columns,
            rows,
        }
    }

    /// Number of data rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }
}

/// Turns header cells into unique column names.
///
/// - Empty header cells become `Unnamed: <index>`
/// - Other cells use their display string
/// - Repeated names get `.1`, `.2`, ... suffixes in order of appearance
pub(crate) fn normalize_header(header: &[CellValue]) -> Vec<String> {
    let mut used: HashSet<String> = HashSet::new();
    let mut suffixes: HashMap<String, usize> = HashMap::new();
    let mut columns: Vec<String> = Vec::with_capacity(header.len());
    for (index, cell) in header.iter().enumerate() {
        let name = match cell {
            CellValue::Empty => format!("Unnamed: {index}"),
            _ => cell.to_string(),
        };
        let mut candidate = name.clone();
        while used.contains(&candidate) {
            let suffix = suffixes.entry(name.clone()).or_insert(0);
            *suffix += 1;
            candidate = format!("{name}.{suffix}");
        }
        used.insert(candidate.clone());
        columns.push(candidate);
    }
    columns
}
