//! Row-wise union of parsed tables followed by exact-duplicate removal.

use crate::database::table::Row;
use crate::database::table::Table;
use crate::spreadsheet::cell::CellValue;
use sha2::Digest;
use sha2::Sha256;
use std::collections::HashMap;
use std::collections::HashSet;

/// Name given to the merged table.
const MERGED_TABLE_NAME: &str = "Merged_Data";

/// The result of concatenating and deduplicating all parsed tables.
#[derive(Clone, Debug, PartialEq)]
pub struct MergedTable {
    /// Merged columns and the surviving rows, in concatenation order
    pub table: Table,
    /// Rows before duplicates were removed
    pub source_rows: usize,
    /// Rows dropped as exact duplicates
    pub duplicates_removed: usize,
}

impl MergedTable {
    /// Column names in merged order.
    pub fn columns(&self) -> &[String] {
        &self.table.columns
    }

    /// Surviving rows, indexed from zero.
    pub fn rows(&self) -> &[Row] {
        &self.table.rows
    }

    /// SHA-256 over column names and cell values, used as the export cache key.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update((self.table.columns.len() as u64).to_le_bytes());
        for column in &self.table.columns {
            update_str(&mut hasher, column);
        }
        for row in &self.table.rows {
            for cell in row {
                match cell {
                    CellValue::Empty => hasher.update([0u8]),
                    CellValue::Bool(value) => hasher.update([1u8, *value as u8]),
                    CellValue::Number(value) => {
                        hasher.update([2u8]);
                        hasher.update(value.to_le_bytes());
                    }
                    CellValue::Text(value) => {
                        hasher.update([3u8]);
                        update_str(&mut hasher, value);
                    }
                    CellValue::DateTime(value) => {
                        hasher.update([4u8]);
                        update_str(&mut hasher, &value.to_string());
                    }
                }
            }
        }
        hex::encode(hasher.finalize())
    }
}

/// Feeds a length-prefixed string into the hasher.
fn update_str(hasher: &mut Sha256, value: &str) {
    hasher.update((value.len() as u64).to_le_bytes());
    hasher.update(value.as_bytes());
}

/// Concatenates tables row-wise and removes exact duplicate rows.
///
/// Columns are aligned by name in first-seen order; cells of columns a table lacks
/// are filled with [`CellValue::Empty`]. Of each group of equal rows only the
/// earliest, by concatenation order, is kept.
///
/// # Returns
/// `None` when there is nothing to merge.
pub fn merge_tables(tables: &[Table]) -> Option<MergedTable> {
    if tables.is_empty() {
        return None;
    }

    // Union of columns in first-seen order
    let mut columns: Vec<String> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();
    for table in tables {
        for column in &table.columns {
            if !positions.contains_key(column.as_str()) {
                positions.insert(column, columns.len());
                columns.push(column.to_owned());
            }
        }
    }

    // Align every row to the merged layout
    let mut rows: Vec<Row> = Vec::with_capacity(tables.iter().map(Table::row_count).sum());
    for table in tables {
        let targets: Vec<usize> = table.columns.iter().map(|column| positions[column.as_str()]).collect();
        for source in &table.rows {
            let mut row: Row = vec![CellValue::Empty; columns.len()];
            for (value, target) in source.iter().zip(&targets) {
                row[*target] = value.clone();
            }
            rows.push(row);
        }
    }

    let source_rows = rows.len();
    let rows = deduplicate(rows);
    let duplicates_removed = source_rows - rows.len();

    Some(MergedTable {
        table: Table {
            name: MERGED_TABLE_NAME.to_owned(),
            columns,
            rows,
        },
        source_rows,
        duplicates_removed,
    })
}

/// Keeps the first occurrence of every distinct row, preserving order.
pub(crate) fn deduplicate(rows: Vec<Row>) -> Vec<Row> {
    let keep: Vec<bool> = {
        let mut seen: HashSet<&Row> = HashSet::with_capacity(rows.len());
        rows.iter().map(|row| seen.insert(row)).collect()
    };
    rows.into_iter()
        .zip(keep)
        .filter_map(|(row, keep)| keep.then_some(row))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(value: &str) -> CellValue {
        CellValue::Text(value.to_owned())
    }

    fn number(value: f64) -> CellValue {
        CellValue::Number(value)
    }

    fn table(name: &str, columns: &[&str], rows: Vec<Row>) -> Table {
        Table {
            name: name.to_owned(),
            columns: columns.iter().map(|column| column.to_string()).collect(),
            rows,
        }
    }

    #[test]
    fn merge_nothing() {
        assert!(merge_tables(&[]).is_none());
    }

    #[test]
    fn merge_collapses_shared_rows() {
        let first = table("File1", &["ID", "Name"], vec![
            vec![number(1.0), text("A")],
            vec![number(2.0), text("B")],
        ]);
        let second = table("File2", &["ID", "Name"], vec![
            vec![number(2.0), text("B")],
            vec![number(3.0), text("C")],
        ]);
        let merged = merge_tables(&[first, second]).unwrap();
        assert_eq!(merged.columns(), ["ID", "Name"]);
        assert_eq!(merged.rows(), [
            vec![number(1.0), text("A")],
            vec![number(2.0), text("B")],
            vec![number(3.0), text("C")],
        ]);
        assert_eq!(merged.source_rows, 4);
        assert_eq!(merged.duplicates_removed, 1);
    }

    #[test]
    fn merge_keeps_earliest_duplicate() {
        let first = table("a", &["k", "v"], vec![
            vec![text("x"), number(1.0)],
            vec![text("y"), number(2.0)],
            vec![text("x"), number(1.0)],
        ]);
        let second = table("b", &["k", "v"], vec![
            vec![text("y"), number(2.0)],
            vec![text("z"), number(3.0)],
        ]);
        let merged = merge_tables(&[first, second]).unwrap();
        let keys: Vec<String> = merged.rows().iter().map(|row| row[0].to_string()).collect();
        assert_eq!(keys, vec!["x", "y", "z"]);
    }

    #[test]
    fn merge_aligns_columns_by_name() {
        let first = table("a", &["ID", "Name"], vec![vec![number(1.0), text("A")]]);
        let second = table("b", &["Name", "City"], vec![vec![text("B"), text("Oslo")]]);
        let merged = merge_tables(&[first, second]).unwrap();
        assert_eq!(merged.columns(), ["ID", "Name", "City"]);
        assert_eq!(merged.rows(), [
            vec![number(1.0), text("A"), CellValue::Empty],
            vec![CellValue::Empty, text("B"), text("Oslo")],
        ]);
    }

    #[test]
    fn missing_values_compare_equal() {
        let first = table("a", &["ID"], vec![vec![number(1.0)]]);
        let second = table("b", &["ID", "Note"], vec![
            vec![number(1.0), CellValue::Empty],
            vec![number(f64::NAN), CellValue::Empty],
            vec![number(f64::NAN), CellValue::Empty],
        ]);
        let merged = merge_tables(&[first, second]).unwrap();
        assert_eq!(merged.table.row_count(), 2);
        assert_eq!(merged.duplicates_removed, 2);
    }

    #[test]
    fn merge_is_idempotent() {
        let first = table("a", &["ID"], vec![vec![number(1.0)], vec![number(2.0)], vec![number(1.0)]]);
        let merged = merge_tables(&[first]).unwrap();
        let again = merge_tables(&[merged.table.clone(), merged.table.clone()]).unwrap();
        assert_eq!(again.table.columns, merged.table.columns);
        assert_eq!(again.table.rows, merged.table.rows);
    }

    #[test]
    fn empty_tables_still_merge() {
        let merged = merge_tables(&[Table::new("empty")]).unwrap();
        assert!(merged.columns().is_empty());
        assert!(merged.rows().is_empty());
    }

    #[test]
    fn digest_follows_content() {
        let first = table("a", &["ID"], vec![vec![number(1.0)]]);
        let same = table("b", &["ID"], vec![vec![number(1.0)]]);
        let other = table("c", &["ID"], vec![vec![number(2.0)]]);
        let digest = merge_tables(&[first]).unwrap().digest();
        assert_eq!(digest, merge_tables(&[same]).unwrap().digest());
        assert_ne!(digest, merge_tables(&[other]).unwrap().digest());
        assert_eq!(digest.len(), 64);
    }
}
