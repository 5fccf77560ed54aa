//! Serialization of the merged table into the downloadable workbook.

use crate::database::merge::MergedTable;
use crate::error::MergerError;
use crate::error::ResultMessage;
use crate::spreadsheet::writer::write_xlsx;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::debug;

/// File name offered for download
pub const EXPORT_FILE_NAME: &str = "merged_data.xlsx";
/// Name of the only sheet in the exported workbook
pub const EXPORT_SHEET_NAME: &str = "Merged_Data";
/// MIME type of the exported workbook
pub const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// An encoded workbook ready to be downloaded or written to disk.
#[derive(Clone, Debug, PartialEq)]
pub struct ExportedFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Encodes the merged table as `merged_data.xlsx` with a single `Merged_Data` sheet.
pub fn export(merged: &MergedTable) -> Result<ExportedFile, MergerError> {
    let bytes = write_xlsx(&merged.table, EXPORT_SHEET_NAME).with_prefix("Export merged workbook failed")?;
    debug!(bytes = bytes.len(), rows = merged.table.row_count(), "Encoded merged workbook");
    Ok(ExportedFile {
        file_name: EXPORT_FILE_NAME.to_owned(),
        content_type: XLSX_CONTENT_TYPE.to_owned(),
        bytes,
    })
}

/// Content-addressed store of encoded workbooks.
///
/// Keys are [`MergedTable::digest`] values. Once `capacity` entries are held the
/// oldest entry is evicted first. A capacity of zero disables caching.
pub struct ExportCache {
    capacity: usize,
    entries: Mutex<CacheEntries>,
}

#[derive(Default)]
struct CacheEntries {
    files: HashMap<String, Arc<ExportedFile>>,
    order: VecDeque<String>,
}

impl ExportCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(CacheEntries::default()),
        }
    }

    /// Returns the cached export for this table, encoding and storing it on a miss.
    pub fn get_or_export(&self, merged: &MergedTable) -> Result<Arc<ExportedFile>, MergerError> {
        if self.capacity == 0 {
            return Ok(Arc::new(export(merged)?));
        }

        let key = merged.digest();
        if let Some(file) = self.entries.lock().files.get(&key) {
            debug!(digest = %key, "Export cache hit");
            return Ok(Arc::clone(file));
        }

        // Encode outside the lock; concurrent misses for the same key both encode
        let file = Arc::new(export(merged)?);
        let mut entries = self.entries.lock();
        if !entries.files.contains_key(&key) {
            while entries.order.len() >= self.capacity {
                if let Some(oldest) = entries.order.pop_front() {
                    entries.files.remove(&oldest);
                }
            }
            entries.order.push_back(key.clone());
            entries.files.insert(key, Arc::clone(&file));
        }
        Ok(file)
    }

    /// Number of cached workbooks.
    pub fn len(&self) -> usize {
        self.entries.lock().files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::merge::merge_tables;
    use crate::database::table::Table;
    use crate::spreadsheet::cell::CellValue;
    use crate::spreadsheet::Spreadsheet;

    fn merged(values: &[f64]) -> MergedTable {
        let table = Table {
            name: "source".to_owned(),
            columns: vec!["Value".to_owned()],
            rows: values.iter().map(|value| vec![CellValue::Number(*value)]).collect(),
        };
        merge_tables(&[table]).unwrap()
    }

    #[test]
    fn export_names_file_and_sheet() {
        let file = export(&merged(&[1.0, 2.0])).unwrap();
        assert_eq!(file.file_name, "merged_data.xlsx");
        assert_eq!(file.content_type, XLSX_CONTENT_TYPE);
        let spreadsheet = Spreadsheet::open(&file.file_name, &file.bytes).unwrap();
        assert_eq!(spreadsheet.sheet_names(), vec!["Merged_Data"]);
    }

    #[test]
    fn export_is_deterministic() {
        assert_eq!(export(&merged(&[1.0, 2.0])).unwrap(), export(&merged(&[1.0, 2.0])).unwrap());
    }

    #[test]
    fn cache_returns_stored_file() {
        let cache = ExportCache::new(4);
        let first = cache.get_or_export(&merged(&[1.0])).unwrap();
        let second = cache.get_or_export(&merged(&[1.0])).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn cache_evicts_oldest_entry() {
        let cache = ExportCache::new(2);
        let first = cache.get_or_export(&merged(&[1.0])).unwrap();
        cache.get_or_export(&merged(&[2.0])).unwrap();
        cache.get_or_export(&merged(&[3.0])).unwrap();
        assert_eq!(cache.len(), 2);
        let again = cache.get_or_export(&merged(&[1.0])).unwrap();
        assert!(!Arc::ptr_eq(&first, &again));
        assert_eq!(first, again);
    }

    #[test]
    fn zero_capacity_disables_cache() {
        let cache = ExportCache::new(0);
        cache.get_or_export(&merged(&[1.0])).unwrap();
        assert!(cache.is_empty());
    }
}
