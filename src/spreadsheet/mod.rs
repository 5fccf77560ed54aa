//! # Spreadsheet Processing Module
//!
//! Reads uploaded Excel workbooks (.xlsx and legacy .xls) from memory into
//! [`Table`]s and writes merged tables back out as .xlsx workbooks.
//! The container format is detected from the file content, the same way for
//! every upload regardless of its name.
use crate::database::table::Row;
use crate::database::table::Table;
use crate::spreadsheet::cell::CellValue;
use calamine::Data;
use calamine::Reader;
use calamine::Xls;
use calamine::XlsError;
use calamine::Xlsx;
use calamine::XlsxError;
use std::ffi::OsStr;
use std::io::Cursor;
use std::path::Path;
use thiserror::Error;

pub mod cell;
pub(crate) mod reference;
pub mod writer;

/// Leading bytes of a ZIP archive (Office Open XML)
const ZIP_SIGNATURE: &[u8] = b"PK\x03\x04";
/// Leading bytes of an OLE compound file (BIFF8)
const OLE_SIGNATURE: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0];
/// File extensions accepted for upload
pub const SUPPORTED_EXTENSIONS: [&str; 2] = ["xls", "xlsx"];

/// Errors raised while reading a single uploaded workbook.
#[derive(Error, Debug)]
pub enum SpreadsheetError {
    /// Error in Excel 2007+ format (.xlsx)
    #[error("Invalid xlsx file format: {0}")]
    InvalidXlsxFileFormat(#[from] XlsxError),

    /// Error in legacy Excel format (.xls)
    #[error("Invalid xls file format: {0}")]
    InvalidXlsFileFormat(#[from] XlsError),

    /// File name does not end with a supported extension
    #[error("Unsupported file extension for '{0}', expected .xls or .xlsx")]
    UnsupportedExtension(String),

    /// Content is neither a ZIP archive nor an OLE compound file
    #[error("Unrecognized spreadsheet format for '{0}'")]
    UnrecognizedFormat(String),

    /// Workbook contains no worksheet
    #[error("Sheet not found or spreadsheet is empty")]
    SheetNotFound,
}

/// Wrapper over the calamine readers for the supported formats.
pub enum Spreadsheet<'a> {
    /// Excel 2007+ format reader (.xlsx, .xlsm)
    Xlsx(Xlsx<Cursor<&'a [u8]>>),
    /// Legacy Excel format reader (.xls)
    Xls(Xls<Cursor<&'a [u8]>>),
}

impl<'a> Spreadsheet<'a> {
    /// Opens an in-memory workbook.
    ///
    /// # Arguments
    /// * `name` - File name of the upload, used for extension checks and messages
    /// * `content` - Raw file bytes
    ///
    /// # Errors
    /// Returns an error if the extension is not .xls/.xlsx, the content signature is
    /// unknown, or the workbook structure cannot be parsed.
    pub fn open(name: &str, content: &'a [u8]) -> Result<Spreadsheet<'a>, SpreadsheetError> {
        if !has_supported_extension(name) {
            Err(SpreadsheetError::UnsupportedExtension(name.to_owned()))?;
        }
        if content.starts_with(ZIP_SIGNATURE) {
            Ok(Self::Xlsx(Xlsx::new(Cursor::new(content))?))
        } else if content.starts_with(OLE_SIGNATURE) {
            Ok(Self::Xls(Xls::new(Cursor::new(content))?))
        } else {
            Err(SpreadsheetError::UnrecognizedFormat(name.to_owned()))
        }
    }

    /// Returns the names of all sheets in the workbook.
    pub fn sheet_names(&self) -> Vec<String> {
        match self {
            Self::Xlsx(xlsx) => xlsx.sheet_names(),
            Self::Xls(xls) => xls.sheet_names(),
        }
    }

    /// Reads the first sheet into a table.
    ///
    /// The first row of the used range is the header; every later row is data.
    /// A sheet without any used cell gives a table with no columns and no rows.
    pub fn read_first_sheet(&mut self, table_name: &str) -> Result<Table, SpreadsheetError> {
        // Only xlsx text carries `_xHHHH_` escapes
        let (range, convert): (_, fn(&Data) -> CellValue) = match self {
            Self::Xlsx(xlsx) => (
                xlsx.worksheet_range_at(0).ok_or(SpreadsheetError::SheetNotFound)??,
                CellValue::from_ooxml,
            ),
            Self::Xls(xls) => (
                xls.worksheet_range_at(0).ok_or(SpreadsheetError::SheetNotFound)??,
                |data: &Data| CellValue::from(data),
            ),
        };

        let mut rows = range.rows();
        let header: Row = match rows.next() {
            Some(cells) => cells.iter().map(convert).collect(),
            None => return Ok(Table::new(table_name)),
        };
        let data = rows.map(|cells: &[Data]| cells.iter().map(convert).collect::<Row>());
        Ok(Table::from_rows(table_name, &header, data))
    }
}

/// Checks the file name against [`SUPPORTED_EXTENSIONS`], ignoring case.
pub fn has_supported_extension(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(OsStr::to_str)
        .map(|extension| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| extension.eq_ignore_ascii_case(supported))
        })
        .unwrap_or(false)
}

/// Parses one uploaded workbook into a table named after the file.
pub fn read_table(name: &str, content: &[u8]) -> Result<Table, SpreadsheetError> {
    let mut spreadsheet = Spreadsheet::open(name, content)?;
    spreadsheet.read_first_sheet(name)
}
