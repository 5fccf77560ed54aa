//! Office Open XML (.xlsx) writer for a single table.
//!
//! The package holds the minimum Excel needs to open a workbook on its own:
//! content types, package and workbook relationships, the workbook, a stylesheet
//! and one worksheet. Strings are stored inline so no shared string table is needed.

use crate::database::table::Table;
use crate::error::MergerError;
use crate::helpers::xml::escape_ooxml;
use crate::helpers::xml::XmlWriter;
use crate::helpers::zip::ZipHelper;
use crate::spreadsheet::cell::to_excel_serial;
use crate::spreadsheet::cell::CellValue;
use crate::spreadsheet::reference::index_to_reference;
use std::io::Cursor;
use std::io::Seek;
use std::io::Write;
use zip::ZipWriter;

// Package part paths
const PART_CONTENT_TYPES: &str = "[Content_Types].xml";
const PART_ROOT_RELATIONSHIPS: &str = "_rels/.rels";
const PART_WORKBOOK: &str = "xl/workbook.xml";
const PART_WORKBOOK_RELATIONSHIPS: &str = "xl/_rels/workbook.xml.rels";
const PART_STYLES: &str = "xl/styles.xml";
const PART_WORKSHEET: &str = "xl/worksheets/sheet1.xml";

// Namespaces
const NS_CONTENT_TYPES: &str = "http://schemas.openxmlformats.org/package/2006/content-types";
const NS_PACKAGE_RELATIONSHIPS: &str =
    "http://schemas.openxmlformats.org/package/2006/relationships";
const NS_SPREADSHEET: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const NS_RELATIONSHIPS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

// Relationship types
const REL_OFFICE_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
const REL_WORKSHEET: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet";
const REL_STYLES: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";

// Content types
const TYPE_RELATIONSHIPS: &str = "application/vnd.openxmlformats-package.relationships+xml";
const TYPE_XML: &str = "application/xml";
const TYPE_WORKBOOK: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml";
const TYPE_WORKSHEET: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml";
const TYPE_STYLES: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml";

// Cell style indexes into cellXfs
const STYLE_DATETIME: &str = "1"; // Built-in number format 22 (m/d/yy h:mm)
const STYLE_HEADER: &str = "2"; // Bold font

/// cellXfs entries in style index order: number format, font, and the apply flag
const CELL_FORMATS: [(&str, &str, Option<&str>); 3] = [
    ("0", "0", None),
    ("22", "0", Some("applyNumberFormat")),
    ("0", "1", Some("applyFont")),
];

/// Writes the table as a single-sheet .xlsx workbook.
///
/// The header row holds the column names; no index column is written. Empty cells
/// are omitted, non-finite numbers are written as empty cells.
///
/// # Arguments
/// * `table` - Table to serialize
/// * `sheet_name` - Name of the only worksheet
///
/// # Returns
/// The complete workbook bytes
pub fn write_xlsx(table: &Table, sheet_name: &str) -> Result<Vec<u8>, MergerError> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    write_content_types(&mut zip)?;
    write_root_relationships(&mut zip)?;
    write_workbook(&mut zip, sheet_name)?;
    write_workbook_relationships(&mut zip)?;
    write_styles(&mut zip)?;
    write_worksheet(&mut zip, table)?;
    Ok(zip.finish()?.into_inner())
}

/// Writes `[Content_Types].xml`
fn write_content_types<W: Write + Seek>(zip: &mut ZipWriter<W>) -> Result<(), MergerError> {
    let mut xml = zip.xml_writer(PART_CONTENT_TYPES)?;
    xml.start("Types", &[("xmlns", NS_CONTENT_TYPES)])?;
    xml.empty("Default", &[("Extension", "rels"), ("ContentType", TYPE_RELATIONSHIPS)])?;
    xml.empty("Default", &[("Extension", "xml"), ("ContentType", TYPE_XML)])?;
    for (part, content_type) in [
        (PART_WORKBOOK, TYPE_WORKBOOK),
        (PART_WORKSHEET, TYPE_WORKSHEET),
        (PART_STYLES, TYPE_STYLES),
    ] {
        let part_name = format!("/{part}");
        xml.empty("Override", &[("PartName", &part_name), ("ContentType", content_type)])?;
    }
    xml.end("Types")
}

/// Writes `_rels/.rels` pointing at the workbook
fn write_root_relationships<W: Write + Seek>(zip: &mut ZipWriter<W>) -> Result<(), MergerError> {
    let mut xml = zip.xml_writer(PART_ROOT_RELATIONSHIPS)?;
    xml.start("Relationships", &[("xmlns", NS_PACKAGE_RELATIONSHIPS)])?;
    let document = [("Id", "rId1"), ("Type", REL_OFFICE_DOCUMENT), ("Target", PART_WORKBOOK)];
    xml.empty("Relationship", &document)?;
    xml.end("Relationships")
}

/// Writes `xl/workbook.xml` with the single sheet entry
fn write_workbook<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    sheet_name: &str,
) -> Result<(), MergerError> {
    let mut xml = zip.xml_writer(PART_WORKBOOK)?;
    xml.start("workbook", &[("xmlns", NS_SPREADSHEET), ("xmlns:r", NS_RELATIONSHIPS)])?;
    xml.start("sheets", &[])?;
    xml.empty("sheet", &[("name", sheet_name), ("sheetId", "1"), ("r:id", "rId1")])?;
    xml.end("sheets")?;
    xml.end("workbook")
}

/// Writes `xl/_rels/workbook.xml.rels` for the worksheet and stylesheet
fn write_workbook_relationships<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
) -> Result<(), MergerError> {
    let mut xml = zip.xml_writer(PART_WORKBOOK_RELATIONSHIPS)?;
    xml.start("Relationships", &[("xmlns", NS_PACKAGE_RELATIONSHIPS)])?;
    for (id, kind, target) in [
        ("rId1", REL_WORKSHEET, "worksheets/sheet1.xml"),
        ("rId2", REL_STYLES, "styles.xml"),
    ] {
        xml.empty("Relationship", &[("Id", id), ("Type", kind), ("Target", target)])?;
    }
    xml.end("Relationships")
}

/// Writes `xl/styles.xml`: default style, date-time style and bold header style
fn write_styles<W: Write + Seek>(zip: &mut ZipWriter<W>) -> Result<(), MergerError> {
    let mut xml = zip.xml_writer(PART_STYLES)?;
    xml.start("styleSheet", &[("xmlns", NS_SPREADSHEET)])?;

    xml.start("fonts", &[("count", "2")])?;
    for bold in [false, true] {
        xml.start("font", &[])?;
        if bold {
            xml.empty("b", &[])?;
        }
        xml.empty("sz", &[("val", "11")])?;
        xml.empty("name", &[("val", "Calibri")])?;
        xml.empty("family", &[("val", "2")])?;
        xml.end("font")?;
    }
    xml.end("fonts")?;

    xml.start("fills", &[("count", "2")])?;
    for pattern in ["none", "gray125"] {
        xml.start("fill", &[])?;
        xml.empty("patternFill", &[("patternType", pattern)])?;
        xml.end("fill")?;
    }
    xml.end("fills")?;

    xml.start("borders", &[("count", "1")])?;
    xml.start("border", &[])?;
    for side in ["left", "right", "top", "bottom", "diagonal"] {
        xml.empty(side, &[])?;
    }
    xml.end("border")?;
    xml.end("borders")?;

    xml.start("cellStyleXfs", &[("count", "1")])?;
    let base = [("numFmtId", "0"), ("fontId", "0"), ("fillId", "0"), ("borderId", "0")];
    xml.empty("xf", &base)?;
    xml.end("cellStyleXfs")?;

    let count = CELL_FORMATS.len().to_string();
    xml.start("cellXfs", &[("count", &count)])?;
    for (number_format, font, apply) in CELL_FORMATS {
        let mut attributes = vec![
            ("numFmtId", number_format),
            ("fontId", font),
            ("fillId", "0"),
            ("borderId", "0"),
            ("xfId", "0"),
        ];
        if let Some(flag) = apply {
            attributes.push((flag, "1"));
        }
        xml.empty("xf", &attributes)?;
    }
    xml.end("cellXfs")?;

    xml.start("cellStyles", &[("count", "1")])?;
    xml.empty("cellStyle", &[("name", "Normal"), ("xfId", "0"), ("builtinId", "0")])?;
    xml.end("cellStyles")?;

    xml.end("styleSheet")
}

/// Writes `xl/worksheets/sheet1.xml`: header row followed by the data rows
fn write_worksheet<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    table: &Table,
) -> Result<(), MergerError> {
    let mut xml = zip.xml_writer(PART_WORKSHEET)?;
    xml.start("worksheet", &[("xmlns", NS_SPREADSHEET), ("xmlns:r", NS_RELATIONSHIPS)])?;
    if !table.columns.is_empty() {
        let dimension = format!(
            "A1:{}",
            index_to_reference(table.rows.len(), table.columns.len() - 1)
        );
        xml.empty("dimension", &[("ref", &dimension)])?;
    }

    xml.start("sheetData", &[])?;
    if !table.columns.is_empty() {
        xml.start("row", &[("r", "1")])?;
        for (col, name) in table.columns.iter().enumerate() {
            write_string_cell(&mut xml, 0, col, name, Some(STYLE_HEADER))?;
        }
        xml.end("row")?;
    }
    for (index, row) in table.rows.iter().enumerate() {
        let row_number = (index + 2).to_string();
        xml.start("row", &[("r", &row_number)])?;
        for (col, value) in row.iter().enumerate() {
            write_cell(&mut xml, index + 1, col, value)?;
        }
        xml.end("row")?;
    }
    xml.end("sheetData")?;
    xml.end("worksheet")
}

/// Writes one data cell; empty values and non-finite numbers produce nothing
fn write_cell<W: Write>(
    xml: &mut XmlWriter<W>,
    row: usize,
    col: usize,
    value: &CellValue,
) -> Result<(), MergerError> {
    let reference = index_to_reference(row, col);
    match value {
        CellValue::Empty => Ok(()),
        CellValue::Number(number) if !number.is_finite() => Ok(()),
        CellValue::Number(number) => {
            xml.start("c", &[("r", &reference)])?;
            xml.element("v", &[], &number.to_string())?;
            xml.end("c")
        }
        CellValue::Bool(flag) => {
            xml.start("c", &[("r", &reference), ("t", "b")])?;
            xml.element("v", &[], if *flag { "1" } else { "0" })?;
            xml.end("c")
        }
        CellValue::DateTime(datetime) => {
            xml.start("c", &[("r", &reference), ("s", STYLE_DATETIME)])?;
            xml.element("v", &[], &to_excel_serial(datetime).to_string())?;
            xml.end("c")
        }
        CellValue::Text(text) => write_string_cell(xml, row, col, text, None),
    }
}

/// Writes an inline string cell
fn write_string_cell<W: Write>(
    xml: &mut XmlWriter<W>,
    row: usize,
    col: usize,
    text: &str,
    style: Option<&str>,
) -> Result<(), MergerError> {
    let reference = index_to_reference(row, col);
    let mut attributes = vec![("r", reference.as_str()), ("t", "inlineStr")];
    if let Some(style) = style {
        attributes.push(("s", style));
    }
    xml.start("c", &attributes)?;
    xml.start("is", &[])?;
    xml.element("t", &[("xml:space", "preserve")], &escape_ooxml(text))?;
    xml.end("is")?;
    xml.end("c")
}
