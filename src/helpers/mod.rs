//! Low-level writers shared by the workbook encoder.

pub(crate) mod xml;
pub(crate) mod zip;
