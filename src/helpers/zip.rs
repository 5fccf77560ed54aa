//! ZIP archive helper utilities for writing Excel (.xlsx) packages
//! Every part is written with the same options so identical input gives identical bytes

use crate::error::MergerError;
use crate::helpers::xml::XmlWriter;
use std::io::Seek;
use std::io::Write;
use zip::write::SimpleFileOptions;
use zip::CompressionMethod;
use zip::DateTime;
use zip::ZipWriter;

/// Helper trait for ZIP archive writing with XML part creation
pub(crate) trait ZipHelper<WS: Write + Seek> {
    /// Starts a deflated part with a fixed timestamp
    fn start_part(&mut self, name: &str) -> Result<(), MergerError>;

    /// Starts a part and returns an XML writer positioned after the declaration
    fn xml_writer(&mut self, name: &str) -> Result<XmlWriter<&mut ZipWriter<WS>>, MergerError>;
}

impl<WS: Write + Seek> ZipHelper<WS> for ZipWriter<WS> {
    /// Starts a deflated part with a fixed timestamp
    fn start_part(&mut self, name: &str) -> Result<(), MergerError> {
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(DateTime::default())
            .unix_permissions(0o644);
        self.start_file(name, options)?;
        Ok(())
    }

    /// Starts a part and returns an XML writer positioned after the declaration
    fn xml_writer(&mut self, name: &str) -> Result<XmlWriter<&mut ZipWriter<WS>>, MergerError> {
        self.start_part(name)?;
        XmlWriter::new(self)
    }
}
