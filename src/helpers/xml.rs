//! XML writing utilities for SpreadsheetML parts
//! Provides an XML writer wrapper with element and text helpers

use crate::error::MergerError;
use quick_xml::events::BytesDecl;
use quick_xml::events::BytesEnd;
use quick_xml::events::BytesStart;
use quick_xml::events::BytesText;
use quick_xml::events::Event;
use quick_xml::Writer;
use std::borrow::Cow;
use std::io::Write;

/// XML writer wrapper emitting compact, escaped SpreadsheetML
pub(crate) struct XmlWriter<W: Write> {
    writer: Writer<W>,
}

impl<W: Write> XmlWriter<W> {
    /// Creates a new XML writer and emits the standalone UTF-8 declaration
    pub(crate) fn new(inner: W) -> Result<XmlWriter<W>, MergerError> {
        let mut writer = Writer::new(inner);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
        Ok(XmlWriter { writer })
    }

    /// Writes a start tag with the given attributes
    pub(crate) fn start(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<(), MergerError> {
        let element = BytesStart::new(name).with_attributes(attributes.iter().copied());
        self.writer.write_event(Event::Start(element))?;
        Ok(())
    }

    /// Writes the matching end tag
    pub(crate) fn end(&mut self, name: &str) -> Result<(), MergerError> {
        self.writer.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }

    /// Writes a self-closing element with the given attributes
    pub(crate) fn empty(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<(), MergerError> {
        let element = BytesStart::new(name).with_attributes(attributes.iter().copied());
        self.writer.write_event(Event::Empty(element))?;
        Ok(())
    }

    /// Writes escaped text content
    pub(crate) fn text(&mut self, content: &str) -> Result<(), MergerError> {
        self.writer.write_event(Event::Text(BytesText::new(content)))?;
        Ok(())
    }

    /// Writes `<name attributes>text</name>`
    pub(crate) fn element(&mut self, name: &str, attributes: &[(&str, &str)], content: &str) -> Result<(), MergerError> {
        self.start(name, attributes)?;
        self.text(content)?;
        self.end(name)
    }
}

/// Replaces characters that XML 1.0 cannot carry with the `_xHHHH_` escapes Excel uses.
/// Text that already looks like such an escape gets its underscore escaped.
pub(crate) fn escape_ooxml(value: &str) -> Cow<'_, str> {
    let chars: Vec<char> = value.chars().collect();
    if !chars.iter().enumerate().any(|(index, c)| is_restricted(*c) || looks_escaped(&chars[index..])) {
        return Cow::Borrowed(value);
    }
    let mut escaped = String::with_capacity(value.len() + 8);
    for (index, character) in chars.iter().enumerate() {
        if is_restricted(*character) {
            escaped.push_str(&format!("_x{:04X}_", *character as u32));
        } else if looks_escaped(&chars[index..]) {
            escaped.push_str("_x005F_");
        } else {
            escaped.push(*character);
        }
    }
    Cow::Owned(escaped)
}

/// Decodes the `_xHHHH_` escapes written by Excel and by [`escape_ooxml`].
/// Escapes naming an invalid code point stay as they are.
pub(crate) fn unescape_ooxml(value: &str) -> Cow<'_, str> {
    if !value.contains("_x") {
        return Cow::Borrowed(value);
    }
    let chars: Vec<char> = value.chars().collect();
    let mut decoded = String::with_capacity(value.len());
    let mut index = 0;
    while index < chars.len() {
        if looks_escaped(&chars[index..]) {
            let digits: String = chars[index + 2..index + 6].iter().collect();
            let code = u32::from_str_radix(&digits, 16).ok();
            if let Some(character) = code.and_then(char::from_u32) {
                decoded.push(character);
                index += 7;
                continue;
            }
        }
        decoded.push(chars[index]);
        index += 1;
    }
    Cow::Owned(decoded)
}

/// Control characters not allowed in XML 1.0 text, except tab, line feed and carriage return
fn is_restricted(c: char) -> bool {
    matches!(c, '\u{0}'..='\u{8}' | '\u{B}' | '\u{C}' | '\u{E}'..='\u{1F}' | '\u{FFFE}' | '\u{FFFF}')
}

/// Matches `_xHHHH_` at the start of the slice
fn looks_escaped(chars: &[char]) -> bool {
    chars.len() >= 7
        && chars[0] == '_'
        && chars[1] == 'x'
        && chars[2..6].iter().all(char::is_ascii_hexdigit)
        && chars[6] == '_'
}
