//! # XML Reader
//!
//! Pull-style reader over a pre-tokenised XML document. Cells call
//! `read_element(tag)` to advance to their element and then query its
//! attributes; nested lists are closed with `read_end_element(tag)`.
//!
//! ## Table of Contents
//! 1. Token model
//! 2. XmlReader - navigation and attribute access
//! 3. Pending side files and object-name mapping

use std::collections::HashMap;

use quick_xml::events::{BytesStart, Event};
use tracing::trace;

use crate::error::{Result, StreamError};

// ============================================================================
// Tokens
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    Start,
    Empty,
    End,
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    name: String,
    attributes: Vec<(String, String)>,
}

impl Token {
    fn open(kind: TokenKind, element: &BytesStart<'_>) -> Result<Self> {
        let name = String::from_utf8_lossy(element.name().as_ref()).into_owned();
        let mut attributes = Vec::new();
        for attr in element.attributes() {
            let attr = attr.map_err(|e| StreamError::Xml(e.to_string()))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|e| StreamError::Xml(e.to_string()))?
                .into_owned();
            attributes.push((key, value));
        }
        Ok(Self { kind, name, attributes })
    }
}

/// A side file announced by a cell during restore
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFile {
    pub file_name: String,
    pub owner: String,
}

// ============================================================================
// XmlReader
// ============================================================================

/// Reader positioned on one element at a time
#[derive(Debug, Clone, Default)]
pub struct XmlReader {
    tokens: Vec<Token>,
    next: usize,
    current: Option<usize>,
    files: Vec<PendingFile>,
    name_mapping: HashMap<String, String>,
}

impl XmlReader {
    /// Parse a whole document
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = quick_xml::Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut tokens = Vec::new();
        loop {
            match reader
                .read_event()
                .map_err(|e| StreamError::Xml(e.to_string()))?
            {
                Event::Start(e) => tokens.push(Token::open(TokenKind::Start, &e)?),
                Event::Empty(e) => tokens.push(Token::open(TokenKind::Empty, &e)?),
                Event::End(e) => tokens.push(Token {
                    kind: TokenKind::End,
                    name: String::from_utf8_lossy(e.name().as_ref()).into_owned(),
                    attributes: Vec::new(),
                }),
                Event::Eof => break,
                _ => {}
            }
        }

        Ok(Self {
            tokens,
            ..Self::default()
        })
    }

    /// Advance to the next opening element named `tag`, skipping anything before it
    pub fn read_element(&mut self, tag: &str) -> Result<()> {
        let found = self.tokens[self.next..]
            .iter()
            .position(|t| t.kind != TokenKind::End && t.name == tag)
            .map(|offset| self.next + offset);

        match found {
            Some(index) => {
                trace!("read_element <{}> at token {}", tag, index);
                self.current = Some(index);
                self.next = index + 1;
                Ok(())
            }
            None => Err(StreamError::UnexpectedEof(tag.to_string())),
        }
    }

    /// Advance past the closing tag matching `tag`.
    ///
    /// Nested elements with the same name are balanced. If the current element
    /// is a self-closing `<tag/>` there is nothing to consume.
    pub fn read_end_element(&mut self, tag: &str) -> Result<()> {
        if let Some(index) = self.current {
            let token = &self.tokens[index];
            if token.kind == TokenKind::Empty && token.name == tag && self.next == index + 1 {
                return Ok(());
            }
        }

        let mut depth = 0usize;
        for index in self.next..self.tokens.len() {
            let token = &self.tokens[index];
            if token.name != tag {
                continue;
            }
            match token.kind {
                TokenKind::Start => depth += 1,
                TokenKind::Empty => {}
                TokenKind::End if depth == 0 => {
                    self.next = index + 1;
                    return Ok(());
                }
                TokenKind::End => depth -= 1,
            }
        }
        Err(StreamError::UnexpectedEof(format!("/{}", tag)))
    }

    /// Name of the element the reader is positioned on
    pub fn element_name(&self) -> Option<&str> {
        self.current.map(|i| self.tokens[i].name.as_str())
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.current_token()
            .map(|t| t.attributes.iter().any(|(k, _)| k == name))
            .unwrap_or(false)
    }

    pub fn get_attribute(&self, name: &str) -> Result<&str> {
        let token = self
            .current_token()
            .ok_or_else(|| StreamError::NoCurrentElement(name.to_string()))?;
        token
            .attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
            .ok_or_else(|| StreamError::MissingAttribute {
                element: token.name.clone(),
                attribute: name.to_string(),
            })
    }

    pub fn get_attribute_as_integer(&self, name: &str) -> Result<i64> {
        self.parse_attribute(name)
    }

    pub fn get_attribute_as_unsigned(&self, name: &str) -> Result<u64> {
        self.parse_attribute(name)
    }

    pub fn get_attribute_as_float(&self, name: &str) -> Result<f64> {
        self.parse_attribute(name)
    }

    fn parse_attribute<T: std::str::FromStr>(&self, name: &str) -> Result<T> {
        let raw = self.get_attribute(name)?;
        raw.trim().parse().map_err(|_| StreamError::InvalidAttribute {
            element: self.element_name().unwrap_or_default().to_string(),
            attribute: name.to_string(),
            value: raw.to_string(),
        })
    }

    fn current_token(&self) -> Option<&Token> {
        self.current.map(|i| &self.tokens[i])
    }

    // ========================================================================
    // Side Files
    // ========================================================================

    /// Request that `file_name` be fed to `owner` once the XML pass is done
    pub fn add_file(&mut self, file_name: &str, owner: &str) {
        trace!("Pending side file '{}' for '{}'", file_name, owner);
        self.files.push(PendingFile {
            file_name: file_name.to_string(),
            owner: owner.to_string(),
        });
    }

    pub fn files(&self) -> &[PendingFile] {
        &self.files
    }

    pub fn take_files(&mut self) -> Vec<PendingFile> {
        std::mem::take(&mut self.files)
    }

    // ========================================================================
    // Object Name Mapping
    // ========================================================================

    /// Install the mapping from exported object names to names in this document
    pub fn set_name_mapping(&mut self, mapping: HashMap<String, String>) {
        self.name_mapping = mapping;
    }

    /// Map an exported object name; unknown names are returned unchanged
    pub fn get_name<'a>(&'a self, name: &'a str) -> &'a str {
        self.name_mapping.get(name).map(String::as_str).unwrap_or(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"
        <Properties Count="2">
            <Property name="Count" type="App::PropertyInteger">
                <Integer value="-12"/>
            </Property>
            <Property name="Items" type="App::PropertyIntegerList">
                <IntegerList count="2">
                    <I v="1"/>
                    <I v="2"/>
                </IntegerList>
            </Property>
        </Properties>
    "#;

    #[test]
    fn test_read_elements_and_attributes() {
        let mut reader = XmlReader::parse(DOC).unwrap();
        reader.read_element("Properties").unwrap();
        assert_eq!(reader.get_attribute_as_unsigned("Count").unwrap(), 2);

        reader.read_element("Integer").unwrap();
        assert_eq!(reader.get_attribute_as_integer("value").unwrap(), -12);
        assert!(!reader.has_attribute("CustomEnum"));

        reader.read_element("IntegerList").unwrap();
        reader.read_element("I").unwrap();
        reader.read_element("I").unwrap();
        assert_eq!(reader.get_attribute("v").unwrap(), "2");
        reader.read_end_element("IntegerList").unwrap();
        reader.read_end_element("Property").unwrap();
        reader.read_end_element("Properties").unwrap();
    }

    #[test]
    fn test_missing_element_is_eof() {
        let mut reader = XmlReader::parse("<Float value=\"1\"/>").unwrap();
        assert!(matches!(
            reader.read_element("Integer"),
            Err(StreamError::UnexpectedEof(_))
        ));
    }

    #[test]
    fn test_bad_attribute_value() {
        let mut reader = XmlReader::parse("<Integer value=\"abc\"/>").unwrap();
        reader.read_element("Integer").unwrap();
        assert!(matches!(
            reader.get_attribute_as_integer("value"),
            Err(StreamError::InvalidAttribute { .. })
        ));
        assert!(matches!(
            reader.get_attribute("missing"),
            Err(StreamError::MissingAttribute { .. })
        ));
    }

    #[test]
    fn test_self_closing_list_needs_no_end_tag() {
        let mut reader = XmlReader::parse("<Map count=\"0\"/><Next/>").unwrap();
        reader.read_element("Map").unwrap();
        reader.read_end_element("Map").unwrap();
        reader.read_element("Next").unwrap();
    }

    #[test]
    fn test_end_element_balances_nesting() {
        let xml = "<P><P><A/></P><B/></P><C/>";
        let mut reader = XmlReader::parse(xml).unwrap();
        reader.read_element("P").unwrap();
        reader.read_end_element("P").unwrap();
        reader.read_element("C").unwrap();
    }

    #[test]
    fn test_unescapes_numeric_references() {
        let mut reader = XmlReader::parse("<String value=\"a&#10;b &amp; c\"/>").unwrap();
        reader.read_element("String").unwrap();
        assert_eq!(reader.get_attribute("value").unwrap(), "a\nb & c");
    }

    #[test]
    fn test_name_mapping() {
        let mut reader = XmlReader::default();
        reader.set_name_mapping(HashMap::from([("Box".to_string(), "Box001".to_string())]));
        assert_eq!(reader.get_name("Box"), "Box001");
        assert_eq!(reader.get_name("Cylinder"), "Cylinder");
    }
}
