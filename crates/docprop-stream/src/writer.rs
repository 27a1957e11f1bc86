//! # XML Writer
//!
//! Indented XML text writer used by property cells to persist themselves.
//!
//! ## Table of Contents
//! 1. Indent - Display helper for the current indentation
//! 2. FileEntry - Side file registered during a save
//! 3. Writer - Text buffer, indentation and side-file bookkeeping
//! 4. Attribute encoding

use std::borrow::Cow;
use std::fmt;

use tracing::debug;

use crate::config::StreamConfig;

// ============================================================================
// Indent
// ============================================================================

/// Current indentation, rendered as spaces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Indent(usize);

impl fmt::Display for Indent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:width$}", "", width = self.0)
    }
}

// ============================================================================
// File Entry
// ============================================================================

/// A binary side file requested by a cell while saving
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Unique name inside the archive
    pub file_name: String,
    /// Name of the cell whose `save_doc_file` produces the content
    pub owner: String,
}

// ============================================================================
// Writer
// ============================================================================

/// XML document writer
#[derive(Debug, Clone)]
pub struct Writer {
    buffer: String,
    level: usize,
    indent_width: usize,
    force_xml: bool,
    files: Vec<FileEntry>,
}

impl Default for Writer {
    fn default() -> Self {
        Self::with_config(&StreamConfig::default())
    }
}

impl Writer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: &StreamConfig) -> Self {
        Self {
            buffer: String::new(),
            level: 0,
            indent_width: config.indent_width,
            force_xml: config.force_xml,
            files: Vec::new(),
        }
    }

    /// Indentation for the current nesting level
    pub fn ind(&self) -> Indent {
        Indent(self.level * self.indent_width)
    }

    pub fn inc_ind(&mut self) {
        self.level += 1;
    }

    pub fn dec_ind(&mut self) {
        self.level = self.level.saturating_sub(1);
    }

    /// Raw access to the output text
    pub fn stream(&mut self) -> &mut String {
        &mut self.buffer
    }

    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    pub fn into_string(self) -> String {
        self.buffer
    }

    pub fn is_force_xml(&self) -> bool {
        self.force_xml
    }

    pub fn set_force_xml(&mut self, force_xml: bool) {
        self.force_xml = force_xml;
    }

    /// Register a side file and return the unique name it will be stored under
    pub fn add_file(&mut self, name: &str, owner: &str) -> String {
        let base = if name.is_empty() { "PropertyFile" } else { name };
        let mut file_name = base.to_string();
        let mut counter = 1;
        while self.files.iter().any(|f| f.file_name == file_name) {
            file_name = format!("{}{}", base, counter);
            counter += 1;
        }

        debug!("Registered side file '{}' for '{}'", file_name, owner);
        self.files.push(FileEntry {
            file_name: file_name.clone(),
            owner: owner.to_string(),
        });
        file_name
    }

    /// Side files registered so far, in registration order
    pub fn files(&self) -> &[FileEntry] {
        &self.files
    }

    /// `<tag a="..."/>` on its own line
    pub fn empty_element(&mut self, tag: &str, attributes: &[(&str, &str)]) {
        self.open_tag(tag, attributes);
        self.buffer.push_str("/>\n");
    }

    /// `<tag a="...">` on its own line, then indent
    pub fn start_element(&mut self, tag: &str, attributes: &[(&str, &str)]) {
        self.open_tag(tag, attributes);
        self.buffer.push_str(">\n");
        self.inc_ind();
    }

    /// Unindent, then `</tag>` on its own line
    pub fn end_element(&mut self, tag: &str) {
        self.dec_ind();
        let line = format!("{}</{}>\n", self.ind(), tag);
        self.buffer.push_str(&line);
    }

    fn open_tag(&mut self, tag: &str, attributes: &[(&str, &str)]) {
        let mut line = format!("{}<{}", self.ind(), tag);
        for (key, value) in attributes {
            line.push_str(&format!(" {}=\"{}\"", key, encode_attribute(value)));
        }
        self.buffer.push_str(&line);
    }
}

// ============================================================================
// Attribute Encoding
// ============================================================================

/// Escape a value for use inside a double-quoted XML attribute.
///
/// Markup characters become entities. Line breaks and tabs become numeric
/// references so they survive attribute-value normalisation.
pub fn encode_attribute(value: &str) -> Cow<'_, str> {
    let escaped = quick_xml::escape::escape(value);
    if !escaped.contains(['\n', '\r', '\t']) {
        return escaped;
    }

    let mut out = String::with_capacity(escaped.len() + 8);
    for c in escaped.chars() {
        match c {
            '\n' => out.push_str("&#10;"),
            '\r' => out.push_str("&#13;"),
            '\t' => out.push_str("&#9;"),
            other => out.push(other),
        }
    }
    Cow::Owned(out)
}
