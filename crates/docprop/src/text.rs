//! # Text Cells
//!
//! String (also font names and object labels), filesystem path and UUID
//! cells.
//!
//! ## Table of Contents
//! 1. PropertyString - plain strings, fonts and labels
//! 2. PropertyPath
//! 3. PropertyUuid

use std::any::Any;
use std::path::{Path, PathBuf};

use docprop_stream::{Writer, XmlReader};
use tracing::debug;
use uuid::Uuid;

use crate::dynamic::DynValue;
use crate::error::{bad_cast, type_error, PropertyError, Result};
use crate::property::{
    paste_source, path_float, path_int, path_str, Property, PropertyCore, PropertyKind,
};

// ============================================================================
// PropertyString
// ============================================================================

/// Whether a string cell is an object's label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StringRole {
    #[default]
    Plain,
    /// Changes go through the container's proposed-label-change hook
    Label,
}

/// String cell
#[derive(Debug, Clone)]
pub struct PropertyString {
    core: PropertyCore,
    value: String,
    kind: PropertyKind,
    role: StringRole,
}

pub type PropertyFont = PropertyString;

impl PropertyString {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            core: PropertyCore::new(name),
            value: String::new(),
            kind: PropertyKind::String,
            role: StringRole::Plain,
        }
    }

    /// String cell persisted as a font name
    pub fn font(name: impl Into<String>) -> Self {
        Self {
            kind: PropertyKind::Font,
            ..Self::new(name)
        }
    }

    /// The owning object's label
    pub fn label(name: impl Into<String>) -> Self {
        Self {
            role: StringRole::Label,
            ..Self::new(name)
        }
    }

    pub fn role(&self) -> StringRole {
        self.role
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Assign a new value. Equal values are a no-op without notification.
    ///
    /// For labels the container may rewrite the text and return edits of
    /// related cells; those run after the label changes, inside a
    /// `Change <object>.Label` transaction when none is active.
    pub fn set_value(&mut self, value: impl Into<String>) -> Result<()> {
        let mut value = value.into();
        if value == self.value {
            return Ok(());
        }
        if self.role != StringRole::Label {
            self.assign(value);
            return Ok(());
        }

        let container = self.core.container().cloned();
        let changes = match &container {
            Some(container) => container.propose_label_change(&mut value),
            None => Vec::new(),
        };
        if value == self.value {
            return Ok(());
        }

        let mut opened = None;
        if !changes.is_empty() {
            if let Some(container) = &container {
                if let Some(transactions) = container.transactions() {
                    if !transactions.has_active() {
                        let title = format!("Change {}.Label", container.object_name());
                        debug!("{} cascades to {} related edits", title, changes.len());
                        transactions.open(&title);
                        opened = Some(transactions);
                    }
                }
            }
        }

        self.assign(value);
        let result = changes.into_iter().try_for_each(|change| change());

        if let Some(transactions) = opened {
            transactions.close();
        }
        result
    }

    fn assign(&mut self, value: String) {
        self.core.about_to_set_value();
        self.value = value;
        self.core.has_set_value();
    }
}

impl Property for PropertyString {
    fn kind(&self) -> PropertyKind {
        self.kind
    }

    fn core(&self) -> &PropertyCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut PropertyCore {
        &mut self.core
    }

    fn to_dynamic(&self) -> DynValue {
        DynValue::Str(self.value.clone())
    }

    fn from_dynamic(&mut self, value: &DynValue) -> Result<()> {
        match value {
            DynValue::Str(s) => self.set_value(s.as_str()),
            DynValue::Bytes(b) => self.set_value(String::from_utf8(b.clone())?),
            other => Err(type_error("type must be str", other)),
        }
    }

    /// Labels being exported carry a `restore` attribute so the importer
    /// knows whether to keep or remap them.
    fn save(&self, writer: &mut Writer) -> Result<()> {
        let export = match (self.role, self.core.container()) {
            (StringRole::Label, Some(container)) => container.label_export(),
            _ => None,
        };

        match export {
            Some(export) if export.allow_duplicate_labels => {
                writer.empty_element("String", &[("restore", "1"), ("value", self.value.as_str())]);
            }
            Some(export) if self.value == export.internal_name => {
                writer.empty_element(
                    "String",
                    &[("restore", "0"), ("value", export.export_name.as_str())],
                );
            }
            _ => writer.empty_element("String", &[("value", self.value.as_str())]),
        }
        Ok(())
    }

    fn restore(&mut self, reader: &mut XmlReader) -> Result<()> {
        reader.read_element("String")?;
        let value = reader.get_attribute("value")?.to_string();

        if self.role == StringRole::Label && reader.has_attribute("restore") {
            if reader.get_attribute_as_integer("restore")? == 1 {
                self.assign(value);
                return Ok(());
            }
            let mapped = reader.get_name(&value).to_string();
            return self.set_value(mapped);
        }
        self.set_value(value)
    }

    fn copy(&self) -> Box<dyn Property> {
        Box::new(Self {
            core: self.core.detached(),
            value: self.value.clone(),
            kind: self.kind,
            role: self.role,
        })
    }

    fn paste(&mut self, from: &dyn Property) -> Result<()> {
        let source = paste_source::<Self>(self.kind, from)?;
        self.set_value(source.value.clone())
    }

    fn mem_size(&self) -> usize {
        self.value.len()
    }

    /// Native bools, numbers and strings are formatted; dynamic values use their `str()`
    fn set_path_value(&mut self, sub_path: &str, value: &dyn Any) -> Result<()> {
        self.verify_path(sub_path)?;
        let text = if let Some(b) = value.downcast_ref::<bool>() {
            let word = if *b { "True" } else { "False" };
            word.to_string()
        } else if let Some(i) = path_int(value) {
            i.to_string()
        } else if let Some(f) = path_float(value) {
            format!("{:.6}", f)
        } else if let Some(s) = path_str(value) {
            s.to_string()
        } else if let Some(dynamic) = value.downcast_ref::<DynValue>() {
            dynamic.to_string()
        } else {
            return Err(bad_cast(&self.core.full_name(), value));
        };
        self.set_value(text)
    }

    fn get_path_value(&self, sub_path: &str) -> Result<Box<dyn Any + Send>> {
        self.verify_path(sub_path)?;
        Ok(Box::new(self.value.clone()))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ============================================================================
// PropertyPath
// ============================================================================

/// Filesystem path cell
#[derive(Debug, Clone, Default)]
pub struct PropertyPath {
    core: PropertyCore,
    value: PathBuf,
}

impl PropertyPath {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            core: PropertyCore::new(name),
            value: PathBuf::new(),
        }
    }

    pub fn value(&self) -> &Path {
        &self.value
    }

    pub fn set_value(&mut self, value: impl Into<PathBuf>) {
        self.core.about_to_set_value();
        self.value = value.into();
        self.core.has_set_value();
    }

    /// The path as UTF-8
    pub fn value_as_str(&self) -> Result<&str> {
        self.value.to_str().ok_or_else(|| {
            PropertyError::Encoding(format!(
                "{} is not valid UTF-8",
                self.value.to_string_lossy()
            ))
        })
    }
}

impl Property for PropertyPath {
    fn kind(&self) -> PropertyKind {
        PropertyKind::Path
    }

    fn core(&self) -> &PropertyCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut PropertyCore {
        &mut self.core
    }

    fn to_dynamic(&self) -> DynValue {
        DynValue::Str(self.value.to_string_lossy().into_owned())
    }

    fn from_dynamic(&mut self, value: &DynValue) -> Result<()> {
        match value {
            DynValue::Str(s) => {
                self.set_value(s.as_str());
                Ok(())
            }
            DynValue::Bytes(b) => {
                let text = String::from_utf8(b.clone())?;
                self.set_value(text);
                Ok(())
            }
            other => Err(type_error("type must be str or bytes", other)),
        }
    }

    fn save(&self, writer: &mut Writer) -> Result<()> {
        writer.empty_element("Path", &[("value", self.value_as_str()?)]);
        Ok(())
    }

    fn restore(&mut self, reader: &mut XmlReader) -> Result<()> {
        reader.read_element("Path")?;
        let value = reader.get_attribute("value")?.to_string();
        self.set_value(value);
        Ok(())
    }

    fn copy(&self) -> Box<dyn Property> {
        Box::new(Self {
            core: self.core.detached(),
            value: self.value.clone(),
        })
    }

    fn paste(&mut self, from: &dyn Property) -> Result<()> {
        let source = paste_source::<Self>(PropertyKind::Path, from)?;
        self.set_value(source.value.clone());
        Ok(())
    }

    fn mem_size(&self) -> usize {
        self.value.as_os_str().len()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ============================================================================
// PropertyUuid
// ============================================================================

/// UUID cell; empty until assigned or generated
#[derive(Debug, Clone, Default)]
pub struct PropertyUuid {
    core: PropertyCore,
    value: Option<Uuid>,
}

impl PropertyUuid {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            core: PropertyCore::new(name),
            value: None,
        }
    }

    pub fn value(&self) -> Option<Uuid> {
        self.value
    }

    pub fn set_value(&mut self, value: Uuid) {
        self.core.about_to_set_value();
        self.value = Some(value);
        self.core.has_set_value();
    }

    /// Parse and assign; malformed text is rejected and leaves the cell unchanged
    pub fn set_value_str(&mut self, text: &str) -> Result<()> {
        let uuid = Uuid::parse_str(text.trim())
            .map_err(|e| PropertyError::ValueRejected(format!("invalid UUID '{}': {}", text, e)))?;
        self.set_value(uuid);
        Ok(())
    }

    /// Assign a fresh random UUID
    pub fn generate(&mut self) -> Uuid {
        let uuid = Uuid::new_v4();
        self.set_value(uuid);
        uuid
    }

    /// Hyphenated text, or empty when unset
    pub fn value_str(&self) -> String {
        self.value.map(|u| u.to_string()).unwrap_or_default()
    }
}

impl Property for PropertyUuid {
    fn kind(&self) -> PropertyKind {
        PropertyKind::Uuid
    }

    fn core(&self) -> &PropertyCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut PropertyCore {
        &mut self.core
    }

    fn to_dynamic(&self) -> DynValue {
        DynValue::Str(self.value_str())
    }

    fn from_dynamic(&mut self, value: &DynValue) -> Result<()> {
        match value {
            DynValue::Str(s) => self.set_value_str(s),
            other => Err(type_error("type must be str", other)),
        }
    }

    fn save(&self, writer: &mut Writer) -> Result<()> {
        writer.empty_element("Uuid", &[("value", self.value_str().as_str())]);
        Ok(())
    }

    fn restore(&mut self, reader: &mut XmlReader) -> Result<()> {
        reader.read_element("Uuid")?;
        let text = reader.get_attribute("value")?.to_string();
        if text.is_empty() {
            self.core.about_to_set_value();
            self.value = None;
            self.core.has_set_value();
            return Ok(());
        }
        self.set_value_str(&text)
    }

    fn copy(&self) -> Box<dyn Property> {
        Box::new(Self {
            core: self.core.detached(),
            value: self.value,
        })
    }

    fn paste(&mut self, from: &dyn Property) -> Result<()> {
        let source = paste_source::<Self>(PropertyKind::Uuid, from)?;
        self.core.about_to_set_value();
        self.value = source.value;
        self.core.has_set_value();
        Ok(())
    }

    fn mem_size(&self) -> usize {
        std::mem::size_of::<Uuid>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
