//! # Enumeration
//!
//! `Enumeration` is a selected index into a label list. Labels are either a
//! canonical static table shared by every cell of a feature type, or a
//! custom list owned by the value and persisted inline.
//!
//! ## Table of Contents
//! 1. EnumLabels / Enumeration - the value
//! 2. PropertyEnumeration - the cell
//! 3. Virtual sub-paths (`.Enum`, `.All`, `.String`)

use std::any::Any;

use docprop_stream::{Writer, XmlReader};
use serde::Serialize;
use tracing::warn;

use crate::dynamic::DynValue;
use crate::error::{PropertyError, Result};
use crate::property::{paste_source, path_float, path_int, path_str, Property, PropertyCore, PropertyKind};

// ============================================================================
// Enumeration Value
// ============================================================================

/// Label storage of an enumeration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum EnumLabels {
    Static(&'static [&'static str]),
    Custom(Vec<String>),
}

impl Default for EnumLabels {
    fn default() -> Self {
        EnumLabels::Custom(Vec::new())
    }
}

/// Selected index plus labels. `-1` means no selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Enumeration {
    index: i64,
    labels: EnumLabels,
}

impl Default for Enumeration {
    fn default() -> Self {
        Self {
            index: -1,
            labels: EnumLabels::default(),
        }
    }
}

impl Enumeration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Canonical labels; selects the first one
    pub fn from_static(labels: &'static [&'static str]) -> Self {
        Self {
            index: if labels.is_empty() { -1 } else { 0 },
            labels: EnumLabels::Static(labels),
        }
    }

    /// Custom labels; selects the first one
    pub fn with_labels(labels: Vec<String>) -> Self {
        Self {
            index: if labels.is_empty() { -1 } else { 0 },
            labels: EnumLabels::Custom(labels),
        }
    }

    pub fn index(&self) -> i64 {
        self.index
    }

    /// Select by index without range checking
    pub fn set_index(&mut self, index: i64) {
        self.index = index;
    }

    /// Select by label; returns false when the label is not present
    pub fn set_label(&mut self, label: &str) -> bool {
        match self.position(label) {
            Some(index) => {
                self.index = index as i64;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        match &self.labels {
            EnumLabels::Static(labels) => labels.len(),
            EnumLabels::Custom(labels) => labels.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn has_enums(&self) -> bool {
        !self.is_empty()
    }

    pub fn is_custom(&self) -> bool {
        matches!(self.labels, EnumLabels::Custom(_))
    }

    /// Index selects one of the labels
    pub fn is_valid(&self) -> bool {
        self.index >= 0 && (self.index as usize) < self.len()
    }

    pub fn label_at(&self, index: usize) -> Option<&str> {
        match &self.labels {
            EnumLabels::Static(labels) => labels.get(index).copied(),
            EnumLabels::Custom(labels) => labels.get(index).map(String::as_str),
        }
    }

    pub fn current_label(&self) -> Option<&str> {
        if self.is_valid() {
            self.label_at(self.index as usize)
        } else {
            None
        }
    }

    pub fn contains(&self, label: &str) -> bool {
        self.position(label).is_some()
    }

    pub fn labels(&self) -> Vec<String> {
        (0..self.len())
            .filter_map(|i| self.label_at(i).map(str::to_string))
            .collect()
    }

    pub fn label_source(&self) -> &EnumLabels {
        &self.labels
    }

    /// Replace the labels, keeping the selected label when it survives
    pub fn set_labels(&mut self, labels: EnumLabels) {
        let previous = self.current_label().map(str::to_string);
        self.labels = labels;
        if let Some(previous) = previous {
            self.index = self.position(&previous).map_or(0, |i| i as i64);
        }
    }

    fn position(&self, label: &str) -> Option<usize> {
        (0..self.len()).find(|&i| self.label_at(i) == Some(label))
    }
}

// ============================================================================
// PropertyEnumeration
// ============================================================================

/// Enumeration cell
#[derive(Debug, Clone, Default)]
pub struct PropertyEnumeration {
    core: PropertyCore,
    value: Enumeration,
}

impl PropertyEnumeration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            core: PropertyCore::new(name),
            value: Enumeration::new(),
        }
    }

    pub fn with_enumeration(name: impl Into<String>, value: Enumeration) -> Self {
        Self {
            core: PropertyCore::new(name),
            value,
        }
    }

    pub fn enumeration(&self) -> &Enumeration {
        &self.value
    }

    /// Selected index, `-1` when nothing is selected
    pub fn value(&self) -> i64 {
        self.value.index()
    }

    pub fn is_valid(&self) -> bool {
        self.value.is_valid()
    }

    pub fn has_enums(&self) -> bool {
        self.value.has_enums()
    }

    pub fn is_part_of(&self, label: &str) -> bool {
        self.value.contains(label)
    }

    pub fn labels(&self) -> Vec<String> {
        self.value.labels()
    }

    /// Replace the labels. An unattached cell changes silently.
    pub fn set_enums(&mut self, labels: EnumLabels) {
        let notify = self.core.is_attached();
        if notify {
            self.core.about_to_set_value();
        }
        self.value.set_labels(labels);
        if notify {
            self.core.has_set_value();
        }
    }

    pub fn set_enum_vector(&mut self, labels: Vec<String>) {
        self.set_enums(EnumLabels::Custom(labels));
    }

    pub fn set_static_enums(&mut self, labels: &'static [&'static str]) {
        self.set_enums(EnumLabels::Static(labels));
    }

    pub fn set_value(&mut self, index: i64) {
        self.core.about_to_set_value();
        self.value.set_index(index);
        self.core.has_set_value();
    }

    /// Select by label; labels not in the list are rejected
    pub fn set_value_label(&mut self, label: &str) -> Result<()> {
        if !self.value.contains(label) {
            return Err(PropertyError::ValueRejected(format!(
                "'{}' is not part of the enumeration in {}",
                label,
                self.core.full_name()
            )));
        }
        self.core.about_to_set_value();
        self.value.set_label(label);
        self.core.has_set_value();
        Ok(())
    }

    pub fn set_enumeration(&mut self, value: Enumeration) {
        self.core.about_to_set_value();
        self.value = value;
        self.core.has_set_value();
    }

    pub fn value_as_string(&self) -> Result<&str> {
        self.value.current_label().ok_or_else(|| {
            PropertyError::Runtime("Cannot get value from invalid enumeration".to_string())
        })
    }

    fn set_checked_index(&mut self, index: i64) -> Result<()> {
        if index < 0 || index as usize >= self.value.len() {
            return Err(PropertyError::ValueRejected(format!(
                "Index {} is out of range for the enumeration in {}",
                index,
                self.core.full_name()
            )));
        }
        self.set_value(index);
        Ok(())
    }

    fn labels_from_dynamic(&self, items: &[DynValue]) -> Result<Vec<String>> {
        items
            .iter()
            .map(|item| {
                item.as_str().map(str::to_string).ok_or_else(|| self.type_error())
            })
            .collect()
    }

    fn type_error(&self) -> PropertyError {
        PropertyError::TypeMismatch(format!(
            "PropertyEnumeration {} expects type to be int, string, or list(string), or list(list, int)",
            self.core.full_name()
        ))
    }

    fn labels_tuple(&self) -> DynValue {
        DynValue::tuple(self.value.labels().into_iter().map(DynValue::Str))
    }
}

impl Property for PropertyEnumeration {
    fn kind(&self) -> PropertyKind {
        PropertyKind::Enumeration
    }

    fn core(&self) -> &PropertyCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut PropertyCore {
        &mut self.core
    }

    /// Current label, or `None` without a valid selection
    fn to_dynamic(&self) -> DynValue {
        match self.value.current_label() {
            Some(label) => DynValue::Str(label.to_string()),
            None => DynValue::None,
        }
    }

    /// int selects (range checked), str selects by label, a sequence of
    /// strings replaces the labels, and `(labels, index)` does both.
    fn from_dynamic(&mut self, value: &DynValue) -> Result<()> {
        match value {
            DynValue::Int(index) => self.set_checked_index(*index),
            DynValue::Str(label) => self.set_value_label(label),
            DynValue::List(items) | DynValue::Tuple(items) => {
                if let [DynValue::List(labels) | DynValue::Tuple(labels), DynValue::Int(index)] =
                    items.as_slice()
                {
                    let labels = self.labels_from_dynamic(labels)?;
                    let mut next = self.value.clone();
                    next.set_labels(EnumLabels::Custom(labels));
                    if *index >= 0 {
                        if *index as usize >= next.len() {
                            return Err(PropertyError::ValueRejected(format!(
                                "Index {} is out of range for the enumeration in {}",
                                index,
                                self.core.full_name()
                            )));
                        }
                        next.set_index(*index);
                    }
                    self.set_enumeration(next);
                    return Ok(());
                }
                let labels = self.labels_from_dynamic(items)?;
                self.set_enum_vector(labels);
                Ok(())
            }
            _ => Err(self.type_error()),
        }
    }

    fn save(&self, writer: &mut Writer) -> Result<()> {
        let index = self.value.index().to_string();
        if !self.value.is_custom() {
            writer.empty_element("Integer", &[("value", index.as_str())]);
            return Ok(());
        }

        writer.empty_element("Integer", &[("value", index.as_str()), ("CustomEnum", "true")]);
        let labels = self.value.labels();
        let count = labels.len().to_string();
        writer.start_element("CustomEnumList", &[("count", count.as_str())]);
        for label in &labels {
            writer.empty_element("Enum", &[("value", label.as_str())]);
        }
        writer.end_element("CustomEnumList");
        Ok(())
    }

    /// An index outside the label range keeps the current selection
    fn restore(&mut self, reader: &mut XmlReader) -> Result<()> {
        reader.read_element("Integer")?;
        let mut index = reader.get_attribute_as_integer("value")?;
        let custom = reader.has_attribute("CustomEnum");

        self.core.about_to_set_value();
        if custom {
            reader.read_element("CustomEnumList")?;
            let count = reader.get_attribute_as_unsigned("count")? as usize;
            let mut labels = Vec::with_capacity(count.min(1024));
            for _ in 0..count {
                reader.read_element("Enum")?;
                labels.push(reader.get_attribute("value")?.to_string());
            }
            reader.read_end_element("CustomEnumList")?;
            self.value.set_labels(EnumLabels::Custom(labels));
        }

        let out_of_range = self.value.has_enums() && index as usize >= self.value.len();
        if index < 0 || out_of_range {
            if self.value.has_enums() {
                warn!(
                    "Enumeration index {} is out of range for {}, ignoring it",
                    index,
                    self.core.full_name()
                );
            }
            index = self.value.index();
        }
        self.value.set_index(index);
        self.core.has_set_value();
        Ok(())
    }

    fn copy(&self) -> Box<dyn Property> {
        Box::new(Self {
            core: self.core.detached(),
            value: self.value.clone(),
        })
    }

    fn paste(&mut self, from: &dyn Property) -> Result<()> {
        let source = paste_source::<Self>(PropertyKind::Enumeration, from)?;
        self.set_enumeration(source.value.clone());
        Ok(())
    }

    fn mem_size(&self) -> usize {
        let labels = match &self.value.labels {
            EnumLabels::Static(_) => 0,
            EnumLabels::Custom(labels) => labels.iter().map(String::len).sum(),
        };
        std::mem::size_of::<Enumeration>() + labels
    }

    fn verify_path(&self, sub_path: &str) -> Result<()> {
        match sub_path {
            "" | ".Enum" | ".All" | ".String" => Ok(()),
            other => Err(PropertyError::InvalidPath {
                property: self.core.full_name(),
                path: other.to_string(),
            }),
        }
    }

    /// Native ints (floats truncated) select by index and strings by label;
    /// dynamic values go through `from_dynamic`.
    fn set_path_value(&mut self, sub_path: &str, value: &dyn Any) -> Result<()> {
        self.verify_path(sub_path)?;
        if let Some(index) = path_int(value) {
            self.set_value(index);
            Ok(())
        } else if let Some(f) = path_float(value) {
            self.set_value(f as i64);
            Ok(())
        } else if let Some(label) = path_str(value) {
            let label = label.to_string();
            self.set_value_label(&label)
        } else if let Some(dynamic) = value.downcast_ref::<DynValue>() {
            self.from_dynamic(dynamic)
        } else {
            Err(crate::error::bad_cast(&self.core.full_name(), value))
        }
    }

    fn get_path_value(&self, sub_path: &str) -> Result<Box<dyn Any + Send>> {
        self.verify_path(sub_path)?;
        match sub_path {
            ".Enum" => Ok(Box::new(self.labels_tuple())),
            ".All" => Ok(Box::new(DynValue::tuple([
                self.labels_tuple(),
                DynValue::Int(self.value.index()),
            ]))),
            ".String" => Ok(Box::new(self.value_as_string()?.to_string())),
            _ => Ok(Box::new(self.value.index())),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::ChangeRecorder;
    use std::sync::Arc;

    static REFINE: [&str; 3] = ["Off", "On", "Auto"];

    fn custom(labels: &[&str]) -> PropertyEnumeration {
        let mut cell = PropertyEnumeration::new("Mode");
        cell.set_enum_vector(labels.iter().map(|s| s.to_string()).collect());
        cell
    }

    #[test]
    fn test_static_labels_save_without_list() {
        let mut cell = PropertyEnumeration::new("Refine");
        cell.set_static_enums(&REFINE);
        cell.set_value(2);

        let mut writer = Writer::new();
        cell.save(&mut writer).unwrap();
        assert_eq!(writer.as_str(), "<Integer value=\"2\"/>\n");
        assert_eq!(cell.value_as_string().unwrap(), "Auto");
    }

    #[test]
    fn test_custom_round_trip() {
        let mut cell = custom(&["Red", "Green", "Blue"]);
        cell.set_value_label("Blue").unwrap();

        let mut writer = Writer::new();
        cell.save(&mut writer).unwrap();
        let mut reader = XmlReader::parse(writer.as_str()).unwrap();
        let mut fresh = PropertyEnumeration::new("Mode");
        fresh.restore(&mut reader).unwrap();

        assert!(fresh.enumeration().is_custom());
        assert_eq!(fresh.labels(), vec!["Red", "Green", "Blue"]);
        assert_eq!(fresh.value(), 2);
    }

    #[test]
    fn test_restore_out_of_range_keeps_current() {
        let mut cell = PropertyEnumeration::new("Refine");
        cell.set_static_enums(&REFINE);
        cell.set_value(1);
        let mut reader = XmlReader::parse("<Integer value=\"7\"/>").unwrap();
        cell.restore(&mut reader).unwrap();
        assert_eq!(cell.value(), 1);

        let mut reader = XmlReader::parse("<Integer value=\"-1\"/>").unwrap();
        cell.restore(&mut reader).unwrap();
        assert_eq!(cell.value(), 1);
    }

    #[test]
    fn test_unknown_label_rejected() {
        let mut cell = custom(&["A", "B"]);
        let err = cell.from_dynamic(&DynValue::Str("C".into())).unwrap_err();
        assert!(err.is_value_rejected());
        assert_eq!(err.to_string(), "'C' is not part of the enumeration in Mode");
        assert_eq!(cell.value(), 0);
    }

    #[test]
    fn test_invalid_enumeration_has_no_string() {
        let cell = PropertyEnumeration::new("Empty");
        assert!(matches!(cell.value_as_string(), Err(PropertyError::Runtime(_))));
        assert_eq!(cell.to_dynamic(), DynValue::None);
    }

    #[test]
    fn test_dynamic_forms() {
        let mut cell = custom(&["A", "B"]);
        cell.from_dynamic(&DynValue::Int(1)).unwrap();
        assert_eq!(cell.to_dynamic(), DynValue::Str("B".into()));
        assert!(cell.from_dynamic(&DynValue::Int(5)).unwrap_err().is_value_rejected());

        let pair = DynValue::list([DynValue::list([DynValue::from("x"), DynValue::from("y"), DynValue::from("z")]), DynValue::Int(2)]);
        cell.from_dynamic(&pair).unwrap();
        assert_eq!(cell.labels(), vec!["x", "y", "z"]);
        assert_eq!(cell.value_as_string().unwrap(), "z");

        cell.from_dynamic(&DynValue::list([DynValue::from("p"), DynValue::from("z")])).unwrap();
        assert_eq!(cell.value_as_string().unwrap(), "z");

        let err = cell.from_dynamic(&DynValue::Float(1.0)).unwrap_err();
        assert!(err.is_type_mismatch());
        assert!(err.to_string().starts_with("PropertyEnumeration Mode expects type"));
    }

    #[test]
    fn test_set_enums_silent_when_unattached() {
        let recorder = Arc::new(ChangeRecorder::new("Obj"));
        let mut cell = PropertyEnumeration::new("Mode");
        cell.set_enum_vector(vec!["A".to_string()]);
        assert!(!cell.core().is_touched());

        cell.core_mut().attach(recorder.clone());
        cell.set_enum_vector(vec!["A".to_string(), "B".to_string()]);
        assert_eq!(recorder.before_count("Mode"), 1);
        assert_eq!(recorder.after_count("Mode"), 1);
    }

    #[test]
    fn test_virtual_sub_paths() {
        let mut cell = custom(&["A", "B"]);
        cell.set_value(1);

        let all = cell.get_path_value(".All").unwrap();
        assert_eq!(
            all.downcast_ref::<DynValue>(),
            Some(&DynValue::tuple([
                DynValue::tuple([DynValue::from("A"), DynValue::from("B")]),
                DynValue::Int(1)
            ]))
        );
        let label = cell.get_path_value(".String").unwrap();
        assert_eq!(label.downcast_ref::<String>().map(String::as_str), Some("B"));
        let index = cell.get_path_value("").unwrap();
        assert_eq!(index.downcast_ref::<i64>(), Some(&1));
        assert!(cell.get_path_value(".Bogus").is_err());

        cell.set_path_value("", &String::from("A")).unwrap();
        assert_eq!(cell.value(), 0);
        cell.set_path_value("", &1i16).unwrap();
        assert_eq!(cell.value(), 1);
    }
}
