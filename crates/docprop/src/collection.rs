//! # Set and Map Cells
//!
//! `PropertyIntegerSet` holds an ordered set of integers and `PropertyMap`
//! a string-to-string dictionary. Both persist as counted child elements.

use std::any::Any;
use std::collections::{BTreeMap, BTreeSet};

use docprop_stream::{Writer, XmlReader};

use crate::dynamic::DynValue;
use crate::error::{bad_cast, type_error, Result};
use crate::property::{paste_source, Property, PropertyCore, PropertyKind};

// ============================================================================
// PropertyIntegerSet
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct PropertyIntegerSet {
    core: PropertyCore,
    values: BTreeSet<i64>,
}

impl PropertyIntegerSet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            core: PropertyCore::new(name),
            values: BTreeSet::new(),
        }
    }

    pub fn values(&self) -> &BTreeSet<i64> {
        &self.values
    }

    pub fn size(&self) -> usize {
        self.values.len()
    }

    pub fn contains(&self, value: i64) -> bool {
        self.values.contains(&value)
    }

    pub fn set_values(&mut self, values: BTreeSet<i64>) {
        self.core.about_to_set_value();
        self.values = values;
        self.core.has_set_value();
    }

    /// Replace the set with `{value}`
    pub fn set_value(&mut self, value: i64) {
        self.set_values(BTreeSet::from([value]));
    }
}

impl Property for PropertyIntegerSet {
    fn kind(&self) -> PropertyKind {
        PropertyKind::IntegerSet
    }

    fn core(&self) -> &PropertyCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut PropertyCore {
        &mut self.core
    }

    fn to_dynamic(&self) -> DynValue {
        DynValue::Set(self.values.iter().map(|v| DynValue::Int(*v)).collect())
    }

    fn from_dynamic(&mut self, value: &DynValue) -> Result<()> {
        const EXPECTED: &str = "type must be int or a sequence of int";
        if let DynValue::Int(single) = value {
            self.set_value(*single);
            return Ok(());
        }
        let items = value.as_collection().ok_or_else(|| type_error(EXPECTED, value))?;
        let values = items
            .iter()
            .map(|item| item.as_int().ok_or_else(|| type_error(EXPECTED, item)))
            .collect::<Result<BTreeSet<i64>>>()?;
        self.set_values(values);
        Ok(())
    }

    fn save(&self, writer: &mut Writer) -> Result<()> {
        let count = self.values.len().to_string();
        writer.start_element("IntegerSet", &[("count", count.as_str())]);
        for value in &self.values {
            writer.empty_element("I", &[("v", value.to_string().as_str())]);
        }
        writer.end_element("IntegerSet");
        Ok(())
    }

    fn restore(&mut self, reader: &mut XmlReader) -> Result<()> {
        reader.read_element("IntegerSet")?;
        let count = reader.get_attribute_as_unsigned("count")?;
        let mut values = BTreeSet::new();
        for _ in 0..count {
            reader.read_element("I")?;
            values.insert(reader.get_attribute_as_integer("v")?);
        }
        reader.read_end_element("IntegerSet")?;
        self.set_values(values);
        Ok(())
    }

    fn copy(&self) -> Box<dyn Property> {
        Box::new(Self {
            core: self.core.detached(),
            values: self.values.clone(),
        })
    }

    fn paste(&mut self, from: &dyn Property) -> Result<()> {
        let source = paste_source::<Self>(PropertyKind::IntegerSet, from)?;
        self.set_values(source.values.clone());
        Ok(())
    }

    fn mem_size(&self) -> usize {
        self.values.len() * std::mem::size_of::<i64>()
    }

    fn set_path_value(&mut self, sub_path: &str, value: &dyn Any) -> Result<()> {
        self.verify_path(sub_path)?;
        if let Some(values) = value.downcast_ref::<BTreeSet<i64>>() {
            self.set_values(values.clone());
            Ok(())
        } else if let Some(dynamic) = value.downcast_ref::<DynValue>() {
            self.from_dynamic(dynamic)
        } else {
            Err(bad_cast(&self.core.full_name(), value))
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ============================================================================
// PropertyMap
// ============================================================================

/// String-to-string dictionary cell, iterated in key order
#[derive(Debug, Clone, Default)]
pub struct PropertyMap {
    core: PropertyCore,
    values: BTreeMap<String, String>,
}

impl PropertyMap {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            core: PropertyCore::new(name),
            values: BTreeMap::new(),
        }
    }

    pub fn size(&self) -> usize {
        self.values.len()
    }

    pub fn values(&self) -> &BTreeMap<String, String> {
        &self.values
    }

    /// Value for `key`, empty when the key is absent
    pub fn get(&self, key: &str) -> &str {
        self.values.get(key).map_or("", String::as_str)
    }

    pub fn set_value(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.core.about_to_set_value();
        self.values.insert(key.into(), value.into());
        self.core.has_set_value();
    }

    pub fn set_values(&mut self, values: BTreeMap<String, String>) {
        self.core.about_to_set_value();
        self.values = values;
        self.core.has_set_value();
    }
}

impl Property for PropertyMap {
    fn kind(&self) -> PropertyKind {
        PropertyKind::Map
    }

    fn core(&self) -> &PropertyCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut PropertyCore {
        &mut self.core
    }

    fn to_dynamic(&self) -> DynValue {
        DynValue::Dict(
            self.values
                .iter()
                .map(|(k, v)| (DynValue::Str(k.clone()), DynValue::Str(v.clone())))
                .collect(),
        )
    }

    fn from_dynamic(&mut self, value: &DynValue) -> Result<()> {
        let pairs = value
            .as_dict()
            .ok_or_else(|| type_error("type must be a dict or object with mapping protocol", value))?;
        let mut values = BTreeMap::new();
        for (key, item) in pairs {
            let key = key
                .as_str()
                .ok_or_else(|| type_error("type of the key need to be string", key))?;
            let item = item
                .as_str()
                .ok_or_else(|| type_error("type in values must be string", item))?;
            values.insert(key.to_string(), item.to_string());
        }
        self.set_values(values);
        Ok(())
    }

    fn save(&self, writer: &mut Writer) -> Result<()> {
        let count = self.values.len().to_string();
        writer.start_element("Map", &[("count", count.as_str())]);
        for (key, value) in &self.values {
            writer.empty_element("Item", &[("key", key.as_str()), ("value", value.as_str())]);
        }
        writer.end_element("Map");
        Ok(())
    }

    fn restore(&mut self, reader: &mut XmlReader) -> Result<()> {
        reader.read_element("Map")?;
        let count = reader.get_attribute_as_unsigned("count")?;
        let mut values = BTreeMap::new();
        for _ in 0..count {
            reader.read_element("Item")?;
            values.insert(
                reader.get_attribute("key")?.to_string(),
                reader.get_attribute("value")?.to_string(),
            );
        }
        reader.read_end_element("Map")?;
        self.set_values(values);
        Ok(())
    }

    fn copy(&self) -> Box<dyn Property> {
        Box::new(Self {
            core: self.core.detached(),
            values: self.values.clone(),
        })
    }

    fn paste(&mut self, from: &dyn Property) -> Result<()> {
        let source = paste_source::<Self>(PropertyKind::Map, from)?;
        self.set_values(source.values.clone());
        Ok(())
    }

    fn mem_size(&self) -> usize {
        self.values.iter().map(|(k, v)| k.len() + v.len()).sum()
    }

    fn set_path_value(&mut self, sub_path: &str, value: &dyn Any) -> Result<()> {
        self.verify_path(sub_path)?;
        if let Some(values) = value.downcast_ref::<BTreeMap<String, String>>() {
            self.set_values(values.clone());
            Ok(())
        } else if let Some(dynamic) = value.downcast_ref::<DynValue>() {
            self.from_dynamic(dynamic)
        } else {
            Err(bad_cast(&self.core.full_name(), value))
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

    #[test]
    fn test_integer_set_round_trip() {
        let mut cell = PropertyIntegerSet::new("Faces");
        cell.from_dynamic(&DynValue::list([DynValue::Int(3), DynValue::Int(1), DynValue::Int(3)]))
            .unwrap();
        assert_eq!(cell.size(), 2);

        let mut writer = Writer::new();
        cell.save(&mut writer).unwrap();
        let mut reader = XmlReader::parse(writer.as_str()).unwrap();
        let mut fresh = PropertyIntegerSet::new("Faces");
        fresh.restore(&mut reader).unwrap();
        assert_eq!(fresh.values(), cell.values());
        assert_eq!(
            fresh.to_dynamic(),
            DynValue::Set(vec![DynValue::Int(1), DynValue::Int(3)])
        );
    }

    #[test]
    fn test_integer_set_single_and_errors() {
        let mut cell = PropertyIntegerSet::new("Faces");
        cell.from_dynamic(&DynValue::Int(9)).unwrap();
        assert!(cell.contains(9));
        assert_eq!(cell.size(), 1);

        let err = cell.from_dynamic(&DynValue::from("9")).unwrap_err();
        assert_eq!(err.to_string(), "type must be int or a sequence of int, not str");
        let err = cell
            .from_dynamic(&DynValue::Set(vec![DynValue::Float(1.0)]))
            .unwrap_err();
        assert!(err.is_type_mismatch());
        assert!(cell.contains(9));
    }

    #[test]
    fn test_map_round_trip_and_get() {
        let mut cell = PropertyMap::new("Meta");
        cell.set_value("author", "J. \"Doe\"");
        cell.set_value("note", "a&b");
        assert_eq!(cell.get("author"), "J. \"Doe\"");
        assert_eq!(cell.get("missing"), "");

        let mut writer = Writer::new();
        cell.save(&mut writer).unwrap();
        assert!(writer.as_str().starts_with("<Map count=\"2\">"));
        let mut reader = XmlReader::parse(writer.as_str()).unwrap();
        let mut fresh = PropertyMap::new("Meta");
        fresh.restore(&mut reader).unwrap();
        assert_eq!(fresh.values(), cell.values());
    }

    #[test]
    fn test_map_dynamic_errors() {
        let mut cell = PropertyMap::new("Meta");
        let err = cell.from_dynamic(&DynValue::List(Vec::new())).unwrap_err();
        assert_eq!(
            err.to_string(),
            "type must be a dict or object with mapping protocol, not list"
        );

        let bad_key = DynValue::Dict(vec![(DynValue::Int(1), DynValue::from("x"))]);
        assert_eq!(
            cell.from_dynamic(&bad_key).unwrap_err().to_string(),
            "type of the key need to be string, not int"
        );

        let bad_value = DynValue::Dict(vec![(DynValue::from("k"), DynValue::Float(1.0))]);
        assert_eq!(
            cell.from_dynamic(&bad_value).unwrap_err().to_string(),
            "type in values must be string, not float"
        );

        let good = DynValue::Dict(vec![(DynValue::from("k"), DynValue::from("v"))]);
        cell.from_dynamic(&good).unwrap();
        assert_eq!(cell.get("k"), "v");
        assert_eq!(cell.to_dynamic(), good);
    }
}
