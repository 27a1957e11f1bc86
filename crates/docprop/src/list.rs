//! # List Cells
//!
//! `PropertyList<T>` is the homogeneous ordered list cell. Element types
//! describe their XML form, their dynamic coercion, and whether bulk data
//! goes to a binary side file, through `ListElement`.
//!
//! ## Table of Contents
//! 1. ListElement - per element-type behavior
//! 2. Element types (int, float, string, bool, color)
//! 3. PropertyList - the cell
//!
//! ## Side files
//!
//! Float and color lists write `<FloatList file="NAME"/>` and register the
//! file with the writer unless XML is forced; the blob is a `u32` count
//! followed by fixed-size records. Bool lists always write a bit string with
//! the highest index first.

use std::any::Any;
use std::fmt;
use std::io::{Read, Write};

use docprop_stream::{InputStream, OutputStream, Writer, XmlReader};

use crate::color::{read_packed, Color};
use crate::dynamic::DynValue;
use crate::error::{bad_cast, type_error, PropertyError, Result};
use crate::notify::PropertyStatus;
use crate::property::{paste_source, Property, PropertyCore, PropertyKind};

// ============================================================================
// ListElement
// ============================================================================

/// An element type that can be held by a `PropertyList`
pub trait ListElement: Clone + PartialEq + Default + fmt::Debug + Send + Sync + 'static {
    const KIND: PropertyKind;
    const LIST_TAG: &'static str;
    const ITEM_TAG: &'static str;
    const ITEM_ATTR: &'static str;
    /// Bulk data goes to a side file unless the writer forces XML
    const BLOB: bool = false;

    fn to_attribute(&self) -> String;

    /// Parse the current item element
    fn read_item(reader: &XmlReader) -> Result<Self>;

    fn element_to_dynamic(&self) -> DynValue;

    fn element_from_dynamic(value: &DynValue) -> Result<Self>;

    fn bulk_to_dynamic(values: &[Self]) -> DynValue {
        DynValue::list(values.iter().map(Self::element_to_dynamic))
    }

    /// A sequence converts element-wise; anything else is a single element
    fn bulk_from_dynamic(value: &DynValue) -> Result<Vec<Self>> {
        match value.as_sequence() {
            Some(items) => items.iter().map(Self::element_from_dynamic).collect(),
            None => Ok(vec![Self::element_from_dynamic(value)?]),
        }
    }

    fn save_list(values: &[Self], owner: &str, writer: &mut Writer) {
        if Self::BLOB && !writer.is_force_xml() {
            let file = if values.is_empty() {
                String::new()
            } else {
                writer.add_file(owner, owner)
            };
            writer.empty_element(Self::LIST_TAG, &[("file", file.as_str())]);
            return;
        }

        let count = values.len().to_string();
        writer.start_element(Self::LIST_TAG, &[("count", count.as_str())]);
        for value in values {
            writer.empty_element(Self::ITEM_TAG, &[(Self::ITEM_ATTR, value.to_attribute().as_str())]);
        }
        writer.end_element(Self::LIST_TAG);
    }

    /// Inline values, or `None` when a side file was registered for `owner`
    fn restore_list(reader: &mut XmlReader, owner: &str) -> Result<Option<Vec<Self>>> {
        reader.read_element(Self::LIST_TAG)?;
        if reader.has_attribute("file") {
            let file = reader.get_attribute("file")?.to_string();
            if file.is_empty() {
                return Ok(Some(Vec::new()));
            }
            reader.add_file(&file, owner);
            return Ok(None);
        }

        let count = reader.get_attribute_as_unsigned("count")? as usize;
        let mut values = Vec::with_capacity(count.min(4096));
        for _ in 0..count {
            reader.read_element(Self::ITEM_TAG)?;
            values.push(Self::read_item(reader)?);
        }
        reader.read_end_element(Self::LIST_TAG)?;
        Ok(Some(values))
    }

    fn write_blob(_values: &[Self], _status: PropertyStatus, _out: &mut OutputStream<'_>) -> Result<()> {
        Err(no_side_file::<Self>())
    }

    fn read_blob(_status: PropertyStatus, _input: &mut InputStream<'_>) -> Result<Vec<Self>> {
        Err(no_side_file::<Self>())
    }

    /// Heap bytes owned by one element
    fn heap_size(&self) -> usize {
        0
    }
}

fn no_side_file<T: ListElement>() -> PropertyError {
    PropertyError::Runtime(format!("{} has no binary side file", T::LIST_TAG))
}

fn read_count(input: &mut InputStream<'_>) -> Result<usize> {
    Ok(input.read_u32()? as usize)
}

// ============================================================================
// Element Types
// ============================================================================

impl ListElement for i64 {
    const KIND: PropertyKind = PropertyKind::IntegerList;
    const LIST_TAG: &'static str = "IntegerList";
    const ITEM_TAG: &'static str = "I";
    const ITEM_ATTR: &'static str = "v";

    fn to_attribute(&self) -> String {
        self.to_string()
    }

    fn read_item(reader: &XmlReader) -> Result<Self> {
        Ok(reader.get_attribute_as_integer(Self::ITEM_ATTR)?)
    }

    fn element_to_dynamic(&self) -> DynValue {
        DynValue::Int(*self)
    }

    fn element_from_dynamic(value: &DynValue) -> Result<Self> {
        value
            .as_int()
            .ok_or_else(|| type_error("type in list must be int", value))
    }
}

impl ListElement for f64 {
    const KIND: PropertyKind = PropertyKind::FloatList;
    const LIST_TAG: &'static str = "FloatList";
    const ITEM_TAG: &'static str = "F";
    const ITEM_ATTR: &'static str = "v";
    const BLOB: bool = true;

    fn to_attribute(&self) -> String {
        self.to_string()
    }

    fn read_item(reader: &XmlReader) -> Result<Self> {
        Ok(reader.get_attribute_as_float(Self::ITEM_ATTR)?)
    }

    fn element_to_dynamic(&self) -> DynValue {
        DynValue::Float(*self)
    }

    fn element_from_dynamic(value: &DynValue) -> Result<Self> {
        value
            .as_number()
            .ok_or_else(|| type_error("type in list must be float", value))
    }

    /// Full or reduced precision per the `SINGLE_PRECISION` flag, which is
    /// not itself persisted
    fn write_blob(values: &[Self], status: PropertyStatus, out: &mut OutputStream<'_>) -> Result<()> {
        out.write_u32(values.len() as u32)?;
        let single = status.contains(PropertyStatus::SINGLE_PRECISION);
        for value in values {
            if single {
                out.write_f32(*value as f32)?;
            } else {
                out.write_f64(*value)?;
            }
        }
        Ok(())
    }

    fn read_blob(status: PropertyStatus, input: &mut InputStream<'_>) -> Result<Vec<Self>> {
        let count = read_count(input)?;
        let single = status.contains(PropertyStatus::SINGLE_PRECISION);
        let mut values = Vec::with_capacity(count.min(1 << 16));
        for _ in 0..count {
            let value = if single {
                f64::from(input.read_f32()?)
            } else {
                input.read_f64()?
            };
            values.push(value);
        }
        Ok(values)
    }
}

impl ListElement for String {
    const KIND: PropertyKind = PropertyKind::StringList;
    const LIST_TAG: &'static str = "StringList";
    const ITEM_TAG: &'static str = "String";
    const ITEM_ATTR: &'static str = "value";

    fn to_attribute(&self) -> String {
        self.clone()
    }

    fn read_item(reader: &XmlReader) -> Result<Self> {
        Ok(reader.get_attribute(Self::ITEM_ATTR)?.to_string())
    }

    fn element_to_dynamic(&self) -> DynValue {
        DynValue::Str(self.clone())
    }

    fn element_from_dynamic(value: &DynValue) -> Result<Self> {
        match value {
            DynValue::Str(s) => Ok(s.clone()),
            DynValue::Bytes(bytes) => Ok(String::from_utf8(bytes.clone())?),
            other => Err(type_error("type in list must be str or unicode", other)),
        }
    }

    fn heap_size(&self) -> usize {
        self.capacity()
    }
}

impl ListElement for bool {
    const KIND: PropertyKind = PropertyKind::BoolList;
    const LIST_TAG: &'static str = "BoolList";
    const ITEM_TAG: &'static str = "";
    const ITEM_ATTR: &'static str = "value";

    fn to_attribute(&self) -> String {
        let bit = if *self { "1" } else { "0" };
        bit.to_string()
    }

    fn read_item(reader: &XmlReader) -> Result<Self> {
        Ok(reader.get_attribute(Self::ITEM_ATTR)? == "1")
    }

    fn element_to_dynamic(&self) -> DynValue {
        DynValue::Bool(*self)
    }

    fn element_from_dynamic(value: &DynValue) -> Result<Self> {
        match value {
            DynValue::Bool(b) => Ok(*b),
            DynValue::Int(i) => Ok(*i != 0),
            other => Err(type_error("type in list must be bool or int", other)),
        }
    }

    fn bulk_to_dynamic(values: &[Self]) -> DynValue {
        DynValue::tuple(values.iter().map(Self::element_to_dynamic))
    }

    /// A string is read as a bit string, highest index first
    fn bulk_from_dynamic(value: &DynValue) -> Result<Vec<Self>> {
        match value {
            DynValue::Str(bits) => parse_bits(bits),
            other => match other.as_sequence() {
                Some(items) => items.iter().map(Self::element_from_dynamic).collect(),
                None => Ok(vec![Self::element_from_dynamic(other)?]),
            },
        }
    }

    fn save_list(values: &[Self], _owner: &str, writer: &mut Writer) {
        let bits: String = values.iter().rev().map(|b| if *b { '1' } else { '0' }).collect();
        writer.empty_element(Self::LIST_TAG, &[("value", bits.as_str())]);
    }

    fn restore_list(reader: &mut XmlReader, _owner: &str) -> Result<Option<Vec<Self>>> {
        reader.read_element(Self::LIST_TAG)?;
        let bits = reader.get_attribute(Self::ITEM_ATTR)?.to_string();
        Ok(Some(parse_bits(&bits)?))
    }
}

fn parse_bits(bits: &str) -> Result<Vec<bool>> {
    bits.chars()
        .rev()
        .map(|c| match c {
            '0' => Ok(false),
            '1' => Ok(true),
            other => Err(PropertyError::ValueRejected(format!(
                "'{}' is not a valid bit in a bool list",
                other
            ))),
        })
        .collect()
}

impl ListElement for Color {
    const KIND: PropertyKind = PropertyKind::ColorList;
    const LIST_TAG: &'static str = "ColorList";
    const ITEM_TAG: &'static str = "C";
    const ITEM_ATTR: &'static str = "v";
    const BLOB: bool = true;

    fn to_attribute(&self) -> String {
        self.packed().to_string()
    }

    fn read_item(reader: &XmlReader) -> Result<Self> {
        read_packed(reader, Self::ITEM_ATTR)
    }

    fn element_to_dynamic(&self) -> DynValue {
        self.to_dynamic()
    }

    fn element_from_dynamic(value: &DynValue) -> Result<Self> {
        Color::from_dynamic(value)
    }

    /// A 3 or 4 tuple of numbers is one color, not a list of packed colors
    fn bulk_from_dynamic(value: &DynValue) -> Result<Vec<Self>> {
        match value {
            DynValue::Tuple(items)
                if (items.len() == 3 || items.len() == 4)
                    && items.iter().all(|item| item.as_number().is_some()) =>
            {
                Ok(vec![Color::from_dynamic(value)?])
            }
            other => match other.as_sequence() {
                Some(items) => items.iter().map(Color::from_dynamic).collect(),
                None => Ok(vec![Color::from_dynamic(other)?]),
            },
        }
    }

    fn write_blob(values: &[Self], _status: PropertyStatus, out: &mut OutputStream<'_>) -> Result<()> {
        out.write_u32(values.len() as u32)?;
        for value in values {
            out.write_u32(value.packed())?;
        }
        Ok(())
    }

    fn read_blob(_status: PropertyStatus, input: &mut InputStream<'_>) -> Result<Vec<Self>> {
        let count = read_count(input)?;
        let mut values = Vec::with_capacity(count.min(1 << 16));
        for _ in 0..count {
            values.push(Color::from_packed(input.read_u32()?));
        }
        Ok(values)
    }
}

// ============================================================================
// PropertyList
// ============================================================================

/// Ordered homogeneous list cell
#[derive(Debug, Clone, Default)]
pub struct PropertyList<T> {
    core: PropertyCore,
    values: Vec<T>,
}

pub type PropertyIntegerList = PropertyList<i64>;
pub type PropertyFloatList = PropertyList<f64>;
pub type PropertyStringList = PropertyList<String>;
pub type PropertyBoolList = PropertyList<bool>;
pub type PropertyColorList = PropertyList<Color>;

impl<T: ListElement> PropertyList<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            core: PropertyCore::new(name),
            values: Vec::new(),
        }
    }

    pub fn with_values(name: impl Into<String>, values: Vec<T>) -> Self {
        Self {
            core: PropertyCore::new(name),
            values,
        }
    }

    pub fn size(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn value_at(&self, index: usize) -> Option<&T> {
        self.values.get(index)
    }

    pub fn set_values(&mut self, values: Vec<T>) {
        self.core.about_to_set_value();
        self.values = values;
        self.core.has_set_value();
    }

    /// `-1` or `size` appends; anything else outside `0..size` is rejected
    pub fn set_value_at(&mut self, index: i64, value: T) -> Result<()> {
        let size = self.values.len();
        let slot = checked_slot(index, size)?;
        self.core.about_to_set_value();
        if slot == size {
            self.values.push(value);
        } else {
            self.values[slot] = value;
        }
        self.core.has_set_value();
        Ok(())
    }

    /// Truncate or pad with default elements
    pub fn set_size(&mut self, size: usize) {
        self.core.about_to_set_value();
        self.values.resize(size, T::default());
        self.core.has_set_value();
    }

    /// `{index: value}` updates; applied all at once or not at all
    fn update_from_dict(&mut self, pairs: &[(DynValue, DynValue)]) -> Result<()> {
        let mut values = self.values.clone();
        for (key, value) in pairs {
            let index = key
                .as_int()
                .ok_or_else(|| type_error("expect key type to be integer", key))?;
            let slot = checked_slot(index, values.len())?;
            let element = T::element_from_dynamic(value)?;
            if slot == values.len() {
                values.push(element);
            } else {
                values[slot] = element;
            }
        }
        self.set_values(values);
        Ok(())
    }
}

/// Slot addressed by `index` in a list of `size`; `-1` and `size` append
pub(crate) fn checked_slot(index: i64, size: usize) -> Result<usize> {
    if index == -1 {
        return Ok(size);
    }
    if index < 0 || index as usize > size {
        return Err(PropertyError::IndexOutOfBounds { index, size });
    }
    Ok(index as usize)
}

impl<T: ListElement> Property for PropertyList<T> {
    fn kind(&self) -> PropertyKind {
        T::KIND
    }

    fn core(&self) -> &PropertyCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut PropertyCore {
        &mut self.core
    }

    fn to_dynamic(&self) -> DynValue {
        T::bulk_to_dynamic(&self.values)
    }

    fn from_dynamic(&mut self, value: &DynValue) -> Result<()> {
        if let Some(pairs) = value.as_dict() {
            return self.update_from_dict(pairs);
        }
        let values = T::bulk_from_dynamic(value)?;
        self.set_values(values);
        Ok(())
    }

    fn save(&self, writer: &mut Writer) -> Result<()> {
        T::save_list(&self.values, self.core.name(), writer);
        Ok(())
    }

    fn restore(&mut self, reader: &mut XmlReader) -> Result<()> {
        let owner = self.core.name().to_string();
        if let Some(values) = T::restore_list(reader, &owner)? {
            self.set_values(values);
        }
        Ok(())
    }

    /// Lists kept inline in the XML have no side file; nothing is written
    fn save_doc_file(&self, out: &mut dyn Write) -> Result<()> {
        if !T::BLOB {
            return Ok(());
        }
        let mut stream = OutputStream::new(out);
        T::write_blob(&self.values, self.core.status(), &mut stream)
    }

    fn restore_doc_file(&mut self, input: &mut dyn Read) -> Result<()> {
        if !T::BLOB {
            return Ok(());
        }
        let mut stream = InputStream::new(input);
        let values = T::read_blob(self.core.status(), &mut stream)?;
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
        let source = paste_source::<Self>(T::KIND, from)?;
        self.set_values(source.values.clone());
        Ok(())
    }

    fn mem_size(&self) -> usize {
        self.values.capacity() * std::mem::size_of::<T>()
            + self.values.iter().map(T::heap_size).sum::<usize>()
    }

    /// Accepts a native `Vec` of the element type or a dynamic value
    fn set_path_value(&mut self, sub_path: &str, value: &dyn Any) -> Result<()> {
        self.verify_path(sub_path)?;
        if let Some(values) = value.downcast_ref::<Vec<T>>() {
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
    use crate::notify::ChangeRecorder;
    use std::sync::Arc;

    fn restore_from(xml: &str, cell: &mut dyn Property) -> XmlReader {
        let mut reader = XmlReader::parse(xml).unwrap();
        cell.restore(&mut reader).unwrap();
        reader
    }

    #[test]
    fn test_integer_list_xml() {
        let cell = PropertyIntegerList::with_values("Ids", vec![1, 2, 3]);
        let mut writer = Writer::new();
        cell.save(&mut writer).unwrap();
        let compact: String = writer.as_str().lines().map(str::trim).collect();
        assert_eq!(
            compact,
            "<IntegerList count=\"3\"><I v=\"1\"/><I v=\"2\"/><I v=\"3\"/></IntegerList>"
        );

        let mut fresh = PropertyIntegerList::new("Ids");
        restore_from(writer.as_str(), &mut fresh);
        assert_eq!(fresh.values(), &[1, 2, 3]);
    }

    #[test]
    fn test_bool_list_bit_string() {
        let cell = PropertyBoolList::with_values("Flags", vec![true, false, true]);
        let mut writer = Writer::new();
        cell.save(&mut writer).unwrap();
        assert_eq!(writer.as_str(), "<BoolList value=\"101\"/>\n");

        let cell = PropertyBoolList::with_values("Flags", vec![true, true, false]);
        let mut writer = Writer::new();
        cell.save(&mut writer).unwrap();
        assert_eq!(writer.as_str(), "<BoolList value=\"011\"/>\n");

        let mut fresh = PropertyBoolList::new("Flags");
        restore_from(writer.as_str(), &mut fresh);
        assert_eq!(fresh.values(), &[true, true, false]);
        assert_eq!(
            fresh.to_dynamic(),
            DynValue::tuple([DynValue::Bool(true), DynValue::Bool(true), DynValue::Bool(false)])
        );
    }

    #[test]
    fn test_float_list_side_file() {
        let cell = PropertyFloatList::with_values("Weights", vec![0.5, 2.25]);
        let mut writer = Writer::new();
        cell.save(&mut writer).unwrap();
        assert_eq!(writer.as_str(), "<FloatList file=\"Weights\"/>\n");
        assert_eq!(writer.files()[0].owner, "Weights");

        let mut blob = Vec::new();
        cell.save_doc_file(&mut blob).unwrap();
        assert_eq!(blob.len(), 4 + 2 * 8);

        let mut fresh = PropertyFloatList::new("Weights");
        let mut reader = restore_from(writer.as_str(), &mut fresh);
        assert!(fresh.is_empty());
        let pending = reader.take_files();
        assert_eq!(pending[0].file_name, "Weights");
        fresh.restore_doc_file(&mut blob.as_slice()).unwrap();
        assert_eq!(fresh.values(), &[0.5, 2.25]);
    }

    #[test]
    fn test_float_list_single_precision() {
        let mut cell = PropertyFloatList::with_values("Weights", vec![3.14159]);
        cell.core_mut().set_status(PropertyStatus::SINGLE_PRECISION, true);
        let mut blob = Vec::new();
        cell.save_doc_file(&mut blob).unwrap();
        assert_eq!(blob.len(), 4 + 4);

        let mut fresh = PropertyFloatList::new("Weights");
        fresh.core_mut().set_status(PropertyStatus::SINGLE_PRECISION, true);
        fresh.restore_doc_file(&mut blob.as_slice()).unwrap();
        assert_eq!(fresh.values(), &[3.14159f32 as f64]);
    }

    #[test]
    fn test_forced_xml_and_empty_file() {
        let cell = PropertyColorList::with_values("Colors", vec![Color::new(1.0, 0.0, 0.0, 0.0)]);
        let mut writer = Writer::new();
        writer.set_force_xml(true);
        cell.save(&mut writer).unwrap();
        assert!(writer.files().is_empty());

        let mut fresh = PropertyColorList::new("Colors");
        restore_from(writer.as_str(), &mut fresh);
        assert_eq!(fresh.values(), cell.values());

        let mut writer = Writer::new();
        PropertyColorList::new("Colors").save(&mut writer).unwrap();
        assert_eq!(writer.as_str(), "<ColorList file=\"\"/>\n");
        let reader = restore_from(writer.as_str(), &mut fresh);
        assert!(fresh.is_empty());
        assert!(reader.files().is_empty());
    }

    #[test]
    fn test_inline_lists_ignore_side_files() {
        let recorder = Arc::new(ChangeRecorder::new("Body"));
        let mut ids = PropertyIntegerList::with_values("Ids", vec![1, 2, 3]);
        ids.core_mut().attach(recorder.clone());
        ids.restore_doc_file(&mut [3u8, 0, 0, 0].as_slice()).unwrap();
        assert_eq!(ids.values(), &[1, 2, 3]);
        assert_eq!(recorder.after_count("Ids"), 0);

        let mut blob = Vec::new();
        ids.save_doc_file(&mut blob).unwrap();
        assert!(blob.is_empty());

        let mut flags = PropertyBoolList::with_values("Flags", vec![true]);
        flags.restore_doc_file(&mut [1u8, 0, 0, 0].as_slice()).unwrap();
        assert_eq!(flags.values(), &[true]);
    }

    #[test]
    fn test_color_item_wider_than_32_bits_rejected() {
        let xml = format!("<ColorList count=\"1\"><C v=\"{}\"/></ColorList>", 1u64 << 32);
        let mut reader = XmlReader::parse(&xml).unwrap();
        let mut cell = PropertyColorList::with_values("Colors", vec![Color::rgb(1.0, 0.0, 0.0)]);
        assert!(cell.restore(&mut reader).unwrap_err().is_value_rejected());
        assert_eq!(cell.size(), 1);
    }

    #[test]
    fn test_string_list_escaping_and_bytes() {
        let mut cell = PropertyStringList::new("Names");
        cell.from_dynamic(&DynValue::list([
            DynValue::from("a<b"),
            DynValue::Bytes(b"caf\xc3\xa9".to_vec()),
        ]))
        .unwrap();
        assert_eq!(cell.values(), &["a<b".to_string(), "café".to_string()]);

        let mut writer = Writer::new();
        cell.save(&mut writer).unwrap();
        let mut fresh = PropertyStringList::new("Names");
        restore_from(writer.as_str(), &mut fresh);
        assert_eq!(fresh.values(), cell.values());

        let err = cell.from_dynamic(&DynValue::Bytes(vec![0xff])).unwrap_err();
        assert!(matches!(err, PropertyError::Encoding(_)));
        let err = cell.from_dynamic(&DynValue::list([DynValue::Int(1)])).unwrap_err();
        assert_eq!(err.to_string(), "type in list must be str or unicode, not int");
    }

    #[test]
    fn test_dynamic_coercions() {
        let mut floats = PropertyFloatList::new("F");
        floats.from_dynamic(&DynValue::list([DynValue::Int(1), DynValue::Float(0.5)])).unwrap();
        assert_eq!(floats.values(), &[1.0, 0.5]);
        floats.from_dynamic(&DynValue::Float(7.0)).unwrap();
        assert_eq!(floats.values(), &[7.0]);

        let mut ints = PropertyIntegerList::new("I");
        let err = ints.from_dynamic(&DynValue::list([DynValue::Float(1.0)])).unwrap_err();
        assert_eq!(err.to_string(), "type in list must be int, not float");

        let mut bools = PropertyBoolList::new("B");
        bools.from_dynamic(&DynValue::from("110")).unwrap();
        assert_eq!(bools.values(), &[false, true, true]);

        let mut colors = PropertyColorList::new("C");
        colors
            .from_dynamic(&DynValue::tuple([DynValue::Float(0.0), DynValue::Float(1.0), DynValue::Float(0.0)]))
            .unwrap();
        assert_eq!(colors.values(), &[Color::rgb(0.0, 1.0, 0.0)]);
    }

    #[test]
    fn test_partial_update_and_bounds() {
        let mut cell = PropertyIntegerList::with_values("I", vec![1, 2, 3]);
        let update = DynValue::Dict(vec![
            (DynValue::Int(0), DynValue::Int(10)),
            (DynValue::Int(3), DynValue::Int(40)),
        ]);
        cell.from_dynamic(&update).unwrap();
        assert_eq!(cell.values(), &[10, 2, 3, 40]);

        let bad = DynValue::Dict(vec![
            (DynValue::Int(1), DynValue::Int(0)),
            (DynValue::Int(9), DynValue::Int(0)),
        ]);
        let err = cell.from_dynamic(&bad).unwrap_err();
        assert!(matches!(err, PropertyError::IndexOutOfBounds { index: 9, size: 4 }));
        assert_eq!(cell.values(), &[10, 2, 3, 40]);

        cell.set_value_at(-1, 50).unwrap();
        cell.set_value_at(1, 20).unwrap();
        assert_eq!(cell.values(), &[10, 20, 3, 40, 50]);
        assert!(cell.set_value_at(7, 0).is_err());
        assert!(cell.set_value_at(-2, 0).is_err());
    }

    #[test]
    fn test_set_size_and_paste() {
        let recorder = Arc::new(ChangeRecorder::new("Obj"));
        let mut cell = PropertyStringList::new("Names");
        cell.core_mut().attach(recorder.clone());
        cell.set_size(2);
        assert_eq!(cell.values(), &[String::new(), String::new()]);

        let source = PropertyStringList::with_values("Other", vec!["x".to_string()]);
        cell.paste(&source).unwrap();
        assert_eq!(cell.values(), &["x".to_string()]);
        assert_eq!(recorder.after_count("Names"), 2);

        let wrong = PropertyIntegerList::new("I");
        assert!(cell.paste(&wrong).is_err());
    }

    #[test]
    fn test_path_value_accepts_native_vec() {
        let mut cell = PropertyIntegerList::new("I");
        cell.set_path_value("", &vec![4i64, 5]).unwrap();
        assert_eq!(cell.values(), &[4, 5]);
        let out = cell.get_path_value("").unwrap();
        assert_eq!(
            out.downcast_ref::<DynValue>(),
            Some(&DynValue::list([DynValue::Int(4), DynValue::Int(5)]))
        );
    }
}
