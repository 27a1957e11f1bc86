//! # Scalar Cells
//!
//! Integer, float and bool cells share one generic implementation,
//! `PropertyScalar<T>`; each value type supplies its XML tag and its
//! dynamic and path coercions through `ScalarValue`.

use std::any::Any;
use std::fmt;

use docprop_stream::{Writer, XmlReader};

use crate::dynamic::DynValue;
use crate::error::{bad_cast, type_error, Result};
use crate::property::{paste_source, path_float, path_int, Property, PropertyCore, PropertyKind};

// ============================================================================
// Scalar Value Types
// ============================================================================

/// A value type stored in a `PropertyScalar`
pub trait ScalarValue: Clone + PartialEq + Default + fmt::Debug + Send + Sync + 'static {
    const KIND: PropertyKind;
    /// Element written by `save`
    const TAG: &'static str;

    fn to_attribute(&self) -> String;

    /// Parse the `value` attribute of the current element
    fn read_value(reader: &XmlReader) -> Result<Self>;

    fn to_dynamic(&self) -> DynValue;

    fn from_dynamic(value: &DynValue) -> Result<Self>;

    fn from_path_value(value: &dyn Any) -> Option<Self>;
}

impl ScalarValue for i64 {
    const KIND: PropertyKind = PropertyKind::Integer;
    const TAG: &'static str = "Integer";

    fn to_attribute(&self) -> String {
        self.to_string()
    }

    fn read_value(reader: &XmlReader) -> Result<Self> {
        Ok(reader.get_attribute_as_integer("value")?)
    }

    fn to_dynamic(&self) -> DynValue {
        DynValue::Int(*self)
    }

    /// Floats are rounded half away from zero
    fn from_dynamic(value: &DynValue) -> Result<Self> {
        match value {
            DynValue::Int(i) => Ok(*i),
            DynValue::Float(f) => Ok(f.round() as i64),
            other => Err(type_error("type must be int or float", other)),
        }
    }

    fn from_path_value(value: &dyn Any) -> Option<Self> {
        path_int(value).or_else(|| path_float(value).map(|f| f.round() as i64))
    }
}

impl ScalarValue for f64 {
    const KIND: PropertyKind = PropertyKind::Float;
    const TAG: &'static str = "Float";

    fn to_attribute(&self) -> String {
        self.to_string()
    }

    fn read_value(reader: &XmlReader) -> Result<Self> {
        Ok(reader.get_attribute_as_float("value")?)
    }

    fn to_dynamic(&self) -> DynValue {
        DynValue::Float(*self)
    }

    fn from_dynamic(value: &DynValue) -> Result<Self> {
        value
            .as_number()
            .ok_or_else(|| type_error("type must be float or int", value))
    }

    fn from_path_value(value: &dyn Any) -> Option<Self> {
        path_float(value)
            .or_else(|| path_int(value).map(|i| i as f64))
            .or_else(|| value.downcast_ref::<u64>().map(|u| *u as f64))
    }
}

impl ScalarValue for bool {
    const KIND: PropertyKind = PropertyKind::Bool;
    const TAG: &'static str = "Bool";

    fn to_attribute(&self) -> String {
        let text = if *self { "true" } else { "false" };
        text.to_string()
    }

    /// Anything but `"true"` reads as false
    fn read_value(reader: &XmlReader) -> Result<Self> {
        Ok(reader.get_attribute("value")? == "true")
    }

    fn to_dynamic(&self) -> DynValue {
        DynValue::Bool(*self)
    }

    fn from_dynamic(value: &DynValue) -> Result<Self> {
        match value {
            DynValue::Bool(b) => Ok(*b),
            DynValue::Int(i) => Ok(*i != 0),
            other => Err(type_error("type must be bool or int", other)),
        }
    }

    fn from_path_value(value: &dyn Any) -> Option<Self> {
        if let Some(b) = value.downcast_ref::<bool>() {
            return Some(*b);
        }
        path_int(value)
            .map(|i| i != 0)
            .or_else(|| path_float(value).map(|f| f.round() != 0.0))
    }
}

// ============================================================================
// PropertyScalar
// ============================================================================

/// Cell holding a single scalar
#[derive(Debug, Clone, Default)]
pub struct PropertyScalar<T> {
    core: PropertyCore,
    value: T,
}

pub type PropertyInteger = PropertyScalar<i64>;
pub type PropertyFloat = PropertyScalar<f64>;
pub type PropertyBool = PropertyScalar<bool>;

impl<T: ScalarValue> PropertyScalar<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            core: PropertyCore::new(name),
            value: T::default(),
        }
    }

    pub fn with_value(name: impl Into<String>, value: T) -> Self {
        Self {
            core: PropertyCore::new(name),
            value,
        }
    }

    pub fn value(&self) -> T {
        self.value.clone()
    }

    pub fn set_value(&mut self, value: T) {
        self.core.about_to_set_value();
        self.value = value;
        self.core.has_set_value();
    }
}

impl<T: ScalarValue> Property for PropertyScalar<T> {
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
        self.value.to_dynamic()
    }

    fn from_dynamic(&mut self, value: &DynValue) -> Result<()> {
        let value = T::from_dynamic(value)?;
        self.set_value(value);
        Ok(())
    }

    fn save(&self, writer: &mut Writer) -> Result<()> {
        writer.empty_element(T::TAG, &[("value", self.value.to_attribute().as_str())]);
        Ok(())
    }

    fn restore(&mut self, reader: &mut XmlReader) -> Result<()> {
        reader.read_element(T::TAG)?;
        let value = T::read_value(reader)?;
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
        let source = paste_source::<Self>(T::KIND, from)?;
        self.set_value(source.value.clone());
        Ok(())
    }

    fn mem_size(&self) -> usize {
        std::mem::size_of::<T>()
    }

    fn set_path_value(&mut self, sub_path: &str, value: &dyn Any) -> Result<()> {
        self.verify_path(sub_path)?;
        match T::from_path_value(value) {
            Some(v) => {
                self.set_value(v);
                Ok(())
            }
            None => Err(bad_cast(&self.core.full_name(), value)),
        }
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PropertyError;
    use crate::notify::ChangeRecorder;
    use std::sync::Arc;

    fn round_trip(cell: &dyn Property, fresh: &mut dyn Property) -> String {
        let mut writer = Writer::new();
        cell.save(&mut writer).unwrap();
        let xml = writer.into_string();
        let mut reader = XmlReader::parse(&xml).unwrap();
        fresh.restore(&mut reader).unwrap();
        xml
    }

    #[test]
    fn test_integer_xml() {
        let cell = PropertyInteger::with_value("Count", -42);
        let mut fresh = PropertyInteger::new("Count");
        let xml = round_trip(&cell, &mut fresh);
        assert_eq!(xml, "<Integer value=\"-42\"/>\n");
        assert_eq!(fresh.value(), -42);
    }

    #[test]
    fn test_float_and_bool_round_trip() {
        let cell = PropertyFloat::with_value("Ratio", 0.1);
        let mut fresh = PropertyFloat::new("Ratio");
        round_trip(&cell, &mut fresh);
        assert_eq!(fresh.value(), 0.1);

        let cell = PropertyBool::with_value("Visible", true);
        let mut fresh = PropertyBool::new("Visible");
        let xml = round_trip(&cell, &mut fresh);
        assert_eq!(xml, "<Bool value=\"true\"/>\n");
        assert!(fresh.value());
    }

    #[test]
    fn test_integer_rounds_floats() {
        let mut cell = PropertyInteger::new("N");
        cell.from_dynamic(&DynValue::Float(2.5)).unwrap();
        assert_eq!(cell.value(), 3);
        cell.from_dynamic(&DynValue::Float(-2.5)).unwrap();
        assert_eq!(cell.value(), -3);

        let err = cell.from_dynamic(&DynValue::Str("7".into())).unwrap_err();
        assert_eq!(err.to_string(), "type must be int or float, not str");
        assert_eq!(cell.value(), -3);
    }

    #[test]
    fn test_float_accepts_int_and_bool_accepts_int() {
        let mut f = PropertyFloat::new("F");
        f.from_dynamic(&DynValue::Int(4)).unwrap();
        assert_eq!(f.value(), 4.0);
        assert!(f.from_dynamic(&DynValue::Bool(true)).unwrap_err().is_type_mismatch());

        let mut b = PropertyBool::new("B");
        b.from_dynamic(&DynValue::Int(2)).unwrap();
        assert!(b.value());
        b.from_dynamic(&DynValue::Int(0)).unwrap();
        assert!(!b.value());
    }

    #[test]
    fn test_path_values() {
        let mut cell = PropertyInteger::new("N");
        cell.set_path_value("", &7.6f64).unwrap();
        assert_eq!(cell.value(), 8);
        cell.set_path_value("", &3i32).unwrap();
        assert_eq!(cell.value(), 3);

        let err = cell.set_path_value("", &String::from("9")).unwrap_err();
        assert!(matches!(err, PropertyError::BadCast { .. }));
        assert!(matches!(
            cell.set_path_value(".x", &1i64),
            Err(PropertyError::InvalidPath { .. })
        ));

        let out = cell.get_path_value("").unwrap();
        assert_eq!(out.downcast_ref::<i64>(), Some(&3));
    }

    #[test]
    fn test_copy_is_independent() {
        let mut cell = PropertyFloat::with_value("F", 1.5);
        let copy = cell.copy();
        cell.set_value(9.0);
        assert_eq!(copy.to_dynamic(), DynValue::Float(1.5));
        assert!(!copy.core().is_attached());
    }

    #[test]
    fn test_paste_brackets_once() {
        let recorder = Arc::new(ChangeRecorder::new("Obj"));
        let mut target = PropertyInteger::new("N");
        target.core_mut().attach(recorder.clone());

        let source = PropertyInteger::with_value("Other", 11);
        target.paste(&source).unwrap();
        assert_eq!(target.value(), 11);
        assert_eq!(recorder.before_count("N"), 1);
        assert_eq!(recorder.after_count("N"), 1);

        let wrong = PropertyFloat::with_value("F", 1.0);
        let err = target.paste(&wrong).unwrap_err();
        assert!(matches!(err, PropertyError::SameKindMismatch { .. }));
        assert_eq!(recorder.after_count("N"), 1);
    }
}
