//! # Color
//!
//! RGBA color with `f32` channels in `0..=1`, packed as `0xRRGGBBAA` for
//! persistence, and the single color cell.

use std::any::Any;

use docprop_stream::{Writer, XmlReader};
use serde::{Deserialize, Serialize};

use crate::dynamic::DynValue;
use crate::error::{bad_cast, type_error, PropertyError, Result};
use crate::property::{paste_source, Property, PropertyCore, PropertyKind};

// ============================================================================
// Color Value
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self::new(r, g, b, 0.0)
    }

    /// `0xRRGGBBAA`; channels are clamped to `0..=255` after rounding
    pub fn packed(&self) -> u32 {
        let channel = |c: f32| (c * 255.0 + 0.5).clamp(0.0, 255.0) as u32;
        (channel(self.r) << 24) | (channel(self.g) << 16) | (channel(self.b) << 8) | channel(self.a)
    }

    pub fn from_packed(packed: u32) -> Self {
        let channel = |shift: u32| ((packed >> shift) & 0xff) as f32 / 255.0;
        Self::new(channel(24), channel(16), channel(8), channel(0))
    }

    /// Packed value from a wider integer; anything outside `u32` is rejected
    pub fn try_from_packed(packed: i64) -> Result<Self> {
        u32::try_from(packed).map(Self::from_packed).map_err(|_| {
            PropertyError::ValueRejected(format!("{} is not a packed 32-bit color", packed))
        })
    }

    pub fn to_dynamic(&self) -> DynValue {
        DynValue::tuple([
            DynValue::from(self.r),
            DynValue::from(self.g),
            DynValue::from(self.b),
            DynValue::from(self.a),
        ])
    }

    /// Accepts a 3 or 4 tuple of floats (`0..=1`) or of ints (`0..=255`),
    /// or an int holding the packed value. Alpha defaults to 0.
    pub fn from_dynamic(value: &DynValue) -> Result<Self> {
        match value {
            DynValue::Int(packed) => Self::try_from_packed(*packed),
            DynValue::Tuple(items) if items.len() == 3 || items.len() == 4 => {
                let channels = match &items[0] {
                    DynValue::Float(_) => items
                        .iter()
                        .map(|item| match item {
                            DynValue::Float(f) => Ok(*f as f32),
                            DynValue::Int(_) => Err(PropertyError::TypeMismatch(
                                "Type in tuple must be consistent (float)".to_string(),
                            )),
                            _ => Err(channel_error()),
                        })
                        .collect::<Result<Vec<f32>>>()?,
                    DynValue::Int(_) => items
                        .iter()
                        .map(|item| match item {
                            DynValue::Int(i) => Ok(*i as f32 / 255.0),
                            DynValue::Float(_) => Err(PropertyError::TypeMismatch(
                                "Type in tuple must be consistent (integer)".to_string(),
                            )),
                            _ => Err(channel_error()),
                        })
                        .collect::<Result<Vec<f32>>>()?,
                    _ => return Err(channel_error()),
                };
                let alpha = channels.get(3).copied().unwrap_or(0.0);
                Ok(Self::new(channels[0], channels[1], channels[2], alpha))
            }
            other => Err(type_error(
                "type must be integer or tuple of float or tuple integer",
                other,
            )),
        }
    }
}

fn channel_error() -> PropertyError {
    PropertyError::TypeMismatch("Type in tuple must be float or integer".to_string())
}

impl From<u32> for Color {
    fn from(packed: u32) -> Self {
        Self::from_packed(packed)
    }
}

// ============================================================================
// PropertyColor
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct PropertyColor {
    core: PropertyCore,
    value: Color,
}

impl PropertyColor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            core: PropertyCore::new(name),
            value: Color::default(),
        }
    }

    pub fn value(&self) -> Color {
        self.value
    }

    pub fn set_value(&mut self, value: Color) {
        self.core.about_to_set_value();
        self.value = value;
        self.core.has_set_value();
    }

    pub fn set_packed(&mut self, packed: u32) {
        self.set_value(Color::from_packed(packed));
    }
}

impl Property for PropertyColor {
    fn kind(&self) -> PropertyKind {
        PropertyKind::Color
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
        let color = Color::from_dynamic(value)?;
        self.set_value(color);
        Ok(())
    }

    fn save(&self, writer: &mut Writer) -> Result<()> {
        let packed = self.value.packed().to_string();
        writer.empty_element("PropertyColor", &[("value", packed.as_str())]);
        Ok(())
    }

    fn restore(&mut self, reader: &mut XmlReader) -> Result<()> {
        reader.read_element("PropertyColor")?;
        let color = read_packed(reader, "value")?;
        self.set_value(color);
        Ok(())
    }

    fn copy(&self) -> Box<dyn Property> {
        Box::new(Self {
            core: self.core.detached(),
            value: self.value,
        })
    }

    fn paste(&mut self, from: &dyn Property) -> Result<()> {
        let source = paste_source::<Self>(PropertyKind::Color, from)?;
        self.set_value(source.value);
        Ok(())
    }

    fn mem_size(&self) -> usize {
        std::mem::size_of::<Color>()
    }

    fn set_path_value(&mut self, sub_path: &str, value: &dyn Any) -> Result<()> {
        self.verify_path(sub_path)?;
        if let Some(color) = value.downcast_ref::<Color>() {
            self.set_value(*color);
            Ok(())
        } else if let Some(packed) = value.downcast_ref::<u32>() {
            self.set_packed(*packed);
            Ok(())
        } else if let Some(dynamic) = value.downcast_ref::<DynValue>() {
            self.from_dynamic(dynamic)
        } else {
            Err(bad_cast(&self.core.full_name(), value))
        }
    }

    fn get_path_value(&self, sub_path: &str) -> Result<Box<dyn Any + Send>> {
        self.verify_path(sub_path)?;
        Ok(Box::new(self.value))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Packed color attribute of the current element
pub(crate) fn read_packed(reader: &XmlReader, attribute: &str) -> Result<Color> {
    let packed = reader.get_attribute_as_unsigned(attribute)?;
    u32::try_from(packed).map(Color::from_packed).map_err(|_| {
        PropertyError::ValueRejected(format!(
            "{}=\"{}\" is not a packed 32-bit color",
            attribute, packed
        ))
    })
}
