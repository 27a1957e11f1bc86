//! # Material Cells
//!
//! `Material` bundles the four shading colors, shininess, transparency and
//! texture identifiers. `PropertyMaterial` holds one; `PropertyMaterialList`
//! holds a list that is never empty and persists to a versioned side file.
//!
//! ## Table of Contents
//! 1. Material - the composite value
//! 2. PropertyMaterial - single material cell
//! 3. PropertyMaterialList - per-face materials
//! 4. Side file format versions
//!
//! ## Side file versions
//!
//! | version | layout                                                          |
//! |---------|-----------------------------------------------------------------|
//! | 0 / 1   | leading `i32`: negative means a `u32` count follows, else count |
//! | 2       | `u32` count, fixed records                                      |
//! | 3       | `u32` count, fixed records, then three strings per element      |
//!
//! A fixed record is four packed colors followed by shininess and
//! transparency as `f32`. Only version 3 is written.

use std::any::Any;
use std::io::{Read, Write};

use docprop_stream::{InputStream, OutputStream, Writer, XmlReader};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::color::{read_packed, Color};
use crate::dynamic::{DynValue, Handle};
use crate::error::{bad_cast, type_error, PropertyError, Result};
use crate::list::checked_slot;
use crate::property::{paste_source, Property, PropertyCore, PropertyKind};

/// Side file format written by `PropertyMaterialList`
pub const MATERIAL_LIST_VERSION: u32 = 3;

// ============================================================================
// Material
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Material {
    pub ambient_color: Color,
    pub diffuse_color: Color,
    pub specular_color: Color,
    pub emissive_color: Color,
    pub shininess: f32,
    pub transparency: f32,
    pub image: String,
    pub image_path: String,
    pub uuid: String,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            ambient_color: Color::new(0.2, 0.2, 0.2, 0.0),
            diffuse_color: Color::new(0.8, 0.8, 0.8, 0.0),
            specular_color: Color::default(),
            emissive_color: Color::default(),
            shininess: 0.9,
            transparency: 0.0,
            image: String::new(),
            image_path: String::new(),
            uuid: String::new(),
        }
    }
}

impl Material {
    /// Dynamic handle carrying a copy of this material
    pub fn to_handle(&self) -> Handle {
        Handle::new("Material", self.clone())
    }

    fn from_handle(handle: &Handle) -> Option<Material> {
        handle.downcast_ref::<Material>().cloned()
    }

    fn write_record(&self, out: &mut OutputStream<'_>) -> Result<()> {
        out.write_u32(self.ambient_color.packed())?;
        out.write_u32(self.diffuse_color.packed())?;
        out.write_u32(self.specular_color.packed())?;
        out.write_u32(self.emissive_color.packed())?;
        out.write_f32(self.shininess)?;
        out.write_f32(self.transparency)?;
        Ok(())
    }

    /// Fixed record; the texture strings are left empty
    fn read_record(input: &mut InputStream<'_>) -> Result<Material> {
        Ok(Material {
            ambient_color: Color::from_packed(input.read_u32()?),
            diffuse_color: Color::from_packed(input.read_u32()?),
            specular_color: Color::from_packed(input.read_u32()?),
            emissive_color: Color::from_packed(input.read_u32()?),
            shininess: input.read_f32()?,
            transparency: input.read_f32()?,
            ..Material::default()
        })
    }

    fn save_element(&self, writer: &mut Writer) {
        let ambient = self.ambient_color.packed().to_string();
        let diffuse = self.diffuse_color.packed().to_string();
        let specular = self.specular_color.packed().to_string();
        let emissive = self.emissive_color.packed().to_string();
        let shininess = self.shininess.to_string();
        let transparency = self.transparency.to_string();
        writer.empty_element(
            "PropertyMaterial",
            &[
                ("ambientColor", ambient.as_str()),
                ("diffuseColor", diffuse.as_str()),
                ("specularColor", specular.as_str()),
                ("emissiveColor", emissive.as_str()),
                ("shininess", shininess.as_str()),
                ("transparency", transparency.as_str()),
                ("image", self.image.as_str()),
                ("imagePath", self.image_path.as_str()),
                ("uuid", self.uuid.as_str()),
            ],
        );
    }

    /// Reads the current `PropertyMaterial` element; texture attributes are optional
    fn read_element(reader: &XmlReader) -> Result<Material> {
        let packed = |name: &str| read_packed(reader, name);
        let optional = |name: &str| -> Result<String> {
            if reader.has_attribute(name) {
                Ok(reader.get_attribute(name)?.to_string())
            } else {
                Ok(String::new())
            }
        };
        Ok(Material {
            ambient_color: packed("ambientColor")?,
            diffuse_color: packed("diffuseColor")?,
            specular_color: packed("specularColor")?,
            emissive_color: packed("emissiveColor")?,
            shininess: reader.get_attribute_as_float("shininess")? as f32,
            transparency: reader.get_attribute_as_float("transparency")? as f32,
            image: optional("image")?,
            image_path: optional("imagePath")?,
            uuid: optional("uuid")?,
        })
    }
}

// ============================================================================
// PropertyMaterial
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct PropertyMaterial {
    core: PropertyCore,
    value: Material,
}

impl PropertyMaterial {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            core: PropertyCore::new(name),
            value: Material::default(),
        }
    }

    pub fn value(&self) -> &Material {
        &self.value
    }

    pub fn set_value(&mut self, value: Material) {
        self.update(|m| *m = value);
    }

    pub fn set_ambient_color(&mut self, color: Color) {
        self.update(|m| m.ambient_color = color);
    }

    pub fn set_diffuse_color(&mut self, color: Color) {
        self.update(|m| m.diffuse_color = color);
    }

    pub fn set_specular_color(&mut self, color: Color) {
        self.update(|m| m.specular_color = color);
    }

    pub fn set_emissive_color(&mut self, color: Color) {
        self.update(|m| m.emissive_color = color);
    }

    pub fn set_shininess(&mut self, shininess: f32) {
        self.update(|m| m.shininess = shininess);
    }

    pub fn set_transparency(&mut self, transparency: f32) {
        self.update(|m| m.transparency = transparency);
    }

    pub fn ambient_color(&self) -> Color {
        self.value.ambient_color
    }

    pub fn diffuse_color(&self) -> Color {
        self.value.diffuse_color
    }

    pub fn specular_color(&self) -> Color {
        self.value.specular_color
    }

    pub fn emissive_color(&self) -> Color {
        self.value.emissive_color
    }

    pub fn shininess(&self) -> f32 {
        self.value.shininess
    }

    pub fn transparency(&self) -> f32 {
        self.value.transparency
    }

    fn update(&mut self, apply: impl FnOnce(&mut Material)) {
        self.core.about_to_set_value();
        apply(&mut self.value);
        self.core.has_set_value();
    }
}

impl Property for PropertyMaterial {
    fn kind(&self) -> PropertyKind {
        PropertyKind::Material
    }

    fn core(&self) -> &PropertyCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut PropertyCore {
        &mut self.core
    }

    fn to_dynamic(&self) -> DynValue {
        DynValue::Handle(self.value.to_handle())
    }

    /// A material handle replaces the value; a color sets the diffuse color
    fn from_dynamic(&mut self, value: &DynValue) -> Result<()> {
        if let Some(material) = value.as_handle().and_then(Material::from_handle) {
            self.set_value(material);
            return Ok(());
        }
        let color = Color::from_dynamic(value)?;
        self.set_diffuse_color(color);
        Ok(())
    }

    fn save(&self, writer: &mut Writer) -> Result<()> {
        self.value.save_element(writer);
        Ok(())
    }

    fn restore(&mut self, reader: &mut XmlReader) -> Result<()> {
        reader.read_element("PropertyMaterial")?;
        let material = Material::read_element(reader)?;
        self.set_value(material);
        Ok(())
    }

    fn copy(&self) -> Box<dyn Property> {
        Box::new(Self {
            core: self.core.detached(),
            value: self.value.clone(),
        })
    }

    fn paste(&mut self, from: &dyn Property) -> Result<()> {
        let source = paste_source::<Self>(PropertyKind::Material, from)?;
        self.set_value(source.value.clone());
        Ok(())
    }

    fn mem_size(&self) -> usize {
        std::mem::size_of::<Material>()
    }

    fn set_path_value(&mut self, sub_path: &str, value: &dyn Any) -> Result<()> {
        self.verify_path(sub_path)?;
        if let Some(material) = value.downcast_ref::<Material>() {
            self.set_value(material.clone());
            Ok(())
        } else if let Some(dynamic) = value.downcast_ref::<DynValue>() {
            self.from_dynamic(dynamic)
        } else {
            Err(bad_cast(&self.core.full_name(), value))
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

// ============================================================================
// PropertyMaterialList
// ============================================================================

/// List of materials, never empty after a mutation through its setters
#[derive(Debug, Clone)]
pub struct PropertyMaterialList {
    core: PropertyCore,
    values: Vec<Material>,
    /// Version announced by the last restored `MaterialList` element
    format_version: Option<u32>,
}

impl Default for PropertyMaterialList {
    fn default() -> Self {
        Self::new("")
    }
}

impl PropertyMaterialList {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            core: PropertyCore::new(name),
            values: vec![Material::default()],
            format_version: None,
        }
    }

    pub fn size(&self) -> usize {
        self.values.len()
    }

    pub fn values(&self) -> &[Material] {
        &self.values
    }

    pub fn material(&self, index: usize) -> Option<&Material> {
        self.values.get(index)
    }

    /// Replace all materials; an empty input leaves one default material
    pub fn set_values(&mut self, values: Vec<Material>) {
        self.core.about_to_set_value();
        self.values = values;
        if self.values.is_empty() {
            self.values.push(Material::default());
        }
        self.core.has_set_value();
    }

    /// Collapse to a single material
    pub fn set_value(&mut self, material: Material) {
        self.set_values(vec![material]);
    }

    /// Reset to one default material
    pub fn set_default(&mut self) {
        self.set_value(Material::default());
    }

    /// `-1` or `size` appends
    pub fn set_value_at(&mut self, index: i64, material: Material) -> Result<()> {
        self.update_at(index, |m| *m = material)
    }

    pub fn set_ambient_color(&mut self, color: Color) {
        self.update_all(|m| m.ambient_color = color);
    }

    pub fn set_diffuse_color(&mut self, color: Color) {
        self.update_all(|m| m.diffuse_color = color);
    }

    pub fn set_specular_color(&mut self, color: Color) {
        self.update_all(|m| m.specular_color = color);
    }

    pub fn set_emissive_color(&mut self, color: Color) {
        self.update_all(|m| m.emissive_color = color);
    }

    pub fn set_shininess(&mut self, shininess: f32) {
        self.update_all(|m| m.shininess = shininess);
    }

    pub fn set_transparency(&mut self, transparency: f32) {
        self.update_all(|m| m.transparency = transparency);
    }

    pub fn set_ambient_color_at(&mut self, index: i64, color: Color) -> Result<()> {
        self.update_at(index, |m| m.ambient_color = color)
    }

    pub fn set_diffuse_color_at(&mut self, index: i64, color: Color) -> Result<()> {
        self.update_at(index, |m| m.diffuse_color = color)
    }

    pub fn set_specular_color_at(&mut self, index: i64, color: Color) -> Result<()> {
        self.update_at(index, |m| m.specular_color = color)
    }

    pub fn set_emissive_color_at(&mut self, index: i64, color: Color) -> Result<()> {
        self.update_at(index, |m| m.emissive_color = color)
    }

    pub fn set_shininess_at(&mut self, index: i64, shininess: f32) -> Result<()> {
        self.update_at(index, |m| m.shininess = shininess)
    }

    pub fn set_transparency_at(&mut self, index: i64, transparency: f32) -> Result<()> {
        self.update_at(index, |m| m.transparency = transparency)
    }

    /// One diffuse color per material; new slots copy the first material
    pub fn set_diffuse_colors(&mut self, colors: &[Color]) {
        self.resize_to(colors.len(), |m, i| m.diffuse_color = colors[i]);
    }

    /// One transparency per material; new slots copy the first material
    pub fn set_transparencies(&mut self, transparencies: &[f32]) {
        self.resize_to(transparencies.len(), |m, i| m.transparency = transparencies[i]);
    }

    pub fn ambient_color(&self) -> Color {
        self.first().ambient_color
    }

    pub fn diffuse_color(&self) -> Color {
        self.first().diffuse_color
    }

    pub fn specular_color(&self) -> Color {
        self.first().specular_color
    }

    pub fn emissive_color(&self) -> Color {
        self.first().emissive_color
    }

    pub fn shininess(&self) -> f32 {
        self.first().shininess
    }

    pub fn transparency(&self) -> f32 {
        self.first().transparency
    }

    pub fn diffuse_colors(&self) -> Vec<Color> {
        self.values.iter().map(|m| m.diffuse_color).collect()
    }

    pub fn transparencies(&self) -> Vec<f32> {
        self.values.iter().map(|m| m.transparency).collect()
    }

    pub fn format_version(&self) -> Option<u32> {
        self.format_version
    }

    fn first(&self) -> Material {
        self.values.first().cloned().unwrap_or_default()
    }

    fn update_all(&mut self, apply: impl Fn(&mut Material)) {
        self.core.about_to_set_value();
        if self.values.is_empty() {
            self.values.push(Material::default());
        }
        self.values.iter_mut().for_each(apply);
        self.core.has_set_value();
    }

    fn update_at(&mut self, index: i64, apply: impl FnOnce(&mut Material)) -> Result<()> {
        let slot = checked_slot(index, self.values.len())?;
        self.core.about_to_set_value();
        if slot == self.values.len() {
            self.values.push(Material::default());
        }
        apply(&mut self.values[slot]);
        self.core.has_set_value();
        Ok(())
    }

    fn resize_to(&mut self, len: usize, apply: impl Fn(&mut Material, usize)) {
        self.core.about_to_set_value();
        let template = self.first();
        self.values.resize(len.max(1), template);
        for (i, material) in self.values.iter_mut().take(len).enumerate() {
            apply(material, i);
        }
        self.core.has_set_value();
    }

    fn read_fixed_records(input: &mut InputStream<'_>, count: usize) -> Result<Vec<Material>> {
        let mut values = Vec::with_capacity(count.min(1 << 16));
        for _ in 0..count {
            values.push(Material::read_record(input)?);
        }
        Ok(values)
    }

    fn read_version_3(input: &mut InputStream<'_>) -> Result<Vec<Material>> {
        let count = input.read_u32()? as usize;
        let mut values = Self::read_fixed_records(input, count)?;
        for material in &mut values {
            material.image = input.read_string()?;
            material.image_path = input.read_string()?;
            material.uuid = input.read_string()?;
        }
        Ok(values)
    }
}

impl Property for PropertyMaterialList {
    fn kind(&self) -> PropertyKind {
        PropertyKind::MaterialList
    }

    fn core(&self) -> &PropertyCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut PropertyCore {
        &mut self.core
    }

    fn to_dynamic(&self) -> DynValue {
        DynValue::tuple(self.values.iter().map(|m| DynValue::Handle(m.to_handle())))
    }

    /// A material handle or a sequence of them
    fn from_dynamic(&mut self, value: &DynValue) -> Result<()> {
        const EXPECTED: &str = "type must be 'Material'";
        let material = |item: &DynValue| {
            item.as_handle()
                .and_then(Material::from_handle)
                .ok_or_else(|| type_error(EXPECTED, item))
        };
        if let Some(items) = value.as_sequence() {
            let values = items.iter().map(material).collect::<Result<Vec<_>>>()?;
            self.set_values(values);
            return Ok(());
        }
        let single = material(value)?;
        self.set_value(single);
        Ok(())
    }

    fn save(&self, writer: &mut Writer) -> Result<()> {
        let version = MATERIAL_LIST_VERSION.to_string();
        if writer.is_force_xml() {
            let count = self.values.len().to_string();
            writer.start_element(
                "MaterialList",
                &[("count", count.as_str()), ("version", version.as_str())],
            );
            for material in &self.values {
                material.save_element(writer);
            }
            writer.end_element("MaterialList");
            return Ok(());
        }

        let file = if self.values.is_empty() {
            String::new()
        } else {
            writer.add_file(self.core.name(), self.core.name())
        };
        writer.empty_element(
            "MaterialList",
            &[("file", file.as_str()), ("version", version.as_str())],
        );
        Ok(())
    }

    fn restore(&mut self, reader: &mut XmlReader) -> Result<()> {
        reader.read_element("MaterialList")?;
        if reader.has_attribute("version") {
            let version = reader.get_attribute_as_unsigned("version")?;
            let version = u32::try_from(version).map_err(|_| {
                PropertyError::ValueRejected(format!(
                    "Material list version {} is out of range in {}",
                    version,
                    self.core.full_name()
                ))
            })?;
            self.format_version = Some(version);
        }

        if reader.has_attribute("file") {
            let file = reader.get_attribute("file")?.to_string();
            if !file.is_empty() {
                let owner = self.core.name().to_string();
                reader.add_file(&file, &owner);
            }
            return Ok(());
        }

        let count = reader.get_attribute_as_unsigned("count")? as usize;
        let mut values = Vec::with_capacity(count.min(4096));
        for _ in 0..count {
            reader.read_element("PropertyMaterial")?;
            values.push(Material::read_element(reader)?);
        }
        reader.read_end_element("MaterialList")?;
        self.set_values(values);
        Ok(())
    }

    fn save_doc_file(&self, out: &mut dyn Write) -> Result<()> {
        let mut stream = OutputStream::new(out);
        stream.write_u32(self.values.len() as u32)?;
        for material in &self.values {
            material.write_record(&mut stream)?;
        }
        for material in &self.values {
            stream.write_string(&material.image)?;
            stream.write_string(&material.image_path)?;
            stream.write_string(&material.uuid)?;
        }
        Ok(())
    }

    fn restore_doc_file(&mut self, input: &mut dyn Read) -> Result<()> {
        let mut stream = InputStream::new(input);
        let values = match self.format_version {
            Some(3) => Self::read_version_3(&mut stream)?,
            Some(2) => {
                let count = stream.read_u32()? as usize;
                Self::read_fixed_records(&mut stream, count)?
            }
            Some(version) if version > MATERIAL_LIST_VERSION => {
                return Err(PropertyError::Runtime(format!(
                    "Unsupported material list format version {} in {}",
                    version,
                    self.core.full_name()
                )));
            }
            _ => {
                let lead = stream.read_i32()?;
                let count = if lead < 0 {
                    stream.read_u32()? as usize
                } else {
                    lead as usize
                };
                debug!("Reading legacy material list with {} entries", count);
                Self::read_fixed_records(&mut stream, count)?
            }
        };
        self.set_values(values);
        Ok(())
    }

    fn copy(&self) -> Box<dyn Property> {
        Box::new(Self {
            core: self.core.detached(),
            values: self.values.clone(),
            format_version: self.format_version,
        })
    }

    fn paste(&mut self, from: &dyn Property) -> Result<()> {
        let source = paste_source::<Self>(PropertyKind::MaterialList, from)?;
        self.set_values(source.values.clone());
        Ok(())
    }

    fn mem_size(&self) -> usize {
        self.values.len() * std::mem::size_of::<Material>()
    }

    fn set_path_value(&mut self, sub_path: &str, value: &dyn Any) -> Result<()> {
        self.verify_path(sub_path)?;
        if let Some(values) = value.downcast_ref::<Vec<Material>>() {
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
