//! # Property Cells
//!
//! The object-safe `Property` trait every cell implements, the shared
//! `PropertyCore` that carries the notification bracket, and the
//! `PropertyKind` tag used for factories and paste checks.
//!
//! ## Table of Contents
//! 1. PropertyCore - name, owner and status of a cell
//! 2. Property - the cell protocol
//! 3. PropertyKind - concrete kind tag and factory
//! 4. Path-value helpers

use std::any::Any;
use std::fmt;
use std::io::{Read, Write};
use std::sync::Arc;

use docprop_stream::{Writer, XmlReader};

use crate::collection::{PropertyIntegerSet, PropertyMap};
use crate::color::PropertyColor;
use crate::constrained::PropertyConstrained;
use crate::dynamic::DynValue;
use crate::enumeration::PropertyEnumeration;
use crate::error::{PropertyError, Result};
use crate::list::PropertyList;
use crate::material::{PropertyMaterial, PropertyMaterialList};
use crate::notify::{PropertyContainer, PropertyStatus};
use crate::persistent::PropertyPersistentObject;
use crate::scalar::PropertyScalar;
use crate::text::{PropertyPath, PropertyString, PropertyUuid};

// ============================================================================
// Property Core
// ============================================================================

/// State shared by every cell: its name, the container it is attached to and
/// its status bits. Owns the pre/post change bracket.
#[derive(Clone, Default)]
pub struct PropertyCore {
    name: String,
    container: Option<Arc<dyn PropertyContainer>>,
    status: PropertyStatus,
}

impl PropertyCore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn attach(&mut self, container: Arc<dyn PropertyContainer>) {
        self.container = Some(container);
    }

    pub fn detach(&mut self) {
        self.container = None;
    }

    pub fn is_attached(&self) -> bool {
        self.container.is_some()
    }

    pub fn container(&self) -> Option<&Arc<dyn PropertyContainer>> {
        self.container.as_ref()
    }

    /// `Object.Property`, or just the property name when unattached
    pub fn full_name(&self) -> String {
        match &self.container {
            Some(container) => format!("{}.{}", container.object_name(), self.name),
            None => self.name.clone(),
        }
    }

    pub fn status(&self) -> PropertyStatus {
        self.status
    }

    pub fn test_status(&self, flag: PropertyStatus) -> bool {
        self.status.contains(flag)
    }

    pub fn set_status(&mut self, flag: PropertyStatus, on: bool) {
        self.status.set(flag, on);
    }

    pub fn is_touched(&self) -> bool {
        self.test_status(PropertyStatus::TOUCHED)
    }

    pub fn purge_touched(&mut self) {
        self.status.remove(PropertyStatus::TOUCHED);
    }

    /// Pre-change hook
    pub fn about_to_set_value(&self) {
        if let Some(container) = &self.container {
            container.on_before_change(&self.name);
        }
    }

    /// Post-change hook; marks the cell touched
    pub fn has_set_value(&mut self) {
        self.status.insert(PropertyStatus::TOUCHED);
        if let Some(container) = &self.container {
            container.on_changed(&self.name);
        }
    }

    /// Core for a copy: same name, unattached, clean status
    pub fn detached(&self) -> Self {
        Self::new(self.name.clone())
    }
}

impl fmt::Debug for PropertyCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyCore")
            .field("name", &self.name)
            .field("attached", &self.is_attached())
            .field("status", &self.status)
            .finish()
    }
}

// ============================================================================
// Property Trait
// ============================================================================

/// A typed, persistent, observable value cell
pub trait Property: Any + Send + Sync + fmt::Debug {
    fn kind(&self) -> PropertyKind;

    fn core(&self) -> &PropertyCore;

    fn core_mut(&mut self) -> &mut PropertyCore;

    fn name(&self) -> &str {
        self.core().name()
    }

    fn type_name(&self) -> &'static str {
        self.kind().type_name()
    }

    fn to_dynamic(&self) -> DynValue;

    fn from_dynamic(&mut self, value: &DynValue) -> Result<()>;

    /// Write the XML element(s) that `restore` reads back
    fn save(&self, writer: &mut Writer) -> Result<()>;

    fn restore(&mut self, reader: &mut XmlReader) -> Result<()>;

    /// Write the side file registered during `save`
    fn save_doc_file(&self, _out: &mut dyn Write) -> Result<()> {
        Ok(())
    }

    /// Read the side file requested during `restore`
    fn restore_doc_file(&mut self, _input: &mut dyn Read) -> Result<()> {
        Ok(())
    }

    /// Independent, unattached cell holding the same value
    fn copy(&self) -> Box<dyn Property>;

    /// Take the value of a cell of the same kind, in one bracket
    fn paste(&mut self, from: &dyn Property) -> Result<()>;

    /// Approximate memory footprint in bytes
    fn mem_size(&self) -> usize;

    /// Scalar cells have no sub-paths
    fn verify_path(&self, sub_path: &str) -> Result<()> {
        if sub_path.is_empty() {
            Ok(())
        } else {
            Err(PropertyError::InvalidPath {
                property: self.core().full_name(),
                path: sub_path.to_string(),
            })
        }
    }

    /// Assign from a native value produced by expression evaluation
    fn set_path_value(&mut self, sub_path: &str, value: &dyn Any) -> Result<()> {
        self.verify_path(sub_path)?;
        match value.downcast_ref::<DynValue>() {
            Some(dynamic) => self.from_dynamic(dynamic),
            None => Err(crate::error::bad_cast(&self.core().full_name(), value)),
        }
    }

    fn get_path_value(&self, sub_path: &str) -> Result<Box<dyn Any + Send>> {
        self.verify_path(sub_path)?;
        Ok(Box::new(self.to_dynamic()))
    }

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<'p> dyn Property + 'p {
    pub fn downcast_ref<T: Property>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: Property>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }

    pub fn is_touched(&self) -> bool {
        self.core().is_touched()
    }
}

/// Resolve the source of a paste, failing fast on any kind mismatch
pub(crate) fn paste_source<'a, T: Property>(
    expected: PropertyKind,
    from: &'a dyn Property,
) -> Result<&'a T> {
    let mismatch = || PropertyError::SameKindMismatch {
        expected: expected.type_name(),
        found: from.kind().type_name(),
    };
    if from.kind() != expected {
        return Err(mismatch());
    }
    from.downcast_ref::<T>().ok_or_else(mismatch)
}

// ============================================================================
// Property Kind
// ============================================================================

/// Concrete kind of a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyKind {
    Integer,
    IntegerConstraint,
    Percent,
    Float,
    FloatConstraint,
    Precision,
    Bool,
    String,
    Font,
    Path,
    Uuid,
    Enumeration,
    IntegerList,
    IntegerSet,
    FloatList,
    StringList,
    BoolList,
    Map,
    Color,
    ColorList,
    Material,
    MaterialList,
    PersistentObject,
}

impl PropertyKind {
    pub const ALL: [PropertyKind; 23] = [
        PropertyKind::Integer,
        PropertyKind::IntegerConstraint,
        PropertyKind::Percent,
        PropertyKind::Float,
        PropertyKind::FloatConstraint,
        PropertyKind::Precision,
        PropertyKind::Bool,
        PropertyKind::String,
        PropertyKind::Font,
        PropertyKind::Path,
        PropertyKind::Uuid,
        PropertyKind::Enumeration,
        PropertyKind::IntegerList,
        PropertyKind::IntegerSet,
        PropertyKind::FloatList,
        PropertyKind::StringList,
        PropertyKind::BoolList,
        PropertyKind::Map,
        PropertyKind::Color,
        PropertyKind::ColorList,
        PropertyKind::Material,
        PropertyKind::MaterialList,
        PropertyKind::PersistentObject,
    ];

    /// Persisted type name
    pub fn type_name(self) -> &'static str {
        match self {
            PropertyKind::Integer => "App::PropertyInteger",
            PropertyKind::IntegerConstraint => "App::PropertyIntegerConstraint",
            PropertyKind::Percent => "App::PropertyPercent",
            PropertyKind::Float => "App::PropertyFloat",
            PropertyKind::FloatConstraint => "App::PropertyFloatConstraint",
            PropertyKind::Precision => "App::PropertyPrecision",
            PropertyKind::Bool => "App::PropertyBool",
            PropertyKind::String => "App::PropertyString",
            PropertyKind::Font => "App::PropertyFont",
            PropertyKind::Path => "App::PropertyPath",
            PropertyKind::Uuid => "App::PropertyUUID",
            PropertyKind::Enumeration => "App::PropertyEnumeration",
            PropertyKind::IntegerList => "App::PropertyIntegerList",
            PropertyKind::IntegerSet => "App::PropertyIntegerSet",
            PropertyKind::FloatList => "App::PropertyFloatList",
            PropertyKind::StringList => "App::PropertyStringList",
            PropertyKind::BoolList => "App::PropertyBoolList",
            PropertyKind::Map => "App::PropertyMap",
            PropertyKind::Color => "App::PropertyColor",
            PropertyKind::ColorList => "App::PropertyColorList",
            PropertyKind::Material => "App::PropertyMaterial",
            PropertyKind::MaterialList => "App::PropertyMaterialList",
            PropertyKind::PersistentObject => "App::PropertyPersistentObject",
        }
    }

    pub fn from_type_name(type_name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.type_name() == type_name)
    }

    /// Fresh cell of this kind with default value
    pub fn create(self, name: &str) -> Box<dyn Property> {
        match self {
            PropertyKind::Integer => Box::new(PropertyScalar::<i64>::new(name)),
            PropertyKind::IntegerConstraint => Box::new(PropertyConstrained::<i64>::new(name)),
            PropertyKind::Percent => Box::new(PropertyConstrained::<i64>::percent(name)),
            PropertyKind::Float => Box::new(PropertyScalar::<f64>::new(name)),
            PropertyKind::FloatConstraint => Box::new(PropertyConstrained::<f64>::new(name)),
            PropertyKind::Precision => Box::new(PropertyConstrained::<f64>::precision(name)),
            PropertyKind::Bool => Box::new(PropertyScalar::<bool>::new(name)),
            PropertyKind::String => Box::new(PropertyString::new(name)),
            PropertyKind::Font => Box::new(PropertyString::font(name)),
            PropertyKind::Path => Box::new(PropertyPath::new(name)),
            PropertyKind::Uuid => Box::new(PropertyUuid::new(name)),
            PropertyKind::Enumeration => Box::new(PropertyEnumeration::new(name)),
            PropertyKind::IntegerList => Box::new(PropertyList::<i64>::new(name)),
            PropertyKind::IntegerSet => Box::new(PropertyIntegerSet::new(name)),
            PropertyKind::FloatList => Box::new(PropertyList::<f64>::new(name)),
            PropertyKind::StringList => Box::new(PropertyList::<String>::new(name)),
            PropertyKind::BoolList => Box::new(PropertyList::<bool>::new(name)),
            PropertyKind::Map => Box::new(PropertyMap::new(name)),
            PropertyKind::Color => Box::new(PropertyColor::new(name)),
            PropertyKind::ColorList => Box::new(PropertyList::<crate::color::Color>::new(name)),
            PropertyKind::Material => Box::new(PropertyMaterial::new(name)),
            PropertyKind::MaterialList => Box::new(PropertyMaterialList::new(name)),
            PropertyKind::PersistentObject => Box::new(PropertyPersistentObject::new(name)),
        }
    }
}

impl fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

// ============================================================================
// Path-Value Helpers
// ============================================================================

/// Native integer types accepted by path assignment
pub(crate) fn path_int(value: &dyn Any) -> Option<i64> {
    if let Some(v) = value.downcast_ref::<i64>() {
        Some(*v)
    } else if let Some(v) = value.downcast_ref::<i32>() {
        Some(i64::from(*v))
    } else if let Some(v) = value.downcast_ref::<i16>() {
        Some(i64::from(*v))
    } else if let Some(v) = value.downcast_ref::<u32>() {
        Some(i64::from(*v))
    } else {
        None
    }
}

/// Native floating-point types accepted by path assignment
pub(crate) fn path_float(value: &dyn Any) -> Option<f64> {
    if let Some(v) = value.downcast_ref::<f64>() {
        Some(*v)
    } else {
        value.downcast_ref::<f32>().map(|v| f64::from(*v))
    }
}

/// Native string types accepted by path assignment
pub(crate) fn path_str(value: &dyn Any) -> Option<&str> {
    if let Some(v) = value.downcast_ref::<String>() {
        Some(v.as_str())
    } else {
        value.downcast_ref::<&'static str>().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::ChangeRecorder;

    #[test]
    fn test_type_names_round_trip() {
        for kind in PropertyKind::ALL {
            assert_eq!(PropertyKind::from_type_name(kind.type_name()), Some(kind));
            let cell = kind.create("P");
            assert_eq!(cell.kind(), kind);
            assert_eq!(cell.name(), "P");
        }
        assert_eq!(PropertyKind::from_type_name("App::PropertyVector"), None);
    }

    #[test]
    fn test_core_bracket_touches_and_notifies() {
        let recorder = Arc::new(ChangeRecorder::new("Box"));
        let mut core = PropertyCore::new("Length");
        assert_eq!(core.full_name(), "Length");

        core.attach(recorder.clone());
        assert_eq!(core.full_name(), "Box.Length");
        core.about_to_set_value();
        core.has_set_value();

        assert!(core.is_touched());
        assert_eq!(recorder.before_count("Length"), 1);
        assert_eq!(recorder.after_count("Length"), 1);

        core.purge_touched();
        assert!(!core.is_touched());
        assert!(!core.detached().is_attached());
    }

    #[test]
    fn test_path_helpers() {
        assert_eq!(path_int(&7i32), Some(7));
        assert_eq!(path_int(&7.0f64), None);
        assert_eq!(path_float(&0.5f32), Some(0.5));
        assert_eq!(path_str(&"abc"), Some("abc"));
        assert_eq!(path_str(&String::from("x")), Some("x"));
    }

    #[test]
    fn test_paste_source_rejects_other_kind() {
        let from = PropertyKind::Float.create("F");
        let err = paste_source::<PropertyScalar<i64>>(PropertyKind::Integer, from.as_ref()).unwrap_err();
        assert!(matches!(err, PropertyError::SameKindMismatch { .. }));
    }
}
