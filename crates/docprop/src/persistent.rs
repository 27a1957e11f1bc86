//! # Persistent Object Cell
//!
//! A cell naming a persistable type and holding an instance of it. Types are
//! registered by name in a process-wide registry so a document can recreate
//! the instance while restoring.
//!
//! ## Table of Contents
//! 1. Persistence - nested save/restore protocol
//! 2. Registry
//! 3. PropertyPersistentObject

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use docprop_stream::{Writer, XmlReader};
use parking_lot::RwLock;
use tracing::debug;

use crate::dynamic::{DynValue, Handle};
use crate::error::{bad_cast, type_error, PropertyError, Result};
use crate::property::{paste_source, path_str, Property, PropertyCore, PropertyKind};

// ============================================================================
// Persistence
// ============================================================================

/// An object that saves itself as a nested XML sub-document
pub trait Persistence: Send + Sync + fmt::Debug {
    fn type_name(&self) -> &str;

    fn save(&self, writer: &mut Writer) -> Result<()>;

    fn restore(&mut self, reader: &mut XmlReader) -> Result<()>;

    fn mem_size(&self) -> usize {
        0
    }
}

/// Instance shared between a cell and its copies
pub type SharedObject = Arc<RwLock<Box<dyn Persistence>>>;

pub type PersistenceFactory = fn() -> Box<dyn Persistence>;

// ============================================================================
// Registry
// ============================================================================

fn registry() -> &'static RwLock<HashMap<String, PersistenceFactory>> {
    static REGISTRY: OnceLock<RwLock<HashMap<String, PersistenceFactory>>> = OnceLock::new();
    REGISTRY.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Make `type_name` creatable by `PropertyPersistentObject::set_value`
pub fn register_persistence_type(type_name: &str, factory: PersistenceFactory) {
    debug!("Registered persistence type '{}'", type_name);
    registry().write().insert(type_name.to_string(), factory);
}

pub fn is_registered(type_name: &str) -> bool {
    registry().read().contains_key(type_name)
}

pub fn create_persistent(type_name: &str) -> Option<Box<dyn Persistence>> {
    let factory = registry().read().get(type_name).copied();
    factory.map(|create| create())
}

// ============================================================================
// PropertyPersistentObject
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct PropertyPersistentObject {
    core: PropertyCore,
    type_name: String,
    object: Option<SharedObject>,
}

impl PropertyPersistentObject {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            core: PropertyCore::new(name),
            type_name: String::new(),
            object: None,
        }
    }

    pub fn type_name_value(&self) -> &str {
        &self.type_name
    }

    pub fn object(&self) -> Option<&SharedObject> {
        self.object.as_ref()
    }

    /// Create a fresh instance of `type_name`; an empty name clears the cell.
    /// Setting the type the cell already holds keeps the instance.
    pub fn set_value(&mut self, type_name: &str) -> Result<()> {
        if !type_name.is_empty() {
            if !is_registered(type_name) {
                return Err(PropertyError::ValueRejected(format!(
                    "Invalid type or type must be a registered persistence type: '{}'",
                    type_name
                )));
            }
            if self.object.is_some() && self.type_name == type_name {
                return Ok(());
            }
        }

        self.core.about_to_set_value();
        self.type_name = type_name.to_string();
        self.object = create_persistent(type_name).map(|object| Arc::new(RwLock::new(object)));
        self.core.has_set_value();
        Ok(())
    }

    /// Adopt an existing shared instance
    pub fn set_object(&mut self, object: SharedObject) {
        let type_name = object.read().type_name().to_string();
        self.core.about_to_set_value();
        self.type_name = type_name;
        self.object = Some(object);
        self.core.has_set_value();
    }

    fn same_object(&self, other: &Option<SharedObject>) -> bool {
        match (&self.object, other) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl Property for PropertyPersistentObject {
    fn kind(&self) -> PropertyKind {
        PropertyKind::PersistentObject
    }

    fn core(&self) -> &PropertyCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut PropertyCore {
        &mut self.core
    }

    /// The instance as a handle, or the type name when there is none
    fn to_dynamic(&self) -> DynValue {
        match &self.object {
            Some(object) => DynValue::Handle(Handle::new(self.type_name.clone(), Arc::clone(object))),
            None => DynValue::Str(self.type_name.clone()),
        }
    }

    fn from_dynamic(&mut self, value: &DynValue) -> Result<()> {
        match value {
            DynValue::Str(type_name) => self.set_value(type_name),
            DynValue::Handle(handle) => match handle.downcast_ref::<SharedObject>() {
                Some(object) => {
                    self.set_object(Arc::clone(object));
                    Ok(())
                }
                None => Err(type_error("type must be str or a persistent object", value)),
            },
            other => Err(type_error("type must be str or a persistent object", other)),
        }
    }

    fn save(&self, writer: &mut Writer) -> Result<()> {
        writer.empty_element("String", &[("value", self.type_name.as_str())]);
        writer.start_element("PersistentObject", &[]);
        if let Some(object) = &self.object {
            object.read().save(writer)?;
        }
        writer.end_element("PersistentObject");
        Ok(())
    }

    fn restore(&mut self, reader: &mut XmlReader) -> Result<()> {
        reader.read_element("String")?;
        let type_name = reader.get_attribute("value")?.to_string();
        self.set_value(&type_name)?;
        reader.read_element("PersistentObject")?;
        if let Some(object) = &self.object {
            object.write().restore(reader)?;
        }
        reader.read_end_element("PersistentObject")?;
        Ok(())
    }

    /// The copy shares the instance
    fn copy(&self) -> Box<dyn Property> {
        Box::new(Self {
            core: self.core.detached(),
            type_name: self.type_name.clone(),
            object: self.object.clone(),
        })
    }

    fn paste(&mut self, from: &dyn Property) -> Result<()> {
        let source = paste_source::<Self>(PropertyKind::PersistentObject, from)?;
        if self.type_name != source.type_name || !self.same_object(&source.object) {
            self.core.about_to_set_value();
            self.type_name = source.type_name.clone();
            self.object = source.object.clone();
            self.core.has_set_value();
        }
        Ok(())
    }

    fn mem_size(&self) -> usize {
        let nested = self.object.as_ref().map_or(0, |object| object.read().mem_size());
        self.type_name.len() + nested
    }

    fn set_path_value(&mut self, sub_path: &str, value: &dyn Any) -> Result<()> {
        self.verify_path(sub_path)?;
        if let Some(type_name) = path_str(value) {
            let type_name = type_name.to_string();
            self.set_value(&type_name)
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

    #[derive(Debug, Default)]
    struct Sketch {
        constraints: i64,
    }

    impl Persistence for Sketch {
        fn type_name(&self) -> &str {
            "Test::Sketch"
        }

        fn save(&self, writer: &mut Writer) -> Result<()> {
            writer.empty_element("Constraints", &[("count", self.constraints.to_string().as_str())]);
            Ok(())
        }

        fn restore(&mut self, reader: &mut XmlReader) -> Result<()> {
            reader.read_element("Constraints")?;
            self.constraints = reader.get_attribute_as_integer("count")?;
            Ok(())
        }

        fn mem_size(&self) -> usize {
            8
        }
    }

    fn register() {
        register_persistence_type("Test::Sketch", || Box::new(Sketch::default()));
    }

    fn saved_object(cell: &PropertyPersistentObject) -> String {
        let mut writer = Writer::new();
        cell.object().unwrap().read().save(&mut writer).unwrap();
        writer.into_string()
    }

    #[test]
    fn test_unregistered_type_rejected() {
        let mut cell = PropertyPersistentObject::new("Data");
        let err = cell.set_value("Test::Missing").unwrap_err();
        assert!(err.is_value_rejected());
        assert!(cell.object().is_none());
    }

    #[test]
    fn test_nested_round_trip() {
        register();
        let mut cell = PropertyPersistentObject::new("Data");
        cell.set_value("Test::Sketch").unwrap();
        let mut writer = Writer::new();
        writer.start_element("Wrapper", &[]);
        cell.save(&mut writer).unwrap();
        writer.end_element("Wrapper");
        assert!(writer.as_str().contains("<String value=\"Test::Sketch\"/>"));
        assert!(writer.as_str().contains("<Constraints count=\"0\"/>"));

        let xml = writer
            .as_str()
            .replace("<Constraints count=\"0\"/>", "<Constraints count=\"5\"/>");
        let mut reader = XmlReader::parse(&xml).unwrap();
        let mut fresh = PropertyPersistentObject::new("Data");
        fresh.restore(&mut reader).unwrap();
        assert_eq!(fresh.type_name_value(), "Test::Sketch");
        assert_eq!(saved_object(&fresh), "<Constraints count=\"5\"/>\n");
        assert_eq!(fresh.mem_size(), "Test::Sketch".len() + 8);
    }

    #[test]
    fn test_same_type_keeps_instance_and_copy_shares() {
        register();
        let recorder = Arc::new(ChangeRecorder::new("Obj"));
        let mut cell = PropertyPersistentObject::new("Data");
        cell.core_mut().attach(recorder.clone());
        cell.set_value("Test::Sketch").unwrap();
        let first = Arc::clone(cell.object().unwrap());
        cell.set_value("Test::Sketch").unwrap();
        assert!(Arc::ptr_eq(&first, cell.object().unwrap()));
        assert_eq!(recorder.after_count("Data"), 1);

        let copy = cell.copy();
        let copy = copy.downcast_ref::<PropertyPersistentObject>().unwrap();
        assert!(Arc::ptr_eq(&first, copy.object().unwrap()));

        cell.paste(copy).unwrap();
        assert_eq!(recorder.after_count("Data"), 1);

        cell.set_value("").unwrap();
        assert!(cell.object().is_none());
        assert_eq!(recorder.after_count("Data"), 2);
    }
}
