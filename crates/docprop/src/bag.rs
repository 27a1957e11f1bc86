//! # Property Bag
//!
//! An ordered, name-keyed collection of cells owned by one container, with
//! whole-document persistence.
//!
//! ## Table of Contents
//! 1. PropertyBag - cell collection
//! 2. XML save/restore of all cells
//! 3. DocumentArchive - XML plus side files
//! 4. Directory archives
//!
//! ## Document layout
//!
//! ```xml
//! <Properties Count="2">
//!     <Property name="Length" type="App::PropertyFloat">
//!         <Float value="10"/>
//!     </Property>
//!     <Property name="Weights" type="App::PropertyFloatList">
//!         <FloatList file="Weights"/>
//!     </Property>
//! </Properties>
//! ```
//!
//! Side files are written after the XML pass, once every cell has registered
//! its files, and fed back to their owning cells after the XML is restored.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use docprop_stream::{Writer, XmlReader};
use tracing::{debug, warn};

use crate::config::PropertyConfig;
use crate::error::{PropertyError, Result};
use crate::notify::PropertyContainer;
use crate::property::{Property, PropertyKind};

// ============================================================================
// PropertyBag
// ============================================================================

/// Named cells of one document object, in insertion order
#[derive(Default)]
pub struct PropertyBag {
    cells: Vec<Box<dyn Property>>,
    container: Option<Arc<dyn PropertyContainer>>,
    config: PropertyConfig,
}

impl fmt::Debug for PropertyBag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyBag")
            .field("cells", &self.cells)
            .field("attached", &self.container.is_some())
            .field("config", &self.config)
            .finish()
    }
}

impl PropertyBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cells added to this bag are attached to `container`
    pub fn with_container(container: Arc<dyn PropertyContainer>) -> Self {
        Self {
            container: Some(container),
            ..Self::default()
        }
    }

    pub fn with_config(mut self, config: PropertyConfig) -> Self {
        self.config = config;
        for cell in &mut self.cells {
            self.config.apply(cell.as_mut());
        }
        self
    }

    pub fn config(&self) -> &PropertyConfig {
        &self.config
    }

    /// Add a cell; names must be unique within the bag
    pub fn add(&mut self, mut cell: Box<dyn Property>) -> Result<&mut dyn Property> {
        if self.contains(cell.name()) {
            return Err(PropertyError::ValueRejected(format!(
                "Property '{}' already exists",
                cell.name()
            )));
        }
        if let Some(container) = &self.container {
            cell.core_mut().attach(Arc::clone(container));
        }
        self.config.apply(cell.as_mut());
        self.cells.push(cell);
        let index = self.cells.len() - 1;
        Ok(self.cells[index].as_mut())
    }

    /// Add a default cell of `kind`
    pub fn add_kind(&mut self, kind: PropertyKind, name: &str) -> Result<&mut dyn Property> {
        self.add(kind.create(name))
    }

    /// Remove a cell, detaching it from the container
    pub fn remove(&mut self, name: &str) -> Option<Box<dyn Property>> {
        let index = self.position(name)?;
        let mut cell = self.cells.remove(index);
        cell.core_mut().detach();
        Some(cell)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&dyn Property> {
        self.cells
            .iter()
            .find(|cell| cell.name() == name)
            .map(|cell| cell.as_ref())
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut dyn Property> {
        for cell in &mut self.cells {
            if cell.name() == name {
                return Some(cell.as_mut());
            }
        }
        None
    }

    /// Typed access to a cell
    pub fn get_as<T: Property>(&self, name: &str) -> Option<&T> {
        self.get(name)?.downcast_ref::<T>()
    }

    pub fn get_as_mut<T: Property>(&mut self, name: &str) -> Option<&mut T> {
        self.get_mut(name)?.downcast_mut::<T>()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Box<dyn Property>> {
        self.cells.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.cells.iter().map(|cell| cell.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Names of cells changed since the last `purge_touched`
    pub fn touched(&self) -> Vec<&str> {
        self.cells
            .iter()
            .filter(|cell| cell.core().is_touched())
            .map(|cell| cell.name())
            .collect()
    }

    pub fn purge_touched(&mut self) {
        for cell in &mut self.cells {
            cell.core_mut().purge_touched();
        }
    }

    pub fn mem_size(&self) -> usize {
        self.cells.iter().map(|cell| cell.mem_size()).sum()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.cells.iter().position(|cell| cell.name() == name)
    }

    // ========================================================================
    // XML
    // ========================================================================

    pub fn save(&self, writer: &mut Writer) -> Result<()> {
        let count = self.cells.len().to_string();
        writer.start_element("Properties", &[("Count", count.as_str())]);
        for cell in &self.cells {
            writer.start_element("Property", &[("name", cell.name()), ("type", cell.type_name())]);
            cell.save(writer)?;
            writer.end_element("Property");
        }
        writer.end_element("Properties");
        Ok(())
    }

    /// Restore every saved cell. Missing cells are created from their type
    /// name; cells of an unknown or different type are skipped with a warning.
    pub fn restore(&mut self, reader: &mut XmlReader) -> Result<()> {
        reader.read_element("Properties")?;
        let count = reader.get_attribute_as_unsigned("Count")?;

        for _ in 0..count {
            reader.read_element("Property")?;
            let name = reader.get_attribute("name")?.to_string();
            let type_name = reader.get_attribute("type")?.to_string();

            if !self.contains(&name) {
                match PropertyKind::from_type_name(&type_name) {
                    Some(kind) => {
                        self.add_kind(kind, &name)?;
                    }
                    None => warn!("Skipping property '{}' of unknown type '{}'", name, type_name),
                }
            }

            match self.get_mut(&name) {
                Some(cell) if cell.type_name() == type_name => cell.restore(reader)?,
                Some(cell) => warn!(
                    "Skipping property '{}': saved as '{}' but is '{}'",
                    name,
                    type_name,
                    cell.type_name()
                ),
                None => {}
            }
            reader.read_end_element("Property")?;
        }

        reader.read_end_element("Properties")?;
        Ok(())
    }

    // ========================================================================
    // Archives
    // ========================================================================

    /// Save the XML document and every registered side file
    pub fn save_archive(&self) -> Result<DocumentArchive> {
        let mut writer = Writer::with_config(&self.config.stream);
        writer.stream().push_str("<?xml version='1.0' encoding='utf-8'?>\n");
        self.save(&mut writer)?;

        let mut files = BTreeMap::new();
        for entry in writer.files() {
            let cell = self.get(&entry.owner).ok_or_else(|| {
                PropertyError::Runtime(format!(
                    "Side file '{}' has no owner '{}'",
                    entry.file_name, entry.owner
                ))
            })?;
            let mut bytes = Vec::new();
            cell.save_doc_file(&mut bytes)?;
            debug!("Saved side file '{}' ({} bytes)", entry.file_name, bytes.len());
            files.insert(entry.file_name.clone(), bytes);
        }

        Ok(DocumentArchive {
            document: writer.into_string(),
            files,
        })
    }

    pub fn restore_archive(&mut self, archive: &DocumentArchive) -> Result<()> {
        self.restore_document(&archive.document, |file_name| {
            Ok(archive.files.get(file_name).cloned())
        })
    }

    /// Write the archive as a directory: the XML document plus one file per blob
    pub fn write_to_dir(&self, dir: &Path) -> Result<()> {
        let archive = self.save_archive()?;
        std::fs::create_dir_all(dir)?;
        std::fs::write(dir.join(&self.config.document_file_name), &archive.document)?;
        for (file_name, bytes) in &archive.files {
            std::fs::write(dir.join(file_name), bytes)?;
        }
        Ok(())
    }

    pub fn read_from_dir(&mut self, dir: &Path) -> Result<()> {
        let document = std::fs::read_to_string(dir.join(&self.config.document_file_name))?;
        self.restore_document(&document, |file_name| {
            let path = dir.join(file_name);
            if path.exists() {
                Ok(Some(std::fs::read(path)?))
            } else {
                Ok(None)
            }
        })
    }

    fn restore_document(
        &mut self,
        document: &str,
        mut load: impl FnMut(&str) -> Result<Option<Vec<u8>>>,
    ) -> Result<()> {
        let mut reader = XmlReader::parse(document)?;
        self.restore(&mut reader)?;

        for pending in reader.take_files() {
            let Some(bytes) = load(&pending.file_name)? else {
                warn!("Side file '{}' for '{}' is missing", pending.file_name, pending.owner);
                continue;
            };
            match self.get_mut(&pending.owner) {
                Some(cell) => cell.restore_doc_file(&mut bytes.as_slice())?,
                None => warn!("Side file '{}' has no owner '{}'", pending.file_name, pending.owner),
            }
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a PropertyBag {
    type Item = &'a Box<dyn Property>;
    type IntoIter = std::slice::Iter<'a, Box<dyn Property>>;

    fn into_iter(self) -> Self::IntoIter {
        self.cells.iter()
    }
}

// ============================================================================
// DocumentArchive
// ============================================================================

/// A saved document: the XML text plus named binary side files
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentArchive {
    pub document: String,
    pub files: BTreeMap<String, Vec<u8>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::list::PropertyFloatList;
    use crate::notify::ChangeRecorder;
    use crate::scalar::PropertyFloat;

    #[test]
    fn test_add_attaches_and_rejects_duplicates() {
        let recorder = Arc::new(ChangeRecorder::new("Pad"));
        let mut bag = PropertyBag::with_container(recorder.clone());
        bag.add_kind(PropertyKind::Float, "Length").unwrap();
        assert!(bag.add_kind(PropertyKind::Integer, "Length").unwrap_err().is_value_rejected());

        bag.get_as_mut::<PropertyFloat>("Length").unwrap().set_value(5.0);
        assert_eq!(recorder.after_count("Length"), 1);
        assert_eq!(bag.get("Length").unwrap().core().full_name(), "Pad.Length");
        assert_eq!(bag.touched(), vec!["Length"]);

        bag.purge_touched();
        assert!(bag.touched().is_empty());
        let removed = bag.remove("Length").unwrap();
        assert!(!removed.core().is_attached());
        assert!(bag.is_empty());
    }

    #[test]
    fn test_restore_creates_missing_cells() {
        let mut bag = PropertyBag::new();
        bag.add_kind(PropertyKind::Float, "Length").unwrap();
        bag.add_kind(PropertyKind::String, "Label").unwrap();
        bag.get_as_mut::<PropertyFloat>("Length").unwrap().set_value(12.5);

        let mut writer = Writer::new();
        bag.save(&mut writer).unwrap();
        assert!(writer.as_str().starts_with("<Properties Count=\"2\">"));

        let mut reader = XmlReader::parse(writer.as_str()).unwrap();
        let mut fresh = PropertyBag::new();
        fresh.restore(&mut reader).unwrap();
        assert_eq!(fresh.names(), vec!["Length", "Label"]);
        assert_eq!(fresh.get_as::<PropertyFloat>("Length").unwrap().value(), 12.5);
    }

    #[test]
    fn test_restore_skips_unknown_and_mismatched() {
        let xml = r#"<Properties Count="3">
            <Property name="Shape" type="Part::PropertyPartShape"><Part file="x.brp"/></Property>
            <Property name="Length" type="App::PropertyInteger"><Integer value="3"/></Property>
            <Property name="Width" type="App::PropertyFloat"><Float value="2.5"/></Property>
        </Properties>"#;
        let mut bag = PropertyBag::new();
        bag.add_kind(PropertyKind::Float, "Length").unwrap();
        let mut reader = XmlReader::parse(xml).unwrap();
        bag.restore(&mut reader).unwrap();

        assert!(!bag.contains("Shape"));
        assert_eq!(bag.get_as::<PropertyFloat>("Length").unwrap().value(), 0.0);
        assert_eq!(bag.get_as::<PropertyFloat>("Width").unwrap().value(), 2.5);
    }

    #[test]
    fn test_archive_feeds_side_files_back() {
        let mut bag = PropertyBag::new();
        bag.add(Box::new(PropertyFloatList::with_values("Weights", vec![1.5, -2.0])))
            .unwrap();
        let archive = bag.save_archive().unwrap();
        assert!(archive.document.starts_with("<?xml"));
        assert_eq!(archive.files.len(), 1);

        let mut fresh = PropertyBag::new();
        fresh.restore_archive(&archive).unwrap();
        assert_eq!(
            fresh.get_as::<PropertyFloatList>("Weights").unwrap().values(),
            &[1.5, -2.0]
        );

        let mut partial = archive.clone();
        partial.files.clear();
        let mut fresh = PropertyBag::new();
        fresh.restore_archive(&partial).unwrap();
        assert!(fresh.get_as::<PropertyFloatList>("Weights").unwrap().is_empty());
    }
}
