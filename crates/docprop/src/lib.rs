//! # docprop
//!
//! Typed, persistent, observable value cells for CAD document objects.
//!
//! Every cell implements [`Property`]: it brackets each mutation with the
//! owning container's pre/post change hooks, saves itself as XML (plus an
//! optional binary side file), converts to and from the dynamic
//! [`DynValue`] used by scripting hosts, and supports copy/paste for undo.
//!
//! ## Table of Contents
//! 1. Errors (`error`)
//! 2. Dynamic values (`dynamic`)
//! 3. Change notification (`notify`)
//! 4. The cell protocol and kind registry (`property`)
//! 5. Scalar and constrained cells (`scalar`, `descriptor`, `constrained`)
//! 6. Text, path and UUID cells (`text`)
//! 7. Enumeration (`enumeration`)
//! 8. Lists, sets and maps (`list`, `collection`)
//! 9. Colors and materials (`color`, `material`)
//! 10. Persistent sub-objects (`persistent`)
//! 11. Property bags and document archives (`bag`, `config`)
//!
//! ## Example
//!
//! ```
//! use docprop::prelude::*;
//!
//! let mut bag = PropertyBag::new();
//! bag.add_kind(PropertyKind::Percent, "Opacity").unwrap();
//! let opacity = bag.get_mut("Opacity").unwrap();
//! opacity.from_dynamic(&DynValue::Int(150)).unwrap();
//! assert_eq!(opacity.to_dynamic(), DynValue::Int(100));
//! ```

mod bag;
mod collection;
mod color;
mod config;
mod constrained;
mod descriptor;
mod dynamic;
mod enumeration;
mod error;
mod list;
mod material;
mod notify;
mod persistent;
mod property;
mod scalar;
mod text;

pub use bag::*;
pub use collection::*;
pub use color::*;
pub use config::*;
pub use constrained::*;
pub use descriptor::*;
pub use dynamic::*;
pub use enumeration::*;
pub use error::*;
pub use list::*;
pub use material::*;
pub use notify::*;
pub use persistent::*;
pub use property::*;
pub use scalar::*;
pub use text::*;

pub use docprop_stream::{InputStream, OutputStream, PendingFile, StreamConfig, StreamError, Writer, XmlReader};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::bag::{DocumentArchive, PropertyBag};
    pub use crate::color::{Color, PropertyColor};
    pub use crate::config::PropertyConfig;
    pub use crate::constrained::{PropertyConstrained, PropertyPercent, PropertyPrecision};
    pub use crate::dynamic::{DynValue, Handle};
    pub use crate::enumeration::{Enumeration, PropertyEnumeration};
    pub use crate::error::{PropertyError, Result};
    pub use crate::list::{
        PropertyBoolList, PropertyColorList, PropertyFloatList, PropertyIntegerList,
        PropertyStringList,
    };
    pub use crate::material::{Material, PropertyMaterial, PropertyMaterialList};
    pub use crate::notify::{PropertyContainer, PropertyStatus, TransactionLog};
    pub use crate::property::{Property, PropertyCore, PropertyKind};
    pub use crate::scalar::{PropertyBool, PropertyFloat, PropertyInteger};
    pub use crate::text::{PropertyPath, PropertyString, PropertyUuid};
    pub use docprop_stream::{Writer, XmlReader};
}
