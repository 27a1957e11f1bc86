//! # docprop-stream
//!
//! Persistence collaborators for document property cells: an indented XML
//! writer, a pull-style XML reader, and little-endian binary streams for the
//! side files that large lists are stored in.
//!
//! ## Table of Contents
//! 1. Error types (`error`)
//! 2. Writer configuration (`config`)
//! 3. XML writer (`writer`)
//! 4. XML reader (`reader`)
//! 5. Binary streams (`binary`)

mod binary;
mod config;
mod error;
mod reader;
mod writer;

pub use binary::*;
pub use config::*;
pub use error::*;
pub use reader::*;
pub use writer::*;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::binary::{InputStream, OutputStream};
    pub use crate::config::StreamConfig;
    pub use crate::error::{Result, StreamError};
    pub use crate::reader::{PendingFile, XmlReader};
    pub use crate::writer::{encode_attribute, FileEntry, Writer};
}
