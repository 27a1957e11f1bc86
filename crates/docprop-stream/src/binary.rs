//! # Binary Streams
//!
//! Little-endian primitive streams for side-file blobs. Lengths and counts
//! are `u32`; strings are a `u32` byte length followed by UTF-8 bytes.

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{Result, StreamError};

/// Writes little-endian primitives to any sink
pub struct OutputStream<'a> {
    inner: &'a mut dyn Write,
}

impl<'a> OutputStream<'a> {
    pub fn new(inner: &'a mut dyn Write) -> Self {
        Self { inner }
    }

    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.inner.write_u32::<LittleEndian>(value)?;
        Ok(())
    }

    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        self.inner.write_i32::<LittleEndian>(value)?;
        Ok(())
    }

    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        self.inner.write_f32::<LittleEndian>(value)?;
        Ok(())
    }

    pub fn write_f64(&mut self, value: f64) -> Result<()> {
        self.inner.write_f64::<LittleEndian>(value)?;
        Ok(())
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.inner.write_all(bytes)?;
        Ok(())
    }

    /// Length-prefixed UTF-8 string
    pub fn write_string(&mut self, value: &str) -> Result<()> {
        let len = u32::try_from(value.len()).map_err(|_| {
            StreamError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "string longer than u32::MAX bytes",
            ))
        })?;
        self.write_u32(len)?;
        self.write_bytes(value.as_bytes())
    }
}

/// Reads little-endian primitives from any source
pub struct InputStream<'a> {
    inner: &'a mut dyn Read,
}

impl<'a> InputStream<'a> {
    pub fn new(inner: &'a mut dyn Read) -> Self {
        Self { inner }
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(self.inner.read_u32::<LittleEndian>()?)
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(self.inner.read_i32::<LittleEndian>()?)
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(self.inner.read_f32::<LittleEndian>()?)
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(self.inner.read_f64::<LittleEndian>()?)
    }

    /// Exactly `len` bytes; a short read is an `UnexpectedEof` I/O error
    pub fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        Read::take(&mut *self.inner, len as u64).read_to_end(&mut buf)?;
        if buf.len() != len {
            return Err(StreamError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("expected {} bytes, got {}", len, buf.len()),
            )));
        }
        Ok(buf)
    }

    /// Length-prefixed UTF-8 string
    pub fn read_string(&mut self) -> Result<String> {
        let len = self.read_u32()? as usize;
        let bytes = self.read_bytes(len)?;
        Ok(String::from_utf8(bytes)?)
    }
}
