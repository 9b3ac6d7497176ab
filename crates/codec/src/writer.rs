//! Element writer implementation.
//!
//! This module provides a position-tracked buffer writer that serializes
//! typed elements into their tag/length/payload wire form.

use crate::element::{integer_payload_size, Element};
use crate::CodecResult;
use bytes::{BufMut, BytesMut};

/// A writer for serializing elements to binary data.
pub struct ElementWriter {
    /// The buffer being written to
    buffer: BytesMut,
}

impl ElementWriter {
    /// Creates a new element writer.
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::new(),
        }
    }

    /// Creates a new element writer with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
        }
    }

    /// Returns the number of bytes written so far.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Writes a complete element, including its tag and length octets.
    pub fn write_element(&mut self, element: &Element) -> CodecResult<usize> {
        let start = self.buffer.len();
        self.buffer.put_u8(element.type_tag());
        self.write_length(element.payload_size());
        match element {
            Element::Integer(value) => self.write_integer_payload(*value),
            Element::OctetString(bytes) => self.buffer.put_slice(bytes),
            Element::Boolean(value) => self.buffer.put_u8(if *value { 0xFF } else { 0x00 }),
            Element::Null => {}
            Element::Sequence(children) => {
                for child in children {
                    self.write_element(child)?;
                }
            }
        }
        Ok(self.buffer.len() - start)
    }

    /// Writes a length value: short form below 128, long form above.
    fn write_length(&mut self, length: usize) {
        if length < 0x80 {
            self.buffer.put_u8(length as u8);
            return;
        }

        let be = (length as u64).to_be_bytes();
        let leading = be.iter().take_while(|&&b| b == 0).count();
        let octets = &be[leading..];
        self.buffer.put_u8(0x80 | octets.len() as u8);
        self.buffer.put_slice(octets);
    }

    /// Writes a two's-complement big-endian integer payload with the minimal
    /// number of octets.
    fn write_integer_payload(&mut self, value: i64) {
        let size = integer_payload_size(value);
        let be = value.to_be_bytes();
        self.buffer.put_slice(&be[8 - size..]);
    }

    /// Consumes the writer, returning the written bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer.to_vec()
    }

    /// Returns a copy of the written bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.buffer.to_vec()
    }
}

impl Default for ElementWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Encodes a single element to its wire form.
pub fn encode_element(element: &Element) -> CodecResult<Vec<u8>> {
    let mut writer = ElementWriter::with_capacity(element.encoded_size());
    writer.write_element(element)?;
    Ok(writer.into_bytes())
}
