//! Element reader implementation.
//!
//! This module provides a position-tracked reader that decodes typed
//! elements from their tag/length/payload wire form. Decoding is strict:
//! unknown tags, truncated payloads, and over-limit lengths are errors, and
//! all of them are fatal to the connection the bytes came from.

use crate::element::{
    Element, TAG_BOOLEAN, TAG_INTEGER, TAG_NULL, TAG_OCTET_STRING, TAG_SEQUENCE,
};
use crate::{CodecError, CodecResult};

/// A reader for deserializing elements from binary data.
pub struct ElementReader<'a> {
    /// The data being read
    data: &'a [u8],

    /// The current position in the data
    position: usize,

    /// Largest acceptable payload length
    max_element_size: usize,
}

impl<'a> ElementReader<'a> {
    /// Creates a new element reader over the given data.
    pub fn new(data: &'a [u8], max_element_size: usize) -> Self {
        Self {
            data,
            position: 0,
            max_element_size,
        }
    }

    /// Returns the current position in the data.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Returns the number of unread bytes.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    /// Returns whether all bytes have been consumed.
    pub fn is_eof(&self) -> bool {
        self.position >= self.data.len()
    }

    /// Reads one complete element from the current position.
    pub fn read_element(&mut self) -> CodecResult<Element> {
        let tag = self.read_byte("element tag")?;
        let length = self.read_length()?;
        if length > self.max_element_size {
            return Err(CodecError::ElementTooLarge {
                size: length,
                max: self.max_element_size,
            });
        }
        if self.remaining() < length {
            return Err(CodecError::truncated(
                length - self.remaining(),
                "element payload",
            ));
        }

        match tag {
            TAG_INTEGER => self.read_integer(length),
            TAG_OCTET_STRING => {
                let bytes = self.take(length);
                Ok(Element::OctetString(bytes.to_vec()))
            }
            TAG_BOOLEAN => {
                if length != 1 {
                    return Err(CodecError::InvalidBoolean { length });
                }
                let byte = self.read_byte("boolean payload")?;
                Ok(Element::Boolean(byte != 0))
            }
            TAG_NULL => {
                if length != 0 {
                    return Err(CodecError::invalid_length(format!(
                        "null element with {} payload bytes",
                        length
                    )));
                }
                Ok(Element::Null)
            }
            TAG_SEQUENCE => {
                let end = self.position + length;
                let mut children = Vec::new();
                while self.position < end {
                    children.push(self.read_element()?);
                }
                if self.position != end {
                    return Err(CodecError::MalformedSequence {
                        reason: "last child overran the sequence length".to_string(),
                    });
                }
                Ok(Element::Sequence(children))
            }
            other => Err(CodecError::UnknownTag { tag: other }),
        }
    }

    /// Reads a length value: short form below 128, long form above.
    fn read_length(&mut self) -> CodecResult<usize> {
        let first = self.read_byte("length octet")?;
        if first & 0x80 == 0 {
            return Ok(first as usize);
        }

        let octet_count = (first & 0x7F) as usize;
        if octet_count == 0 {
            return Err(CodecError::invalid_length(
                "indefinite length is not supported",
            ));
        }
        if octet_count > 8 {
            return Err(CodecError::invalid_length(format!(
                "length uses {} octets",
                octet_count
            )));
        }
        if self.remaining() < octet_count {
            return Err(CodecError::truncated(
                octet_count - self.remaining(),
                "length octets",
            ));
        }

        let mut length: u64 = 0;
        for _ in 0..octet_count {
            length = (length << 8) | self.read_byte("length octet")? as u64;
        }
        usize::try_from(length)
            .map_err(|_| CodecError::invalid_length(format!("length {} overflows", length)))
    }

    /// Reads a two's-complement big-endian integer payload.
    fn read_integer(&mut self, length: usize) -> CodecResult<Element> {
        if length == 0 {
            return Err(CodecError::InvalidInteger {
                reason: "empty payload".to_string(),
                length,
            });
        }
        if length > 8 {
            return Err(CodecError::InvalidInteger {
                reason: "payload wider than 64 bits".to_string(),
                length,
            });
        }

        let bytes = self.take(length);
        let negative = bytes[0] & 0x80 != 0;
        let mut buf = if negative { [0xFFu8; 8] } else { [0x00u8; 8] };
        buf[8 - length..].copy_from_slice(bytes);
        Ok(Element::Integer(i64::from_be_bytes(buf)))
    }

    fn read_byte(&mut self, context: &str) -> CodecResult<u8> {
        if self.is_eof() {
            return Err(CodecError::truncated(1, context));
        }
        let byte = self.data[self.position];
        self.position += 1;
        Ok(byte)
    }

    fn take(&mut self, count: usize) -> &'a [u8] {
        let slice = &self.data[self.position..self.position + count];
        self.position += count;
        slice
    }
}

/// Decodes a single element from its wire form. Trailing bytes after the
/// element are an error.
pub fn decode_element(data: &[u8], max_element_size: usize) -> CodecResult<Element> {
    let mut reader = ElementReader::new(data, max_element_size);
    let element = reader.read_element()?;
    if !reader.is_eof() {
        return Err(CodecError::MalformedSequence {
            reason: format!("{} trailing bytes after element", reader.remaining()),
        });
    }
    Ok(element)
}
