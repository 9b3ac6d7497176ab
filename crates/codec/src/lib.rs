//! Wire framing for the stampede control link.
//!
//! This crate provides the nested length-prefixed typed value encoding used
//! between the controller and its client managers: tagged elements
//! (integer, octet string, boolean, null, and constructed sequences), a
//! position-tracked encoder and decoder, and a bounded framed transport
//! layer for async streams.

pub mod element;
pub mod error;
pub mod framed;
pub mod reader;
pub mod writer;

pub use element::{
    Element, TAG_BOOLEAN, TAG_INTEGER, TAG_NULL, TAG_OCTET_STRING, TAG_SEQUENCE,
};
pub use error::{CodecError, CodecResult};
pub use framed::{read_element_bounded, write_element};
pub use reader::{decode_element, ElementReader};
pub use writer::{encode_element, ElementWriter};

/// Default cap on a single element's payload, re-exported for convenience.
pub use stampede_config::MAX_ELEMENT_SIZE;
