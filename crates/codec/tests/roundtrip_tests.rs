//! Encode/decode round-trip tests over the full element shape space.

use stampede_codec::{decode_element, encode_element, CodecError, Element};

const MAX: usize = 1 << 20;

fn roundtrip(element: Element) {
    let bytes = encode_element(&element).unwrap();
    let decoded = decode_element(&bytes, MAX).unwrap();
    assert_eq!(decoded, element);
}

#[test]
fn test_integer_extremes() {
    for value in [0, 1, -1, 127, 128, -128, -129, i64::MAX, i64::MIN] {
        roundtrip(Element::Integer(value));
    }
}

#[test]
fn test_octet_string_sizes() {
    roundtrip(Element::OctetString(Vec::new()));
    roundtrip(Element::OctetString(vec![0u8; 127]));
    roundtrip(Element::OctetString(vec![0xABu8; 128]));
    roundtrip(Element::OctetString(vec![0x55u8; 70_000]));
}

#[test]
fn test_booleans_and_null() {
    roundtrip(Element::Boolean(true));
    roundtrip(Element::Boolean(false));
    roundtrip(Element::Null);
}

#[test]
fn test_deep_nesting() {
    let mut element = Element::Integer(9);
    for _ in 0..20 {
        element = Element::Sequence(vec![element.clone(), Element::Null]);
    }
    roundtrip(element);
}

#[test]
fn test_message_shaped_sequence() {
    // A control message envelope: type, message id, body.
    roundtrip(Element::Sequence(vec![
        Element::Integer(1),
        Element::Integer(43),
        Element::Sequence(vec![
            Element::from_text("2.0"),
            Element::from_text("client-7"),
            Element::Integer(25),
        ]),
    ]));
}

#[test]
fn test_empty_sequence() {
    roundtrip(Element::Sequence(Vec::new()));
}

#[test]
fn test_oversized_declared_length_is_fatal() {
    // Valid encoding, but the receiving side enforces a smaller cap.
    let element = Element::OctetString(vec![0u8; 1024]);
    let bytes = encode_element(&element).unwrap();
    let result = decode_element(&bytes, 512);
    assert!(matches!(result, Err(CodecError::ElementTooLarge { .. })));
}
