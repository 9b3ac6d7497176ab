//! Framed element transport.
//!
//! This module reads and writes complete elements on an async byte stream.
//! Reads are bounded: waiting for the first byte of an element is limited by
//! a caller-supplied deadline so the caller's loop can service other work,
//! and once an element has started arriving the remainder must land within
//! the same deadline or the stream is considered unrecoverable.

use crate::reader::decode_element;
use crate::writer::encode_element;
use crate::{CodecError, CodecResult, Element};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;

/// Reads one complete element, waiting at most `deadline` for it to start
/// arriving.
///
/// Returns `CodecError::Timeout` when no element begins before the deadline
/// (a benign condition for a polling read loop), `CodecError::EndOfStream`
/// when the peer closed the stream between elements, and a fatal decode
/// error for anything malformed.
pub async fn read_element_bounded<R>(
    stream: &mut R,
    deadline: Duration,
    max_element_size: usize,
) -> CodecResult<Element>
where
    R: AsyncRead + Unpin,
{
    let mut tag = [0u8; 1];
    let read = match timeout(deadline, stream.read(&mut tag)).await {
        Ok(result) => result.map_err(CodecError::from)?,
        Err(_) => {
            return Err(CodecError::timeout(
                "element tag",
                deadline.as_millis() as u64,
            ))
        }
    };
    if read == 0 {
        return Err(CodecError::EndOfStream {
            context: "element tag".to_string(),
        });
    }

    // The element has started; the rest must arrive within the same bound.
    match timeout(deadline, read_element_body(stream, tag[0], max_element_size)).await {
        Ok(result) => result,
        Err(_) => Err(CodecError::truncated(1, "element body before deadline")),
    }
}

/// Writes one complete element and flushes the stream.
pub async fn write_element<W>(stream: &mut W, element: &Element) -> CodecResult<()>
where
    W: AsyncWrite + Unpin,
{
    let bytes = encode_element(element)?;
    stream
        .write_all(&bytes)
        .await
        .map_err(|e| CodecError::io("write", &e.to_string()))?;
    stream
        .flush()
        .await
        .map_err(|e| CodecError::io("flush", &e.to_string()))?;
    Ok(())
}

/// Reads the length octets and payload that follow an already-consumed tag
/// byte, then decodes the reassembled element.
async fn read_element_body<R>(
    stream: &mut R,
    tag: u8,
    max_element_size: usize,
) -> CodecResult<Element>
where
    R: AsyncRead + Unpin,
{
    let mut raw = vec![tag];

    let first_length = read_exact_byte(stream, "length octet").await?;
    raw.push(first_length);

    let payload_length = if first_length & 0x80 == 0 {
        first_length as usize
    } else {
        let octet_count = (first_length & 0x7F) as usize;
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
        let mut length: u64 = 0;
        for _ in 0..octet_count {
            let octet = read_exact_byte(stream, "length octet").await?;
            raw.push(octet);
            length = (length << 8) | octet as u64;
        }
        usize::try_from(length)
            .map_err(|_| CodecError::invalid_length(format!("length {} overflows", length)))?
    };

    if payload_length > max_element_size {
        return Err(CodecError::ElementTooLarge {
            size: payload_length,
            max: max_element_size,
        });
    }

    let mut payload = vec![0u8; payload_length];
    stream.read_exact(&mut payload).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            CodecError::truncated(payload_length, "element payload")
        } else {
            CodecError::io("read", &e.to_string())
        }
    })?;
    raw.extend_from_slice(&payload);

    decode_element(&raw, max_element_size)
}

async fn read_exact_byte<R>(stream: &mut R, context: &str) -> CodecResult<u8>
where
    R: AsyncRead + Unpin,
{
    let mut byte = [0u8; 1];
    stream.read_exact(&mut byte).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            CodecError::truncated(1, context)
        } else {
            CodecError::io("read", &e.to_string())
        }
    })?;
    Ok(byte[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const MAX: usize = 1 << 20;

    #[tokio::test]
    async fn test_read_write_roundtrip() {
        let element = Element::Sequence(vec![
            Element::Integer(42),
            Element::from_text("hello"),
            Element::Boolean(true),
        ]);

        let mut buffer = Vec::new();
        write_element(&mut buffer, &element).await.unwrap();

        let mut cursor = Cursor::new(buffer);
        let decoded = read_element_bounded(&mut cursor, Duration::from_secs(1), MAX)
            .await
            .unwrap();
        assert_eq!(decoded, element);
    }

    #[tokio::test]
    async fn test_read_end_of_stream() {
        let mut cursor = Cursor::new(Vec::new());
        let result = read_element_bounded(&mut cursor, Duration::from_secs(1), MAX).await;
        assert!(matches!(result, Err(CodecError::EndOfStream { .. })));
    }

    #[tokio::test]
    async fn test_read_truncated_element() {
        // Declares a five-byte payload but only two bytes follow.
        let mut cursor = Cursor::new(vec![0x04, 0x05, b'a', b'b']);
        let result = read_element_bounded(&mut cursor, Duration::from_secs(1), MAX).await;
        assert!(matches!(result, Err(CodecError::Truncated { .. })));
    }

    #[tokio::test]
    async fn test_read_rejects_oversized_element() {
        let mut cursor = Cursor::new(vec![0x04, 0x82, 0x01, 0x00]);
        let result = read_element_bounded(&mut cursor, Duration::from_secs(1), 64).await;
        assert_eq!(
            result,
            Err(CodecError::ElementTooLarge { size: 256, max: 64 })
        );
    }

    #[tokio::test]
    async fn test_read_deadline_elapses() {
        // A duplex pipe with no writer activity: the read must time out.
        let (client, _server) = tokio::io::duplex(64);
        let mut client = client;
        let result =
            read_element_bounded(&mut client, Duration::from_millis(50), MAX).await;
        assert!(matches!(result, Err(CodecError::Timeout { .. })));
    }
}
