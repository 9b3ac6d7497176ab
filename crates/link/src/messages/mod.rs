//! Control-protocol messages.
//!
//! Every message on the link is a top-level sequence of
//! `(message type, message ID, body)`. The body is itself a sequence whose
//! layout depends on the type. Decoding is strict; any deviation is a
//! protocol error, which the link treats as fatal.

pub mod message_id;
pub mod response_code;

pub use message_id::MessageIdSequence;
pub use response_code::ResponseCode;

use crate::error::{LinkError, LinkResult};
use stampede_codec::Element;

/// Wire value identifying a `ManagerHello`.
pub const TYPE_MANAGER_HELLO: i64 = 1;
/// Wire value identifying a `HelloResponse`.
pub const TYPE_HELLO_RESPONSE: i64 = 2;
/// Wire value identifying a `StartClientRequest`.
pub const TYPE_START_CLIENT_REQUEST: i64 = 3;
/// Wire value identifying a `StartClientResponse`.
pub const TYPE_START_CLIENT_RESPONSE: i64 = 4;
/// Wire value identifying a `StopClientRequest`.
pub const TYPE_STOP_CLIENT_REQUEST: i64 = 5;
/// Wire value identifying a `StopClientResponse`.
pub const TYPE_STOP_CLIENT_RESPONSE: i64 = 6;
/// Wire value identifying a `ServerShutdown`.
pub const TYPE_SERVER_SHUTDOWN: i64 = 7;

/// The payload of a control message.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlMessageBody {
    /// Manager to controller, first message on every connection.
    ManagerHello {
        client_version: String,
        client_id: String,
        max_clients: i64,
    },
    /// Controller's verdict on a hello.
    HelloResponse {
        response_code: ResponseCode,
        response_message: String,
    },
    /// Controller asks the manager to spawn client processes.
    StartClientRequest { count: i64 },
    /// Manager's outcome for a start request.
    StartClientResponse {
        response_code: ResponseCode,
        response_message: String,
    },
    /// Controller asks the manager to kill client processes. A negative
    /// count means all of them.
    StopClientRequest { count: i64 },
    /// Manager reports how many clients it actually stopped.
    StopClientResponse { stopped: i64 },
    /// Controller is going down; the manager should close and reconnect
    /// later.
    ServerShutdown,
}

/// One framed control message.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlMessage {
    pub message_id: i64,
    pub body: ControlMessageBody,
}

impl ControlMessage {
    pub fn new(message_id: i64, body: ControlMessageBody) -> Self {
        Self { message_id, body }
    }

    /// The wire value for this message's type.
    pub fn message_type(&self) -> i64 {
        match &self.body {
            ControlMessageBody::ManagerHello { .. } => TYPE_MANAGER_HELLO,
            ControlMessageBody::HelloResponse { .. } => TYPE_HELLO_RESPONSE,
            ControlMessageBody::StartClientRequest { .. } => TYPE_START_CLIENT_REQUEST,
            ControlMessageBody::StartClientResponse { .. } => TYPE_START_CLIENT_RESPONSE,
            ControlMessageBody::StopClientRequest { .. } => TYPE_STOP_CLIENT_REQUEST,
            ControlMessageBody::StopClientResponse { .. } => TYPE_STOP_CLIENT_RESPONSE,
            ControlMessageBody::ServerShutdown => TYPE_SERVER_SHUTDOWN,
        }
    }

    /// Encodes the message as its wire element.
    pub fn encode(&self) -> Element {
        let body = match &self.body {
            ControlMessageBody::ManagerHello {
                client_version,
                client_id,
                max_clients,
            } => vec![
                Element::from_text(client_version.clone()),
                Element::from_text(client_id.clone()),
                Element::Integer(*max_clients),
            ],
            ControlMessageBody::HelloResponse {
                response_code,
                response_message,
            }
            | ControlMessageBody::StartClientResponse {
                response_code,
                response_message,
            } => vec![
                Element::Integer(response_code.code()),
                Element::from_text(response_message.clone()),
            ],
            ControlMessageBody::StartClientRequest { count }
            | ControlMessageBody::StopClientRequest { count } => {
                vec![Element::Integer(*count)]
            }
            ControlMessageBody::StopClientResponse { stopped } => {
                vec![Element::Integer(*stopped)]
            }
            ControlMessageBody::ServerShutdown => Vec::new(),
        };

        Element::Sequence(vec![
            Element::Integer(self.message_type()),
            Element::Integer(self.message_id),
            Element::Sequence(body),
        ])
    }

    /// Decodes a wire element into a message.
    pub fn decode(element: &Element) -> LinkResult<Self> {
        let envelope = element
            .as_sequence()
            .map_err(|e| LinkError::protocol(format!("bad envelope: {}", e)))?;
        if envelope.len() != 3 {
            return Err(LinkError::protocol(format!(
                "envelope has {} elements, expected 3",
                envelope.len()
            )));
        }

        let message_type = envelope[0]
            .as_integer()
            .map_err(|e| LinkError::protocol(format!("bad message type: {}", e)))?;
        let message_id = envelope[1]
            .as_integer()
            .map_err(|e| LinkError::protocol(format!("bad message id: {}", e)))?;
        let body = envelope[2]
            .as_sequence()
            .map_err(|e| LinkError::protocol(format!("bad message body: {}", e)))?;

        let body = match message_type {
            TYPE_MANAGER_HELLO => {
                expect_fields(body, 3, "ManagerHello")?;
                ControlMessageBody::ManagerHello {
                    client_version: text_field(&body[0], "client version")?,
                    client_id: text_field(&body[1], "client id")?,
                    max_clients: integer_field(&body[2], "max clients")?,
                }
            }
            TYPE_HELLO_RESPONSE => {
                expect_fields(body, 2, "HelloResponse")?;
                ControlMessageBody::HelloResponse {
                    response_code: code_field(&body[0])?,
                    response_message: text_field(&body[1], "response message")?,
                }
            }
            TYPE_START_CLIENT_REQUEST => {
                expect_fields(body, 1, "StartClientRequest")?;
                ControlMessageBody::StartClientRequest {
                    count: integer_field(&body[0], "count")?,
                }
            }
            TYPE_START_CLIENT_RESPONSE => {
                expect_fields(body, 2, "StartClientResponse")?;
                ControlMessageBody::StartClientResponse {
                    response_code: code_field(&body[0])?,
                    response_message: text_field(&body[1], "response message")?,
                }
            }
            TYPE_STOP_CLIENT_REQUEST => {
                expect_fields(body, 1, "StopClientRequest")?;
                ControlMessageBody::StopClientRequest {
                    count: integer_field(&body[0], "count")?,
                }
            }
            TYPE_STOP_CLIENT_RESPONSE => {
                expect_fields(body, 1, "StopClientResponse")?;
                ControlMessageBody::StopClientResponse {
                    stopped: integer_field(&body[0], "stopped")?,
                }
            }
            TYPE_SERVER_SHUTDOWN => {
                expect_fields(body, 0, "ServerShutdown")?;
                ControlMessageBody::ServerShutdown
            }
            other => {
                return Err(LinkError::protocol(format!(
                    "unknown message type {}",
                    other
                )))
            }
        };

        Ok(ControlMessage { message_id, body })
    }
}

fn expect_fields(body: &[Element], expected: usize, kind: &str) -> LinkResult<()> {
    if body.len() != expected {
        return Err(LinkError::protocol(format!(
            "{} body has {} fields, expected {}",
            kind,
            body.len(),
            expected
        )));
    }
    Ok(())
}

fn text_field(element: &Element, what: &str) -> LinkResult<String> {
    element
        .as_text()
        .map_err(|e| LinkError::protocol(format!("bad {}: {}", what, e)))
}

fn integer_field(element: &Element, what: &str) -> LinkResult<i64> {
    element
        .as_integer()
        .map_err(|e| LinkError::protocol(format!("bad {}: {}", what, e)))
}

fn code_field(element: &Element) -> LinkResult<ResponseCode> {
    let code = integer_field(element, "response code")?;
    ResponseCode::from_code(code)
        .ok_or_else(|| LinkError::protocol(format!("unknown response code {}", code)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(message: ControlMessage) {
        let decoded = ControlMessage::decode(&message.encode()).unwrap();
        assert_eq!(decoded, message);
    }

    #[test]
    fn test_all_message_kinds_roundtrip() {
        roundtrip(ControlMessage::new(
            1,
            ControlMessageBody::ManagerHello {
                client_version: "2.0".into(),
                client_id: "rack-17".into(),
                max_clients: 25,
            },
        ));
        roundtrip(ControlMessage::new(
            1,
            ControlMessageBody::HelloResponse {
                response_code: ResponseCode::Success,
                response_message: "welcome".into(),
            },
        ));
        roundtrip(ControlMessage::new(
            2,
            ControlMessageBody::StartClientRequest { count: 5 },
        ));
        roundtrip(ControlMessage::new(
            2,
            ControlMessageBody::StartClientResponse {
                response_code: ResponseCode::InsufficientClients,
                response_message: "only 3 slots left".into(),
            },
        ));
        roundtrip(ControlMessage::new(
            4,
            ControlMessageBody::StopClientRequest { count: -1 },
        ));
        roundtrip(ControlMessage::new(
            4,
            ControlMessageBody::StopClientResponse { stopped: 7 },
        ));
        roundtrip(ControlMessage::new(6, ControlMessageBody::ServerShutdown));
    }

    #[test]
    fn test_decode_rejects_unknown_type() {
        let element = Element::Sequence(vec![
            Element::Integer(99),
            Element::Integer(1),
            Element::Sequence(vec![]),
        ]);
        assert!(matches!(
            ControlMessage::decode(&element),
            Err(LinkError::Protocol { .. })
        ));
    }

    #[test]
    fn test_decode_rejects_short_envelope() {
        let element = Element::Sequence(vec![Element::Integer(1)]);
        assert!(ControlMessage::decode(&element).is_err());
    }

    #[test]
    fn test_decode_rejects_wrong_field_count() {
        let element = Element::Sequence(vec![
            Element::Integer(TYPE_START_CLIENT_REQUEST),
            Element::Integer(2),
            Element::Sequence(vec![Element::Integer(1), Element::Integer(2)]),
        ]);
        assert!(ControlMessage::decode(&element).is_err());
    }

    #[test]
    fn test_decode_rejects_unknown_response_code() {
        let element = Element::Sequence(vec![
            Element::Integer(TYPE_HELLO_RESPONSE),
            Element::Integer(2),
            Element::Sequence(vec![Element::Integer(42), Element::from_text("??")]),
        ]);
        assert!(ControlMessage::decode(&element).is_err());
    }
}
