//! Control link between the controller and its client managers.
//!
//! This crate implements the manager side of the long-lived control
//! channel: typed length-prefixed messages over TCP (optionally TLS), the
//! connect/handshake/serve state machine with reconnection, and the
//! supervision of spawned client processes.

pub mod children;
pub mod error;
pub mod manager;
pub mod messages;
pub mod transport;

pub use children::{ClientProcessList, ManagedClient};
pub use error::{LinkError, LinkResult};
pub use manager::ClientManager;
pub use messages::{
    ControlMessage, ControlMessageBody, MessageIdSequence, ResponseCode,
};
pub use transport::{connect, Transport};
