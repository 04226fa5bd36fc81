//! acaflow wire protocol
//!
//! This crate defines the JSON shapes exchanged between the remote webhook
//! relay, the acaflow plugin bus and the code that issues commands.
//!
//! # Protocol Overview
//!
//! The relay socket carries JSON text frames.
//!
//! ## Frames
//!
//! - handshake (client -> relay): `{"auth": "<api-key>", "fastForward": <bool>}`
//! - webhook (relay -> client): `{"topic": "<topic>", "body": <record>}`
//!
//! ## Bus messages
//!
//! - event: `{"type": "aca-...-event", "payload": <record>}`
//! - command: `{"type": "<capability-tag>", "body": <params>}`
//! - response: `{"statusCode": <int>, "body": <value> | {"error": <diagnostic>}}`

mod envelope;
mod types;

pub use envelope::*;
pub use types::*;

/// Protocol version
pub const PROTOCOL_VERSION: &str = "1.0.0";
