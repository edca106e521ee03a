//! # rsql-protocol
//!
//! Pure implementation of the RSQL wire protocol.
//!
//! RSQL frames every unit of traffic as a message-pack value. This crate
//! provides the message-pack type markers, an append-style encoder over a
//! growable byte buffer, a one-byte type classifier for the decoder, and the
//! request/response/datatype tag sets shared by client and server.
//!
//! ## Design Philosophy
//!
//! This crate is intentionally IO-agnostic. It contains no networking logic
//! and makes no assumptions about the async runtime. Higher-level crates
//! build upon this foundation to provide buffered stream I/O.
//!
//! ## Example
//!
//! ```rust
//! use bytes::BytesMut;
//! use rsql_protocol::{encode, wire_type, WireType};
//!
//! let mut buf = BytesMut::new();
//! encode::append_uint64(&mut buf, 300);
//! assert_eq!(buf.len(), 3); // uint16 encoding
//! assert_eq!(wire_type::classify(buf[0]), WireType::Uint);
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod encode;
pub mod error;
pub mod marker;
pub mod tags;
pub mod wire_type;

pub use error::ProtocolError;
pub use tags::{DatatypeTag, RequestTag, ResponseTag, MAX_BATCH_TEXT};
pub use wire_type::WireType;
