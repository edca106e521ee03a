//! # rsql-testing
//!
//! A scripted mock RSQL server for driver tests.
//!
//! The mock accepts one connection, performs the authentication exchange,
//! and answers each received batch with the next scripted response stream,
//! tolerating interleaved keepalives. Response streams are built with
//! [`ResponseScript`], which mirrors the server's message shapes.
//!
//! ## Example
//!
//! ```rust,ignore
//! use rsql_testing::{ColumnSpec, MockServer, ResponseScript, WireValue};
//!
//! #[tokio::test]
//! async fn test_scalar_query() {
//!     let server = MockServer::builder()
//!         .response(
//!             ResponseScript::new()
//!                 .record_layout(&["x"], &[ColumnSpec::Int])
//!                 .record(&[WireValue::Int(1)])
//!                 .record_finished(1)
//!                 .batch_end(0),
//!         )
//!         .start()
//!         .await
//!         .unwrap();
//!
//!     // Connect your client to server.addr()...
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod mock_server;
pub mod script;

pub use mock_server::{MockServer, MockServerBuilder};
pub use script::{ColumnSpec, ErrorSpec, ResponseScript, WireValue};
