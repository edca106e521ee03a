//! # rsql-types
//!
//! Typed column field model for RSQL recordsets.
//!
//! When the server announces a recordset it sends a column-name list and a
//! column-layout descriptor. This crate turns the descriptor into a row of
//! [`Field`]s — one strongly-typed slot per column — and decodes each
//! subsequent row's wire values into those slots in place, reusing value
//! buffers across rows.
//!
//! Scaled numeric types (`MONEY`, `NUMERIC`) keep their exact decimal text;
//! they are never re-encoded through a binary float. Temporal types decode
//! to UTC instants.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod datatype;
pub mod field;
pub mod layout;

pub use datatype::Datatype;
pub use field::Field;
pub use layout::{read_column_names, read_row_layout, read_row_values};
