//! # rsql-client
//!
//! Async client driver for RSQL, a remote SQL execution service speaking a
//! T-SQL-style batch model.
//!
//! A [`Connection`] submits a batch of one or more SQL statements as a
//! single string and consumes a stream of results: recordsets with typed
//! rows, per-statement affected-row counts, a possible batch error and a
//! terminating return code.
//!
//! The server implements T-SQL, so a batch can declare variables, use `IF`
//! and `WHILE`, and wrap its work in `BEGIN TRAN`/`COMMIT`. Send everything
//! a task needs in one batch instead of many round trips, and fetch several
//! recordsets from one submission (see [`Batch::exists_next_recordset`]).
//!
//! The server closes connections idle for more than about 30 seconds. A
//! background keepalive covers gaps between batches, but a connection left
//! unused for long should simply be closed and reopened when needed.
//!
//! ## Example
//!
//! ```rust,ignore
//! use rsql_client::{Config, Connection, SqlPart};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_connection_string(
//!         "server=localhost;login=sa;password=changeme;database=mydb",
//!     )?;
//!     let mut conn = Connection::connect(config).await?;
//!
//!     let text = SqlPart::new("SELECT a, b FROM mydb..t1 WHERE a > {{min}};")
//!         .bind_int64("min", 10)
//!         .text()?;
//!
//!     let mut batch = conn.query(text).await?;
//!     let mut a: i32 = 0;
//!     let mut b = String::new();
//!     while batch.next().await {
//!         batch.scan((&mut a, &mut b))?;
//!         println!("{a} {b}");
//!     }
//!     if let Some(err) = batch.err() {
//!         return Err(err.clone().into());
//!     }
//!     println!("({} row(s) affected)", batch.record_count());
//!
//!     batch.finalize().await?;
//!     conn.close().await;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod batch;
pub mod config;
pub mod cursor;
pub mod error;
pub mod session;
pub mod sqltext;

pub use batch::{Batch, Connection};
pub use config::{Config, SessionOptions, DEFAULT_KEEPALIVE_INTERVAL, DEFAULT_PORT};
pub use cursor::{localize_time, ScanDestinations, ScanTarget};
pub use error::{BatchError, Error, Result, STATE_CONNECTION_CLOSED};
pub use session::{CloseHandle, Session};
pub use sqltext::{SqlPart, SqlText, TemplateError};

// Re-export the value model used by the cursor surface.
pub use rsql_types::{Datatype, Field};
