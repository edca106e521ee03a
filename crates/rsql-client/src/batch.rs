//! Batch submission and the response state machine.

use std::collections::{HashMap, HashSet};

use rsql_protocol::ResponseTag;
use rsql_types::Field;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::session::{CloseHandle, Session};

/// A connection to an RSQL server.
///
/// A connection runs at most one batch at a time: [`Connection::query`] and
/// [`Connection::execute`] refuse to start while the previous batch has not
/// reached its end. Send everything a task needs in one batch — the server
/// speaks T-SQL, so variables, `IF`/`WHILE` and transactions all fit in a
/// single submission — rather than many small round trips.
///
/// The server closes connections that stay idle for about 30 seconds; a
/// background keepalive suppresses this between batches.
pub struct Connection {
    config: Config,
    session: Session,
    dirty: bool,
}

impl Connection {
    /// Connect and authenticate.
    pub async fn connect(config: Config) -> Result<Connection> {
        let session = Session::connect(&config).await?;
        Ok(Connection {
            config,
            session,
            dirty: false,
        })
    }

    /// The configuration this connection was created with.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// A handle that can close this connection from another task, which is
    /// the way to cancel a running query.
    #[must_use]
    pub fn close_handle(&self) -> CloseHandle {
        self.session.close_handle()
    }

    /// Close the connection. Idempotent and safe from any task.
    pub async fn close(&self) {
        self.session.close().await;
    }

    /// Submit a batch and return as soon as the first recordset (or the end
    /// of the batch) is reached.
    ///
    /// Iterate rows with [`Batch::next`]; drain any remaining statements
    /// with [`Batch::finalize`]. Print payloads and informational messages
    /// from the server are discarded.
    pub async fn query(&mut self, text: impl Into<String>) -> Result<Batch<'_>> {
        let text = text.into();
        self.begin(&text).await?;

        let mut batch = Batch::new(self, text);
        batch.step(StepStop::NextRow).await;
        Ok(batch)
    }

    /// Submit a batch and drive it to completion, discarding any rows.
    ///
    /// Returns when the batch has terminated; the first recorded error (a
    /// server-side [`BatchError`](crate::BatchError) or a transport failure)
    /// is returned as `Err`.
    pub async fn execute(&mut self, text: impl Into<String>) -> Result<Batch<'_>> {
        let text = text.into();
        self.begin(&text).await?;

        let mut batch = Batch::new(self, text);
        batch.step(StepStop::Finalize).await;
        if let Some(err) = &batch.err {
            return Err(err.clone());
        }
        Ok(batch)
    }

    async fn begin(&mut self, text: &str) -> Result<()> {
        if self.dirty {
            return Err(Error::BatchInFlight);
        }
        self.dirty = true;
        self.session.send_batch(text).await
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("server", &self.config.server_addr)
            .field("dirty", &self.dirty)
            .finish()
    }
}

/// Execution state of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BatchStatus {
    /// SQL text has been sent to the server.
    BatchSent,
    /// A recordset was announced; column metadata can be inspected before
    /// the first row is pulled.
    RecordLayoutAvailable,
    /// A row is available for reading.
    RecordAvailable,
    /// The current recordset ended.
    RecordEnd,
    /// The batch has terminated, successfully or with an error.
    BatchEnd,
}

/// Stop condition for the response driver loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StepStop {
    /// Return at the next available row (or recordset boundary).
    NextRow,
    /// Keep consuming until the batch terminates.
    Finalize,
}

/// A running or terminated batch.
///
/// Rows, row counts, errors and the return code are all read through this
/// object. A batch cannot be reused; submit another one through the
/// connection once this batch has ended.
pub struct Batch<'a> {
    pub(crate) conn: &'a mut Connection,

    text: String,
    pub(crate) status: BatchStatus,
    recordset_count: u32,
    pub(crate) colnames: Vec<String>,
    pub(crate) colmap: HashMap<String, usize>,
    pub(crate) row: Vec<Field>,
    /// Rows decoded in the current recordset, verified against the server's
    /// count at its end.
    row_count: i64,
    /// Server-reported count of the last recordset that terminated.
    finished_row_count: i64,
    exec_row_count: i64,
    pub(crate) err: Option<Error>,
    rc: i64,
}

impl<'a> Batch<'a> {
    fn new(conn: &'a mut Connection, text: String) -> Batch<'a> {
        Batch {
            conn,
            text,
            status: BatchStatus::BatchSent,
            recordset_count: 0,
            colnames: Vec::new(),
            colmap: HashMap::new(),
            row: Vec::new(),
            row_count: 0,
            finished_row_count: 0,
            exec_row_count: 0,
            err: None,
            rc: 0,
        }
    }

    /// The SQL text this batch was created with.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Column names of the current recordset.
    ///
    /// Only available between a recordset announcement and its end.
    pub fn columns(&self) -> Result<&[String]> {
        match self.status {
            BatchStatus::RecordLayoutAvailable | BatchStatus::RecordAvailable => {
                Ok(&self.colnames)
            }
            _ => Err(Error::NoRecordset),
        }
    }

    /// Index of a column by exact name.
    ///
    /// Names that appear more than once in the recordset are unaddressable
    /// and return `None`, as do empty names.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.colmap.get(name).copied()
    }

    /// Row count of the last `SELECT` statement that terminated.
    #[must_use]
    pub fn record_count(&self) -> i64 {
        self.finished_row_count
    }

    /// Affected-row count of the last `INSERT`/`UPDATE`/`DELETE` statement
    /// that terminated. Not reported by the server under `SET NOCOUNT ON`.
    #[must_use]
    pub fn exec_record_count(&self) -> i64 {
        self.exec_row_count
    }

    /// How many recordsets have been announced so far.
    #[must_use]
    pub fn recordset_count(&self) -> u32 {
        self.recordset_count
    }

    /// Return code of the batch, valid once it has terminated.
    #[must_use]
    pub fn rc(&self) -> i64 {
        self.rc
    }

    /// The first error recorded by this batch, if any.
    ///
    /// After [`Batch::next`] returns false this must be checked: a false
    /// result means either a clean boundary or a failure. A
    /// [`BatchError`](crate::BatchError) with a non-fatal state leaves the
    /// connection usable for further batches once the batch has ended.
    #[must_use]
    pub fn err(&self) -> Option<&Error> {
        self.err.as_ref()
    }

    /// Advance to the next row of the current recordset.
    ///
    /// Returns true when a row is available. Returns false at a recordset
    /// boundary, at the end of the batch, or on error — check
    /// [`Batch::err`] afterwards.
    pub async fn next(&mut self) -> bool {
        self.step(StepStop::NextRow).await
    }

    /// Whether a recordset announcement is pending, i.e. another recordset
    /// can be iterated with [`Batch::next`].
    #[must_use]
    pub fn exists_next_recordset(&self) -> bool {
        self.status == BatchStatus::RecordLayoutAvailable
    }

    /// Execute all remaining statements until the end of the batch,
    /// discarding their rows.
    ///
    /// Gracefully terminates a [`Connection::query`] batch whose remaining
    /// rows are not needed; does nothing when the batch has already ended.
    pub async fn finalize(&mut self) -> Result<()> {
        if let Some(err) = &self.err {
            return Err(err.clone());
        }

        if self.status != BatchStatus::BatchEnd {
            self.step(StepStop::Finalize).await;
        }

        match &self.err {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    /// Drive the response state machine.
    ///
    /// Consumes server messages in order until the stop condition is met:
    /// with [`StepStop::NextRow`] control returns at the next row or
    /// recordset boundary, with [`StepStop::Finalize`] only at the end of
    /// the batch. Returns true exactly when a row is available.
    ///
    /// A recorded error short-circuits all further progress.
    async fn step(&mut self, stop: StepStop) -> bool {
        if self.err.is_some() {
            return false;
        }

        loop {
            let tag = match self.conn.session.read_response_tag().await {
                Ok(tag) => tag,
                Err(e) => return self.fail(e),
            };

            match tag {
                ResponseTag::RecordLayout => {
                    // A layout arriving while a recordset is active starts a
                    // fresh recordset; the prior one is abandoned without a
                    // count check.
                    let names = match self.conn.session.read_column_names().await {
                        Ok(names) => names,
                        Err(e) => return self.fail(e),
                    };
                    self.colmap = build_column_map(&names);
                    self.colnames = names;

                    self.row = match self.conn.session.read_row_layout().await {
                        Ok(row) => row,
                        Err(e) => return self.fail(e),
                    };

                    self.row_count = 0;
                    self.recordset_count += 1;
                    self.status = BatchStatus::RecordLayoutAvailable;

                    if stop == StepStop::NextRow {
                        // No row yet; the caller may inspect column
                        // metadata before pulling the first one.
                        return false;
                    }
                }

                ResponseTag::Record => {
                    if let Err(e) = self.conn.session.read_row_values(&mut self.row).await {
                        return self.fail(e);
                    }
                    self.row_count += 1;
                    self.status = BatchStatus::RecordAvailable;

                    if stop == StepStop::NextRow {
                        return true;
                    }
                }

                ResponseTag::RecordFinished => {
                    let reported = match self.conn.session.read_int64().await {
                        Ok(n) => n,
                        Err(e) => return self.fail(e),
                    };
                    if reported != self.row_count {
                        return self.fail(Error::Protocol(format!(
                            "recordset row count mismatch: server reported {reported}, driver counted {}",
                            self.row_count
                        )));
                    }

                    self.colnames = Vec::new();
                    self.colmap = HashMap::new();
                    self.row = Vec::new();
                    self.finished_row_count = reported;
                    self.status = BatchStatus::RecordEnd;
                }

                ResponseTag::ExecutionFinished => {
                    self.exec_row_count = match self.conn.session.read_int64().await {
                        Ok(n) => n,
                        Err(e) => return self.fail(e),
                    };
                }

                ResponseTag::Print => {
                    if let Err(e) = self.conn.session.discard_print().await {
                        return self.fail(e);
                    }
                }

                ResponseTag::Message => {
                    if let Err(e) = self.conn.session.read_string().await {
                        return self.fail(e);
                    }
                }

                ResponseTag::Error => {
                    let record = match self.conn.session.read_error_record().await {
                        Ok(record) => record,
                        Err(e) => return self.fail(e),
                    };
                    // The server sends BatchEnd after the error record, so
                    // keep consuming; with state 127 it has also closed the
                    // connection.
                    self.err = Some(Error::Batch(record));
                }

                ResponseTag::BatchEnd => {
                    match self.conn.session.read_int64().await {
                        Ok(rc) => self.rc = rc,
                        Err(e) => return self.fail(e),
                    }
                    self.status = BatchStatus::BatchEnd;
                    // The connection can carry another batch now.
                    self.conn.dirty = false;
                    return false;
                }

                ResponseTag::LoginFailed | ResponseTag::LoginSuccess => {
                    return self.fail(Error::Protocol(format!(
                        "unexpected response tag {tag:?} during batch"
                    )));
                }
            }
        }
    }

    fn fail(&mut self, err: Error) -> bool {
        if self.err.is_none() {
            self.err = Some(err);
        }
        false
    }
}

impl std::fmt::Debug for Batch<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Batch")
            .field("status", &self.status)
            .field("recordset_count", &self.recordset_count)
            .field("row_count", &self.row_count)
            .field("has_error", &self.err.is_some())
            .finish()
    }
}

/// Build the case-exact column-name map.
///
/// Empty names are skipped; a name that appears more than once is removed
/// and stays unaddressable, so the map holds exactly the names that occur
/// once.
fn build_column_map(names: &[String]) -> HashMap<String, usize> {
    let mut map = HashMap::with_capacity(names.len());
    let mut ambiguous = HashSet::new();

    for (index, name) in names.iter().enumerate() {
        if name.is_empty() || ambiguous.contains(name) {
            continue;
        }
        if map.insert(name.clone(), index).is_some() {
            map.remove(name);
            ambiguous.insert(name.clone());
        }
    }

    map
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_column_map_drops_ambiguous_and_empty_names() {
        let map = build_column_map(&names(&["a", "b", "a", ""]));
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("b"), Some(&1));
        assert_eq!(map.get("a"), None);
        assert_eq!(map.get(""), None);
    }

    #[test]
    fn test_column_map_triple_occurrence_stays_absent() {
        let map = build_column_map(&names(&["x", "x", "x", "y"]));
        assert_eq!(map.get("x"), None);
        assert_eq!(map.get("y"), Some(&3));
    }

    #[test]
    fn test_column_map_is_case_exact() {
        let map = build_column_map(&names(&["Id", "id"]));
        assert_eq!(map.get("Id"), Some(&0));
        assert_eq!(map.get("id"), Some(&1));
        assert_eq!(map.get("ID"), None);
    }
}
