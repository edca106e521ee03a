//! Session lifecycle: login, keepalive, close and cancellation.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::time::Duration;

use rsql_client::{Config, Connection, Error};
use rsql_testing::{ColumnSpec, MockServer, ResponseScript};

#[tokio::test]
async fn test_login_failure_aborts_connect() {
    let server = MockServer::builder().reject_login().start().await.unwrap();

    let config = Config::from_connection_string(&server.connection_string()).unwrap();
    let err = Connection::connect(config).await.unwrap_err();
    assert!(matches!(err, Error::LoginFailed));
}

#[tokio::test]
async fn test_close_is_idempotent() {
    let server = MockServer::builder().start().await.unwrap();

    let config = Config::from_connection_string(&server.connection_string()).unwrap();
    let conn = Connection::connect(config).await.unwrap();

    conn.close().await;
    conn.close().await;

    // A handle created before the close still works.
    let handle = conn.close_handle();
    handle.close().await;
}

#[tokio::test]
async fn test_close_unblocks_inflight_batch() {
    // The script announces a recordset and then goes quiet, so the next
    // row read blocks until the session is torn down.
    let server = MockServer::builder()
        .response(ResponseScript::new().record_layout(&["x"], &[ColumnSpec::Int]))
        .start()
        .await
        .unwrap();

    let config = Config::from_connection_string(&server.connection_string()).unwrap();
    let mut conn = Connection::connect(config).await.unwrap();
    let handle = conn.close_handle();

    let mut batch = conn.query("SELECT x FROM t;").await.unwrap();
    assert!(batch.exists_next_recordset());

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.close().await;
    });

    // The pending read fails instead of hanging.
    assert!(!batch.next().await);
    assert!(batch.err().is_some());
    assert!(batch.finalize().await.is_err());
}

#[tokio::test]
async fn test_keepalive_traffic_does_not_disturb_batches() {
    let server = MockServer::builder()
        .response(ResponseScript::new().execution_finished(1).batch_end(0))
        .start()
        .await
        .unwrap();

    let config = Config::from_connection_string(&server.connection_string())
        .unwrap()
        .with_keepalive_interval(Duration::from_millis(20));
    let mut conn = Connection::connect(config).await.unwrap();

    // Let several keepalive ticks hit the wire before and around the batch.
    tokio::time::sleep(Duration::from_millis(120)).await;

    let batch = conn.execute("INSERT INTO mytest..t1 VALUES (1);").await.unwrap();
    assert_eq!(batch.exec_record_count(), 1);
    drop(batch);

    tokio::time::sleep(Duration::from_millis(60)).await;
    conn.close().await;
}

#[tokio::test]
async fn test_operations_after_close_fail() {
    let server = MockServer::builder().start().await.unwrap();

    let config = Config::from_connection_string(&server.connection_string()).unwrap();
    let mut conn = Connection::connect(config).await.unwrap();
    conn.close().await;

    let err = conn.query("SELECT 1;").await.unwrap_err();
    assert!(!matches!(err, Error::Batch(_)), "got {err}");
}
