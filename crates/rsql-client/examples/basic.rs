//! Basic connection and query example.
//!
//! # Running
//!
//! ```bash
//! export RSQL_SERVER=localhost
//! export RSQL_LOGIN=sa
//! export RSQL_PASSWORD=changeme
//! export RSQL_DATABASE=mytest
//!
//! cargo run --example basic
//! ```

// Allow common patterns in example code
#![allow(clippy::unwrap_used, clippy::expect_used)]

use rsql_client::{Config, Connection, SqlPart};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let server = std::env::var("RSQL_SERVER").unwrap_or_else(|_| "localhost".into());
    let login = std::env::var("RSQL_LOGIN").unwrap_or_else(|_| "sa".into());
    let password = std::env::var("RSQL_PASSWORD").unwrap_or_else(|_| "changeme".into());
    let database = std::env::var("RSQL_DATABASE").unwrap_or_else(|_| "mytest".into());

    let config = Config::from_connection_string(&format!(
        "server={server};login={login};password={password};database={database}"
    ))?;

    println!("Connecting to RSQL at {}...", config.server_addr);
    let mut conn = Connection::connect(config).await?;

    // Create and fill a table; one batch carries the whole task.
    let batch = conn
        .execute(
            r"
            IF OBJECT_ID('mytest..t1') IS NOT NULL DROP TABLE mytest..t1;
            CREATE TABLE mytest..t1 (a INT NULL, b VARCHAR(20) NULL);
            INSERT INTO mytest..t1 VALUES (10, 'Hello'), (NULL, NULL), (20, 'World');
            ",
        )
        .await?;
    println!("table ready, rc={}", batch.rc());

    // Query it back with a templated batch string.
    let text = SqlPart::new("SELECT a, b FROM mytest..t1 WHERE a >= {{min}} ORDER BY a;")
        .bind_int64("min", 0)
        .text()?;

    let mut batch = conn.query(text).await?;
    while batch.next().await {
        for i in 0..batch.col_count() {
            let value = batch.col_string(i).unwrap_or_else(|| "NULL".into());
            print!("\"{value}\"\t");
        }
        println!();
    }
    if let Some(err) = batch.err() {
        return Err(err.clone().into());
    }
    println!("\n({} row(s) affected)", batch.record_count());

    batch.finalize().await?;
    conn.close().await;
    Ok(())
}
