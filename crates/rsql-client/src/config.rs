//! Connection configuration.

use std::time::Duration;

use crate::error::{Error, Result};

/// Default server port when the connection string omits one.
pub const DEFAULT_PORT: u16 = 7777;

/// Default keepalive interval.
///
/// The server aggressively closes connections that stay idle for about
/// 30 seconds; the keepalive ticker must fire well inside that window.
pub const DEFAULT_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(20);

/// Diagnostic options transmitted with the login message.
///
/// Each flag is sent to the server only when set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionOptions {
    /// Ask the server to show the AST of each batch.
    pub show_tree: bool,
    /// Disable constant folding, for debugging.
    pub no_constant_fold: bool,
    /// Parse and compile batches without running them.
    pub no_exec: bool,
}

/// Connection parameters for an RSQL session.
///
/// Usually built from a connection string:
///
/// ```rust
/// use rsql_client::Config;
///
/// let config = Config::from_connection_string(
///     "server=localhost;login=sa;password=changeme;database=mydb",
/// ).unwrap();
/// assert_eq!(config.server_addr, "localhost:7777");
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Server address as `host:port`.
    pub server_addr: String,
    /// Login name, lowercased.
    pub login: String,
    /// Password, case preserved.
    pub password: String,
    /// Database name, lowercased.
    pub database: String,
    /// Diagnostic options for the session.
    pub options: SessionOptions,
    /// Interval between keepalive messages.
    pub keepalive_interval: Duration,
}

impl Config {
    /// Parse a connection string of `attr=val` pairs separated by
    /// semicolons.
    ///
    /// Recognized attributes (case-insensitive): `server`, `login`,
    /// `password`, `database`. The port defaults to [`DEFAULT_PORT`] when
    /// the server value carries none; `login` and `database` are lowercased,
    /// the password keeps its case. Empty segments are skipped; unknown
    /// attributes and empty values are rejected.
    pub fn from_connection_string(conn_str: &str) -> Result<Self> {
        if !conn_str.contains('=') {
            return Err(Error::Config(
                "connection string must contain attr=val pairs separated by semicolons".into(),
            ));
        }

        let mut config = Config {
            server_addr: String::new(),
            login: String::new(),
            password: String::new(),
            database: String::new(),
            options: SessionOptions::default(),
            keepalive_interval: DEFAULT_KEEPALIVE_INTERVAL,
        };

        for item in conn_str.split(';') {
            if item.trim().is_empty() {
                // consecutive or trailing semicolons
                continue;
            }

            let parts: Vec<&str> = item.split('=').collect();
            let &[attr, val] = parts.as_slice() else {
                return Err(Error::Config(
                    "connection string must contain attr=val pairs separated by semicolons"
                        .into(),
                ));
            };

            let attr = attr.trim().to_lowercase();
            if attr.is_empty() {
                return Err(Error::Config(
                    "connection string attributes cannot be empty".into(),
                ));
            }
            let val = val.trim();
            if val.is_empty() {
                return Err(Error::Config(format!(
                    "connection string: value for attribute \"{attr}\" cannot be empty"
                )));
            }

            match attr.as_str() {
                "server" => {
                    config.server_addr = if val.contains(':') {
                        val.to_string()
                    } else {
                        format!("{val}:{DEFAULT_PORT}")
                    };
                }
                "login" => config.login = val.to_lowercase(),
                "password" => config.password = val.to_string(),
                "database" => config.database = val.to_lowercase(),
                _ => {
                    return Err(Error::Config(format!(
                        "connection string attribute \"{attr}\" is not supported"
                    )));
                }
            }
        }

        Ok(config)
    }

    /// Set the keepalive interval.
    #[must_use]
    pub fn with_keepalive_interval(mut self, interval: Duration) -> Self {
        self.keepalive_interval = interval;
        self
    }

    /// Set the diagnostic session options.
    #[must_use]
    pub fn with_options(mut self, options: SessionOptions) -> Self {
        self.options = options;
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_full_connection_string() {
        let config = Config::from_connection_string(
            "Server=db.example.com:9999;Login=Admin;Password=S3cret;Database=Sales",
        )
        .unwrap();
        assert_eq!(config.server_addr, "db.example.com:9999");
        assert_eq!(config.login, "admin");
        assert_eq!(config.password, "S3cret");
        assert_eq!(config.database, "sales");
        assert_eq!(config.keepalive_interval, DEFAULT_KEEPALIVE_INTERVAL);
    }

    #[test]
    fn test_port_defaults() {
        let config = Config::from_connection_string("server=localhost;login=sa;password=x").unwrap();
        assert_eq!(config.server_addr, "localhost:7777");
    }

    #[test]
    fn test_empty_segments_are_skipped() {
        let config =
            Config::from_connection_string("server = 127.0.0.1; ; login=john;").unwrap();
        assert_eq!(config.server_addr, "127.0.0.1:7777");
        assert_eq!(config.login, "john");
    }

    #[test]
    fn test_unknown_attribute_is_rejected() {
        let err = Config::from_connection_string("server=x;timeout=5").unwrap_err();
        assert!(err.to_string().contains("timeout"));
    }

    #[test]
    fn test_empty_value_is_rejected() {
        assert!(Config::from_connection_string("server=;login=sa").is_err());
        assert!(Config::from_connection_string("plain text").is_err());
        assert!(Config::from_connection_string("server=a=b;login=sa").is_err());
    }

    #[test]
    fn test_builders() {
        let config = Config::from_connection_string("server=x;login=a;password=b")
            .unwrap()
            .with_keepalive_interval(Duration::from_secs(5))
            .with_options(SessionOptions {
                show_tree: true,
                ..SessionOptions::default()
            });
        assert_eq!(config.keepalive_interval, Duration::from_secs(5));
        assert!(config.options.show_tree);
    }
}
