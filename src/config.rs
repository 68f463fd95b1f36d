//! Runtime settings shared by the `web` and `cli` binaries.
//!
//! Values come from command-line flags, then `SHELF_*` environment
//! variables, then defaults. Call [`load_dotenv`] before parsing so a local
//! `.env` file can supply the environment.

use clap::Args;
use std::{net::SocketAddr, time::Duration};

pub const DEFAULT_DATABASE_URL: &str = "sqlite:./db/shelf.db";

/// Loads `.env` if present. A missing file is not an error.
pub fn load_dotenv() {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("failed to load .env: {e}");
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct DatabaseSettings {
    /// Database connection URL.
    #[arg(long = "database-url", env = "SHELF_DATABASE_URL", default_value = DEFAULT_DATABASE_URL)]
    pub url: String,
}

#[derive(Debug, Clone, Args)]
pub struct ServerSettings {
    /// Address the HTTP server listens on.
    #[arg(long, env = "SHELF_BIND", default_value = "0.0.0.0:3000")]
    pub bind: SocketAddr,

    /// Per-request timeout in milliseconds.
    #[arg(long, env = "SHELF_REQUEST_TIMEOUT_MS", default_value_t = 15_000)]
    pub request_timeout_ms: u64,

    /// Largest accepted request body. Inline cover images count against it.
    #[arg(long, env = "SHELF_MAX_BODY_BYTES", default_value_t = 10 * 1024 * 1024)]
    pub max_body_bytes: usize,
}

impl ServerSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[derive(Debug, Clone, Args)]
pub struct LogSettings {
    /// Default log filter, overridden by `RUST_LOG`.
    #[arg(long = "log", env = "SHELF_LOG", default_value = "info")]
    pub filter: String,

    /// Emit logs as JSON lines.
    #[arg(long = "log-json", env = "SHELF_LOG_JSON")]
    pub json: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        database: DatabaseSettings,
        #[command(flatten)]
        server: ServerSettings,
        #[command(flatten)]
        log: LogSettings,
    }

    #[test]
    fn test_flags_override_defaults() {
        let cli = TestCli::try_parse_from([
            "shelf",
            "--database-url",
            "sqlite::memory:",
            "--bind",
            "127.0.0.1:8080",
            "--request-timeout-ms",
            "500",
            "--log-json",
        ])
        .unwrap();

        assert_eq!("sqlite::memory:", cli.database.url);
        assert_eq!(8080, cli.server.bind.port());
        assert_eq!(Duration::from_millis(500), cli.server.request_timeout());
        assert!(cli.log.json);
    }

    #[test]
    fn test_rejects_bad_bind_address() {
        assert!(TestCli::try_parse_from(["shelf", "--bind", "not-an-address"]).is_err());
    }
}
