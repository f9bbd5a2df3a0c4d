//! Process configuration from the environment.
//!
//! | Variable | Default | Meaning |
//! |---|---|---|
//! | `PORT` | `4004` | listening port |
//! | `HOST` | `0.0.0.0` | listening address |
//! | `LIBRIS_DB` | `db.json` | path of the JSON datastore |

use std::path::PathBuf;

use tracing::warn;

pub const DEFAULT_PORT: u16 = 4004;
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_DB_PATH: &str = "db.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_owned(),
            port: DEFAULT_PORT,
            db_path: PathBuf::from(DEFAULT_DB_PATH),
        }
    }
}

impl Config {
    pub fn with_port(port: u16) -> Self {
        Self { port, ..Default::default() }
    }

    /// Reads the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup. Unset or empty values fall back
    /// to the defaults; an unparseable `PORT` is logged and ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(host) = get("HOST") {
            config.host = host;
        }
        if let Some(port) = get("PORT") {
            match port.trim().parse() {
                Ok(port) => config.port = port,
                Err(e) => warn!(%port, default = DEFAULT_PORT, "ignoring invalid PORT: {e}"),
            }
        }
        if let Some(path) = get("LIBRIS_DB") {
            config.db_path = PathBuf::from(path);
        }
        config
    }

    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Base URL advertised in the API description.
    pub fn public_url(&self) -> String {
        format!("http://localhost:{}", self.port)
    }
}
