//! Database configuration
//!
//! Settings are plain values with environment overrides:
//!
//! | variable                    | default                     |
//! |-----------------------------|-----------------------------|
//! | `STOCKTREE_DB_PATH`         | `./data/stocktree.db`       |
//! | `STOCKTREE_BUSY_TIMEOUT_MS` | `5000`                      |

use std::env;
use std::path::PathBuf;

pub const DB_PATH_ENV: &str = "STOCKTREE_DB_PATH";
pub const BUSY_TIMEOUT_ENV: &str = "STOCKTREE_BUSY_TIMEOUT_MS";

const DEFAULT_DB_PATH: &str = "./data/stocktree.db";
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;

/// Connection settings for the libsql backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// Path to the database file (parent directory is created on open)
    pub db_path: PathBuf,

    /// How long a connection waits on a locked database before failing
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

impl DatabaseConfig {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            ..Default::default()
        }
    }

    /// Build from environment variables, falling back to defaults
    ///
    /// An unparseable busy timeout is ignored with a warning.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(path) = env::var(DB_PATH_ENV) {
            if !path.trim().is_empty() {
                config.db_path = PathBuf::from(path);
            }
        }

        if let Ok(raw) = env::var(BUSY_TIMEOUT_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(ms) => config.busy_timeout_ms = ms,
                Err(_) => tracing::warn!(
                    "Ignoring invalid {}='{}', using {}ms",
                    BUSY_TIMEOUT_ENV,
                    raw,
                    config.busy_timeout_ms
                ),
            }
        }

        config
    }

    pub fn with_busy_timeout(mut self, busy_timeout_ms: u64) -> Self {
        self.busy_timeout_ms = busy_timeout_ms;
        self
    }
}
