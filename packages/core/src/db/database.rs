//! Database Connection Management
//!
//! This module provides the database connection and schema initialization
//! for the libsql backend of the location tree.
//!
//! # Architecture
//!
//! - **Path-agnostic**: Accepts any file path through `DatabaseConfig`
//! - **Idempotent schema**: `CREATE ... IF NOT EXISTS`, safe on every start
//! - **WAL mode**: Write-Ahead Logging for better concurrency
//! - **Busy timeout**: Configurable, applied to every async connection
//!
//! # Database Connection Patterns
//!
//! Use `connect_with_timeout()` in async functions so concurrent writers wait
//! on a locked database instead of failing immediately with `SQLITE_BUSY`.
//!
//! ```no_run
//! # use stocktree_core::db::{DatabaseConfig, DatabaseService};
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let db_service = DatabaseService::new(DatabaseConfig::new("./data/stocktree.db")).await?;
//! let conn = db_service.connect_with_timeout().await?;
//! # Ok(())
//! # }
//! ```

use crate::db::config::DatabaseConfig;
use crate::db::error::DatabaseError;
use libsql::{Builder, Database};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Table holding every inventory group, soft-deleted ones included
pub const GROUPS_TABLE: &str = "inventory_groups";

/// Database service for managing the libsql database and schema
#[derive(Debug, Clone)]
pub struct DatabaseService {
    /// libsql database handle (wrapped in Arc for sharing)
    pub db: Arc<Database>,

    pub config: DatabaseConfig,
}

impl DatabaseService {
    /// Open (or create) the database described by `config`
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if:
    /// - Parent directory cannot be created
    /// - Database connection fails
    /// - Schema initialization fails
    pub async fn new(config: DatabaseConfig) -> Result<Self, DatabaseError> {
        let is_new_database = !config.db_path.exists();

        if let Some(parent) = config.db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    if e.kind() == std::io::ErrorKind::PermissionDenied {
                        DatabaseError::permission_denied(config.db_path.clone())
                    } else {
                        DatabaseError::DirectoryCreationFailed(e)
                    }
                })?;
            }
        }

        let db = Builder::new_local(&config.db_path)
            .build()
            .await
            .map_err(|e| DatabaseError::connection_failed(config.db_path.clone(), e))?;

        let service = Self {
            db: Arc::new(db),
            config,
        };

        service.initialize_schema(is_new_database).await?;

        tracing::info!(
            "Opened inventory database at {}",
            service.config.db_path.display()
        );

        Ok(service)
    }

    /// Open with default settings for `db_path`
    pub async fn open(db_path: impl Into<PathBuf>) -> Result<Self, DatabaseError> {
        Self::new(DatabaseConfig::new(db_path)).await
    }

    pub fn db_path(&self) -> &Path {
        &self.config.db_path
    }

    /// Execute a PRAGMA statement
    ///
    /// PRAGMA statements return rows, so they go through query() instead of execute().
    async fn execute_pragma(
        &self,
        conn: &libsql::Connection,
        pragma: &str,
    ) -> Result<(), DatabaseError> {
        let mut stmt = conn.prepare(pragma).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute '{}': {}", pragma, e))
        })?;
        let _ = stmt.query(()).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute '{}': {}", pragma, e))
        })?;
        Ok(())
    }

    /// Create the groups table and its indexes
    ///
    /// # Schema
    ///
    /// - `inventory_groups`: one row per group; `metadata` is JSON text and
    ///   timestamps are RFC 3339 text
    /// - `idx_inventory_groups_handle_live`: partial unique index enforcing
    ///   handle uniqueness among non-deleted rows
    async fn initialize_schema(&self, is_new_database: bool) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        self.execute_pragma(&conn, "PRAGMA journal_mode = WAL")
            .await?;

        conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {} (
                    id TEXT PRIMARY KEY,
                    name TEXT NOT NULL,
                    handle TEXT NOT NULL,
                    \"type\" TEXT,
                    zone_code TEXT,
                    aisle_number INTEGER,
                    group_number INTEGER,
                    shelf_number INTEGER,
                    location_code TEXT,
                    mpath TEXT NOT NULL,
                    parent_group_id TEXT,
                    \"rank\" INTEGER NOT NULL DEFAULT 0,
                    is_active INTEGER NOT NULL DEFAULT 1,
                    metadata TEXT,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL,
                    deleted_at TEXT
                )",
                GROUPS_TABLE
            ),
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to create {} table: {}", GROUPS_TABLE, e))
        })?;

        self.create_indexes(&conn).await?;

        // Flush schema for fresh files so a second process sees the table immediately
        if is_new_database {
            self.execute_pragma(&conn, "PRAGMA wal_checkpoint(TRUNCATE)")
                .await?;
        }

        Ok(())
    }

    async fn create_indexes(&self, conn: &libsql::Connection) -> Result<(), DatabaseError> {
        let indexes = [
            (
                "idx_inventory_groups_parent_rank",
                "CREATE INDEX IF NOT EXISTS idx_inventory_groups_parent_rank
                 ON inventory_groups(parent_group_id, \"rank\")",
            ),
            (
                "idx_inventory_groups_mpath",
                "CREATE INDEX IF NOT EXISTS idx_inventory_groups_mpath
                 ON inventory_groups(mpath)",
            ),
            (
                "idx_inventory_groups_location_code",
                "CREATE INDEX IF NOT EXISTS idx_inventory_groups_location_code
                 ON inventory_groups(location_code)",
            ),
            (
                "idx_inventory_groups_handle_live",
                "CREATE UNIQUE INDEX IF NOT EXISTS idx_inventory_groups_handle_live
                 ON inventory_groups(handle) WHERE deleted_at IS NULL",
            ),
        ];

        for (name, sql) in indexes {
            conn.execute(sql, ()).await.map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to create index '{}': {}", name, e))
            })?;
        }

        Ok(())
    }

    /// Get a bare connection to the database
    ///
    /// No busy timeout is configured; prefer `connect_with_timeout()` in async code.
    pub fn connect(&self) -> Result<libsql::Connection, DatabaseError> {
        self.db.connect().map_err(DatabaseError::LibsqlError)
    }

    /// Get a connection with the configured busy timeout and foreign keys enabled
    pub async fn connect_with_timeout(&self) -> Result<libsql::Connection, DatabaseError> {
        let conn = self.connect()?;

        self.execute_pragma(
            &conn,
            &format!("PRAGMA busy_timeout = {}", self.config.busy_timeout_ms),
        )
        .await?;
        self.execute_pragma(&conn, "PRAGMA foreign_keys = ON")
            .await?;

        Ok(conn)
    }

    /// Flush the WAL into the main database file
    pub async fn checkpoint(&self) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;
        self.execute_pragma(&conn, "PRAGMA wal_checkpoint(TRUNCATE)")
            .await
    }
}
