//! Database Layer
//!
//! This module handles persistence of inventory groups:
//!
//! - `GroupStore` / `TransactionalStore` - the store abstraction the engine talks to
//! - `LibsqlStore` - durable backend on an embedded libsql database
//! - `MemoryStore` - in-process backend for tests and ephemeral use
//! - `DatabaseService` / `DatabaseConfig` - connection and schema management
//!
//! # Architecture
//!
//! The service layer never issues SQL. Every read and write goes through
//! `StoreFilter` / `FindOptions`, which both backends evaluate identically.

mod config;
mod database;
mod error;
mod group_store;
mod libsql_store;
mod memory_store;

pub use config::{DatabaseConfig, BUSY_TIMEOUT_ENV, DB_PATH_ENV};
pub use database::{DatabaseService, GROUPS_TABLE};
pub use error::DatabaseError;
pub use group_store::{
    DeletedScope, FindOptions, GroupStore, ParentScope, RankRange, StoreFilter,
    StoreTransaction, TransactionalStore,
};
pub use libsql_store::{LibsqlStore, LibsqlTransaction};
pub use memory_store::{MemoryStore, MemoryTransaction};
