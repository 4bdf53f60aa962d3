//! Stocktree Core - Warehouse Location Tree Engine
//!
//! This crate maintains a hierarchy of inventory location groups
//! (zones → aisles → groups/bays → shelves) on top of a transactional store.
//!
//! # Architecture
//!
//! - **Materialized paths**: every group stores its ancestor chain in `mpath`,
//!   so subtree and ancestor lookups are prefix / equality matches
//! - **Dense sibling ranks**: siblings are ordered `0..n`, maintained with
//!   bounded range shifts inside one transaction
//! - **Pluggable stores**: libsql (embedded SQLite) or in-memory
//!
//! # Modules
//!
//! - [`models`] - Data structures and DTOs
//! - [`utils`] - Handle / location-code derivation and mpath arithmetic
//! - [`db`] - Store abstraction and backends
//! - [`services`] - Business services (InventoryGroupService, rank manager, tree builder)

pub mod db;
pub mod models;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use models::*;
pub use services::*;
