//! Data Models
//!
//! This module contains the data structures used throughout the location tree:
//!
//! - `InventoryGroup` - a node in the zone → aisle → group → shelf hierarchy
//! - `CreateInventoryGroup` / `UpdateInventoryGroup` - write DTOs
//! - `InventoryGroupFilters` / `FindConfig` - read DTOs
//! - `GroupTreeNode` - owned tree payload for ancestor/descendant inclusion

mod inventory_group;
mod query;

pub use inventory_group::{
    generate_group_id, timestamp_now, CreateInventoryGroup, InventoryGroup,
    UpdateInventoryGroup, GROUP_ID_PREFIX,
};
pub use query::{
    FindConfig, GroupTreeNode, InventoryGroupFilters, OrderBy, OrderField, TreeInclusion,
};
