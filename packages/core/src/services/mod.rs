//! Business Services
//!
//! This module contains the location-tree business logic:
//!
//! - `InventoryGroupService` - create / update / retrieve / list / delete façade
//! - `SiblingRankManager` - dense sibling rank maintenance
//! - `TreeBuilder` - ancestor / descendant tree reconstruction
//!
//! Services talk to persistence only through the `db::GroupStore` trait.

pub mod error;
pub mod inventory_group_service;
pub mod rank_manager;
pub mod tree_builder;

pub use error::{InventoryGroupServiceError, ServiceResult};
pub use inventory_group_service::InventoryGroupService;
pub use rank_manager::SiblingRankManager;
pub use tree_builder::TreeBuilder;
