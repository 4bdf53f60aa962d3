//! Inventory Group Data Structures
//!
//! This module defines the `InventoryGroup` record stored by the location-tree
//! engine, plus the create/update DTOs handed in by route handlers.
//!
//! # Materialized Paths
//!
//! Every group carries an `mpath`: the `.`-joined chain of ancestor ids
//! ending in its own id. A root group's `mpath` is exactly its id.
//!
//! ```text
//! zone  (igrp_a)                mpath = "igrp_a"
//! └─ aisle (igrp_b)             mpath = "igrp_a.igrp_b"
//!    └─ shelf (igrp_c)          mpath = "igrp_a.igrp_b.igrp_c"
//! ```
//!
//! # Examples
//!
//! ```rust
//! use stocktree_core::models::CreateInventoryGroup;
//!
//! let input = CreateInventoryGroup::new("Aisle 3")
//!     .with_zone("A")
//!     .with_aisle(3);
//! assert!(input.handle.is_none());
//! ```

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Prefix for generated group ids
pub const GROUP_ID_PREFIX: &str = "igrp";

/// Generate a new group id (`igrp_<uuid-simple>`)
///
/// Generated ids never contain the materialized-path delimiter.
pub fn generate_group_id() -> String {
    format!("{}_{}", GROUP_ID_PREFIX, Uuid::new_v4().simple())
}

/// Current time at the microsecond precision timestamps are stored with
pub fn timestamp_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// A node in the warehouse location hierarchy.
///
/// # Fields
///
/// - `id`: Stable identifier, assigned at creation
/// - `handle`: URL-safe slug, unique among non-deleted groups
/// - `group_type`: Free-form classification tag (serialized as `type`)
/// - `zone_code` / `aisle_number` / `group_number` / `shelf_number`: positional
///   attributes used to derive `handle` and `location_code`
/// - `mpath`: Materialized ancestor path ending in `id`
/// - `parent_group_id`: Parent reference, `None` for roots
/// - `rank`: 0-based position among siblings sharing `parent_group_id`
/// - `deleted_at`: Soft-delete marker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryGroup {
    pub id: String,

    pub name: String,

    pub handle: String,

    #[serde(rename = "type")]
    pub group_type: Option<String>,

    pub zone_code: Option<String>,

    pub aisle_number: Option<u32>,

    pub group_number: Option<u32>,

    pub shelf_number: Option<u32>,

    /// Human-readable composite code (`A03-05-2`), not unique
    pub location_code: Option<String>,

    pub mpath: String,

    pub parent_group_id: Option<String>,

    pub rank: i64,

    pub is_active: bool,

    /// Opaque pass-through data
    pub metadata: Option<serde_json::Value>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl InventoryGroup {
    /// Check if this group is a root (no parent)
    pub fn is_root(&self) -> bool {
        self.parent_group_id.is_none()
    }

    /// Check if this group has been soft-deleted
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Number of segments in the materialized path (1 for roots)
    pub fn depth(&self) -> usize {
        crate::utils::mpath::segment_count(&self.mpath)
    }

    /// Apply a partial update in place.
    ///
    /// Structural fields (`parent_group_id`, `rank`) are NOT applied here; the
    /// service routes those through the rank manager and path rewrite.
    ///
    /// Returns `true` if any positional attribute changed.
    pub fn apply_patch(&mut self, patch: &UpdateInventoryGroup) -> bool {
        let before = (
            self.zone_code.clone(),
            self.aisle_number,
            self.group_number,
            self.shelf_number,
        );

        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(handle) = &patch.handle {
            self.handle = handle.clone();
        }
        if let Some(group_type) = &patch.group_type {
            self.group_type = group_type.clone();
        }
        if let Some(zone_code) = &patch.zone_code {
            self.zone_code = zone_code.clone();
        }
        if let Some(aisle_number) = patch.aisle_number {
            self.aisle_number = aisle_number;
        }
        if let Some(group_number) = patch.group_number {
            self.group_number = group_number;
        }
        if let Some(shelf_number) = patch.shelf_number {
            self.shelf_number = shelf_number;
        }
        if let Some(location_code) = &patch.location_code {
            self.location_code = location_code.clone();
        }
        if let Some(is_active) = patch.is_active {
            self.is_active = is_active;
        }
        if let Some(metadata) = &patch.metadata {
            self.metadata = metadata.clone();
        }

        self.updated_at = timestamp_now();

        before
            != (
                self.zone_code.clone(),
                self.aisle_number,
                self.group_number,
                self.shelf_number,
            )
    }
}

/// Input for creating a group
///
/// `handle` and `location_code` are derived when absent. `rank` appends to the
/// sibling group when absent and is clamped to the append position when it
/// points past the end.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateInventoryGroup {
    pub name: String,

    #[serde(default)]
    pub handle: Option<String>,

    #[serde(default, rename = "type")]
    pub group_type: Option<String>,

    #[serde(default)]
    pub zone_code: Option<String>,

    #[serde(default)]
    pub aisle_number: Option<u32>,

    #[serde(default)]
    pub group_number: Option<u32>,

    #[serde(default)]
    pub shelf_number: Option<u32>,

    #[serde(default)]
    pub location_code: Option<String>,

    #[serde(default)]
    pub parent_group_id: Option<String>,

    #[serde(default)]
    pub rank: Option<i64>,

    #[serde(default)]
    pub is_active: Option<bool>,

    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

impl CreateInventoryGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_parent(mut self, parent_group_id: impl Into<String>) -> Self {
        self.parent_group_id = Some(parent_group_id.into());
        self
    }

    pub fn with_handle(mut self, handle: impl Into<String>) -> Self {
        self.handle = Some(handle.into());
        self
    }

    pub fn with_type(mut self, group_type: impl Into<String>) -> Self {
        self.group_type = Some(group_type.into());
        self
    }

    pub fn with_zone(mut self, zone_code: impl Into<String>) -> Self {
        self.zone_code = Some(zone_code.into());
        self
    }

    pub fn with_aisle(mut self, aisle_number: u32) -> Self {
        self.aisle_number = Some(aisle_number);
        self
    }

    pub fn with_group_number(mut self, group_number: u32) -> Self {
        self.group_number = Some(group_number);
        self
    }

    pub fn with_shelf(mut self, shelf_number: u32) -> Self {
        self.shelf_number = Some(shelf_number);
        self
    }

    pub fn with_rank(mut self, rank: i64) -> Self {
        self.rank = Some(rank);
        self
    }
}

/// Custom deserializer for optional fields that accepts both plain values and nested Options
///
/// Maps three input formats to the double-Option pattern:
/// - Missing field → None (don't update)
/// - null → Some(None) (clear the field)
/// - value → Some(Some(value)) (set to value)
pub(crate) fn deserialize_optional_field<'de, D, T>(
    deserializer: D,
) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Some(Option::<T>::deserialize(deserializer)?))
}

/// Partial update for a single group, keyed by `id`
///
/// # Double-Option Pattern for Nullable Fields
///
/// - `None`: Don't change this field
/// - `Some(None)`: Clear the field (set to NULL)
/// - `Some(Some(value))`: Set the field to `value`
///
/// `parent_group_id: Some(None)` detaches the group to the root level.
///
/// # Examples
///
/// ```rust
/// # use stocktree_core::models::UpdateInventoryGroup;
/// // Rename only
/// let rename = UpdateInventoryGroup::new("igrp_1").with_name("Cold Storage");
///
/// // Clear the zone and move under a new parent at the front
/// let update = UpdateInventoryGroup {
///     zone_code: Some(None),
///     parent_group_id: Some(Some("igrp_2".to_string())),
///     rank: Some(0),
///     ..UpdateInventoryGroup::new("igrp_1")
/// };
/// assert!(update.changes_structure());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateInventoryGroup {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,

    #[serde(
        default,
        rename = "type",
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_field"
    )]
    pub group_type: Option<Option<String>>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_field"
    )]
    pub zone_code: Option<Option<String>>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_field"
    )]
    pub aisle_number: Option<Option<u32>>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_field"
    )]
    pub group_number: Option<Option<u32>>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_field"
    )]
    pub shelf_number: Option<Option<u32>>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_field"
    )]
    pub location_code: Option<Option<String>>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_field"
    )]
    pub parent_group_id: Option<Option<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_field"
    )]
    pub metadata: Option<Option<serde_json::Value>>,
}

impl UpdateInventoryGroup {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_parent(mut self, parent_group_id: Option<String>) -> Self {
        self.parent_group_id = Some(parent_group_id);
        self
    }

    pub fn with_rank(mut self, rank: i64) -> Self {
        self.rank = Some(rank);
        self
    }

    /// Whether this patch touches `parent_group_id` or `rank`
    pub fn changes_structure(&self) -> bool {
        self.parent_group_id.is_some() || self.rank.is_some()
    }
}
