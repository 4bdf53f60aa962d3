//! Query DTOs and tree payloads
//!
//! `InventoryGroupFilters` is what route handlers pass to `list`; the service
//! translates it into a store-level `StoreFilter`. `GroupTreeNode` is the
//! owned value tree returned when ancestor/descendant inclusion is requested.

use super::inventory_group::deserialize_optional_field;
use super::InventoryGroup;
use serde::{Deserialize, Serialize};

/// Filters accepted by `list` / `list_and_count`
///
/// All present filters are combined with AND. Empty `id`/`handle` vectors
/// mean "no filter".
///
/// `parent_group_id` uses the double-Option pattern:
/// - `None`: any parent
/// - `Some(None)`: roots only
/// - `Some(Some(id))`: children of `id`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InventoryGroupFilters {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub id: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub handle: Vec<String>,

    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub group_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone_code: Option<String>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_field"
    )]
    pub parent_group_id: Option<Option<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,

    /// Case-insensitive substring over name, handle and location code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,

    #[serde(default)]
    pub include_descendants_tree: bool,

    #[serde(default)]
    pub include_ancestors_tree: bool,
}

impl InventoryGroupFilters {
    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            id: vec![id.into()],
            ..Default::default()
        }
    }

    pub fn children_of(parent_group_id: impl Into<String>) -> Self {
        Self {
            parent_group_id: Some(Some(parent_group_id.into())),
            ..Default::default()
        }
    }

    pub fn roots() -> Self {
        Self {
            parent_group_id: Some(None),
            ..Default::default()
        }
    }

    pub fn with_descendants(mut self) -> Self {
        self.include_descendants_tree = true;
        self
    }

    pub fn with_ancestors(mut self) -> Self {
        self.include_ancestors_tree = true;
        self
    }

    pub fn tree_inclusion(&self) -> TreeInclusion {
        TreeInclusion {
            ancestors: self.include_ancestors_tree,
            descendants: self.include_descendants_tree,
        }
    }
}

/// Which tree directions to attach to each seed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeInclusion {
    pub ancestors: bool,
    pub descendants: bool,
}

impl TreeInclusion {
    pub fn is_requested(&self) -> bool {
        self.ancestors || self.descendants
    }
}

/// Sortable fields
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderField {
    #[default]
    Rank,
    Name,
    CreatedAt,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: OrderField,
    #[serde(default)]
    pub descending: bool,
}

/// Pagination, ordering and soft-delete visibility
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FindConfig {
    #[serde(default)]
    pub skip: Option<usize>,

    #[serde(default)]
    pub take: Option<usize>,

    /// Defaults to rank ascending
    #[serde(default)]
    pub order: Option<OrderBy>,

    /// Include soft-deleted groups
    #[serde(default)]
    pub with_deleted: bool,
}

impl FindConfig {
    pub fn paginated(skip: usize, take: usize) -> Self {
        Self {
            skip: Some(skip),
            take: Some(take),
            ..Default::default()
        }
    }

    pub fn with_deleted() -> Self {
        Self {
            with_deleted: true,
            ..Default::default()
        }
    }
}

/// A group with its requested tree context attached
///
/// `parent_group` is present only along the ancestor direction and
/// `group_children` only along the descendant direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupTreeNode {
    #[serde(flatten)]
    pub group: InventoryGroup,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_group: Option<Box<GroupTreeNode>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_children: Option<Vec<GroupTreeNode>>,
}

impl GroupTreeNode {
    /// Wrap a group without any tree context
    pub fn leaf(group: InventoryGroup) -> Self {
        Self {
            group,
            parent_group: None,
            group_children: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.group.id
    }

    /// Children slice (empty when descendants were not requested)
    pub fn children(&self) -> &[GroupTreeNode] {
        self.group_children.as_deref().unwrap_or(&[])
    }

    /// Ancestor chain from immediate parent up to the furthest resolved ancestor
    pub fn ancestors(&self) -> Vec<&InventoryGroup> {
        let mut chain = Vec::new();
        let mut current = self.parent_group.as_deref();
        while let Some(node) = current {
            chain.push(&node.group);
            current = node.parent_group.as_deref();
        }
        chain
    }

    /// Total number of nodes in this tree (self + all attached descendants)
    pub fn subtree_size(&self) -> usize {
        1 + self.children().iter().map(|c| c.subtree_size()).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filters_parent_three_states() {
        let any: InventoryGroupFilters = serde_json::from_value(json!({})).unwrap();
        assert_eq!(any.parent_group_id, None);

        let roots: InventoryGroupFilters =
            serde_json::from_value(json!({"parent_group_id": null})).unwrap();
        assert_eq!(roots.parent_group_id, Some(None));

        let children: InventoryGroupFilters =
            serde_json::from_value(json!({"parent_group_id": "igrp_1"})).unwrap();
        assert_eq!(children.parent_group_id, Some(Some("igrp_1".to_string())));
    }

    #[test]
    fn test_tree_flags_map_to_inclusion() {
        let filters: InventoryGroupFilters =
            serde_json::from_value(json!({"include_descendants_tree": true})).unwrap();
        assert_eq!(
            filters.tree_inclusion(),
            TreeInclusion {
                ancestors: false,
                descendants: true,
            }
        );
        assert!(!InventoryGroupFilters::roots().tree_inclusion().is_requested());
    }
}
