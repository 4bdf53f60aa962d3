//! GroupStore Trait - Store Abstraction Layer
//!
//! This module defines the `GroupStore` trait the location-tree engine issues
//! all reads and writes through, plus the filter vocabulary it needs:
//!
//! - equality / any-of on ids, handles and attributes
//! - parent scope (`IS NULL` or equality)
//! - rank ranges (`$gt` / `$gte` / `$lt` / `$lte`) for sibling shifts
//! - mpath prefix (`$like 'prefix%'`) for subtree fetches
//! - mpath any-of (`$or` of equalities) for ancestor fetches
//!
//! # Transactions
//!
//! `TransactionalStore::begin()` hands out a `StoreTransaction`, which is itself
//! a `GroupStore`. Every multi-step mutation (rank shifts, path rewrites and the
//! final write) runs against one transaction so no caller can observe a torn
//! intermediate state such as two siblings sharing a rank.
//!
//! # Examples
//!
//! ```rust,no_run
//! use stocktree_core::db::{GroupStore, MemoryStore, StoreFilter, TransactionalStore};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let store = MemoryStore::new();
//! let tx = store.begin().await?;
//! let roots = tx.count(&StoreFilter::new().siblings_of(None)).await?;
//! tx.commit().await?;
//! # Ok(())
//! # }
//! ```

use crate::models::{InventoryGroup, OrderBy, OrderField};
use crate::utils::mpath;
use anyhow::Result;
use async_trait::async_trait;
use std::cmp::Ordering;

/// Which parent a filter is scoped to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParentScope {
    /// `parent_group_id IS NULL`
    Root,
    /// `parent_group_id = id`
    Parent(String),
}

impl ParentScope {
    pub fn from_parent(parent_group_id: Option<&str>) -> Self {
        match parent_group_id {
            Some(id) => Self::Parent(id.to_string()),
            None => Self::Root,
        }
    }

    fn matches(&self, parent_group_id: Option<&str>) -> bool {
        match self {
            Self::Root => parent_group_id.is_none(),
            Self::Parent(id) => parent_group_id == Some(id.as_str()),
        }
    }
}

/// Soft-delete visibility
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeletedScope {
    #[default]
    Exclude,
    Include,
    Only,
}

/// Rank bounds, all optional and combined with AND
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RankRange {
    pub gt: Option<i64>,
    pub gte: Option<i64>,
    pub lt: Option<i64>,
    pub lte: Option<i64>,
}

impl RankRange {
    pub fn at_least(rank: i64) -> Self {
        Self {
            gte: Some(rank),
            ..Default::default()
        }
    }

    pub fn above(rank: i64) -> Self {
        Self {
            gt: Some(rank),
            ..Default::default()
        }
    }

    /// `low < rank <= high`
    pub fn half_open_above(low: i64, high: i64) -> Self {
        Self {
            gt: Some(low),
            lte: Some(high),
            ..Default::default()
        }
    }

    /// `low <= rank < high`
    pub fn half_open_below(low: i64, high: i64) -> Self {
        Self {
            gte: Some(low),
            lt: Some(high),
            ..Default::default()
        }
    }

    pub fn contains(&self, rank: i64) -> bool {
        self.gt.map_or(true, |b| rank > b)
            && self.gte.map_or(true, |b| rank >= b)
            && self.lt.map_or(true, |b| rank < b)
            && self.lte.map_or(true, |b| rank <= b)
    }
}

/// Store-level filter
///
/// All present criteria are combined with AND. An empty any-of list matches
/// nothing.
#[derive(Debug, Clone, Default)]
pub struct StoreFilter {
    pub ids: Option<Vec<String>>,
    pub name: Option<String>,
    pub handles: Option<Vec<String>>,
    pub group_type: Option<String>,
    pub zone_code: Option<String>,
    pub parent: Option<ParentScope>,
    pub is_active: Option<bool>,
    pub rank: Option<RankRange>,
    /// `mpath LIKE prefix || '%'`
    pub mpath_prefix: Option<String>,
    /// `mpath = a OR mpath = b OR ...`
    pub mpath_any_of: Option<Vec<String>>,
    /// Case-insensitive substring over name, handle and location code
    pub text: Option<String>,
    pub deleted: DeletedScope,
}

impl StoreFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(self, id: impl Into<String>) -> Self {
        self.ids(vec![id.into()])
    }

    pub fn ids(mut self, ids: Vec<String>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn handle(mut self, handle: impl Into<String>) -> Self {
        self.handles = Some(vec![handle.into()]);
        self
    }

    /// Scope to the sibling group under `parent_group_id` (`None` = roots)
    pub fn siblings_of(mut self, parent_group_id: Option<&str>) -> Self {
        self.parent = Some(ParentScope::from_parent(parent_group_id));
        self
    }

    pub fn rank(mut self, range: RankRange) -> Self {
        self.rank = Some(range);
        self
    }

    pub fn mpath_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.mpath_prefix = Some(prefix.into());
        self
    }

    /// Strict descendants of the node at `node_mpath`
    pub fn descendants_of(self, node_mpath: &str) -> Self {
        self.mpath_prefix(mpath::descendant_prefix(node_mpath))
    }

    pub fn mpath_any_of(mut self, mpaths: Vec<String>) -> Self {
        self.mpath_any_of = Some(mpaths);
        self
    }

    pub fn include_deleted(mut self) -> Self {
        self.deleted = DeletedScope::Include;
        self
    }

    pub fn only_deleted(mut self) -> Self {
        self.deleted = DeletedScope::Only;
        self
    }

    /// Evaluate the filter against a single group
    ///
    /// Backends that cannot push filters down (the memory store) use this
    /// directly; SQL backends must agree with it.
    pub fn matches(&self, group: &InventoryGroup) -> bool {
        let deleted_ok = match self.deleted {
            DeletedScope::Exclude => group.deleted_at.is_none(),
            DeletedScope::Include => true,
            DeletedScope::Only => group.deleted_at.is_some(),
        };
        if !deleted_ok {
            return false;
        }

        if let Some(ids) = &self.ids {
            if !ids.iter().any(|id| id == &group.id) {
                return false;
            }
        }
        if let Some(name) = &self.name {
            if &group.name != name {
                return false;
            }
        }
        if let Some(handles) = &self.handles {
            if !handles.iter().any(|h| h == &group.handle) {
                return false;
            }
        }
        if let Some(group_type) = &self.group_type {
            if group.group_type.as_ref() != Some(group_type) {
                return false;
            }
        }
        if let Some(zone_code) = &self.zone_code {
            if group.zone_code.as_ref() != Some(zone_code) {
                return false;
            }
        }
        if let Some(parent) = &self.parent {
            if !parent.matches(group.parent_group_id.as_deref()) {
                return false;
            }
        }
        if let Some(is_active) = self.is_active {
            if group.is_active != is_active {
                return false;
            }
        }
        if let Some(range) = &self.rank {
            if !range.contains(group.rank) {
                return false;
            }
        }
        if let Some(prefix) = &self.mpath_prefix {
            if !group.mpath.starts_with(prefix.as_str()) {
                return false;
            }
        }
        if let Some(mpaths) = &self.mpath_any_of {
            if !mpaths.iter().any(|m| m == &group.mpath) {
                return false;
            }
        }
        if let Some(text) = &self.text {
            let needle = text.to_lowercase();
            let hit = group.name.to_lowercase().contains(&needle)
                || group.handle.to_lowercase().contains(&needle)
                || group
                    .location_code
                    .as_ref()
                    .is_some_and(|c| c.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }

        true
    }
}

/// Pagination and ordering for `find`
#[derive(Debug, Clone, Copy, Default)]
pub struct FindOptions {
    pub skip: Option<usize>,
    pub take: Option<usize>,
    pub order: OrderBy,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(mut self, take: usize) -> Self {
        self.take = Some(take);
        self
    }

    /// Compare two groups the way `order` sorts them
    ///
    /// Ties fall back to `created_at`, then `id`, so results are deterministic.
    pub fn compare(&self, a: &InventoryGroup, b: &InventoryGroup) -> Ordering {
        let primary = match self.order.field {
            OrderField::Rank => a.rank.cmp(&b.rank),
            OrderField::Name => a.name.cmp(&b.name),
            OrderField::CreatedAt => a.created_at.cmp(&b.created_at),
        };
        let primary = if self.order.descending {
            primary.reverse()
        } else {
            primary
        };
        primary
            .then_with(|| a.created_at.cmp(&b.created_at))
            .then_with(|| a.id.cmp(&b.id))
    }
}

/// Abstraction layer for inventory group persistence
///
/// Implementations must be `Send + Sync` so service futures can move between
/// threads. All methods operate on whatever session the implementor
/// represents: an autocommit connection or an open transaction.
#[async_trait]
pub trait GroupStore: Send + Sync {
    /// Query groups matching `filter`, ordered and paginated per `options`
    async fn find(&self, filter: &StoreFilter, options: &FindOptions)
        -> Result<Vec<InventoryGroup>>;

    /// Count groups matching `filter` (pagination ignored)
    async fn count(&self, filter: &StoreFilter) -> Result<usize>;

    /// Persist a new group
    ///
    /// # Errors
    ///
    /// Fails on a duplicate id or a handle already used by a live group.
    async fn insert(&self, group: &InventoryGroup) -> Result<()>;

    /// Overwrite an existing group with `group`'s fields
    async fn save(&self, group: &InventoryGroup) -> Result<()>;

    /// Add `delta` to `rank` of every group matching `filter`
    ///
    /// Returns the number of rows shifted.
    async fn shift_ranks(&self, filter: &StoreFilter, delta: i64) -> Result<u64>;

    /// Hard-delete rows by id; returns the number of rows removed
    async fn delete(&self, ids: &[String]) -> Result<u64>;

    /// Query and count in one call
    async fn find_and_count(
        &self,
        filter: &StoreFilter,
        options: &FindOptions,
    ) -> Result<(Vec<InventoryGroup>, usize)> {
        let rows = self.find(filter, options).await?;
        let count = self.count(filter).await?;
        Ok((rows, count))
    }

    /// First group matching `filter` in default order
    async fn find_one(&self, filter: &StoreFilter) -> Result<Option<InventoryGroup>> {
        let mut rows = self.find(filter, &FindOptions::new().take(1)).await?;
        Ok(rows.pop())
    }
}

/// An open transaction: a `GroupStore` that can be committed or rolled back
///
/// Dropping a transaction without committing discards its writes.
#[async_trait]
pub trait StoreTransaction: GroupStore {
    async fn commit(self: Box<Self>) -> Result<()>;

    async fn rollback(self: Box<Self>) -> Result<()>;
}

/// A store that can open transactions
#[async_trait]
pub trait TransactionalStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn group(id: &str, mpath: &str, parent: Option<&str>, rank: i64) -> InventoryGroup {
        let now = Utc::now();
        InventoryGroup {
            id: id.to_string(),
            name: format!("Group {}", id),
            handle: id.to_string(),
            group_type: None,
            zone_code: Some("A".to_string()),
            aisle_number: None,
            group_number: None,
            shelf_number: None,
            location_code: Some("A03".to_string()),
            mpath: mpath.to_string(),
            parent_group_id: parent.map(str::to_string),
            rank,
            is_active: true,
            metadata: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[test]
    fn test_rank_range_bounds() {
        let range = RankRange::half_open_above(1, 3);
        assert!(!range.contains(1));
        assert!(range.contains(2));
        assert!(range.contains(3));
        assert!(!range.contains(4));

        let range = RankRange::half_open_below(1, 3);
        assert!(range.contains(1));
        assert!(!range.contains(3));
    }

    #[test]
    fn test_sibling_scope_matches_roots_and_children() {
        let root = group("r", "r", None, 0);
        let child = group("c", "r.c", Some("r"), 0);

        let roots = StoreFilter::new().siblings_of(None);
        assert!(roots.matches(&root));
        assert!(!roots.matches(&child));

        let children = StoreFilter::new().siblings_of(Some("r"));
        assert!(children.matches(&child));
        assert!(!children.matches(&root));
    }

    #[test]
    fn test_descendant_prefix_excludes_self_and_lookalikes() {
        let filter = StoreFilter::new().descendants_of("r");
        assert!(filter.matches(&group("c", "r.c", Some("r"), 0)));
        assert!(!filter.matches(&group("r", "r", None, 0)));
        assert!(!filter.matches(&group("r2", "r2", None, 1)));
    }

    #[test]
    fn test_deleted_scope() {
        let mut deleted = group("d", "d", None, 0);
        deleted.deleted_at = Some(Utc::now());

        assert!(!StoreFilter::new().matches(&deleted));
        assert!(StoreFilter::new().include_deleted().matches(&deleted));
        assert!(StoreFilter::new().only_deleted().matches(&deleted));
        assert!(!StoreFilter::new().only_deleted().matches(&group("a", "a", None, 0)));
    }

    #[test]
    fn test_text_filter_is_case_insensitive() {
        let g = group("shelf", "shelf", None, 0);
        let filter = StoreFilter {
            text: Some("a03".to_string()),
            ..Default::default()
        };
        assert!(filter.matches(&g));
    }

    #[test]
    fn test_empty_any_of_matches_nothing() {
        let filter = StoreFilter::new().ids(Vec::new());
        assert!(!filter.matches(&group("a", "a", None, 0)));
    }
}
