//! Inventory Group Service - Location Tree Operations
//!
//! This module provides the business logic layer for the warehouse location
//! tree:
//!
//! - create / update (field patches, re-parenting, re-ordering)
//! - retrieve / list / list_and_count with optional ancestor and descendant trees
//! - delete (hard, guarded) / soft_delete / restore
//!
//! # Transactions
//!
//! Every mutating operation comes in two flavours:
//!
//! - `create_in(&tx, ..)` etc. run on a caller-supplied session and never
//!   commit or roll back
//! - `create(..)` etc. open a transaction, commit on success and roll back on
//!   any error, so a batch is all-or-nothing
//!
//! # Invariants
//!
//! After every committed mutation:
//!
//! 1. a non-root group's `mpath` is its parent's `mpath` + `.` + its id
//! 2. live siblings have ranks `0..n` (soft-deleted siblings leave a gap)
//! 3. a group with live descendants cannot be hard-deleted
//! 4. `handle` is unique among live groups

use crate::db::{
    FindOptions, GroupStore, StoreFilter, StoreTransaction, TransactionalStore,
};
use crate::models::{
    generate_group_id, timestamp_now, CreateInventoryGroup, FindConfig, GroupTreeNode,
    InventoryGroup, InventoryGroupFilters, TreeInclusion, UpdateInventoryGroup,
};
use crate::services::error::{InventoryGroupServiceError, ServiceResult};
use crate::services::rank_manager::SiblingRankManager;
use crate::services::tree_builder::TreeBuilder;
use crate::utils::{generate_handle, generate_location_code, has_position, mpath, slugify};
use std::collections::HashSet;
use std::sync::Arc;

/// Location tree service over a transactional group store
///
/// # Examples
///
/// ```rust
/// use stocktree_core::db::MemoryStore;
/// use stocktree_core::models::CreateInventoryGroup;
/// use stocktree_core::services::InventoryGroupService;
/// use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let service = InventoryGroupService::new(Arc::new(MemoryStore::new()));
///
/// let zone = service
///     .create(vec![CreateInventoryGroup::new("Zone A").with_zone("A")])
///     .await?
///     .remove(0);
/// let aisle = service
///     .create(vec![CreateInventoryGroup::new("Aisle 3")
///         .with_parent(zone.id.clone())
///         .with_zone("A")
///         .with_aisle(3)])
///     .await?
///     .remove(0);
///
/// assert_eq!(aisle.mpath, format!("{}.{}", zone.id, aisle.id));
/// assert_eq!(aisle.location_code.as_deref(), Some("A03"));
/// # Ok(())
/// # }
/// ```
pub struct InventoryGroupService<T> {
    store: Arc<T>,
}

impl<T> Clone for InventoryGroupService<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<T> InventoryGroupService<T>
where
    T: TransactionalStore + GroupStore,
{
    pub fn new(store: Arc<T>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<T> {
        &self.store
    }

    //
    // SELF-TRANSACTING OPERATIONS
    //

    /// Create groups in one transaction
    pub async fn create(
        &self,
        inputs: Vec<CreateInventoryGroup>,
    ) -> ServiceResult<Vec<InventoryGroup>> {
        let tx = self.store.begin().await?;
        let result = self.create_in(tx.as_ref(), inputs).await;
        Self::finish(tx, result, "create").await
    }

    /// Apply patches in one transaction
    pub async fn update(
        &self,
        patches: Vec<UpdateInventoryGroup>,
    ) -> ServiceResult<Vec<InventoryGroup>> {
        let tx = self.store.begin().await?;
        let result = self.update_in(tx.as_ref(), patches).await;
        Self::finish(tx, result, "update").await
    }

    /// Hard-delete groups in one transaction
    pub async fn delete(&self, ids: &[String]) -> ServiceResult<Vec<String>> {
        let tx = self.store.begin().await?;
        let result = self.delete_in(tx.as_ref(), ids).await;
        Self::finish(tx, result, "delete").await
    }

    pub async fn soft_delete(&self, ids: &[String]) -> ServiceResult<Vec<String>> {
        let tx = self.store.begin().await?;
        let result = self.soft_delete_in(tx.as_ref(), ids).await;
        Self::finish(tx, result, "soft_delete").await
    }

    pub async fn restore(&self, ids: &[String]) -> ServiceResult<Vec<String>> {
        let tx = self.store.begin().await?;
        let result = self.restore_in(tx.as_ref(), ids).await;
        Self::finish(tx, result, "restore").await
    }

    /// Fetch one group, optionally with its tree context
    pub async fn retrieve(
        &self,
        id: &str,
        inclusion: TreeInclusion,
        config: &FindConfig,
    ) -> ServiceResult<GroupTreeNode> {
        self.retrieve_in(self.store.as_ref(), id, inclusion, config)
            .await
    }

    pub async fn list(
        &self,
        filters: &InventoryGroupFilters,
        config: &FindConfig,
    ) -> ServiceResult<Vec<GroupTreeNode>> {
        self.list_in(self.store.as_ref(), filters, config).await
    }

    pub async fn list_and_count(
        &self,
        filters: &InventoryGroupFilters,
        config: &FindConfig,
    ) -> ServiceResult<(Vec<GroupTreeNode>, usize)> {
        self.list_and_count_in(self.store.as_ref(), filters, config)
            .await
    }

    /// Commit on success, roll back on error
    async fn finish<R>(
        tx: Box<dyn StoreTransaction>,
        result: ServiceResult<R>,
        operation: &str,
    ) -> ServiceResult<R> {
        match result {
            Ok(value) => {
                tx.commit().await?;
                Ok(value)
            }
            Err(e) => {
                tracing::warn!("{} rolled back: {}", operation, e);
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!("Rollback of {} failed: {}", operation, rollback_err);
                }
                Err(e)
            }
        }
    }

    //
    // CALLER-SESSION OPERATIONS
    //

    /// Create groups on `store`
    ///
    /// For each input: validate the name, resolve the parent, derive handle
    /// and location code, resolve the rank (opening a slot when inserting
    /// mid-sequence), then persist with `mpath` set from the parent.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` for a blank name, a blank or already used explicit
    ///   handle, or a `parent_group_id` that does not resolve to a live group
    pub async fn create_in<S>(
        &self,
        store: &S,
        inputs: Vec<CreateInventoryGroup>,
    ) -> ServiceResult<Vec<InventoryGroup>>
    where
        S: GroupStore + ?Sized,
    {
        let mut created = Vec::with_capacity(inputs.len());

        for input in inputs {
            let name = input.name.trim();
            if name.is_empty() {
                return Err(InventoryGroupServiceError::invalid_argument(
                    "name must not be blank",
                ));
            }

            let parent = match input.parent_group_id.as_deref() {
                Some(parent_id) => Some(Self::live_parent(store, parent_id).await?),
                None => None,
            };

            let handle = match input.handle.as_deref() {
                Some(explicit) => {
                    let explicit = Self::validated_handle(explicit)?;
                    Self::ensure_handle_available(store, &explicit, None).await?;
                    explicit
                }
                None => {
                    let base = Self::derive_handle(&input);
                    Self::unique_handle(store, &base).await?
                }
            };

            let location_code = input.location_code.clone().or_else(|| {
                generate_location_code(
                    input.zone_code.as_deref(),
                    input.aisle_number,
                    input.group_number,
                    input.shelf_number,
                )
            });

            let parent_group_id = parent.as_ref().map(|p| p.id.clone());
            let rank = SiblingRankManager::resolve_insert_rank(
                store,
                parent_group_id.as_deref(),
                input.rank,
            )
            .await?;

            let id = generate_group_id();
            let now = timestamp_now();
            let group = InventoryGroup {
                mpath: mpath::mpath_for(parent.as_ref().map(|p| p.mpath.as_str()), &id),
                id,
                name: name.to_string(),
                handle,
                group_type: input.group_type,
                zone_code: input.zone_code,
                aisle_number: input.aisle_number,
                group_number: input.group_number,
                shelf_number: input.shelf_number,
                location_code,
                parent_group_id,
                rank,
                is_active: input.is_active.unwrap_or(true),
                metadata: input.metadata,
                created_at: now,
                updated_at: now,
                deleted_at: None,
            };

            store.insert(&group).await?;
            tracing::debug!(
                "Created group {} ({}) under {:?} at rank {}",
                group.id,
                group.handle,
                group.parent_group_id,
                group.rank
            );
            created.push(group);
        }

        tracing::info!("Created {} inventory groups", created.len());
        Ok(created)
    }

    /// Apply patches on `store`
    ///
    /// - parent unchanged, rank unchanged: field patch only
    /// - new parent: subtree paths rewritten, inserted at the destination rank
    ///   (append by default), old sibling group compacted
    /// - detach (`parent_group_id: null`): same, with the root group as destination
    /// - rank only: bounded shift within the sibling group
    ///
    /// Explicit `null` clears nullable fields. The location code is
    /// recomputed when positional fields change and no explicit
    /// `location_code` is given; the handle only changes when patched.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the group does not exist or is soft-deleted
    /// - `InvalidArgument` for a blank name or handle, a handle used by
    ///   another live group, or a new parent that is missing, the group
    ///   itself, or one of its descendants
    pub async fn update_in<S>(
        &self,
        store: &S,
        patches: Vec<UpdateInventoryGroup>,
    ) -> ServiceResult<Vec<InventoryGroup>>
    where
        S: GroupStore + ?Sized,
    {
        let mut updated = Vec::with_capacity(patches.len());

        for patch in patches {
            let mut group = store
                .find_one(&StoreFilter::new().id(&patch.id))
                .await?
                .ok_or_else(|| InventoryGroupServiceError::not_found(&patch.id))?;

            if let Some(name) = &patch.name {
                if name.trim().is_empty() {
                    return Err(InventoryGroupServiceError::invalid_argument(
                        "name must not be blank",
                    ));
                }
            }

            let mut patch = patch;
            if let Some(handle) = patch.handle.take() {
                let handle = Self::validated_handle(&handle)?;
                if handle != group.handle {
                    Self::ensure_handle_available(store, &handle, Some(&group.id)).await?;
                }
                patch.handle = Some(handle);
            }
            if let Some(name) = patch.name.take() {
                patch.name = Some(name.trim().to_string());
            }

            if patch.changes_structure() {
                Self::restructure(store, &mut group, &patch).await?;
            }

            let positional_changed = group.apply_patch(&patch);
            if positional_changed && patch.location_code.is_none() {
                group.location_code = generate_location_code(
                    group.zone_code.as_deref(),
                    group.aisle_number,
                    group.group_number,
                    group.shelf_number,
                );
            }

            store.save(&group).await?;
            updated.push(group);
        }

        Ok(updated)
    }

    /// Apply the `parent_group_id` / `rank` part of a patch
    ///
    /// A parent equal to the current one is treated as a rank-only change.
    async fn restructure<S>(
        store: &S,
        group: &mut InventoryGroup,
        patch: &UpdateInventoryGroup,
    ) -> ServiceResult<()>
    where
        S: GroupStore + ?Sized,
    {
        let new_parent = patch
            .parent_group_id
            .clone()
            .filter(|parent| parent != &group.parent_group_id);

        if let Some(new_parent) = new_parent {
            Self::move_subtree(store, group, new_parent, patch.rank).await?;
        } else if let Some(rank) = patch.rank {
            if rank != group.rank {
                group.rank = SiblingRankManager::rerank_on_move(
                    store,
                    group.parent_group_id.as_deref(),
                    group.rank,
                    rank,
                )
                .await?;
            }
        }

        Ok(())
    }

    /// Move `group` (and its subtree) under `new_parent_id`, or to the roots
    async fn move_subtree<S>(
        store: &S,
        group: &mut InventoryGroup,
        new_parent_id: Option<String>,
        requested_rank: Option<i64>,
    ) -> ServiceResult<()>
    where
        S: GroupStore + ?Sized,
    {
        let new_parent = match new_parent_id.as_deref() {
            Some(parent_id) => {
                let parent = Self::live_parent(store, parent_id).await?;
                if mpath::is_within(&parent.mpath, &group.mpath) {
                    return Err(InventoryGroupServiceError::invalid_argument(format!(
                        "cannot move group {} under itself or its descendant {}",
                        group.id, parent.id
                    )));
                }
                Some(parent)
            }
            None => None,
        };

        let old_parent_id = group.parent_group_id.clone();
        let old_rank = group.rank;
        let old_mpath = group.mpath.clone();
        let new_mpath = mpath::mpath_for(new_parent.as_ref().map(|p| p.mpath.as_str()), &group.id);

        // soft-deleted descendants move too so a later restore lands in the right place
        let descendants = store
            .find(
                &StoreFilter::new().descendants_of(&old_mpath).include_deleted(),
                &FindOptions::new(),
            )
            .await?;
        for mut descendant in descendants {
            if let Some(rebased) = mpath::rebase(&descendant.mpath, &old_mpath, &new_mpath) {
                descendant.mpath = rebased;
                store.save(&descendant).await?;
            }
        }

        let new_rank =
            SiblingRankManager::resolve_insert_rank(store, new_parent_id.as_deref(), requested_rank)
                .await?;
        SiblingRankManager::rerank_after_deletion(store, old_parent_id.as_deref(), old_rank)
            .await?;

        tracing::info!(
            "Moved group {} from {:?} to {:?} at rank {}",
            group.id,
            old_parent_id,
            new_parent_id,
            new_rank
        );

        group.parent_group_id = new_parent_id;
        group.mpath = new_mpath;
        group.rank = new_rank;

        Ok(())
    }

    /// Hard-delete groups on `store`
    ///
    /// Already soft-deleted descendants are purged with the group. Live
    /// siblings after the group are compacted.
    ///
    /// # Errors
    ///
    /// - `NotFound` if a group does not exist
    /// - `NotAllowed` if a group still has live descendants
    pub async fn delete_in<S>(&self, store: &S, ids: &[String]) -> ServiceResult<Vec<String>>
    where
        S: GroupStore + ?Sized,
    {
        let ids = dedup(ids);
        let mut deleted = Vec::with_capacity(ids.len());

        for id in ids {
            let group = store
                .find_one(&StoreFilter::new().id(&id).include_deleted())
                .await?
                .ok_or_else(|| InventoryGroupServiceError::not_found(&id))?;

            let live_descendants = store
                .count(&StoreFilter::new().descendants_of(&group.mpath))
                .await?;
            if live_descendants > 0 {
                tracing::warn!(
                    "Refusing to delete group {}: {} live descendants",
                    group.id,
                    live_descendants
                );
                return Err(InventoryGroupServiceError::not_allowed(format!(
                    "group {} has {} live descendant groups",
                    group.id, live_descendants
                )));
            }

            let mut doomed: Vec<String> = store
                .find(
                    &StoreFilter::new().descendants_of(&group.mpath).only_deleted(),
                    &FindOptions::new(),
                )
                .await?
                .into_iter()
                .map(|g| g.id)
                .collect();
            doomed.push(group.id.clone());

            if !group.is_deleted() {
                SiblingRankManager::rerank_after_deletion(
                    store,
                    group.parent_group_id.as_deref(),
                    group.rank,
                )
                .await?;
            }

            let removed = store.delete(&doomed).await?;
            tracing::info!("Deleted group {} ({} rows removed)", group.id, removed);
            deleted.push(group.id);
        }

        Ok(deleted)
    }

    /// Stamp `deleted_at` on live groups; returns the ids that changed
    ///
    /// Ranks and paths are left untouched.
    ///
    /// # Errors
    ///
    /// - `NotFound` if a group does not exist
    pub async fn soft_delete_in<S>(&self, store: &S, ids: &[String]) -> ServiceResult<Vec<String>>
    where
        S: GroupStore + ?Sized,
    {
        let mut affected = Vec::new();

        for id in dedup(ids) {
            let mut group = store
                .find_one(&StoreFilter::new().id(&id).include_deleted())
                .await?
                .ok_or_else(|| InventoryGroupServiceError::not_found(&id))?;

            if group.is_deleted() {
                continue;
            }

            group.deleted_at = Some(timestamp_now());
            store.save(&group).await?;
            affected.push(group.id);
        }

        tracing::info!("Soft-deleted {} inventory groups", affected.len());
        Ok(affected)
    }

    /// Clear `deleted_at`; returns the ids that changed
    ///
    /// The group keeps its rank unless a live sibling took it meanwhile, in
    /// which case it takes the lowest free rank. No other row changes.
    /// Restoring a live group is a no-op.
    ///
    /// # Errors
    ///
    /// - `NotFound` if a group does not exist
    /// - `InvalidArgument` if its handle was taken while it was deleted
    pub async fn restore_in<S>(&self, store: &S, ids: &[String]) -> ServiceResult<Vec<String>>
    where
        S: GroupStore + ?Sized,
    {
        let mut affected = Vec::new();

        for id in dedup(ids) {
            let mut group = store
                .find_one(&StoreFilter::new().id(&id).include_deleted())
                .await?
                .ok_or_else(|| InventoryGroupServiceError::not_found(&id))?;

            if !group.is_deleted() {
                continue;
            }

            Self::ensure_handle_available(store, &group.handle, Some(&group.id)).await?;

            let rank = SiblingRankManager::restore_rank(
                store,
                group.parent_group_id.as_deref(),
                group.rank,
            )
            .await?;
            if rank != group.rank {
                tracing::debug!(
                    "Rank {} of group {} was taken while deleted, restoring at {}",
                    group.rank,
                    group.id,
                    rank
                );
                group.rank = rank;
            }

            group.deleted_at = None;
            store.save(&group).await?;
            affected.push(group.id);
        }

        tracing::info!("Restored {} inventory groups", affected.len());
        Ok(affected)
    }

    /// Fetch one group on `store`
    ///
    /// # Errors
    ///
    /// - `NotFound` if the group does not exist (or is soft-deleted and
    ///   `config.with_deleted` is false)
    pub async fn retrieve_in<S>(
        &self,
        store: &S,
        id: &str,
        inclusion: TreeInclusion,
        config: &FindConfig,
    ) -> ServiceResult<GroupTreeNode>
    where
        S: GroupStore + ?Sized,
    {
        let mut filter = StoreFilter::new().id(id);
        if config.with_deleted {
            filter = filter.include_deleted();
        }

        let group = store
            .find_one(&filter)
            .await?
            .ok_or_else(|| InventoryGroupServiceError::not_found(id))?;

        let mut trees = TreeBuilder::build(store, vec![group], inclusion, config.with_deleted).await?;
        trees
            .pop()
            .ok_or_else(|| InventoryGroupServiceError::not_found(id))
    }

    pub async fn list_in<S>(
        &self,
        store: &S,
        filters: &InventoryGroupFilters,
        config: &FindConfig,
    ) -> ServiceResult<Vec<GroupTreeNode>>
    where
        S: GroupStore + ?Sized,
    {
        let rows = store
            .find(&store_filter(filters, config), &find_options(config))
            .await?;

        Ok(TreeBuilder::build(store, rows, filters.tree_inclusion(), config.with_deleted).await?)
    }

    /// List plus the total number of matches ignoring pagination
    pub async fn list_and_count_in<S>(
        &self,
        store: &S,
        filters: &InventoryGroupFilters,
        config: &FindConfig,
    ) -> ServiceResult<(Vec<GroupTreeNode>, usize)>
    where
        S: GroupStore + ?Sized,
    {
        let (rows, count) = store
            .find_and_count(&store_filter(filters, config), &find_options(config))
            .await?;

        let trees =
            TreeBuilder::build(store, rows, filters.tree_inclusion(), config.with_deleted).await?;
        Ok((trees, count))
    }

    //
    // HELPERS
    //

    async fn live_parent<S>(store: &S, parent_id: &str) -> ServiceResult<InventoryGroup>
    where
        S: GroupStore + ?Sized,
    {
        store
            .find_one(&StoreFilter::new().id(parent_id))
            .await?
            .ok_or_else(|| {
                InventoryGroupServiceError::invalid_argument(format!(
                    "parent group {} does not exist",
                    parent_id
                ))
            })
    }

    fn validated_handle(handle: &str) -> ServiceResult<String> {
        let handle = handle.trim();
        if handle.is_empty() {
            return Err(InventoryGroupServiceError::invalid_argument(
                "handle must not be blank",
            ));
        }
        Ok(handle.to_string())
    }

    /// Handle for an input without one: position, then name, then type / `"group"`
    fn derive_handle(input: &CreateInventoryGroup) -> String {
        if has_position(
            input.zone_code.as_deref(),
            input.aisle_number,
            input.group_number,
            input.shelf_number,
        ) {
            return generate_handle(
                input.group_type.as_deref(),
                input.zone_code.as_deref(),
                input.aisle_number,
                input.group_number,
                input.shelf_number,
            );
        }

        let from_name = slugify(&input.name);
        if !from_name.is_empty() {
            return from_name;
        }

        generate_handle(input.group_type.as_deref(), None, None, None, None)
    }

    async fn ensure_handle_available<S>(
        store: &S,
        handle: &str,
        owner_id: Option<&str>,
    ) -> ServiceResult<()>
    where
        S: GroupStore + ?Sized,
    {
        let holders = store
            .find(&StoreFilter::new().handle(handle), &FindOptions::new().take(2))
            .await?;

        if let Some(holder) = holders.iter().find(|g| Some(g.id.as_str()) != owner_id) {
            return Err(InventoryGroupServiceError::invalid_argument(format!(
                "handle '{}' is already used by group {}",
                handle, holder.id
            )));
        }
        Ok(())
    }

    /// `base`, or `base-v2`, `base-v3`, ... whichever is free first
    ///
    /// Positional segments after the zone are digits only, so a suffixed
    /// handle never takes one a later positional group would derive.
    async fn unique_handle<S>(store: &S, base: &str) -> ServiceResult<String>
    where
        S: GroupStore + ?Sized,
    {
        let mut candidate = base.to_string();
        let mut suffix = 1;

        while store.count(&StoreFilter::new().handle(&candidate)).await? > 0 {
            suffix += 1;
            candidate = format!("{}-v{}", base, suffix);
        }

        Ok(candidate)
    }
}

fn dedup(ids: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.iter()
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}

/// Translate caller filters into a store filter
fn store_filter(filters: &InventoryGroupFilters, config: &FindConfig) -> StoreFilter {
    let mut filter = StoreFilter::new();

    if !filters.id.is_empty() {
        filter = filter.ids(filters.id.clone());
    }
    if !filters.handle.is_empty() {
        filter.handles = Some(filters.handle.clone());
    }
    filter.name = filters.name.clone();
    filter.group_type = filters.group_type.clone();
    filter.zone_code = filters.zone_code.clone();
    if let Some(parent) = &filters.parent_group_id {
        filter = filter.siblings_of(parent.as_deref());
    }
    filter.is_active = filters.is_active;
    filter.text = filters
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_string);

    if config.with_deleted {
        filter = filter.include_deleted();
    }

    filter
}

fn find_options(config: &FindConfig) -> FindOptions {
    FindOptions {
        skip: config.skip,
        take: config.take,
        order: config.order.unwrap_or_default(),
    }
}

#[cfg(test)]
#[path = "inventory_group_service_test.rs"]
mod inventory_group_service_test;
