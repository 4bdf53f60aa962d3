//! MemoryStore - GroupStore Implementation backed by an in-process map
//!
//! Used by tests and by embedders that do not need durability. Rows live in a
//! `BTreeMap<id, InventoryGroup>` behind an async mutex.
//!
//! # Transactions
//!
//! `begin()` takes an owned lock on the shared map and works on a private
//! copy. `commit()` swaps the copy in; `rollback()` (or dropping the
//! transaction) throws it away. Transactions are therefore fully serialized.
//!
//! Calling the autocommit `GroupStore` methods on the same `MemoryStore` while
//! holding one of its transactions deadlocks; use the transaction instead.

use crate::db::group_store::{
    FindOptions, GroupStore, StoreFilter, StoreTransaction, TransactionalStore,
};
use crate::models::InventoryGroup;
use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

type Rows = BTreeMap<String, InventoryGroup>;

/// In-memory group store
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    rows: Arc<Mutex<Rows>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored row, soft-deleted ones included
    pub async fn snapshot(&self) -> Vec<InventoryGroup> {
        self.rows.lock().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.rows.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.lock().await.is_empty()
    }
}

fn find_rows(rows: &Rows, filter: &StoreFilter, options: &FindOptions) -> Vec<InventoryGroup> {
    let mut matched: Vec<&InventoryGroup> = rows.values().filter(|g| filter.matches(g)).collect();
    matched.sort_by(|a, b| options.compare(a, b));

    matched
        .into_iter()
        .skip(options.skip.unwrap_or(0))
        .take(options.take.unwrap_or(usize::MAX))
        .cloned()
        .collect()
}

fn count_rows(rows: &Rows, filter: &StoreFilter) -> usize {
    rows.values().filter(|g| filter.matches(g)).count()
}

fn ensure_handle_free(rows: &Rows, group: &InventoryGroup) -> Result<()> {
    if group.deleted_at.is_some() {
        return Ok(());
    }
    if let Some(other) = rows
        .values()
        .find(|g| g.id != group.id && g.deleted_at.is_none() && g.handle == group.handle)
    {
        bail!(
            "UNIQUE constraint failed: handle '{}' already used by {}",
            group.handle,
            other.id
        );
    }
    Ok(())
}

fn insert_row(rows: &mut Rows, group: &InventoryGroup) -> Result<()> {
    if rows.contains_key(&group.id) {
        bail!("UNIQUE constraint failed: inventory group id '{}'", group.id);
    }
    ensure_handle_free(rows, group)?;
    rows.insert(group.id.clone(), group.clone());
    Ok(())
}

fn save_row(rows: &mut Rows, group: &InventoryGroup) -> Result<()> {
    if !rows.contains_key(&group.id) {
        bail!("Inventory group not found: {}", group.id);
    }
    ensure_handle_free(rows, group)?;
    rows.insert(group.id.clone(), group.clone());
    Ok(())
}

fn shift_rows(rows: &mut Rows, filter: &StoreFilter, delta: i64) -> u64 {
    let mut shifted = 0;
    for group in rows.values_mut().filter(|g| filter.matches(g)) {
        group.rank += delta;
        shifted += 1;
    }
    shifted
}

fn delete_rows(rows: &mut Rows, ids: &[String]) -> u64 {
    ids.iter().filter(|id| rows.remove(id.as_str()).is_some()).count() as u64
}

#[async_trait]
impl GroupStore for MemoryStore {
    async fn find(
        &self,
        filter: &StoreFilter,
        options: &FindOptions,
    ) -> Result<Vec<InventoryGroup>> {
        Ok(find_rows(&*self.rows.lock().await, filter, options))
    }

    async fn count(&self, filter: &StoreFilter) -> Result<usize> {
        Ok(count_rows(&*self.rows.lock().await, filter))
    }

    async fn insert(&self, group: &InventoryGroup) -> Result<()> {
        insert_row(&mut *self.rows.lock().await, group)
    }

    async fn save(&self, group: &InventoryGroup) -> Result<()> {
        save_row(&mut *self.rows.lock().await, group)
    }

    async fn shift_ranks(&self, filter: &StoreFilter, delta: i64) -> Result<u64> {
        Ok(shift_rows(&mut *self.rows.lock().await, filter, delta))
    }

    async fn delete(&self, ids: &[String]) -> Result<u64> {
        Ok(delete_rows(&mut *self.rows.lock().await, ids))
    }
}

#[async_trait]
impl TransactionalStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>> {
        let guard = self.rows.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTransaction {
            shared: guard,
            working: Mutex::new(working),
        }))
    }
}

/// Open transaction over a `MemoryStore`
pub struct MemoryTransaction {
    shared: OwnedMutexGuard<Rows>,
    working: Mutex<Rows>,
}

#[async_trait]
impl GroupStore for MemoryTransaction {
    async fn find(
        &self,
        filter: &StoreFilter,
        options: &FindOptions,
    ) -> Result<Vec<InventoryGroup>> {
        Ok(find_rows(&*self.working.lock().await, filter, options))
    }

    async fn count(&self, filter: &StoreFilter) -> Result<usize> {
        Ok(count_rows(&*self.working.lock().await, filter))
    }

    async fn insert(&self, group: &InventoryGroup) -> Result<()> {
        insert_row(&mut *self.working.lock().await, group)
    }

    async fn save(&self, group: &InventoryGroup) -> Result<()> {
        save_row(&mut *self.working.lock().await, group)
    }

    async fn shift_ranks(&self, filter: &StoreFilter, delta: i64) -> Result<u64> {
        Ok(shift_rows(&mut *self.working.lock().await, filter, delta))
    }

    async fn delete(&self, ids: &[String]) -> Result<u64> {
        Ok(delete_rows(&mut *self.working.lock().await, ids))
    }
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn commit(self: Box<Self>) -> Result<()> {
        let MemoryTransaction {
            mut shared,
            working,
        } = *self;
        *shared = working.into_inner();
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        tracing::debug!("Rolling back in-memory transaction");
        Ok(())
    }
}
