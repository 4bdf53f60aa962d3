//! Sibling rank maintenance
//!
//! Ranks are dense and 0-based within a sibling group (groups sharing a
//! `parent_group_id`). Every shift here is a single bounded range update on
//! the store, run inside the caller's transaction. Soft-deleted siblings are
//! never shifted.

use crate::db::{FindOptions, GroupStore, RankRange, StoreFilter};
use crate::models::{OrderBy, OrderField};
use anyhow::Result;
use std::collections::HashSet;

/// Re-ranking operations for a sibling group
pub struct SiblingRankManager;

impl SiblingRankManager {
    /// Open a slot at `inserted_rank`: siblings at or after it move down one
    pub async fn rerank_after_insertion<S>(
        store: &S,
        parent_group_id: Option<&str>,
        inserted_rank: i64,
    ) -> Result<u64>
    where
        S: GroupStore + ?Sized,
    {
        let filter = StoreFilter::new()
            .siblings_of(parent_group_id)
            .rank(RankRange::at_least(inserted_rank));
        let shifted = store.shift_ranks(&filter, 1).await?;
        tracing::debug!(
            "Opened rank {} under {:?} ({} siblings shifted)",
            inserted_rank,
            parent_group_id,
            shifted
        );
        Ok(shifted)
    }

    /// Close the gap left at `removed_rank`: siblings after it move up one
    pub async fn rerank_after_deletion<S>(
        store: &S,
        parent_group_id: Option<&str>,
        removed_rank: i64,
    ) -> Result<u64>
    where
        S: GroupStore + ?Sized,
    {
        let filter = StoreFilter::new()
            .siblings_of(parent_group_id)
            .rank(RankRange::above(removed_rank));
        let shifted = store.shift_ranks(&filter, -1).await?;
        tracing::debug!(
            "Closed rank {} under {:?} ({} siblings shifted)",
            removed_rank,
            parent_group_id,
            shifted
        );
        Ok(shifted)
    }

    /// Make room for a sibling moving from `original` to `target` in the same group
    ///
    /// `target` is clamped to `[0, last_rank]`. Only the siblings strictly
    /// between the two positions (plus the one at `target`) shift; the moving
    /// sibling itself is left for the caller to save at the returned rank.
    pub async fn rerank_on_move<S>(
        store: &S,
        parent_group_id: Option<&str>,
        original: i64,
        target: i64,
    ) -> Result<i64>
    where
        S: GroupStore + ?Sized,
    {
        let last_rank = (Self::next_rank(store, parent_group_id).await? - 1).max(0);
        let target = target.clamp(0, last_rank);

        if target == original {
            return Ok(original);
        }

        let siblings = StoreFilter::new().siblings_of(parent_group_id);
        let shifted = if target > original {
            store
                .shift_ranks(
                    &siblings.rank(RankRange::half_open_above(original, target)),
                    -1,
                )
                .await?
        } else {
            store
                .shift_ranks(
                    &siblings.rank(RankRange::half_open_below(target, original)),
                    1,
                )
                .await?
        };

        tracing::debug!(
            "Moved rank {} -> {} under {:?} ({} siblings shifted)",
            original,
            target,
            parent_group_id,
            shifted
        );

        Ok(target)
    }

    /// Append position of a sibling group: `max(live rank) + 1`, or 0 when empty
    pub async fn next_rank<S>(store: &S, parent_group_id: Option<&str>) -> Result<i64>
    where
        S: GroupStore + ?Sized,
    {
        let options = FindOptions {
            take: Some(1),
            order: OrderBy {
                field: OrderField::Rank,
                descending: true,
            },
            ..Default::default()
        };
        let last = store
            .find(&StoreFilter::new().siblings_of(parent_group_id), &options)
            .await?;

        Ok(last.first().map_or(0, |g| g.rank + 1))
    }

    /// Rank for a new sibling
    ///
    /// - no request: append
    /// - request at or past the append position: append
    /// - request inside the group: open a slot there
    ///
    /// Negative requests clamp to 0.
    pub async fn resolve_insert_rank<S>(
        store: &S,
        parent_group_id: Option<&str>,
        requested: Option<i64>,
    ) -> Result<i64>
    where
        S: GroupStore + ?Sized,
    {
        let append = Self::next_rank(store, parent_group_id).await?;

        match requested {
            Some(rank) if rank.max(0) < append => {
                let rank = rank.max(0);
                Self::rerank_after_insertion(store, parent_group_id, rank).await?;
                Ok(rank)
            }
            _ => Ok(append),
        }
    }

    /// Rank for a group returning to the sibling group without shifting others
    ///
    /// `preferred` when no live sibling holds it, otherwise the lowest rank no
    /// live sibling holds (a soft-delete gap, or the append position).
    pub async fn restore_rank<S>(
        store: &S,
        parent_group_id: Option<&str>,
        preferred: i64,
    ) -> Result<i64>
    where
        S: GroupStore + ?Sized,
    {
        let taken: HashSet<i64> = store
            .find(&StoreFilter::new().siblings_of(parent_group_id), &FindOptions::new())
            .await?
            .into_iter()
            .map(|g| g.rank)
            .collect();

        if !taken.contains(&preferred) {
            return Ok(preferred);
        }

        let mut rank = 0;
        while taken.contains(&rank) {
            rank += 1;
        }
        Ok(rank)
    }
}
