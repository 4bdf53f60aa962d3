//! Tree reconstruction from flat query results
//!
//! Given seed groups and a `TreeInclusion`, fetch the context rows by mpath
//! (descendants by prefix, ancestors by exact prefix equality) and assemble
//! owned `GroupTreeNode` values.
//!
//! # Shape
//!
//! - seeds carry only the requested directions
//! - ancestor nodes carry `parent_group` only
//! - descendant nodes carry `group_children` only, sorted by rank
//!
//! A `parent_group_id` that does not resolve inside the fetched set ends the
//! ancestor chain there. Inconsistent data (cycles, wrong mpaths) can never
//! loop: ancestor walks are bounded by the seed's path depth and descendant
//! walks track visited ids.

use crate::db::{FindOptions, GroupStore, StoreFilter};
use crate::models::{GroupTreeNode, InventoryGroup, TreeInclusion};
use crate::utils::mpath;
use anyhow::Result;
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap, HashSet};

pub struct TreeBuilder;

impl TreeBuilder {
    /// Attach the requested tree context to every seed
    ///
    /// Returns plain leaves without touching the store when nothing is requested.
    pub async fn build<S>(
        store: &S,
        seeds: Vec<InventoryGroup>,
        inclusion: TreeInclusion,
        with_deleted: bool,
    ) -> Result<Vec<GroupTreeNode>>
    where
        S: GroupStore + ?Sized,
    {
        if !inclusion.is_requested() || seeds.is_empty() {
            return Ok(seeds.into_iter().map(GroupTreeNode::leaf).collect());
        }

        let context = Self::fetch_context(store, &seeds, inclusion, with_deleted).await?;
        Ok(Self::assemble(seeds, context, inclusion))
    }

    /// Fetch every row needed to assemble the requested directions
    pub async fn fetch_context<S>(
        store: &S,
        seeds: &[InventoryGroup],
        inclusion: TreeInclusion,
        with_deleted: bool,
    ) -> Result<Vec<InventoryGroup>>
    where
        S: GroupStore + ?Sized,
    {
        let scoped = |filter: StoreFilter| {
            if with_deleted {
                filter.include_deleted()
            } else {
                filter
            }
        };

        let mut context = Vec::new();

        if inclusion.descendants {
            for seed in seeds {
                let rows = store
                    .find(&scoped(StoreFilter::new().descendants_of(&seed.mpath)), &FindOptions::new())
                    .await?;
                context.extend(rows);
            }
        }

        if inclusion.ancestors {
            let prefixes: BTreeSet<String> = seeds
                .iter()
                .flat_map(|seed| mpath::ancestor_prefixes(&seed.mpath))
                .collect();

            if !prefixes.is_empty() {
                let rows = store
                    .find(
                        &scoped(StoreFilter::new().mpath_any_of(prefixes.into_iter().collect())),
                        &FindOptions::new(),
                    )
                    .await?;
                context.extend(rows);
            }
        }

        tracing::debug!(
            "Fetched {} context rows for {} seeds (ancestors: {}, descendants: {})",
            context.len(),
            seeds.len(),
            inclusion.ancestors,
            inclusion.descendants
        );

        Ok(context)
    }

    /// Assemble trees from seeds plus context rows, without touching the store
    ///
    /// Seeds keep their input order.
    pub fn assemble(
        seeds: Vec<InventoryGroup>,
        context: Vec<InventoryGroup>,
        inclusion: TreeInclusion,
    ) -> Vec<GroupTreeNode> {
        let arena = Arena::new(&seeds, context);

        seeds
            .into_iter()
            .map(|seed| {
                let parent_group = if inclusion.ancestors {
                    arena.ancestor_chain(&seed, mpath::segment_count(&seed.mpath))
                } else {
                    None
                };

                let group_children = if inclusion.descendants {
                    let mut visited = HashSet::from([seed.id.clone()]);
                    Some(arena.descendants(&seed.id, &mut visited))
                } else {
                    None
                };

                GroupTreeNode {
                    group: seed,
                    parent_group,
                    group_children,
                }
            })
            .collect()
    }
}

/// Sibling order: rank, then creation time, then id
fn sibling_order(a: &InventoryGroup, b: &InventoryGroup) -> Ordering {
    a.rank
        .cmp(&b.rank)
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

/// id-indexed node storage with a parent -> children index
struct Arena {
    nodes: Vec<InventoryGroup>,
    by_id: HashMap<String, usize>,
    children: HashMap<String, Vec<usize>>,
}

impl Arena {
    fn new(seeds: &[InventoryGroup], context: Vec<InventoryGroup>) -> Self {
        let mut nodes = Vec::with_capacity(seeds.len() + context.len());
        let mut by_id = HashMap::new();

        for group in seeds.iter().cloned().chain(context) {
            if by_id.contains_key(&group.id) {
                continue;
            }
            by_id.insert(group.id.clone(), nodes.len());
            nodes.push(group);
        }

        let mut children: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, group) in nodes.iter().enumerate() {
            if let Some(parent_id) = &group.parent_group_id {
                children.entry(parent_id.clone()).or_default().push(idx);
            }
        }
        for siblings in children.values_mut() {
            siblings.sort_by(|&a, &b| sibling_order(&nodes[a], &nodes[b]));
        }

        Self {
            nodes,
            by_id,
            children,
        }
    }

    fn ancestor_chain(
        &self,
        group: &InventoryGroup,
        remaining_depth: usize,
    ) -> Option<Box<GroupTreeNode>> {
        if remaining_depth == 0 {
            return None;
        }

        let parent_id = group.parent_group_id.as_ref()?;
        let parent = &self.nodes[*self.by_id.get(parent_id)?];

        Some(Box::new(GroupTreeNode {
            group: parent.clone(),
            parent_group: self.ancestor_chain(parent, remaining_depth - 1),
            group_children: None,
        }))
    }

    fn descendants(&self, id: &str, visited: &mut HashSet<String>) -> Vec<GroupTreeNode> {
        let Some(child_indexes) = self.children.get(id) else {
            return Vec::new();
        };

        let mut result = Vec::with_capacity(child_indexes.len());
        for &idx in child_indexes {
            let child = &self.nodes[idx];
            if !visited.insert(child.id.clone()) {
                continue;
            }
            let grandchildren = self.descendants(&child.id, visited);
            result.push(GroupTreeNode {
                group: child.clone(),
                parent_group: None,
                group_children: Some(grandchildren),
            });
        }
        result
    }
}
