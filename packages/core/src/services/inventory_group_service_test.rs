//! Behavior tests for InventoryGroupService
//!
//! Tests cover:
//! - Root and child creation (paths, ranks, derived handles and codes)
//! - Sibling rank maintenance on create / reorder / move / delete
//! - Subtree moves and cycle rejection
//! - Delete guard, soft delete and restore
//! - Tree inclusion on list and retrieve
//! - Batch atomicity

#[cfg(test)]
mod tests {
    use crate::db::{GroupStore, MemoryStore, StoreFilter, TransactionalStore};
    use crate::models::{
        CreateInventoryGroup, FindConfig, InventoryGroup, InventoryGroupFilters, OrderBy,
        OrderField, TreeInclusion, UpdateInventoryGroup,
    };
    use crate::services::{InventoryGroupService, InventoryGroupServiceError};
    use std::collections::{BTreeMap, HashMap};
    use std::sync::Arc;

    fn create_test_service() -> (InventoryGroupService<MemoryStore>, MemoryStore) {
        let store = MemoryStore::new();
        let service = InventoryGroupService::new(Arc::new(store.clone()));
        (service, store)
    }

    async fn create_one(
        service: &InventoryGroupService<MemoryStore>,
        input: CreateInventoryGroup,
    ) -> InventoryGroup {
        service.create(vec![input]).await.unwrap().remove(0)
    }

    async fn fetch(store: &MemoryStore, id: &str) -> InventoryGroup {
        store
            .find_one(&StoreFilter::new().id(id).include_deleted())
            .await
            .unwrap()
            .unwrap()
    }

    /// Live sibling ids under `parent`, in rank order
    async fn sibling_ids(store: &MemoryStore, parent: Option<&str>) -> Vec<String> {
        store
            .find(
                &StoreFilter::new().siblings_of(parent),
                &crate::db::FindOptions::new(),
            )
            .await
            .unwrap()
            .into_iter()
            .map(|g| g.id)
            .collect()
    }

    /// Path consistency and rank contiguity over every live group
    async fn assert_tree_invariants(store: &MemoryStore) {
        let all = store.snapshot().await;
        let live: Vec<&InventoryGroup> = all.iter().filter(|g| !g.is_deleted()).collect();
        let by_id: HashMap<&str, &InventoryGroup> =
            all.iter().map(|g| (g.id.as_str(), g)).collect();

        let mut ranks: BTreeMap<Option<String>, Vec<i64>> = BTreeMap::new();
        for group in &live {
            match &group.parent_group_id {
                Some(parent_id) => {
                    let parent = by_id
                        .get(parent_id.as_str())
                        .unwrap_or_else(|| panic!("dangling parent of {}", group.id));
                    assert_eq!(group.mpath, format!("{}.{}", parent.mpath, group.id));
                }
                None => assert_eq!(group.mpath, group.id),
            }
            ranks
                .entry(group.parent_group_id.clone())
                .or_default()
                .push(group.rank);
        }

        for (parent, mut group_ranks) in ranks {
            group_ranks.sort();
            let expected: Vec<i64> = (0..group_ranks.len() as i64).collect();
            assert_eq!(group_ranks, expected, "ranks under {:?}", parent);
        }
    }

    #[tokio::test]
    async fn test_create_root_group() {
        let (service, store) = create_test_service();

        let root = create_one(&service, CreateInventoryGroup::new("Main Warehouse")).await;

        assert_eq!(root.mpath, root.id);
        assert_eq!(root.rank, 0);
        assert!(root.parent_group_id.is_none());
        assert!(root.is_active);
        assert_eq!(root.handle, "main-warehouse");
        assert_eq!(fetch(&store, &root.id).await, root);
    }

    #[tokio::test]
    async fn test_children_ranked_in_order_and_compacted_on_delete() {
        let (service, store) = create_test_service();
        let root = create_one(&service, CreateInventoryGroup::new("R")).await;

        let children = service
            .create(vec![
                CreateInventoryGroup::new("C1").with_parent(root.id.clone()),
                CreateInventoryGroup::new("C2").with_parent(root.id.clone()),
                CreateInventoryGroup::new("C3").with_parent(root.id.clone()),
            ])
            .await
            .unwrap();
        let ranks: Vec<i64> = children.iter().map(|c| c.rank).collect();
        assert_eq!(ranks, vec![0, 1, 2]);
        assert!(children
            .iter()
            .all(|c| c.mpath == format!("{}.{}", root.id, c.id)));

        service.delete(&[children[1].id.clone()]).await.unwrap();

        assert_eq!(fetch(&store, &children[2].id).await.rank, 1);
        assert_eq!(
            sibling_ids(&store, Some(&root.id)).await,
            vec![children[0].id.clone(), children[2].id.clone()]
        );
        assert_tree_invariants(&store).await;
    }

    #[tokio::test]
    async fn test_move_subtree_under_new_root() {
        let (service, store) = create_test_service();
        let r = create_one(&service, CreateInventoryGroup::new("R")).await;
        let a = create_one(&service, CreateInventoryGroup::new("A").with_parent(r.id.clone())).await;
        let sibling =
            create_one(&service, CreateInventoryGroup::new("S").with_parent(r.id.clone())).await;
        let b = create_one(&service, CreateInventoryGroup::new("B").with_parent(a.id.clone())).await;
        let r2 = create_one(&service, CreateInventoryGroup::new("R2")).await;

        let moved = service
            .update(vec![
                UpdateInventoryGroup::new(a.id.clone()).with_parent(Some(r2.id.clone()))
            ])
            .await
            .unwrap()
            .remove(0);

        assert_eq!(moved.mpath, format!("{}.{}", r2.id, a.id));
        assert_eq!(moved.parent_group_id.as_deref(), Some(r2.id.as_str()));
        assert_eq!(moved.rank, 0);

        let b = fetch(&store, &b.id).await;
        assert_eq!(b.mpath, format!("{}.{}", moved.mpath, b.id));

        // R's remaining child compacted
        assert_eq!(fetch(&store, &sibling.id).await.rank, 0);
        assert_tree_invariants(&store).await;
    }

    #[tokio::test]
    async fn test_list_with_descendants_tree() {
        let (service, _store) = create_test_service();
        let r = create_one(&service, CreateInventoryGroup::new("R")).await;
        let children = service
            .create(vec![
                CreateInventoryGroup::new("C1").with_parent(r.id.clone()),
                CreateInventoryGroup::new("C2").with_parent(r.id.clone()),
                CreateInventoryGroup::new("C3").with_parent(r.id.clone()),
            ])
            .await
            .unwrap();
        service.delete(&[children[1].id.clone()]).await.unwrap();

        let trees = service
            .list(
                &InventoryGroupFilters::by_id(r.id.clone()).with_descendants(),
                &FindConfig::default(),
            )
            .await
            .unwrap();

        assert_eq!(trees.len(), 1);
        let root = &trees[0];
        assert_eq!(root.id(), r.id);
        assert!(root.parent_group.is_none());
        let child_ids: Vec<&str> = root.children().iter().map(|c| c.id()).collect();
        assert_eq!(child_ids, vec![children[0].id.as_str(), children[2].id.as_str()]);
        assert!(root.children().iter().all(|c| c.parent_group.is_none()));
    }

    #[tokio::test]
    async fn test_derived_handle_and_location_code() {
        let (service, _store) = create_test_service();

        let shelf = create_one(
            &service,
            CreateInventoryGroup::new("Shelf 2")
                .with_type("shelf")
                .with_zone("A")
                .with_aisle(3)
                .with_shelf(2),
        )
        .await;
        assert_eq!(shelf.handle, "a-03-2");
        assert_eq!(shelf.location_code.as_deref(), Some("A03-2"));

        // same position again gets a suffixed handle
        let twin = create_one(
            &service,
            CreateInventoryGroup::new("Shelf 2 (overflow)")
                .with_zone("A")
                .with_aisle(3)
                .with_shelf(2),
        )
        .await;
        assert_eq!(twin.handle, "a-03-2-v2");
        assert_eq!(twin.location_code, shelf.location_code);

        // a suffixed aisle handle leaves the shelf positions below it free
        let aisle = create_one(
            &service,
            CreateInventoryGroup::new("Aisle 3").with_zone("A").with_aisle(3),
        )
        .await;
        let aisle_twin = create_one(
            &service,
            CreateInventoryGroup::new("Aisle 3b").with_zone("A").with_aisle(3),
        )
        .await;
        assert_eq!(aisle.handle, "a-03");
        assert_eq!(aisle_twin.handle, "a-03-v2");
        let shelf_5 = create_one(
            &service,
            CreateInventoryGroup::new("Shelf 5")
                .with_zone("A")
                .with_aisle(3)
                .with_shelf(5),
        )
        .await;
        assert_eq!(shelf_5.handle, "a-03-5");

        let unnamed = create_one(&service, CreateInventoryGroup::new("***")).await;
        assert_eq!(unnamed.handle, "group");
    }

    #[tokio::test]
    async fn test_explicit_duplicate_handle_rejected() {
        let (service, store) = create_test_service();
        create_one(&service, CreateInventoryGroup::new("Cold").with_handle("cold")).await;

        let err = service
            .create(vec![CreateInventoryGroup::new("Cold 2").with_handle("cold")])
            .await
            .unwrap_err();
        assert!(err.is_invalid_argument());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_create_with_unknown_parent_rejected() {
        let (service, _store) = create_test_service();

        let err = service
            .create(vec![CreateInventoryGroup::new("Orphan").with_parent("igrp_missing")])
            .await
            .unwrap_err();
        assert!(matches!(err, InventoryGroupServiceError::InvalidArgument(_)));

        let err = service
            .create(vec![CreateInventoryGroup::new("   ")])
            .await
            .unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[tokio::test]
    async fn test_batch_create_is_all_or_nothing() {
        let (service, store) = create_test_service();
        let root = create_one(&service, CreateInventoryGroup::new("R")).await;

        let result = service
            .create(vec![
                CreateInventoryGroup::new("First").with_parent(root.id.clone()),
                CreateInventoryGroup::new("Second").with_parent("igrp_missing"),
            ])
            .await;
        assert!(result.is_err());

        assert_eq!(store.len().await, 1);
        assert!(sibling_ids(&store, Some(&root.id)).await.is_empty());
    }

    #[tokio::test]
    async fn test_create_at_explicit_rank_shifts_siblings() {
        let (service, store) = create_test_service();
        let root = create_one(&service, CreateInventoryGroup::new("R")).await;
        let a = create_one(&service, CreateInventoryGroup::new("A").with_parent(root.id.clone())).await;
        let b = create_one(&service, CreateInventoryGroup::new("B").with_parent(root.id.clone())).await;

        let front = create_one(
            &service,
            CreateInventoryGroup::new("Front")
                .with_parent(root.id.clone())
                .with_rank(0),
        )
        .await;
        let tail = create_one(
            &service,
            CreateInventoryGroup::new("Tail")
                .with_parent(root.id.clone())
                .with_rank(42),
        )
        .await;

        assert_eq!(front.rank, 0);
        assert_eq!(tail.rank, 3);
        assert_eq!(
            sibling_ids(&store, Some(&root.id)).await,
            vec![front.id, a.id, b.id, tail.id]
        );
        assert_tree_invariants(&store).await;
    }

    #[tokio::test]
    async fn test_reorder_within_parent() {
        let (service, store) = create_test_service();
        let root = create_one(&service, CreateInventoryGroup::new("R")).await;
        let ids: Vec<String> = service
            .create(
                ["A", "B", "C", "D"]
                    .iter()
                    .map(|n| CreateInventoryGroup::new(*n).with_parent(root.id.clone()))
                    .collect(),
            )
            .await
            .unwrap()
            .into_iter()
            .map(|g| g.id)
            .collect();

        service
            .update(vec![UpdateInventoryGroup::new(ids[0].clone()).with_rank(2)])
            .await
            .unwrap();
        assert_eq!(
            sibling_ids(&store, Some(&root.id)).await,
            vec![ids[1].clone(), ids[2].clone(), ids[0].clone(), ids[3].clone()]
        );

        service
            .update(vec![UpdateInventoryGroup::new(ids[3].clone()).with_rank(0)])
            .await
            .unwrap();
        assert_eq!(
            sibling_ids(&store, Some(&root.id)).await,
            vec![ids[3].clone(), ids[1].clone(), ids[2].clone(), ids[0].clone()]
        );
        assert_tree_invariants(&store).await;
    }

    #[tokio::test]
    async fn test_patch_with_current_parent_keeps_order() {
        let (service, store) = create_test_service();
        let root = create_one(&service, CreateInventoryGroup::new("R")).await;
        let children = service
            .create(vec![
                CreateInventoryGroup::new("A").with_parent(root.id.clone()),
                CreateInventoryGroup::new("B").with_parent(root.id.clone()),
            ])
            .await
            .unwrap();

        let updated = service
            .update(vec![UpdateInventoryGroup::new(children[0].id.clone())
                .with_parent(Some(root.id.clone()))
                .with_name("A renamed")])
            .await
            .unwrap()
            .remove(0);

        assert_eq!(updated.rank, 0);
        assert_eq!(updated.mpath, children[0].mpath);
        assert_eq!(updated.name, "A renamed");
        assert_eq!(
            sibling_ids(&store, Some(&root.id)).await,
            vec![children[0].id.clone(), children[1].id.clone()]
        );
        assert_tree_invariants(&store).await;
    }

    #[tokio::test]
    async fn test_detach_to_root() {
        let (service, store) = create_test_service();
        let root = create_one(&service, CreateInventoryGroup::new("R")).await;
        let a = create_one(&service, CreateInventoryGroup::new("A").with_parent(root.id.clone())).await;
        let b = create_one(&service, CreateInventoryGroup::new("B").with_parent(a.id.clone())).await;

        let detached = service
            .update(vec![UpdateInventoryGroup::new(a.id.clone()).with_parent(None)])
            .await
            .unwrap()
            .remove(0);

        assert_eq!(detached.mpath, a.id);
        assert!(detached.parent_group_id.is_none());
        assert_eq!(detached.rank, 1);
        assert_eq!(
            fetch(&store, &b.id).await.mpath,
            format!("{}.{}", a.id, b.id)
        );
        assert_tree_invariants(&store).await;
    }

    #[tokio::test]
    async fn test_move_under_own_descendant_rejected() {
        let (service, store) = create_test_service();
        let a = create_one(&service, CreateInventoryGroup::new("A")).await;
        let b = create_one(&service, CreateInventoryGroup::new("B").with_parent(a.id.clone())).await;

        let err = service
            .update(vec![
                UpdateInventoryGroup::new(a.id.clone()).with_parent(Some(b.id.clone()))
            ])
            .await
            .unwrap_err();
        assert!(err.is_invalid_argument());

        let err = service
            .update(vec![
                UpdateInventoryGroup::new(a.id.clone()).with_parent(Some(a.id.clone()))
            ])
            .await
            .unwrap_err();
        assert!(err.is_invalid_argument());

        assert_eq!(fetch(&store, &a.id).await.mpath, a.id);
    }

    #[tokio::test]
    async fn test_update_unknown_group_not_found() {
        let (service, _store) = create_test_service();
        let err = service
            .update(vec![UpdateInventoryGroup::new("igrp_nope").with_name("x")])
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_update_fields_recomputes_location_code_only() {
        let (service, _store) = create_test_service();
        let group = create_one(
            &service,
            CreateInventoryGroup::new("Aisle")
                .with_zone("A")
                .with_aisle(3),
        )
        .await;
        assert_eq!(group.handle, "a-03");

        let updated = service
            .update(vec![UpdateInventoryGroup {
                aisle_number: Some(Some(4)),
                ..UpdateInventoryGroup::new(group.id.clone())
            }])
            .await
            .unwrap()
            .remove(0);
        assert_eq!(updated.location_code.as_deref(), Some("A04"));
        assert_eq!(updated.handle, "a-03");

        // explicit null clears
        let cleared = service
            .update(vec![UpdateInventoryGroup {
                zone_code: Some(None),
                ..UpdateInventoryGroup::new(group.id.clone())
            }])
            .await
            .unwrap()
            .remove(0);
        assert_eq!(cleared.zone_code, None);
        assert_eq!(cleared.location_code, None);
        assert_eq!(cleared.aisle_number, Some(4));
    }

    #[tokio::test]
    async fn test_delete_guard_leaves_store_unchanged() {
        let (service, store) = create_test_service();
        let root = create_one(&service, CreateInventoryGroup::new("R")).await;
        create_one(&service, CreateInventoryGroup::new("C").with_parent(root.id.clone())).await;
        let before = store.snapshot().await;

        let err = service.delete(&[root.id.clone()]).await.unwrap_err();
        assert!(err.is_not_allowed());
        assert_eq!(store.snapshot().await, before);

        let err = service.delete(&["igrp_missing".to_string()]).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_delete_purges_soft_deleted_descendants() {
        let (service, store) = create_test_service();
        let root = create_one(&service, CreateInventoryGroup::new("R")).await;
        let child =
            create_one(&service, CreateInventoryGroup::new("C").with_parent(root.id.clone())).await;

        service.soft_delete(&[child.id.clone()]).await.unwrap();
        service.delete(&[root.id.clone()]).await.unwrap();

        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_soft_delete_and_restore_round_trip() {
        let (service, store) = create_test_service();
        let root = create_one(&service, CreateInventoryGroup::new("R")).await;
        let children = service
            .create(vec![
                CreateInventoryGroup::new("C1").with_parent(root.id.clone()),
                CreateInventoryGroup::new("C2").with_parent(root.id.clone()),
                CreateInventoryGroup::new("C3").with_parent(root.id.clone()),
            ])
            .await
            .unwrap();
        let before = fetch(&store, &children[1].id).await;

        let affected = service.soft_delete(&[before.id.clone()]).await.unwrap();
        assert_eq!(affected, vec![before.id.clone()]);
        // no compaction
        assert_eq!(fetch(&store, &children[2].id).await.rank, 2);
        let hidden = service
            .retrieve(&before.id, TreeInclusion::default(), &FindConfig::default())
            .await
            .unwrap_err();
        assert!(hidden.is_not_found());

        // second soft delete is a no-op
        assert!(service.soft_delete(&[before.id.clone()]).await.unwrap().is_empty());

        let restored = service.restore(&[before.id.clone()]).await.unwrap();
        assert_eq!(restored, vec![before.id.clone()]);
        assert_eq!(fetch(&store, &before.id).await, before);

        // restoring a live group is a no-op
        assert!(service.restore(&[before.id.clone()]).await.unwrap().is_empty());
        assert_tree_invariants(&store).await;
    }

    #[tokio::test]
    async fn test_restore_after_sibling_delete_takes_free_rank() {
        let (service, store) = create_test_service();
        let root = create_one(&service, CreateInventoryGroup::new("R")).await;
        let children = service
            .create(vec![
                CreateInventoryGroup::new("C1").with_parent(root.id.clone()),
                CreateInventoryGroup::new("C2").with_parent(root.id.clone()),
                CreateInventoryGroup::new("C3").with_parent(root.id.clone()),
            ])
            .await
            .unwrap();
        let (c1, c2, c3) = (&children[0], &children[1], &children[2]);

        service.soft_delete(&[c2.id.clone()]).await.unwrap();
        service.delete(&[c1.id.clone()]).await.unwrap();
        // C3 compacted onto C2's stored rank
        assert_eq!(fetch(&store, &c3.id).await.rank, 1);

        service.restore(&[c2.id.clone()]).await.unwrap();

        assert_eq!(fetch(&store, &c3.id).await.rank, 1);
        assert_eq!(fetch(&store, &c2.id).await.rank, 0);
        assert_eq!(
            sibling_ids(&store, Some(&root.id)).await,
            vec![c2.id.clone(), c3.id.clone()]
        );
        assert_tree_invariants(&store).await;
    }

    #[tokio::test]
    async fn test_restore_with_taken_handle_rejected() {
        let (service, _store) = create_test_service();
        let original =
            create_one(&service, CreateInventoryGroup::new("Dock").with_handle("dock")).await;
        service.soft_delete(&[original.id.clone()]).await.unwrap();
        create_one(&service, CreateInventoryGroup::new("New Dock").with_handle("dock")).await;

        let err = service.restore(&[original.id.clone()]).await.unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[tokio::test]
    async fn test_retrieve_with_ancestors() {
        let (service, _store) = create_test_service();
        let zone = create_one(&service, CreateInventoryGroup::new("Zone")).await;
        let aisle =
            create_one(&service, CreateInventoryGroup::new("Aisle").with_parent(zone.id.clone())).await;
        let shelf =
            create_one(&service, CreateInventoryGroup::new("Shelf").with_parent(aisle.id.clone())).await;

        let node = service
            .retrieve(
                &shelf.id,
                TreeInclusion {
                    ancestors: true,
                    descendants: false,
                },
                &FindConfig::default(),
            )
            .await
            .unwrap();

        let chain: Vec<&str> = node.ancestors().iter().map(|g| g.id.as_str()).collect();
        assert_eq!(chain, vec![aisle.id.as_str(), zone.id.as_str()]);
        assert!(node.group_children.is_none());
        assert!(node.parent_group.as_ref().unwrap().group_children.is_none());
    }

    #[tokio::test]
    async fn test_list_filters_and_pagination() {
        let (service, _store) = create_test_service();
        let root = create_one(&service, CreateInventoryGroup::new("Warehouse")).await;
        for (name, zone) in [("Cold A", "A"), ("Dry B", "B"), ("Cold C", "C")] {
            create_one(
                &service,
                CreateInventoryGroup::new(name)
                    .with_parent(root.id.clone())
                    .with_zone(zone)
                    .with_aisle(1),
            )
            .await;
        }

        let roots = service
            .list(&InventoryGroupFilters::roots(), &FindConfig::default())
            .await
            .unwrap();
        assert_eq!(roots.len(), 1);

        let cold = service
            .list(
                &InventoryGroupFilters {
                    q: Some("COLD".to_string()),
                    ..Default::default()
                },
                &FindConfig::default(),
            )
            .await
            .unwrap();
        assert_eq!(cold.len(), 2);

        let by_code = service
            .list(
                &InventoryGroupFilters {
                    q: Some("b01".to_string()),
                    ..Default::default()
                },
                &FindConfig::default(),
            )
            .await
            .unwrap();
        assert_eq!(by_code.len(), 1);
        assert_eq!(by_code[0].group.name, "Dry B");

        let (page, total) = service
            .list_and_count(
                &InventoryGroupFilters::children_of(root.id.clone()),
                &FindConfig {
                    skip: Some(1),
                    take: Some(1),
                    order: Some(OrderBy {
                        field: OrderField::Name,
                        descending: true,
                    }),
                    with_deleted: false,
                },
            )
            .await
            .unwrap();
        assert_eq!(total, 3);
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].group.name, "Cold C");
    }

    #[tokio::test]
    async fn test_caller_owned_transaction_rolls_back() {
        let (service, store) = create_test_service();

        let tx = store.begin().await.unwrap();
        let created = service
            .create_in(tx.as_ref(), vec![CreateInventoryGroup::new("Temp")])
            .await
            .unwrap();
        assert_eq!(created.len(), 1);
        tx.rollback().await.unwrap();

        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_mixed_operations_keep_invariants() {
        let (service, store) = create_test_service();
        let r1 = create_one(&service, CreateInventoryGroup::new("R1")).await;
        let r2 = create_one(&service, CreateInventoryGroup::new("R2")).await;

        let mut ids = Vec::new();
        for i in 0..6 {
            let parent = if i % 2 == 0 { &r1 } else { &r2 };
            let g = create_one(
                &service,
                CreateInventoryGroup::new(format!("G{}", i))
                    .with_parent(parent.id.clone())
                    .with_rank(i as i64 % 3),
            )
            .await;
            ids.push(g.id);
        }
        let leaf =
            create_one(&service, CreateInventoryGroup::new("Leaf").with_parent(ids[0].clone())).await;

        service
            .update(vec![
                UpdateInventoryGroup::new(ids[0].clone()).with_parent(Some(r2.id.clone())).with_rank(1),
                UpdateInventoryGroup::new(ids[3].clone()).with_rank(0),
                UpdateInventoryGroup::new(ids[5].clone()).with_parent(None),
            ])
            .await
            .unwrap();
        assert_tree_invariants(&store).await;

        service.delete(&[ids[2].clone(), leaf.id.clone()]).await.unwrap();
        assert_tree_invariants(&store).await;

        let leaf_parent = fetch(&store, &ids[0]).await;
        assert_eq!(leaf_parent.parent_group_id.as_deref(), Some(r2.id.as_str()));
    }
}
