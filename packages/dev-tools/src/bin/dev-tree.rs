//! Development tree tool
//!
//! Seeds a demo warehouse into the libsql database (when it is empty) and
//! prints every root with its descendants as JSON.
//!
//! Run with: `cargo run -p stocktree-dev-tools --bin dev-tree [seed|dump|reset]`
//!
//! - `seed` (default): seed if empty, then dump
//! - `dump`: dump only
//! - `reset`: delete every group, then seed and dump
//!
//! Configuration comes from `STOCKTREE_DB_PATH` / `STOCKTREE_BUSY_TIMEOUT_MS`.

use anyhow::{bail, Result};
use std::sync::Arc;
use stocktree_core::db::{DatabaseConfig, DatabaseService, GroupStore, LibsqlStore, StoreFilter};
use stocktree_core::models::{
    CreateInventoryGroup, FindConfig, InventoryGroupFilters, UpdateInventoryGroup,
};
use stocktree_core::services::InventoryGroupService;
use tracing_subscriber::EnvFilter;

type Service = InventoryGroupService<LibsqlStore>;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let command = std::env::args().nth(1).unwrap_or_else(|| "seed".to_string());

    let config = DatabaseConfig::from_env();
    tracing::info!("Using database at {}", config.db_path.display());

    let db = Arc::new(DatabaseService::new(config).await?);
    let store = Arc::new(LibsqlStore::new(db));
    let service = InventoryGroupService::new(store.clone());

    match command.as_str() {
        "seed" => {
            if store.count(&StoreFilter::new().include_deleted()).await? == 0 {
                seed_demo_warehouse(&service).await?;
            } else {
                tracing::info!("Database already has groups, skipping seed");
            }
        }
        "dump" => {}
        "reset" => {
            reset(&store).await?;
            seed_demo_warehouse(&service).await?;
        }
        other => bail!("Unknown command '{}' (expected seed, dump or reset)", other),
    }

    let trees = service
        .list(
            &InventoryGroupFilters::roots().with_descendants(),
            &FindConfig::default(),
        )
        .await?;
    println!("{}", serde_json::to_string_pretty(&trees)?);

    Ok(())
}

async fn reset(store: &LibsqlStore) -> Result<()> {
    let ids: Vec<String> = store
        .find(&StoreFilter::new().include_deleted(), &Default::default())
        .await?
        .into_iter()
        .map(|g| g.id)
        .collect();
    let removed = store.delete(&ids).await?;
    tracing::info!("Removed {} groups", removed);
    Ok(())
}

/// Two zones with aisles and shelves, then one aisle moved between zones
async fn seed_demo_warehouse(service: &Service) -> Result<()> {
    let zones = service
        .create(vec![
            CreateInventoryGroup::new("Zone A").with_type("zone").with_zone("A"),
            CreateInventoryGroup::new("Zone B").with_type("zone").with_zone("B"),
        ])
        .await?;

    for zone in &zones {
        let zone_code = zone.zone_code.clone().unwrap_or_default();

        let aisles = service
            .create(
                (1..=3)
                    .map(|aisle| {
                        CreateInventoryGroup::new(format!("{} Aisle {}", zone.name, aisle))
                            .with_parent(zone.id.clone())
                            .with_type("aisle")
                            .with_zone(zone_code.clone())
                            .with_aisle(aisle)
                    })
                    .collect(),
            )
            .await?;

        for aisle in &aisles {
            let aisle_number = aisle.aisle_number.unwrap_or_default();
            service
                .create(
                    (1..=4)
                        .map(|shelf| {
                            CreateInventoryGroup::new(format!("{} Shelf {}", aisle.name, shelf))
                                .with_parent(aisle.id.clone())
                                .with_type("shelf")
                                .with_zone(zone_code.clone())
                                .with_aisle(aisle_number)
                                .with_group_number(1)
                                .with_shelf(shelf)
                        })
                        .collect(),
                )
                .await?;
        }
    }

    // Move the last aisle of zone B to the front of zone A
    let zone_b_aisles = service
        .list(
            &InventoryGroupFilters::children_of(zones[1].id.clone()),
            &FindConfig::default(),
        )
        .await?;
    if let Some(last) = zone_b_aisles.last() {
        service
            .update(vec![UpdateInventoryGroup::new(last.id())
                .with_parent(Some(zones[0].id.clone()))
                .with_rank(0)])
            .await?;
    }

    tracing::info!("Seeded demo warehouse");
    Ok(())
}
